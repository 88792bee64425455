use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;

/// Request body for registration and full replace.
///
/// Missing fields deserialize as empty so validation reports them as
/// `InvalidInput` instead of a JSON rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub date: Option<String>,
    pub phone: String,
}

/// Public representation of a user. Never carries the credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            surname: u.surname,
            email: u.email,
            phone: u.phone,
            date: u.registered_at,
        }
    }
}
