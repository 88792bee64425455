use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::Credential;

/// User record as persisted by a [`UserStore`](super::repo::UserStore).
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub credential: Credential,
    pub phone: String,
    pub registered_at: OffsetDateTime,
}

/// Validated fields for a user that has no id yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub credential: Credential,
    pub phone: String,
    pub registered_at: OffsetDateTime,
}

/// Mutable fields written by a full replace; id and registration time stay.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub credential: Credential,
    pub phone: String,
}

/// Row shape of the `users` table.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub registered_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            surname: r.surname,
            email: r.email,
            credential: Credential::from_stored(r.password_hash),
            phone: r.phone,
            registered_at: r.registered_at,
        }
    }
}

/// Key used for email uniqueness: comparison ignores ASCII case, matching
/// the `lower(email COLLATE "C")` index on Postgres.
pub fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
