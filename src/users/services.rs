use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    macros::datetime,
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{UserRequest, UserResponse},
    repo::UserStore,
    repo_types::{NewUser, UserChanges},
};
use crate::{
    auth::{
        claims::Role,
        gate::{authorize, Operation},
        password::CredentialHandler,
    },
    error::AppError,
};

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        // printable ASCII except '@'; keeps case folding identical across stores
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[!-?A-~]+@[!-?A-~]+\.[!-?A-~]+$").unwrap();
    }
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9 ()\-]{3,32}$").unwrap();
    }
    phone.is_empty() || PHONE_RE.is_match(phone)
}

/// Accepts RFC 3339, or an ISO 8601 local date-time taken as UTC.
///
/// The result is normalized to UTC and must fall in years 0..=9999, the
/// range the RFC 3339 response format can represent.
pub(crate) fn parse_date(raw: &str) -> Result<OffsetDateTime, AppError> {
    const EARLIEST: OffsetDateTime = datetime!(0000-01-01 0:00 UTC);
    const LATEST: OffsetDateTime = datetime!(9999-12-31 23:59:59.999999999 UTC);

    let raw = raw.trim();
    let parsed = OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(|d| d.assume_utc()))
        .map_err(|_| AppError::InvalidInput("Invalid date".into()))?;
    // instant comparison, so offsets that push the UTC year past 9999 are caught
    if parsed < EARLIEST || parsed > LATEST {
        return Err(AppError::InvalidInput("Invalid date".into()));
    }
    Ok(parsed.to_offset(UtcOffset::UTC))
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{field} is required")));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(AppError::InvalidInput(format!("{field} is too long")));
    }
    Ok(value.to_string())
}

/// Identity fields that passed validation; the secret is still plaintext.
struct ValidFields<'a> {
    name: String,
    surname: String,
    email: String,
    phone: String,
    password: &'a str,
}

fn validate(req: &UserRequest) -> Result<ValidFields<'_>, AppError> {
    let name = required("name", &req.name)?;
    let surname = required("surname", &req.surname)?;

    let email = req.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::InvalidInput("Invalid email".into()));
    }

    let phone = req.phone.trim().to_string();
    if !is_valid_phone(&phone) {
        return Err(AppError::InvalidInput("Invalid phone".into()));
    }

    Ok(ValidFields {
        name,
        surname,
        email,
        phone,
        password: &req.password,
    })
}

/// Business rules for user accounts. Every entry point checks the access
/// gate before the store is touched.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    credentials: CredentialHandler,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, credentials: CredentialHandler) -> Self {
        Self { store, credentials }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn credentials(&self) -> &CredentialHandler {
        &self.credentials
    }

    /// Open registration: no caller role involved.
    #[instrument(skip(self, req))]
    pub async fn register(&self, req: UserRequest) -> Result<UserResponse, AppError> {
        let fields = validate(&req)?;
        let registered_at = match req.date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => parse_date(raw)?,
            None => OffsetDateTime::now_utc(),
        };
        let credential = self.credentials.derive(fields.password)?;

        let user = self
            .store
            .insert(NewUser {
                name: fields.name,
                surname: fields.surname,
                email: fields.email,
                credential,
                phone: fields.phone,
                registered_at,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self, role: Role) -> Result<Vec<UserResponse>, AppError> {
        authorize(role, Operation::List)?;
        let users = self.store.find_all().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, role: Role, id: Uuid) -> Result<UserResponse, AppError> {
        authorize(role, Operation::Get)?;
        Ok(self.store.find_by_id(id).await?.into())
    }

    /// Overwrites name, surname, email, phone and credential. The `date`
    /// field of the request is ignored: registration time never changes.
    #[instrument(skip(self, req))]
    pub async fn replace(
        &self,
        role: Role,
        id: Uuid,
        req: UserRequest,
    ) -> Result<UserResponse, AppError> {
        authorize(role, Operation::Replace)?;
        let fields = validate(&req)?;
        let credential = self.credentials.derive(fields.password)?;

        let user = self
            .store
            .update(
                id,
                UserChanges {
                    name: fields.name,
                    surname: fields.surname,
                    email: fields.email,
                    credential,
                    phone: fields.phone,
                },
            )
            .await?;

        info!(user_id = %user.id, email = %user.email, "user replaced");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, role: Role, id: Uuid) -> Result<(), AppError> {
        authorize(role, Operation::Delete)?;
        self.store.delete_by_id(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Argon2Config, users::memory::MemoryUserStore};

    fn service() -> UserService {
        let credentials = CredentialHandler::new(&Argon2Config {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        UserService::new(Arc::new(MemoryUserStore::new()), credentials)
    }

    fn request(email: &str) -> UserRequest {
        UserRequest {
            name: "name".into(),
            surname: "surname".into(),
            email: email.into(),
            password: "password".into(),
            date: None,
            phone: "071 392 202".into(),
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("username@me.com"));
        assert!(!is_valid_email("username"));
        assert!(!is_valid_email("user name@me.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("jürgen@me.com"));
        assert!(!is_valid_email("user@exämple.com"));
    }

    #[test]
    fn phone_validation_is_optional() {
        assert!(is_valid_phone(""));
        assert!(is_valid_phone("071 392 202"));
        assert!(is_valid_phone("+44 (20) 7946-0958"));
        assert!(!is_valid_phone("call me"));
    }

    #[test]
    fn parses_rfc3339_and_local_dates() {
        let a = parse_date("2024-05-01T10:20:30Z").unwrap();
        let b = parse_date("2024-05-01T10:20:30").unwrap();
        assert_eq!(a, b);
        assert!(matches!(parse_date("yesterday"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn parse_date_normalizes_to_utc() {
        let d = parse_date("2024-05-01T12:20:30+02:00").unwrap();
        assert_eq!(d.offset(), UtcOffset::UTC);
        assert_eq!(d, parse_date("2024-05-01T10:20:30Z").unwrap());
    }

    #[test]
    fn parse_date_rejects_years_outside_rfc3339_range() {
        for raw in [
            "-000001-01-01T00:00:00",
            "+010000-01-01T00:00:00",
            "9999-12-31T23:59:59-01:00",
        ] {
            assert!(
                matches!(parse_date(raw), Err(AppError::InvalidInput(_))),
                "{raw} should be rejected"
            );
        }
        assert!(parse_date("0000-01-01T00:00:00Z").is_ok());
        assert!(parse_date("9999-12-31T22:59:59-01:00").is_ok());
    }

    #[tokio::test]
    async fn register_with_unrepresentable_date_stores_nothing() {
        let svc = service();
        let mut req = request("old@me.com");
        req.date = Some("-000001-01-01T00:00:00".into());
        assert!(matches!(svc.register(req).await, Err(AppError::InvalidInput(_))));
        assert_eq!(svc.store().count().await.unwrap(), 0);
        assert!(svc.list_all(Role::User).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_returns_input_email_and_stores_hash() {
        let svc = service();
        let created = svc.register(request("username@me.com")).await.unwrap();
        assert_eq!(created.email, "username@me.com");

        let stored = svc.store().find_by_id(created.id).await.unwrap();
        assert_ne!(stored.credential.as_str(), "password");
        assert!(svc.credentials().verify("password", &stored.credential).unwrap());
    }

    #[tokio::test]
    async fn register_uses_supplied_date() {
        let svc = service();
        let mut req = request("dated@me.com");
        req.date = Some("2024-05-01T10:20:30".into());
        let created = svc.register(req).await.unwrap();
        assert_eq!(created.date, parse_date("2024-05-01T10:20:30Z").unwrap());
    }

    #[tokio::test]
    async fn register_rejects_blank_fields_and_secrets() {
        let svc = service();
        let mut req = request("a@me.com");
        req.name = "   ".into();
        assert!(matches!(svc.register(req).await, Err(AppError::InvalidInput(_))));

        let mut req = request("a@me.com");
        req.password = String::new();
        assert!(matches!(svc.register(req).await, Err(AppError::InvalidSecret(_))));

        assert!(matches!(
            svc.register(request("not-an-email")).await,
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(svc.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_registration_leaves_one_user() {
        let svc = service();
        svc.register(request("username@me.com")).await.unwrap();
        let err = svc.register(request("USERNAME@me.com")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
        assert_eq!(svc.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replace_updates_fields_but_not_id_or_date() {
        let svc = service();
        let created = svc.register(request("username@me.com")).await.unwrap();

        let mut req = request("newName@me.com");
        req.password = "another-password".into();
        req.date = Some("1999-01-01T00:00:00Z".into());
        let replaced = svc.replace(Role::User, created.id, req).await.unwrap();

        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.email, "newName@me.com");
        assert_eq!(replaced.date, created.date);
        let fetched = svc.get_by_id(Role::User, created.id).await.unwrap();
        assert_eq!(fetched.email, "newName@me.com");

        let stored = svc.store().find_by_id(created.id).await.unwrap();
        assert!(svc.credentials().verify("another-password", &stored.credential).unwrap());
    }

    #[tokio::test]
    async fn replace_missing_user_is_not_found() {
        let svc = service();
        let err = svc
            .replace(Role::User, Uuid::new_v4(), request("x@me.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn delete_requires_admin_and_is_not_idempotent() {
        let svc = service();
        let created = svc.register(request("username@me.com")).await.unwrap();

        let err = svc.delete(Role::User, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        assert_eq!(svc.store().count().await.unwrap(), 1);

        svc.delete(Role::Admin, created.id).await.unwrap();
        assert_eq!(svc.store().count().await.unwrap(), 0);
        assert!(matches!(
            svc.get_by_id(Role::Admin, created.id).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            svc.delete(Role::Admin, created.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_all_returns_every_registration_in_order() {
        let svc = service();
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(svc.register(request(&format!("u{i}@me.com"))).await.unwrap().id);
        }
        let listed: Vec<_> = svc.list_all(Role::User).await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(listed, ids);
    }
}
