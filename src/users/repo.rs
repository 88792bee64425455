use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges, UserRow};
use crate::error::AppError;

/// Keyed persistence for user records.
///
/// Implementations enforce case-insensitive email uniqueness atomically with
/// the write, so two concurrent inserts of the same address cannot both win.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Assigns an id and persists. Fails with `DuplicateEmail`.
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;
    /// Live users in insertion order.
    async fn find_all(&self) -> Result<Vec<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<User, AppError>;
    /// Fails with `NotFound`, or `DuplicateEmail` when another user holds the email.
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, AppError>;
    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError>;
    async fn count(&self) -> Result<u64, AppError>;
}

/// Postgres-backed store. Uniqueness comes from the `lower(email)` index.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, surname, email, password_hash, phone, registered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, surname, email, password_hash, phone, registered_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.email)
        .bind(user.credential.as_str())
        .bind(&user.phone)
        .bind(user.registered_at)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn find_all(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, surname, email, password_hash, phone, registered_at
            FROM users
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, surname, email, password_hash, phone, registered_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::from).ok_or(AppError::NotFound)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET name = $2, surname = $3, email = $4, password_hash = $5, phone = $6
             WHERE id = $1
            RETURNING id, name, surname, email, password_hash, phone, registered_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.surname)
        .bind(&changes.email)
        .bind(changes.credential.as_str())
        .bind(&changes.phone)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::from).ok_or(AppError::NotFound)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64, AppError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(n as u64)
    }
}
