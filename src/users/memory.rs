use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    repo::UserStore,
    repo_types::{email_key, NewUser, User, UserChanges},
};
use crate::error::AppError;

#[derive(Default)]
struct Inner {
    // insertion order
    users: Vec<User>,
    by_email: HashMap<String, Uuid>,
}

impl Inner {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }
}

/// Process-local store used when no database is configured, and in tests.
///
/// A single write lock covers both the records and the email index, so the
/// uniqueness check and the write cannot interleave with another writer.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;
        let key = email_key(&user.email);
        if inner.by_email.contains_key(&key) {
            return Err(AppError::DuplicateEmail);
        }
        let stored = User {
            id: Uuid::new_v4(),
            name: user.name,
            surname: user.surname,
            email: user.email,
            credential: user.credential,
            phone: user.phone,
            registered_at: user.registered_at,
        };
        inner.by_email.insert(key, stored.id);
        inner.users.push(stored.clone());
        Ok(stored)
    }

    async fn find_all(&self) -> Result<Vec<User>, AppError> {
        Ok(self.inner.read().await.users.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, AppError> {
        let inner = self.inner.read().await;
        inner
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;
        let idx = inner.position(id).ok_or(AppError::NotFound)?;
        let new_key = email_key(&changes.email);
        if matches!(inner.by_email.get(&new_key), Some(owner) if *owner != id) {
            return Err(AppError::DuplicateEmail);
        }
        let old_key = email_key(&inner.users[idx].email);
        inner.by_email.remove(&old_key);
        inner.by_email.insert(new_key, id);

        let user = &mut inner.users[idx];
        user.name = changes.name;
        user.surname = changes.surname;
        user.email = changes.email;
        user.credential = changes.credential;
        user.phone = changes.phone;
        Ok(user.clone())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let idx = inner.position(id).ok_or(AppError::NotFound)?;
        let removed = inner.users.remove(idx);
        inner.by_email.remove(&email_key(&removed.email));
        Ok(())
    }

    async fn count(&self) -> Result<u64, AppError> {
        Ok(self.inner.read().await.users.len() as u64)
    }
}
