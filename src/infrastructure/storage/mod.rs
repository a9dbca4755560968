//! In-memory user store

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{Profile, User, UserStatus};
use crate::domain::traits::UserStore;

#[derive(Default)]
struct Users {
    next_id: i64,
    by_external_id: HashMap<i64, User>,
}

/// Process-local store, used by the console mode and in tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<Users>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_or_create_user(&self, profile: &Profile) -> Result<User, StorageError> {
        if let Some(user) = self.users.read().await.by_external_id.get(&profile.external_id) {
            return Ok(user.clone());
        }

        // The write lock covers check and insert
        let mut users = self.users.write().await;
        if let Some(user) = users.by_external_id.get(&profile.external_id) {
            return Ok(user.clone());
        }

        users.next_id += 1;
        let user = User::from_profile(users.next_id, profile, Utc::now());
        users.by_external_id.insert(profile.external_id, user.clone());
        tracing::info!("Created {}", user);
        Ok(user)
    }

    async fn get_user(&self, external_id: i64) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().await.by_external_id.get(&external_id).cloned())
    }

    async fn set_status(&self, external_id: i64, status: UserStatus) -> Result<bool, StorageError> {
        let mut users = self.users.write().await;
        match users.by_external_id.get_mut(&external_id) {
            Some(user) => {
                user.status = status;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let mut users: Vec<User> = self.users.read().await.by_external_id.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = MemoryStore::new();
        let profile = Profile::new(10).with_name("Ann", None::<String>);

        let a = store.get_or_create_user(&profile).await.unwrap();
        let b = store.get_or_create_user(&profile).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id, 1);
    }

    #[tokio::test]
    async fn concurrent_first_contact_creates_one_user() {
        let store = MemoryStore::new();
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                // Two distinct peers racing, sixteen calls each
                let external_id = 100 + (i % 2);
                tokio::spawn(async move { store.get_or_create_user(&Profile::new(external_id)).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn set_status_only_touches_known_users() {
        let store = MemoryStore::new();
        store.get_or_create_user(&Profile::new(3)).await.unwrap();

        assert!(store.set_status(3, UserStatus::Suspended).await.unwrap());
        assert!(!store.set_status(4, UserStatus::Suspended).await.unwrap());
        assert_eq!(store.get_user(3).await.unwrap().unwrap().status, UserStatus::Suspended);
    }
}
