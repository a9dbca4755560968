use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::{Profile, User, UserStatus};

/// Persistence boundary for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Return the user stored for `profile.external_id`, creating it if absent.
    ///
    /// Existing records are returned unmodified. Concurrent first contact from
    /// the same peer yields exactly one row.
    async fn get_or_create_user(&self, profile: &Profile) -> Result<User, StorageError>;

    async fn get_user(&self, external_id: i64) -> Result<Option<User>, StorageError>;

    /// Returns whether a row was updated
    async fn set_status(&self, external_id: i64, status: UserStatus) -> Result<bool, StorageError>;

    /// All users ordered by internal id
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;
}
