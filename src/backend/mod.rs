//! # Backend Collaborators
//!
//! The analysis pipeline talks to three remote services (identity, object
//! storage, the dish-identification function) and one data store. They are
//! injected as a single [`MealBackend`] so the controller never reaches for a
//! global client and tests can substitute doubles.

pub mod http;

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{DishIdentification, Identity, MealRecord};

/// Request/response contract of the remote services the pipeline consumes.
#[async_trait]
pub trait MealBackend: Send + Sync {
    /// The currently authenticated user, or `None` when signed out.
    async fn current_user(&self) -> Result<Option<Identity>>;

    /// Store `bytes` under `key` in `bucket`.
    async fn upload(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    /// Public URL of an uploaded object.
    async fn public_url(&self, bucket: &str, key: &str) -> Result<String>;

    /// Run dish identification on a base64 data URL.
    async fn identify_dish(&self, image: &str) -> Result<DishIdentification>;

    /// Persist one meal row.
    async fn insert_meal(&self, record: &MealRecord) -> Result<()>;
}

/// Millisecond wall clock used for storage keys.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u128;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

/// `{identity}/{millis}.{extension}`
pub fn storage_key(identity: &Identity, millis: u128, extension: &str) -> String {
    format!("{}/{}.{}", identity.id, millis, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let identity = Identity { id: "u1".to_string() };
        assert_eq!(storage_key(&identity, 1_700_000_000_000, "jpg"), "u1/1700000000000.jpg");
    }

    #[test]
    fn test_system_clock_is_after_2023() {
        assert!(SystemClock.now_millis() > 1_700_000_000_000);
    }
}
