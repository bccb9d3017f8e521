///! Subscriber token and feedback persistence

pub mod json_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use json_store::JsonStore;

/// A device subscribed to notifications for one province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberToken {
    pub token: String,
    pub province: String,
    pub created_at: DateTime<Utc>,
}

/// "Did you feel it?" answer sent back by a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub token: String,
    pub felt: bool,
    pub event_context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Tokens whose province equals `region`, ignoring case, in insertion order.
    async fn find_by_region(&self, region: &str) -> Result<Vec<String>, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<SubscriberToken>, StoreError>;

    /// Register `token`; an existing registration is left untouched.
    async fn upsert(&self, token: &str, province: &str) -> Result<UpsertOutcome, StoreError>;

    async fn delete_by_token(&self, token: &str) -> Result<DeleteOutcome, StoreError>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert(
        &self,
        token: &str,
        felt: bool,
        event_context: serde_json::Value,
    ) -> Result<(), StoreError>;
}
