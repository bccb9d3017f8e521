///! Push notification module
///!
///! Builds one message per subscribed device, splits them into
///! provider-sized chunks and sends every chunk independently.

pub mod dispatcher;
pub mod expo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

pub use dispatcher::{ChunkOutcome, DispatchReport, NotificationDispatcher};
pub use expo::ExpoClient;

/// One notification addressed to a single device, in the provider's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Per-message receipt returned for an accepted chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PushTicket {
    Ok {
        id: String,
    },
    Error {
        message: String,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
}

impl PushTicket {
    pub fn is_ok(&self) -> bool {
        matches!(self, PushTicket::Ok { .. })
    }
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Format check only; says nothing about whether the device still exists.
    fn is_valid_token(&self, token: &str) -> bool;

    /// Split `messages` into batches the provider accepts in one request.
    fn chunk(&self, messages: Vec<NotificationMessage>) -> Vec<Vec<NotificationMessage>>;

    /// Send one batch. Tickets come back in message order.
    async fn send_chunk(&self, chunk: &[NotificationMessage]) -> Result<Vec<PushTicket>, DispatchError>;
}
