///! Notification fan-out
///!
///! Invalid tokens are counted and dropped. Each chunk is sent on its own;
///! a failed chunk is logged and left out of the report, it never stops the
///! remaining chunks.

use futures::stream::{self, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{NotificationMessage, PushProvider, PushTicket};
use crate::config::PushConfig;
use crate::module::sismo::EventRecord;

/// Tickets for one accepted chunk.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    /// Position of the chunk in send order
    pub index: usize,
    pub recipients: Vec<String>,
    pub tickets: Vec<PushTicket>,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub tokens_considered: usize,
    pub invalid_tokens: usize,
    pub messages: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    /// Accepted chunks only, in send order
    pub outcomes: Vec<ChunkOutcome>,
}

impl DispatchReport {
    /// Messages the provider acknowledged with an `ok` ticket.
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .flat_map(|o| o.tickets.iter())
            .filter(|t| t.is_ok())
            .count()
    }
}

pub struct NotificationDispatcher {
    provider: Arc<dyn PushProvider>,
    title: String,
    sound: String,
    icon: Option<String>,
    max_concurrent_chunks: usize,
}

impl NotificationDispatcher {
    pub fn new(provider: Arc<dyn PushProvider>, config: &PushConfig) -> Self {
        Self {
            provider,
            title: config.title.clone(),
            sound: config.sound.clone(),
            icon: config.icon.clone(),
            max_concurrent_chunks: config.max_concurrent_chunks.max(1),
        }
    }

    pub fn build_message(&self, event: &EventRecord, token: &str) -> NotificationMessage {
        NotificationMessage {
            to: token.to_string(),
            sound: self.sound.clone(),
            title: self.title.clone(),
            body: format!("Se ha registrado un nuevo sismo en {}.", event.location),
            data: json!({ "ultimoSismo": event }),
            icon: self.icon.clone(),
        }
    }

    /// Send `event` to every valid token. Never fails: provider trouble only
    /// shows up as failed chunks in the report.
    pub async fn dispatch(&self, event: &EventRecord, tokens: &[String]) -> DispatchReport {
        let valid: Vec<&String> = tokens
            .iter()
            .filter(|t| self.provider.is_valid_token(t))
            .collect();
        let invalid_tokens = tokens.len() - valid.len();
        if invalid_tokens > 0 {
            info!("Dropped {} tokens with invalid format", invalid_tokens);
        }

        let messages: Vec<NotificationMessage> = valid
            .into_iter()
            .map(|token| self.build_message(event, token))
            .collect();
        let message_count = messages.len();

        let chunks = self.provider.chunk(messages);
        let chunk_count = chunks.len();

        let provider = &self.provider;
        let results: Vec<_> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, chunk)| async move {
                let result = provider.send_chunk(&chunk).await;
                (index, chunk, result)
            })
            .buffered(self.max_concurrent_chunks)
            .collect()
            .await;

        let mut outcomes = Vec::with_capacity(chunk_count);
        let mut failed_chunks = 0;
        for (index, chunk, result) in results {
            match result {
                Ok(tickets) => {
                    for (msg, ticket) in chunk.iter().zip(&tickets) {
                        if let PushTicket::Error { message, details } = ticket {
                            warn!("Push to {} rejected: {} ({:?})", msg.to, message, details);
                        }
                    }
                    info!("Chunk {}/{} accepted: {} tickets", index + 1, chunk_count, tickets.len());
                    outcomes.push(ChunkOutcome {
                        index,
                        recipients: chunk.into_iter().map(|m| m.to).collect(),
                        tickets,
                    });
                }
                Err(e) => {
                    failed_chunks += 1;
                    error!("Chunk {}/{} ({} messages) failed: {}", index + 1, chunk_count, chunk.len(), e);
                }
            }
        }

        let report = DispatchReport {
            tokens_considered: tokens.len(),
            invalid_tokens,
            messages: message_count,
            chunks: chunk_count,
            failed_chunks,
            outcomes,
        };
        info!(
            "Dispatch for event {}: {} messages in {} chunks, {} delivered, {} chunks failed",
            event.id,
            report.messages,
            report.chunks,
            report.delivered(),
            report.failed_chunks
        );
        report
    }
}
