///! Expo push service client

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, header};
use serde::Deserialize;

use super::{NotificationMessage, PushProvider, PushTicket};
use crate::config::PushConfig;
use crate::error::DispatchError;

const TOKEN_PREFIXES: &[&str] = &["ExponentPushToken[", "ExpoPushToken["];

/// Bare device UUID, accepted alongside the bracketed forms
const DEVICE_ID_PATTERN: &str = r"^(?i:[a-z\d]{8}-[a-z\d]{4}-[a-z\d]{4}-[a-z\d]{4}-[a-z\d]{12})$";

#[derive(Debug, Deserialize)]
struct ExpoError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<PushTicket>,
    #[serde(default)]
    errors: Vec<ExpoError>,
}

pub struct ExpoClient {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    chunk_size: usize,
    device_id_pattern: Regex,
}

impl ExpoClient {
    pub fn new(config: &PushConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build push HTTP client")?;
        let device_id_pattern =
            Regex::new(DEVICE_ID_PATTERN).context("Failed to compile device id regex")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone(),
            chunk_size: config.chunk_size.max(1),
            device_id_pattern,
        })
    }
}

#[async_trait]
impl PushProvider for ExpoClient {
    /// Same rule as the Expo SDK: anything between the brackets is accepted,
    /// including nothing at all.
    fn is_valid_token(&self, token: &str) -> bool {
        let bracketed = TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) && token.ends_with(']');
        bracketed || self.device_id_pattern.is_match(token)
    }

    fn chunk(&self, messages: Vec<NotificationMessage>) -> Vec<Vec<NotificationMessage>> {
        let mut chunks = Vec::with_capacity(messages.len().div_ceil(self.chunk_size));
        let mut iter = messages.into_iter().peekable();
        while iter.peek().is_some() {
            chunks.push(iter.by_ref().take(self.chunk_size).collect());
        }
        chunks
    }

    async fn send_chunk(&self, chunk: &[NotificationMessage]) -> Result<Vec<PushTicket>, DispatchError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, "application/json")
            .json(chunk);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DispatchError::Status { status, body });
        }

        let parsed: ExpoResponse = serde_json::from_str(&body)
            .map_err(|e| DispatchError::Provider(format!("unreadable response: {}", e)))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed
                .errors
                .iter()
                .map(|e| match &e.code {
                    Some(code) => format!("{}: {}", code, e.message),
                    None => e.message.clone(),
                })
                .collect();
            return Err(DispatchError::Provider(messages.join("; ")));
        }

        if parsed.data.len() != chunk.len() {
            return Err(DispatchError::TicketCountMismatch {
                expected: chunk.len(),
                got: parsed.data.len(),
            });
        }

        Ok(parsed.data)
    }
}
