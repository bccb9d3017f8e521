///! JSON-file backed store
///!
///! Keeps tokens and feedback in memory and rewrites the matching file after
///! every mutation. Writers hold the write lock across the file write, so
///! concurrent registrations of the same token are serialized.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{DeleteOutcome, FeedbackRecord, FeedbackStore, SubscriberToken, TokenStore, UpsertOutcome};
use crate::error::StoreError;

const TOKENS_FILE: &str = "tokens.json";
const FEEDBACK_FILE: &str = "feedback.json";

pub struct JsonStore {
    data_dir: PathBuf,
    tokens: RwLock<Vec<SubscriberToken>>,
    feedback: RwLock<Vec<FeedbackRecord>>,
}

impl JsonStore {
    /// Open (creating if needed) the store under `data_dir`.
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).await?;

        let tokens: Vec<SubscriberToken> = load_or_default(&data_dir.join(TOKENS_FILE)).await?;
        let feedback: Vec<FeedbackRecord> = load_or_default(&data_dir.join(FEEDBACK_FILE)).await?;

        info!(
            "Opened store at {:?}: {} tokens, {} feedback records",
            data_dir,
            tokens.len(),
            feedback.len()
        );

        Ok(Self {
            data_dir,
            tokens: RwLock::new(tokens),
            feedback: RwLock::new(feedback),
        })
    }

    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn feedback_count(&self) -> usize {
        self.feedback.read().await.len()
    }
}

async fn load_or_default<T>(path: &Path) -> Result<Vec<T>, StoreError>
where
    T: serde::de::DeserializeOwned,
{
    if !fs::try_exists(path).await? {
        debug!("Store file does not exist yet: {:?}", path);
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).await?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

/// Write through a temporary file so a crash never leaves a truncated file.
async fn persist<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl TokenStore for JsonStore {
    async fn find_by_region(&self, region: &str) -> Result<Vec<String>, StoreError> {
        let region = region.to_lowercase();
        let tokens = self.tokens.read().await;
        Ok(tokens
            .iter()
            .filter(|t| t.province.to_lowercase() == region)
            .map(|t| t.token.clone())
            .collect())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<SubscriberToken>, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn upsert(&self, token: &str, province: &str) -> Result<UpsertOutcome, StoreError> {
        let mut tokens = self.tokens.write().await;
        if tokens.iter().any(|t| t.token == token) {
            return Ok(UpsertOutcome::AlreadyExists);
        }

        tokens.push(SubscriberToken {
            token: token.to_string(),
            province: province.to_string(),
            created_at: Utc::now(),
        });

        if let Err(e) = persist(&self.data_dir.join(TOKENS_FILE), tokens.as_slice()).await {
            tokens.pop();
            return Err(e);
        }
        Ok(UpsertOutcome::Inserted)
    }

    async fn delete_by_token(&self, token: &str) -> Result<DeleteOutcome, StoreError> {
        let mut tokens = self.tokens.write().await;
        let Some(pos) = tokens.iter().position(|t| t.token == token) else {
            return Ok(DeleteOutcome::NotFound);
        };

        let removed = tokens.remove(pos);
        if let Err(e) = persist(&self.data_dir.join(TOKENS_FILE), tokens.as_slice()).await {
            tokens.insert(pos, removed);
            return Err(e);
        }
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait]
impl FeedbackStore for JsonStore {
    async fn insert(
        &self,
        token: &str,
        felt: bool,
        event_context: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut feedback = self.feedback.write().await;
        feedback.push(FeedbackRecord {
            token: token.to_string(),
            felt,
            event_context,
            created_at: Utc::now(),
        });

        if let Err(e) = persist(&self.data_dir.join(FEEDBACK_FILE), feedback.as_slice()).await {
            feedback.pop();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();

        assert_eq!(store.upsert("ExpoPushToken[a]", "San Juan").await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert("ExpoPushToken[a]", "Mendoza").await.unwrap(), UpsertOutcome::AlreadyExists);

        let record = store.find_by_token("ExpoPushToken[a]").await.unwrap().unwrap();
        assert_eq!(record.province, "San Juan");
        assert_eq!(store.token_count().await, 1);
    }

    #[tokio::test]
    async fn test_find_by_region_ignores_case_but_not_substrings() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        store.upsert("t1", "San Juan").await.unwrap();
        store.upsert("t2", "Mendoza").await.unwrap();
        store.upsert("t3", "SAN JUAN").await.unwrap();
        store.upsert("t4", "San Juan Norte").await.unwrap();

        let tokens = store.find_by_region("san juan").await.unwrap();
        assert_eq!(tokens, vec!["t1".to_string(), "t3".to_string()]);
        assert!(store.find_by_region("Salta").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        store.upsert("t1", "Salta").await.unwrap();

        assert_eq!(store.delete_by_token("missing").await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(store.delete_by_token("t1").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(store.delete_by_token("t1").await.unwrap(), DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = JsonStore::open(dir.path()).await.unwrap();
            store.upsert("t1", "Jujuy").await.unwrap();
            store.upsert("t2", "Jujuy").await.unwrap();
            store.delete_by_token("t1").await.unwrap();
            store
                .insert("t2", true, serde_json::json!({"numero": "55"}))
                .await
                .unwrap();
        }

        let store = JsonStore::open(dir.path()).await.unwrap();
        assert_eq!(store.find_by_region("jujuy").await.unwrap(), vec!["t2".to_string()]);
        assert_eq!(store.feedback_count().await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_open() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TOKENS_FILE), "{not json").unwrap();
        let err = JsonStore::open(dir.path()).await.err().unwrap();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_memory() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        store.upsert("t1", "La Rioja").await.unwrap();

        std::fs::remove_dir_all(dir.path()).unwrap();

        let err = store.upsert("t2", "La Rioja").await.err().unwrap();
        assert!(matches!(err, StoreError::Io(_)));
        let err = store.delete_by_token("t1").await.err().unwrap();
        assert!(matches!(err, StoreError::Io(_)));
        let err = store
            .insert("t1", false, serde_json::json!({"numero": "9"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Io(_)));

        assert_eq!(store.token_count().await, 1);
        assert!(store.find_by_token("t1").await.unwrap().is_some());
        assert!(store.find_by_token("t2").await.unwrap().is_none());
        assert_eq!(store.feedback_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registrations() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonStore::open(dir.path()).await.unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.upsert("same", "Catamarca").await.unwrap() })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() == UpsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.token_count().await, 1);
    }
}
