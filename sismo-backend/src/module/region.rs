///! Maps an event's location label to subscribed push tokens.

use std::sync::Arc;

use super::sismo::EventRecord;
use super::store::TokenStore;
use crate::error::StoreError;

/// Region label for a location string.
///
/// "34 km al NO de Calingasta, San Juan" → "San Juan"; a label without a
/// comma is used whole. Blank results yield `None`.
pub fn derive_region(location: &str) -> Option<String> {
    let label = match location.split_once(',') {
        Some((_, rest)) => rest.trim(),
        None => location.trim(),
    };
    (!label.is_empty()).then(|| label.to_string())
}

pub struct RegionMatcher {
    store: Arc<dyn TokenStore>,
}

impl RegionMatcher {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Tokens subscribed to the event's region, in store order.
    pub async fn match_tokens(&self, event: &EventRecord) -> Result<Vec<String>, StoreError> {
        let Some(region) = derive_region(&event.location) else {
            tracing::info!("Event {} has no usable location ({:?})", event.id, event.location);
            return Ok(Vec::new());
        };

        let tokens = self.store.find_by_region(&region).await?;
        tracing::info!("{} tokens subscribed to region '{}'", tokens.len(), region);
        Ok(tokens)
    }
}
