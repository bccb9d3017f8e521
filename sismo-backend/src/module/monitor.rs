///! One monitoring cycle: fetch → parse → select → gate → match → dispatch.

use std::sync::Arc;
use tracing::{info, warn};

use super::push::{DispatchReport, NotificationDispatcher};
use super::region::RegionMatcher;
use super::sismo::{parse_events_html, select_latest, EventRecord, EventSource, NotificationGate};
use crate::error::FetchError;

#[derive(Debug)]
pub enum CycleReport {
    /// Nothing to look at: fetch failed or the table was empty
    NoEvents,
    AlreadyNotified { id: String },
    Dispatched { id: String, report: DispatchReport },
}

pub struct Monitor {
    source: Arc<dyn EventSource>,
    gate: NotificationGate,
    matcher: RegionMatcher,
    dispatcher: NotificationDispatcher,
}

impl Monitor {
    pub fn new(
        source: Arc<dyn EventSource>,
        matcher: RegionMatcher,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            source,
            gate: NotificationGate::new(),
            matcher,
            dispatcher,
        }
    }

    pub fn gate(&self) -> &NotificationGate {
        &self.gate
    }

    /// Fresh fetch + parse, ignoring the gate.
    pub async fn fetch_events(&self) -> Result<Vec<EventRecord>, FetchError> {
        let html = self.source.fetch().await?;
        Ok(parse_events_html(&html))
    }

    /// Run a full cycle. Must not be called concurrently with itself; the
    /// scheduler guarantees that.
    ///
    /// The marker advances once the dispatch attempt has finished, even when
    /// every chunk failed. Retrying a down provider every tick would turn one
    /// outage into a notification storm once it recovers.
    pub async fn run_cycle(&self) -> CycleReport {
        let events = match self.fetch_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Skipping cycle, event source unavailable: {}", e);
                return CycleReport::NoEvents;
            }
        };

        let Some(latest) = select_latest(&events) else {
            info!("No events in listing");
            return CycleReport::NoEvents;
        };
        info!(
            "Latest event: #{} {} {} M{} at {}",
            latest.id, latest.date, latest.time, latest.magnitude, latest.location
        );

        let observed = self.gate.current().await;
        if observed.as_deref() == Some(latest.id.as_str()) {
            info!("Event {} was already notified", latest.id);
            return CycleReport::AlreadyNotified { id: latest.id.clone() };
        }

        let tokens = match self.matcher.match_tokens(latest).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Token lookup failed for event {}: {}", latest.id, e);
                Vec::new()
            }
        };

        info!("Dispatching notifications for event {}", latest.id);
        let report = self.dispatcher.dispatch(latest, &tokens).await;

        if !self.gate.compare_and_set(observed.as_deref(), &latest.id).await {
            warn!("Notification marker changed during cycle; leaving it as is");
        }

        CycleReport::Dispatched { id: latest.id.clone(), report }
    }
}
