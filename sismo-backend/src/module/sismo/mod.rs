///! Seismic event listing module
///!
///! Fetches the public event table, parses it into records,
///! picks the newest one and remembers which event was last notified.

pub mod fetcher;
pub mod gate;
pub mod parser;
pub mod selector;

pub use fetcher::{EventSource, HttpEventSource};
pub use gate::NotificationGate;
pub use parser::parse_events_html;
pub use selector::select_latest;
pub use sismo_common::EventRecord;
