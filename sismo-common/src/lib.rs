//! Types shared between the sismo backend and its API clients.

pub mod types;

pub use types::{DeleteTokenRequest, EventRecord, FeedbackRequest, RegisterTokenRequest};
