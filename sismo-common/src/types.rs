use serde::{Deserialize, Serialize};

/// One row of the seismic-activity table.
///
/// Field names on the wire are the ones mobile clients already consume
/// (`numero`, `fecha`, ...), so they are renamed explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Sequence number assigned by the source. Opaque: not sortable.
    #[serde(rename = "numero")]
    pub id: String,
    /// Date as published, e.g. "19/10/2026"
    #[serde(rename = "fecha")]
    pub date: String,
    /// Time as published, e.g. "14:35:12"
    #[serde(rename = "hora")]
    pub time: String,
    #[serde(rename = "profundidad")]
    pub depth: String,
    #[serde(rename = "magnitud")]
    pub magnitude: String,
    #[serde(rename = "latitud")]
    pub latitude: String,
    #[serde(rename = "longitud")]
    pub longitude: String,
    /// Free-text location label, e.g. "34 km al NO de Calingasta, San Juan"
    #[serde(rename = "ubicacion")]
    pub location: String,
}

/// Body of `POST /api/tokens`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTokenRequest {
    pub token: String,
    pub province: String,
}

/// Body of `DELETE /api/tokens/delete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTokenRequest {
    pub token: String,
}

/// Body of `POST /api/feedback`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub token: String,
    /// Whether the user felt the event
    #[serde(rename = "sentiste")]
    pub felt: bool,
    /// Event context echoed back by the client (usually the notified record)
    #[serde(rename = "sismoInfo")]
    pub event_context: serde_json::Value,
}
