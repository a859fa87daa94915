//! Error types.

use thiserror::Error;

/// Errors that end a single lookup. None of them are retried.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The request never produced a response (DNS, TLS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// The payload was not the JSON shape the adapter expects.
    #[error("malformed response from {service}: {detail}")]
    Decode { service: &'static str, detail: String },

    /// Neither A nor AAAA resolution produced an address.
    #[error("no resolution records for {domain}")]
    NoResolutionRecords { domain: String },

    /// The geocoder returned an empty candidate list.
    #[error("no geocoding candidates for {query}")]
    NoGeocodeCandidates { query: String },

    /// The provider answered but flagged the query as failed.
    #[error("{provider} rejected the query: {reason}")]
    Provider { provider: &'static str, reason: String },

    /// The configured geocoder cannot be used (e.g. missing API key).
    #[error("geocoder unavailable: {0}")]
    GeocoderUnavailable(String),
}

impl LookupError {
    /// Short text for the result panel.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) | Self::Status { .. } | Self::Decode { .. } => {
                "Lookup failed, check the address and your connection.".to_string()
            }
            Self::NoResolutionRecords { domain } => format!("No DNS records found for {domain}."),
            Self::NoGeocodeCandidates { query } => format!("No place found for \"{query}\"."),
            Self::Provider { reason, .. } => format!("Lookup rejected: {reason}"),
            Self::GeocoderUnavailable(why) => format!("Place search unavailable: {why}"),
        }
    }

    /// `true` for failures where the network itself was the problem.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

/// Errors from the persisted history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("history payload is not a JSON string list: {0}")]
    Encoding(#[from] serde_json::Error),
}
