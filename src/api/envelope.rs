use serde::Deserialize;
use serde::de::DeserializeOwned;

/// List endpoints answer either a paginated envelope or a bare array,
/// depending on whether the caller asked for a page. Decoded exactly once
/// here; call sites never unwrap response shapes defensively.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Paginated {
        count: u64,
        next: Option<String>,
        previous: Option<String>,
        results: Vec<T>,
    },
    Plain(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn count(&self) -> u64 {
        match self {
            ListResponse::Paginated { count, .. } => *count,
            ListResponse::Plain(items) => items.len() as u64,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Paginated { results, .. } => results,
            ListResponse::Plain(items) => items,
        }
    }
}

pub fn decode_list<T: DeserializeOwned>(body: &[u8]) -> anyhow::Result<ListResponse<T>> {
    serde_json::from_slice(body).map_err(|e| anyhow::anyhow!("malformed list response: {}", e))
}

/// Best-effort extraction of the server's error message from a failure
/// payload. The backend uses `{"error": ...}`; DRF-style views answer
/// `{"detail": ...}`. Anything else falls back to a generic string.
pub fn error_message(status: u16, body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: Option<String>,
        detail: Option<String>,
        message: Option<String>,
    }

    if let Ok(payload) = serde_json::from_slice::<ErrorPayload>(body) {
        if let Some(msg) = payload.error.or(payload.detail).or(payload.message) {
            if !msg.is_empty() {
                return msg;
            }
        }
    }

    format!("Request failed with status {}", status)
}
