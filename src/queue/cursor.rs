//! Opaque keyset cursor for list pagination.
//!
//! Encoded as URL-safe base64 over the UTF-8 JSON `{"sortAt": <int>,
//! "id": <string>}`. The encoding is stable across requests and servers but
//! unauthenticated: a forged cursor only shifts the caller's own window.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Keyset position after the last item of a page, under
/// (`sort_at` DESC, `id` DESC) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub sort_at: i64,
    pub id: String,
}

impl Cursor {
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    /// Decode a client-supplied cursor. Anything malformed is treated as
    /// absent rather than an error.
    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
