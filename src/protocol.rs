//! Public wire structs for the HTTP endpoints (serde ready).
//! Shared by the server handlers and [`crate::client`].

use serde::{Deserialize, Serialize};

use crate::domain::Flashcard;

/// Multipart field names of the generation endpoint.
pub const FIELD_FILE: &str = "file";
pub const FIELD_COUNT: &str = "count";
pub const FIELD_DECK_ID: &str = "deckId";

/// Header carrying the caller's OpenAI credential.
pub const CREDENTIAL_HEADER: &str = "x-openai-key";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Successful generation.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateOut {
    pub flashcards: Vec<Flashcard>,
}

/// Error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
