//! HTTP client for the generation endpoint, used by UI front-ends.
//!
//! Status codes coming back from the server are mapped onto [`ClientError`]
//! so the caller can tell "ask for a new key" apart from "try again".

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::domain::Flashcard;
use crate::protocol::{ErrorOut, GenerateOut, CREDENTIAL_HEADER, FIELD_COUNT, FIELD_DECK_ID, FIELD_FILE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
  #[error("{message}")]
  InvalidCredential { message: String },

  #[error("{message}")]
  RateLimited { message: String },

  #[error("{message}")]
  BadRequest { message: String },

  #[error("{message}")]
  Server { message: String, details: Option<String> },

  #[error("request failed: {0}")]
  Transport(String),

  #[error("Invalid response format. Please try again.")]
  MalformedResponse,
}

impl ClientError {
  /// True when the user should be sent back to the credential prompt.
  pub fn needs_credential(&self) -> bool {
    matches!(self, ClientError::InvalidCredential { .. })
  }
}

#[derive(Clone)]
pub struct PipelineClient {
  client: reqwest::Client,
  base_url: String,
}

impl PipelineClient {
  pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(120))
      .build()?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
  }

  #[instrument(level = "info", skip(self, bytes, credential), fields(size = bytes.len()))]
  pub async fn generate(
    &self,
    file_name: &str,
    bytes: Vec<u8>,
    count: u32,
    deck_id: &str,
    credential: &str,
  ) -> Result<Vec<Flashcard>, ClientError> {
    let form = Form::new()
      .part(FIELD_FILE, Part::bytes(bytes).file_name(file_name.to_string()))
      .text(FIELD_COUNT, count.to_string())
      .text(FIELD_DECK_ID, deck_id.to_string());

    let res = self.client
      .post(format!("{}/api/chat", self.base_url))
      .header(CREDENTIAL_HEADER, credential)
      .multipart(form)
      .send()
      .await
      .map_err(|e| ClientError::Transport(e.to_string()))?;

    let status = res.status();
    if status.is_success() {
      let body: GenerateOut = res.json().await.map_err(|_| ClientError::MalformedResponse)?;
      return Ok(body.flashcards);
    }

    let body = res.text().await.unwrap_or_default();
    let (message, details) = match serde_json::from_str::<ErrorOut>(&body) {
      Ok(e) => (e.error, e.details),
      Err(_) => ("Something went wrong. Please check your API key and try again.".to_string(), None),
    };
    warn!(target: "client", %status, %message, "Generation request failed");

    Err(match status {
      StatusCode::UNAUTHORIZED => ClientError::InvalidCredential { message },
      StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited { message },
      StatusCode::BAD_REQUEST => ClientError::BadRequest { message },
      _ => ClientError::Server { message, details },
    })
  }
}
