//! The document-to-flashcards pipeline: extract → build request → call model.
//!
//! Steps run strictly in sequence. The first failure aborts the run and
//! nothing produced so far is returned.

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::domain::Flashcard;
use crate::extract::ExtractionError;
use crate::openai::GatewayError;
use crate::prompt::FlashcardRequest;
use crate::state::AppState;

/// One validated upload, ready to run.
#[derive(Debug, Clone)]
pub struct Upload {
  pub file_name: String,
  pub bytes: Vec<u8>,
  pub count: u32,
  pub deck_id: String,
  pub credential: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Extraction(#[from] ExtractionError),
  #[error(transparent)]
  Gateway(#[from] GatewayError),
}

#[instrument(
  level = "info",
  skip(state, upload),
  fields(file_name = %upload.file_name, size = upload.bytes.len(), count = upload.count, deck_id = %upload.deck_id)
)]
pub async fn run(state: &AppState, upload: Upload) -> Result<Vec<Flashcard>, PipelineError> {
  let Upload { file_name, bytes, count, deck_id, credential } = upload;

  // PDF parsing is CPU-bound; keep it off the async workers.
  let extractor = state.extractor.clone();
  let name = file_name.clone();
  let text = tokio::task::spawn_blocking(move || extractor.extract(&name, &bytes))
    .await
    .map_err(|e| {
      error!(target: "pipeline", error = %e, "Extraction task aborted");
      ExtractionError::ExtractionFailed { reason: e.to_string() }
    })??;
  info!(target: "pipeline", %file_name, text_len = text.len(), "Text extracted");

  let request = FlashcardRequest::build(&state.config.prompts, &text, count, &deck_id);
  let cards = state.openai.generate(&request, &credential).await?;
  info!(target: "pipeline", %deck_id, generated = cards.len(), "Flashcards generated");
  Ok(cards)
}
