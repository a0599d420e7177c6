//! HTTP endpoint handlers. These are thin wrappers that forward to the pipeline.
//! Each handler is instrumented; bodies and credentials are never logged.

use std::sync::Arc;

use axum::{
  extract::{multipart::{MultipartError, MultipartRejection}, Multipart, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};

use crate::openai::GatewayError;
use crate::pipeline::{self, PipelineError, Upload};
use crate::protocol::*;
use crate::state::AppState;

/// Everything the generation endpoint can answer besides 200.
#[derive(Debug)]
pub enum ApiError {
  MissingFields,
  CountOutOfRange { max: u32 },
  MissingCredential,
  BodyTooLarge,
  Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
  fn from(e: PipelineError) -> Self { ApiError::Pipeline(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error, details) = match self {
      ApiError::MissingFields => (StatusCode::BAD_REQUEST, "Missing required fields".to_string(), None),
      ApiError::CountOutOfRange { max } => (
        StatusCode::BAD_REQUEST,
        format!("count must be between 1 and {max}"),
        None,
      ),
      ApiError::MissingCredential => (StatusCode::UNAUTHORIZED, "OpenAI API key is required".to_string(), None),
      ApiError::BodyTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Uploaded file is too large".to_string(), None),
      ApiError::Pipeline(PipelineError::Gateway(g)) => {
        let status = match &g {
          GatewayError::InvalidCredential => StatusCode::UNAUTHORIZED,
          GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
          _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match g {
          GatewayError::UpstreamError { message } => {
            (status, "Error communicating with OpenAI API".to_string(), Some(message))
          }
          other => (status, other.to_string(), None),
        }
      }
      ApiError::Pipeline(PipelineError::Extraction(e)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None),
    };
    (status, Json(ErrorOut { error, details })).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// `POST /api/chat`: multipart upload in, exactly `count` flashcards out.
#[instrument(level = "info", skip_all)]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateOut>, ApiError> {
  let multipart = multipart.map_err(|e| {
    warn!(target: "flashdeck", error = %e, "Request is not a multipart form");
    ApiError::MissingFields
  })?;
  let form = read_form(multipart).await?;

  let (file_name, bytes) = form.file.ok_or(ApiError::MissingFields)?;
  let count = form.count
    .and_then(|c| c.trim().parse::<u32>().ok())
    .filter(|c| *c >= 1)
    .ok_or(ApiError::MissingFields)?;
  let deck_id = form.deck_id
    .map(|d| d.trim().to_string())
    .filter(|d| !d.is_empty())
    .ok_or(ApiError::MissingFields)?;
  if count > state.config.max_flashcards {
    return Err(ApiError::CountOutOfRange { max: state.config.max_flashcards });
  }

  let credential = headers
    .get(CREDENTIAL_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|k| !k.is_empty())
    .ok_or(ApiError::MissingCredential)?
    .to_string();

  info!(target: "flashdeck", %file_name, size = bytes.len(), count, %deck_id, "Generation requested");
  let upload = Upload { file_name, bytes, count, deck_id, credential };
  match pipeline::run(&state, upload).await {
    Ok(flashcards) => Ok(Json(GenerateOut { flashcards })),
    Err(e) => {
      error!(target: "flashdeck", error = %e, "Generation failed");
      Err(e.into())
    }
  }
}

#[derive(Default)]
struct GenerateForm {
  file: Option<(String, Vec<u8>)>,
  count: Option<String>,
  deck_id: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<GenerateForm, ApiError> {
  let mut form = GenerateForm::default();
  loop {
    let field = match multipart.next_field().await {
      Ok(Some(f)) => f,
      Ok(None) => break,
      Err(e) => return Err(multipart_failure(e)),
    };
    let name = field.name().unwrap_or_default().to_string();
    match name.as_str() {
      FIELD_FILE => {
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_failure)?;
        form.file = Some((file_name, data.to_vec()));
      }
      FIELD_COUNT => form.count = Some(field.text().await.map_err(multipart_failure)?),
      FIELD_DECK_ID => form.deck_id = Some(field.text().await.map_err(multipart_failure)?),
      _ => {}
    }
  }
  Ok(form)
}

fn multipart_failure(e: MultipartError) -> ApiError {
  warn!(target: "flashdeck", error = %e, "Malformed multipart body");
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    ApiError::BodyTooLarge
  } else {
    ApiError::MissingFields
  }
}
