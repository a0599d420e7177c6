//! Minimal OpenAI client for flashcard generation.
//!
//! One call only: chat.completions with a single forced `create_flashcards`
//! tool. The credential comes with every call and is never stored or logged.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).

use std::collections::HashSet;
use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::domain::{new_id, Flashcard};
use crate::prompt::{FlashcardRequest, TOOL_DESCRIPTION, TOOL_NAME};
use crate::util::trunc_for_log;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
  #[error("Invalid OpenAI API key")]
  InvalidCredential,

  #[error("OpenAI API rate limit exceeded")]
  RateLimited,

  #[error("Error communicating with OpenAI API: {message}")]
  UpstreamError { message: String },

  #[error("Expected exactly {expected} flashcards, but got {actual}")]
  CountMismatch { expected: u32, actual: usize },
}

impl GatewayError {
  fn upstream(message: impl Into<String>) -> Self {
    GatewayError::UpstreamError { message: message.into() }
  }
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
}

/// Tool arguments as the model returns them, before validation.
#[derive(Debug, Deserialize)]
pub struct RawFlashcards {
  pub flashcards: Vec<RawFlashcard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFlashcard {
  #[serde(default)] pub id: String,
  #[serde(default)] pub question: String,
  #[serde(default)] pub answer: String,
}

impl OpenAI {
  pub fn from_config(cfg: &ServerConfig) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      model: cfg.model.clone(),
      temperature: cfg.temperature,
    })
  }

  /// Ask the model for exactly `request.count` flashcards and validate the answer.
  #[instrument(
    level = "info",
    skip(self, request, credential),
    fields(model = %self.model, count = request.count, deck_id = %request.deck_id, text_len = request.source_text.len())
  )]
  pub async fn generate(&self, request: &FlashcardRequest, credential: &str) -> Result<Vec<Flashcard>, GatewayError> {
    let start = Instant::now();
    let raw = self.call_tool(request, credential).await;
    let elapsed = start.elapsed();

    let raw = match raw {
      Ok(r) => {
        info!(?elapsed, returned = r.flashcards.len(), "Model response received");
        r
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during flashcard generation");
        return Err(e);
      }
    };

    let cards = validate_flashcards(raw.flashcards, request.count, &request.deck_id);
    if let Err(e) = &cards {
      warn!(error = %e, "Model output rejected");
    }
    cards
  }

  async fn call_tool(&self, request: &FlashcardRequest, credential: &str) -> Result<RawFlashcards, GatewayError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: request.system.clone() },
        ChatMessageReq { role: "user".into(), content: request.user.clone() },
      ],
      temperature: self.temperature,
      tools: vec![ToolDef {
        r#type: "function".into(),
        function: FunctionDef {
          name: TOOL_NAME.into(),
          description: TOOL_DESCRIPTION.into(),
          parameters: request.parameters.clone(),
        },
      }],
      tool_choice: ToolChoice {
        r#type: "function".into(),
        function: ToolChoiceFunction { name: TOOL_NAME.into() },
      },
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "flashdeck-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", credential))
      .json(&req).send().await
      .map_err(|e| GatewayError::upstream(e.to_string()))?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      return Err(classify_failure(status, &body));
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| GatewayError::upstream(format!("Malformed completion response: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }

    let call = body.choices.into_iter().next()
      .and_then(|c| c.message.tool_calls)
      .and_then(|calls| calls.into_iter().find(|c| c.function.name == TOOL_NAME))
      .ok_or_else(|| GatewayError::upstream("Model did not call the create_flashcards tool"))?;

    serde_json::from_str::<RawFlashcards>(&call.function.arguments).map_err(|e| {
      GatewayError::upstream(format!(
        "Invalid tool arguments ({e}): {}",
        trunc_for_log(&call.function.arguments, 200)
      ))
    })
  }
}

/// Map a non-success upstream response onto the public error classes.
fn classify_failure(status: StatusCode, body: &str) -> GatewayError {
  let msg = extract_openai_error(body).unwrap_or_else(|| trunc_for_log(body, 300));
  if status == StatusCode::UNAUTHORIZED || msg.contains("API key") {
    GatewayError::InvalidCredential
  } else if status == StatusCode::TOO_MANY_REQUESTS {
    GatewayError::RateLimited
  } else {
    GatewayError::upstream(format!("OpenAI HTTP {}: {}", status, msg))
  }
}

/// Post-receipt check of the tool output.
///
/// The length must equal `count` exactly (never padded or truncated) and every
/// card needs a question and an answer. Blank or repeated ids get fresh ones;
/// every card is stamped with `deck_id`.
pub fn validate_flashcards(raw: Vec<RawFlashcard>, count: u32, deck_id: &str) -> Result<Vec<Flashcard>, GatewayError> {
  if raw.len() != count as usize {
    return Err(GatewayError::CountMismatch { expected: count, actual: raw.len() });
  }

  let mut seen = HashSet::new();
  let mut out = Vec::with_capacity(raw.len());
  for (i, card) in raw.into_iter().enumerate() {
    let question = card.question.trim();
    let answer = card.answer.trim();
    if question.is_empty() || answer.is_empty() {
      return Err(GatewayError::upstream(format!("Flashcard {} has an empty question or answer", i + 1)));
    }
    let id = card.id.trim();
    let id = if id.is_empty() || !seen.insert(id.to_string()) {
      new_id()
    } else {
      id.to_string()
    };
    out.push(Flashcard {
      id,
      question: question.to_string(),
      answer: answer.to_string(),
      deck_id: deck_id.to_string(),
    });
  }
  Ok(out)
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  tools: Vec<ToolDef>,
  tool_choice: ToolChoice,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ToolDef { #[serde(rename = "type")] r#type: String, function: FunctionDef }
#[derive(Serialize)]
struct FunctionDef { name: String, description: String, parameters: Value }
#[derive(Serialize)]
struct ToolChoice { #[serde(rename = "type")] r#type: String, function: ToolChoiceFunction }
#[derive(Serialize)]
struct ToolChoiceFunction { name: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { #[serde(default)] tool_calls: Option<Vec<ToolCall>> }
#[derive(Deserialize)]
struct ToolCall { function: ToolCallFunction }
#[derive(Deserialize)]
struct ToolCallFunction { name: String, arguments: String }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
