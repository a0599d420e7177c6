//! Builds the model request for a flashcard set: prompts plus the parameter
//! schema of the `create_flashcards` tool.

use serde_json::{json, Value};

use crate::config::Prompts;
use crate::util::fill_template;

pub const TOOL_NAME: &str = "create_flashcards";
pub const TOOL_DESCRIPTION: &str = "Create flashcards from the provided text";

/// Everything the gateway needs for one generation. Built once, consumed once.
#[derive(Clone, Debug)]
pub struct FlashcardRequest {
  pub source_text: String,
  /// Caller guarantees `count >= 1`; the schema re-states it.
  pub count: u32,
  pub deck_id: String,
  pub system: String,
  pub user: String,
  pub parameters: Value,
}

impl FlashcardRequest {
  pub fn build(prompts: &Prompts, text: &str, count: u32, deck_id: &str) -> Self {
    let count_str = count.to_string();
    let user = fill_template(
      &prompts.flashcard_user_template,
      &[("count", count_str.as_str()), ("text", text)],
    );
    Self {
      source_text: text.to_string(),
      count,
      deck_id: deck_id.to_string(),
      system: prompts.flashcard_system.clone(),
      user,
      parameters: flashcards_schema(count),
    }
  }
}

/// JSON schema for the tool arguments: exactly `count` items with non-empty fields.
pub fn flashcards_schema(count: u32) -> Value {
  let field = json!({ "type": "string", "minLength": 1 });
  json!({
    "type": "object",
    "properties": {
      "flashcards": {
        "type": "array",
        "description": format!("Exactly {count} flashcards"),
        "minItems": count,
        "maxItems": count,
        "items": {
          "type": "object",
          "properties": {
            "id": field,
            "question": field,
            "answer": field,
          },
          "required": ["id", "question", "answer"],
          "additionalProperties": false,
        },
      },
    },
    "required": ["flashcards"],
    "additionalProperties": false,
  })
}
