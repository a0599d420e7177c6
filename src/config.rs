//! Server configuration: environment variables plus optional TOML overrides.
//!
//! Env variables:
//!   PORT                  : u16 (default 3000)
//!   OPENAI_BASE_URL       : default "https://api.openai.com/v1"
//!   OPENAI_MODEL          : default "gpt-4o-mini"
//!   OPENAI_TIMEOUT_SECS   : request timeout for the completion call (default 30)
//!   MAX_UPLOAD_BYTES      : multipart body limit (default 10 MiB)
//!   MAX_FLASHCARDS        : largest accepted `count` (default 20)
//!   STATIC_DIR            : SPA directory served as fallback (default "./static")
//!   FLASHDECK_CONFIG_PATH : TOML file with `[prompts]` and `temperature` overrides
//!
//! The OpenAI credential is never part of the configuration: every request
//! brings its own.

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_MAX_FLASHCARDS: u32 = 20;

/// Clamp a requested card count to `1..=max`.
pub fn clamp_flashcard_count(count: u32, max: u32) -> u32 {
  count.clamp(1, max.max(1))
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
  pub port: u16,
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
  pub timeout_secs: u64,
  pub max_upload_bytes: usize,
  pub max_flashcards: u32,
  pub static_dir: String,
  pub prompts: Prompts,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      port: 3000,
      base_url: "https://api.openai.com/v1".into(),
      model: "gpt-4o-mini".into(),
      temperature: 0.7,
      timeout_secs: 30,
      max_upload_bytes: 10 * 1024 * 1024,
      max_flashcards: DEFAULT_MAX_FLASHCARDS,
      static_dir: "./static".into(),
      prompts: Prompts::default(),
    }
  }
}

/// Overrides accepted in the TOML file.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)] pub prompts: Option<Prompts>,
  #[serde(default)] pub temperature: Option<f32>,
  #[serde(default)] pub model: Option<String>,
}

/// Prompts sent to the completion service. `{count}` and `{text}` are filled
/// into the user template.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub flashcard_system: String,
  pub flashcard_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      flashcard_system: "You turn study material into flashcards.\n\
        Produce EXACTLY the number of flashcards you are asked for: never fewer, never more.\n\
        Every flashcard has a clear question and a short, precise answer taken from the material.\n\
        Keep the wording simple, but cover different topics of the material instead of repeating one idea.\n\
        If the material is thin, still reach the requested number by looking at it from other angles \
        (definitions, causes, consequences, comparisons, examples).\n\
        Always answer by calling the create_flashcards tool.".into(),
      flashcard_user_template: "Create EXACTLY {count} flashcards from this content. \
        No more, no less than {count} flashcards:\n\n{text}".into(),
    }
  }
}

impl ServerConfig {
  /// Defaults, then env variables, then the TOML file (if any).
  pub fn from_env() -> Self {
    let mut cfg = Self::default();
    let env = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());

    if let Some(p) = env("PORT").and_then(|p| p.parse().ok()) { cfg.port = p; }
    if let Some(u) = env("OPENAI_BASE_URL") { cfg.base_url = u.trim_end_matches('/').to_string(); }
    if let Some(m) = env("OPENAI_MODEL") { cfg.model = m; }
    if let Some(t) = env("OPENAI_TIMEOUT_SECS").and_then(|t| t.parse().ok()) { cfg.timeout_secs = t; }
    if let Some(b) = env("MAX_UPLOAD_BYTES").and_then(|b| b.parse().ok()) { cfg.max_upload_bytes = b; }
    if let Some(n) = env("MAX_FLASHCARDS").and_then(|n| n.parse::<u32>().ok()).filter(|n| *n >= 1) {
      cfg.max_flashcards = n;
    }
    if let Some(d) = env("STATIC_DIR") { cfg.static_dir = d; }

    if let Some(file) = load_file_config_from_env() {
      cfg.apply(file);
    }
    cfg
  }

  pub fn apply(&mut self, file: FileConfig) {
    if let Some(p) = file.prompts { self.prompts = p; }
    if let Some(t) = file.temperature { self.temperature = t; }
    if let Some(m) = file.model { self.model = m; }
  }
}

/// Attempt to load `FileConfig` from FLASHDECK_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("FLASHDECK_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<FileConfig>(&s) {
      Ok(cfg) => {
        info!(target: "flashdeck", %path, "Loaded config overrides (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "flashdeck", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "flashdeck", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
