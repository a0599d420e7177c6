//! Client-side preferences: theme, remembered flashcard count, and the
//! OpenAI credential. Stored under the same keys the browser client uses.

use serde::{Deserialize, Serialize};

use crate::config::{clamp_flashcard_count, DEFAULT_MAX_FLASHCARDS};
use crate::kv::{KeyValueStore, KvError};

pub const THEME_KEY: &str = "theme";
pub const LAST_COUNT_KEY: &str = "lastFlashcardCount";
pub const CREDENTIAL_KEY: &str = "openai_api_key";

pub const DEFAULT_FLASHCARD_COUNT: u32 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

impl Theme {
  pub fn as_str(self) -> &'static str {
    match self {
      Theme::Light => "light",
      Theme::Dark => "dark",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s.trim() {
      "light" => Some(Theme::Light),
      "dark" => Some(Theme::Dark),
      _ => None,
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      Theme::Light => Theme::Dark,
      Theme::Dark => Theme::Light,
    }
  }
}

pub struct Settings<S> {
  kv: S,
}

impl<S: KeyValueStore> Settings<S> {
  pub fn new(kv: S) -> Self {
    Self { kv }
  }

  /// Unknown or missing values fall back to light.
  pub fn theme(&self) -> Result<Theme, KvError> {
    Ok(self.kv.get(THEME_KEY)?.and_then(|t| Theme::parse(&t)).unwrap_or_default())
  }

  pub fn set_theme(&self, theme: Theme) -> Result<(), KvError> {
    self.kv.set(THEME_KEY, theme.as_str())
  }

  pub fn toggle_theme(&self) -> Result<Theme, KvError> {
    let next = self.theme()?.toggled();
    self.set_theme(next)?;
    Ok(next)
  }

  /// Last count picked in the wizard, clamped to the slider range.
  pub fn last_flashcard_count(&self) -> Result<u32, KvError> {
    let count = self.kv
      .get(LAST_COUNT_KEY)?
      .and_then(|c| c.trim().parse::<u32>().ok())
      .map(|n| clamp_flashcard_count(n, DEFAULT_MAX_FLASHCARDS))
      .unwrap_or(DEFAULT_FLASHCARD_COUNT);
    Ok(count)
  }

  pub fn remember_flashcard_count(&self, count: u32) -> Result<(), KvError> {
    self.kv.set(LAST_COUNT_KEY, &clamp_flashcard_count(count, DEFAULT_MAX_FLASHCARDS).to_string())
  }

  pub fn credential(&self) -> Result<Option<String>, KvError> {
    Ok(self.kv.get(CREDENTIAL_KEY)?.filter(|k| !k.trim().is_empty()))
  }

  /// A blank credential clears the stored one.
  pub fn set_credential(&self, credential: &str) -> Result<(), KvError> {
    let credential = credential.trim();
    if credential.is_empty() {
      self.kv.remove(CREDENTIAL_KEY)
    } else {
      self.kv.set(CREDENTIAL_KEY, credential)
    }
  }
}
