//! Deck store: the persisted collection of decks.
//!
//! The whole collection lives as one JSON array under [`DECKS_KEY`]. Every
//! mutation reads it all, changes it, and writes it all back; the last writer
//! wins.

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::domain::{DeckViolation, FlashcardDeck};
use crate::kv::{KeyValueStore, KvError};

pub const DECKS_KEY: &str = "flashcardDecks";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage error: {0}")]
  Storage(#[from] KvError),

  #[error("stored decks are unreadable: {0}")]
  Corrupt(#[from] serde_json::Error),

  #[error("Deck not found: {0}")]
  DeckNotFound(String),

  #[error("Deck already exists: {0}")]
  DuplicateDeck(String),

  #[error("invalid deck: {0}")]
  InvalidDeck(#[from] DeckViolation),
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub struct DeckStore<S> {
  kv: S,
}

impl<S: KeyValueStore> DeckStore<S> {
  pub fn new(kv: S) -> Self {
    Self { kv }
  }

  /// All decks in creation order.
  pub fn list(&self) -> Result<Vec<FlashcardDeck>> {
    match self.kv.get(DECKS_KEY)? {
      Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
      _ => Ok(Vec::new()),
    }
  }

  pub fn get(&self, id: &str) -> Result<FlashcardDeck> {
    self.list()?
      .into_iter()
      .find(|d| d.id == id)
      .ok_or_else(|| StoreError::DeckNotFound(id.to_string()))
  }

  /// Append a validated deck.
  #[instrument(level = "debug", skip(self, deck), fields(id = %deck.id, cards = deck.flashcards.len()))]
  pub fn create(&self, deck: FlashcardDeck) -> Result<()> {
    deck.validate()?;
    let mut decks = self.list()?;
    if decks.iter().any(|d| d.id == deck.id) {
      return Err(StoreError::DuplicateDeck(deck.id));
    }
    info!(target: "store", id = %deck.id, name = %deck.name, "Deck created");
    decks.push(deck);
    self.write(&decks)
  }

  #[instrument(level = "debug", skip(self))]
  pub fn delete(&self, id: &str) -> Result<()> {
    let mut decks = self.list()?;
    let before = decks.len();
    decks.retain(|d| d.id != id);
    if decks.len() == before {
      return Err(StoreError::DeckNotFound(id.to_string()));
    }
    info!(target: "store", %id, "Deck deleted");
    self.write(&decks)
  }

  fn write(&self, decks: &[FlashcardDeck]) -> Result<()> {
    let raw = serde_json::to_string(decks)?;
    debug!(target: "store", decks = decks.len(), bytes = raw.len(), "Writing deck collection");
    self.kv.set(DECKS_KEY, &raw)?;
    Ok(())
  }
}
