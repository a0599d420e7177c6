//! Domain models shared by the server pipeline and the client-side components:
//! flashcards, decks, and the deck invariants.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single question/answer pair owned by exactly one deck.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
  pub id: String,
  pub question: String,
  pub answer: String,
  pub deck_id: String,
}

/// A named, ordered collection of flashcards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardDeck {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub flashcards: Vec<Flashcard>,
}

/// Reasons a deck may not be persisted.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeckViolation {
  #[error("deck id is empty")]
  EmptyId,
  #[error("deck name is empty")]
  EmptyName,
  #[error("deck has no flashcards")]
  NoFlashcards,
  #[error("flashcard {index} belongs to deck '{found}', expected '{expected}'")]
  ForeignFlashcard { index: usize, expected: String, found: String },
  #[error("flashcard {index} has an empty question or answer")]
  BlankFlashcard { index: usize },
}

impl FlashcardDeck {
  /// Check every invariant a stored deck must satisfy.
  pub fn validate(&self) -> Result<(), DeckViolation> {
    if self.id.trim().is_empty() { return Err(DeckViolation::EmptyId); }
    if self.name.trim().is_empty() { return Err(DeckViolation::EmptyName); }
    if self.flashcards.is_empty() { return Err(DeckViolation::NoFlashcards); }
    for (index, card) in self.flashcards.iter().enumerate() {
      if card.deck_id != self.id {
        return Err(DeckViolation::ForeignFlashcard {
          index,
          expected: self.id.clone(),
          found: card.deck_id.clone(),
        });
      }
      if card.question.trim().is_empty() || card.answer.trim().is_empty() {
        return Err(DeckViolation::BlankFlashcard { index });
      }
    }
    Ok(())
  }
}

/// Fresh opaque identifier for decks and flashcards.
pub fn new_id() -> String {
  Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn card(deck_id: &str, q: &str, a: &str) -> Flashcard {
    Flashcard { id: new_id(), question: q.into(), answer: a.into(), deck_id: deck_id.into() }
  }

  #[test]
  fn flashcard_serializes_with_camel_case_deck_id() {
    let c = card("d1", "Q", "A");
    let v = serde_json::to_value(&c).expect("json");
    assert_eq!(v["deckId"], "d1");
    assert!(v.get("deck_id").is_none());
  }

  #[test]
  fn validate_rejects_foreign_and_blank_cards() {
    let mut deck = FlashcardDeck { id: "d1".into(), name: "Bio".into(), flashcards: vec![card("d1", "Q", "A")] };
    assert_eq!(deck.validate(), Ok(()));

    deck.flashcards.push(card("other", "Q2", "A2"));
    assert!(matches!(deck.validate(), Err(DeckViolation::ForeignFlashcard { index: 1, .. })));

    deck.flashcards[1] = card("d1", "  ", "A2");
    assert_eq!(deck.validate(), Err(DeckViolation::BlankFlashcard { index: 1 }));

    deck.flashcards.clear();
    assert_eq!(deck.validate(), Err(DeckViolation::NoFlashcards));

    deck.name = " ".into();
    assert_eq!(deck.validate(), Err(DeckViolation::EmptyName));
  }
}
