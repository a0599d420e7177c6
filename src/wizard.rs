//! Deck creation wizard: count → upload → edit → complete.
//!
//! Framework-free state machine. The UI calls the transition methods and
//! renders from the getters. Nothing is persisted until [`CreationWizard::confirm`];
//! cancelling at any point leaves storage untouched.

use thiserror::Error;
use tracing::{info, warn};

use crate::client::ClientError;
use crate::config::clamp_flashcard_count;
use crate::domain::{new_id, Flashcard, FlashcardDeck};
use crate::kv::KeyValueStore;
use crate::store::{DeckStore, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
  Count,
  Upload,
  Edit,
  Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardField {
  Question,
  Answer,
}

#[derive(Debug, Error)]
pub enum WizardError {
  #[error("not allowed in step {actual:?}")]
  WrongStep { actual: Step },
  #[error("a generation is already in flight")]
  Busy,
  #[error("no generation is in flight for this deck")]
  StaleTicket,
  #[error("deck name is required")]
  MissingDeckName,
  #[error("Please add your OpenAI API key in settings before creating flashcards.")]
  MissingCredential,
  #[error("no flashcard at index {0}")]
  NoSuchCard(usize),
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Handed out by [`CreationWizard::begin_generation`]; carries what the upload needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationTicket {
  pub deck_id: String,
  pub count: u32,
}

#[derive(Clone, Debug)]
pub struct CreationWizard {
  step: Step,
  initial_count: u32,
  max_count: u32,
  count: u32,
  deck_name: String,
  deck_id: Option<String>,
  cards: Vec<Flashcard>,
  busy: bool,
  error: Option<String>,
  needs_credential: bool,
}

impl CreationWizard {
  /// `max_count` is the slider maximum; counts are kept within `1..=max_count`.
  pub fn new(initial_count: u32, max_count: u32) -> Self {
    let count = clamp_flashcard_count(initial_count, max_count);
    Self {
      step: Step::Count,
      initial_count: count,
      max_count,
      count,
      deck_name: String::new(),
      deck_id: None,
      cards: Vec::new(),
      busy: false,
      error: None,
      needs_credential: false,
    }
  }

  pub fn step(&self) -> Step { self.step }
  pub fn count(&self) -> u32 { self.count }
  pub fn max_count(&self) -> u32 { self.max_count }
  pub fn deck_name(&self) -> &str { &self.deck_name }
  pub fn cards(&self) -> &[Flashcard] { &self.cards }
  pub fn is_busy(&self) -> bool { self.busy }
  pub fn error(&self) -> Option<&str> { self.error.as_deref() }
  /// Set after a credential failure; the UI should reopen the key prompt.
  pub fn needs_credential(&self) -> bool { self.needs_credential }

  fn expect_step(&self, step: Step) -> Result<(), WizardError> {
    if self.step == step { Ok(()) } else { Err(WizardError::WrongStep { actual: self.step }) }
  }

  pub fn set_count(&mut self, count: u32) -> Result<u32, WizardError> {
    self.expect_step(Step::Count)?;
    self.count = clamp_flashcard_count(count, self.max_count);
    Ok(self.count)
  }

  pub fn set_deck_name(&mut self, name: &str) -> Result<(), WizardError> {
    self.expect_step(Step::Count)?;
    self.deck_name = name.to_string();
    Ok(())
  }

  pub fn proceed_to_upload(&mut self, has_credential: bool) -> Result<(), WizardError> {
    self.expect_step(Step::Count)?;
    if self.deck_name.trim().is_empty() {
      return Err(WizardError::MissingDeckName);
    }
    if !has_credential {
      self.needs_credential = true;
      return Err(WizardError::MissingCredential);
    }
    self.needs_credential = false;
    self.error = None;
    self.step = Step::Upload;
    Ok(())
  }

  /// Start one generation. Re-submitting while one is in flight is refused.
  pub fn begin_generation(&mut self) -> Result<GenerationTicket, WizardError> {
    self.expect_step(Step::Upload)?;
    if self.busy {
      return Err(WizardError::Busy);
    }
    let deck_id = new_id();
    self.deck_id = Some(deck_id.clone());
    self.cards.clear();
    self.error = None;
    self.needs_credential = false;
    self.busy = true;
    Ok(GenerationTicket { deck_id, count: self.count })
  }

  /// Record the outcome of a generation. Failures stay in the upload step
  /// with a message; only an exact-count result moves on to editing.
  pub fn finish_generation(
    &mut self,
    ticket: &GenerationTicket,
    result: Result<Vec<Flashcard>, ClientError>,
  ) -> Result<(), WizardError> {
    if !self.busy || self.step != Step::Upload || self.deck_id.as_deref() != Some(ticket.deck_id.as_str()) {
      return Err(WizardError::StaleTicket);
    }
    self.busy = false;

    let outcome = result.and_then(|cards| {
      if cards.iter().any(|c| c.deck_id != ticket.deck_id) {
        return Err(ClientError::MalformedResponse);
      }
      Ok(cards)
    });

    match outcome {
      Ok(cards) if cards.len() == ticket.count as usize => {
        info!(target: "wizard", deck_id = %ticket.deck_id, cards = cards.len(), "Flashcards ready for review");
        self.cards = cards;
        self.step = Step::Edit;
      }
      Ok(cards) => {
        let message = if cards.len() < ticket.count as usize {
          format!("Not enough flashcards were generated ({}/{}). Please try again.", cards.len(), ticket.count)
        } else {
          format!("Too many flashcards were generated ({}/{}). Please try again.", cards.len(), ticket.count)
        };
        warn!(target: "wizard", %message, "Generation rejected");
        self.error = Some(message);
      }
      Err(e) => {
        warn!(target: "wizard", error = %e, "Generation failed");
        self.needs_credential = e.needs_credential();
        self.error = Some(e.to_string());
      }
    }
    Ok(())
  }

  pub fn edit_card(&mut self, index: usize, field: CardField, value: &str) -> Result<(), WizardError> {
    self.expect_step(Step::Edit)?;
    let card = self.cards.get_mut(index).ok_or(WizardError::NoSuchCard(index))?;
    match field {
      CardField::Question => card.question = value.to_string(),
      CardField::Answer => card.answer = value.to_string(),
    }
    Ok(())
  }

  pub fn delete_card(&mut self, index: usize) -> Result<Flashcard, WizardError> {
    self.expect_step(Step::Edit)?;
    if index >= self.cards.len() {
      return Err(WizardError::NoSuchCard(index));
    }
    Ok(self.cards.remove(index))
  }

  /// Edit → Upload (generated cards dropped), Upload → Count.
  pub fn back(&mut self) -> Result<(), WizardError> {
    match self.step {
      Step::Edit => {
        self.cards.clear();
        self.deck_id = None;
        self.step = Step::Upload;
      }
      Step::Upload if !self.busy => self.step = Step::Count,
      Step::Upload => return Err(WizardError::Busy),
      other => return Err(WizardError::WrongStep { actual: other }),
    }
    self.error = None;
    Ok(())
  }

  /// Persist the reviewed deck and finish.
  pub fn confirm<S: KeyValueStore>(&mut self, store: &DeckStore<S>) -> Result<FlashcardDeck, WizardError> {
    self.expect_step(Step::Edit)?;
    let name = self.deck_name.trim();
    if name.is_empty() {
      return Err(WizardError::MissingDeckName);
    }
    let deck_id = self.deck_id.clone().ok_or(WizardError::StaleTicket)?;
    let deck = FlashcardDeck {
      id: deck_id,
      name: name.to_string(),
      flashcards: self.cards.clone(),
    };
    store.create(deck.clone())?;
    self.step = Step::Complete;
    Ok(deck)
  }

  /// Abandon the flow; storage is not touched.
  pub fn cancel(&mut self) {
    *self = Self::new(self.initial_count, self.max_count);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DEFAULT_MAX_FLASHCARDS;
  use crate::kv::MemoryStore;

  fn cards_for(ticket: &GenerationTicket, n: usize) -> Vec<Flashcard> {
    (0..n)
      .map(|i| Flashcard {
        id: format!("c{i}"),
        question: format!("Q{i}"),
        answer: format!("A{i}"),
        deck_id: ticket.deck_id.clone(),
      })
      .collect()
  }

  fn at_upload(count: u32) -> CreationWizard {
    let mut w = CreationWizard::new(count, DEFAULT_MAX_FLASHCARDS);
    w.set_deck_name("Biology").unwrap();
    w.proceed_to_upload(true).unwrap();
    w
  }

  #[test]
  fn count_is_clamped() {
    let mut w = CreationWizard::new(0, DEFAULT_MAX_FLASHCARDS);
    assert_eq!(w.count(), 1);
    assert_eq!(w.set_count(50).unwrap(), 20);
  }

  #[test]
  fn custom_maximum_is_honored() {
    let mut w = CreationWizard::new(8, 5);
    assert_eq!(w.count(), 5);
    assert_eq!(w.set_count(4).unwrap(), 4);
    assert_eq!(w.set_count(9).unwrap(), 5);
    w.cancel();
    assert_eq!((w.count(), w.max_count()), (5, 5));
  }

  #[test]
  fn upload_requires_name_and_credential() {
    let mut w = CreationWizard::new(5, DEFAULT_MAX_FLASHCARDS);
    assert!(matches!(w.proceed_to_upload(true), Err(WizardError::MissingDeckName)));
    w.set_deck_name("Bio").unwrap();
    assert!(matches!(w.proceed_to_upload(false), Err(WizardError::MissingCredential)));
    assert!(w.needs_credential());
    w.proceed_to_upload(true).unwrap();
    assert_eq!(w.step(), Step::Upload);
  }

  #[test]
  fn resubmission_while_busy_is_refused() {
    let mut w = at_upload(2);
    let ticket = w.begin_generation().unwrap();
    assert!(matches!(w.begin_generation(), Err(WizardError::Busy)));
    assert!(matches!(w.back(), Err(WizardError::Busy)));
    let cards = cards_for(&ticket, 2);
    w.finish_generation(&ticket, Ok(cards)).unwrap();
    assert_eq!(w.step(), Step::Edit);
    assert!(!w.is_busy());
  }

  #[test]
  fn short_or_long_results_stay_in_upload() {
    let mut w = at_upload(3);
    let ticket = w.begin_generation().unwrap();
    let short = cards_for(&ticket, 2);
    w.finish_generation(&ticket, Ok(short)).unwrap();
    assert_eq!(w.step(), Step::Upload);
    assert_eq!(w.error(), Some("Not enough flashcards were generated (2/3). Please try again."));

    let ticket = w.begin_generation().unwrap();
    let long = cards_for(&ticket, 4);
    w.finish_generation(&ticket, Ok(long)).unwrap();
    assert_eq!(w.step(), Step::Upload);
    assert!(w.cards().is_empty());
  }

  #[test]
  fn credential_failure_flags_prompt() {
    let mut w = at_upload(1);
    let ticket = w.begin_generation().unwrap();
    let err = ClientError::InvalidCredential { message: "Invalid OpenAI API key".into() };
    w.finish_generation(&ticket, Err(err)).unwrap();
    assert!(w.needs_credential());
    assert_eq!(w.error(), Some("Invalid OpenAI API key"));
    assert_eq!(w.step(), Step::Upload);
  }

  #[test]
  fn stale_ticket_is_rejected() {
    let mut w = at_upload(1);
    let ticket = w.begin_generation().unwrap();
    let other = GenerationTicket { deck_id: "other".into(), count: 1 };
    assert!(matches!(w.finish_generation(&other, Ok(vec![])), Err(WizardError::StaleTicket)));
    assert!(w.is_busy());
    w.finish_generation(&ticket, Ok(cards_for(&ticket, 1))).unwrap();
  }

  #[test]
  fn edit_delete_and_confirm_persist_the_deck() {
    let store = DeckStore::new(MemoryStore::new());
    let mut w = at_upload(3);
    w.set_deck_name("ignored").unwrap_err();
    let ticket = w.begin_generation().unwrap();
    w.finish_generation(&ticket, Ok(cards_for(&ticket, 3))).unwrap();

    w.edit_card(0, CardField::Question, "What is a cell?").unwrap();
    w.delete_card(2).unwrap();
    assert!(matches!(w.delete_card(5), Err(WizardError::NoSuchCard(5))));

    let deck = w.confirm(&store).unwrap();
    assert_eq!(w.step(), Step::Complete);
    assert_eq!(deck.name, "Biology");
    assert_eq!(deck.id, ticket.deck_id);
    assert_eq!(deck.flashcards.len(), 2);

    let stored = store.get(&ticket.deck_id).unwrap();
    assert_eq!(stored.flashcards[0].question, "What is a cell?");
  }

  #[test]
  fn blanked_card_blocks_confirm() {
    let store = DeckStore::new(MemoryStore::new());
    let mut w = at_upload(1);
    let ticket = w.begin_generation().unwrap();
    w.finish_generation(&ticket, Ok(cards_for(&ticket, 1))).unwrap();
    w.edit_card(0, CardField::Answer, "   ").unwrap();
    assert!(matches!(w.confirm(&store), Err(WizardError::Store(_))));
    assert_eq!(w.step(), Step::Edit);
    assert!(store.list().unwrap().is_empty());
  }

  #[test]
  fn cancel_leaves_storage_untouched() {
    let store = DeckStore::new(MemoryStore::new());
    let mut w = at_upload(2);
    let ticket = w.begin_generation().unwrap();
    w.finish_generation(&ticket, Ok(cards_for(&ticket, 2))).unwrap();
    w.cancel();
    assert_eq!(w.step(), Step::Count);
    assert_eq!(w.count(), 2);
    assert!(w.deck_name().is_empty());
    assert!(store.list().unwrap().is_empty());
  }
}
