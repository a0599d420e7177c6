//! Study session: one deck, one card at a time.
//!
//! Presentation state only (index + visible face); nothing here is persisted.

use crate::domain::{Flashcard, FlashcardDeck};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
  Question,
  Answer,
}

/// Session transitions; also what the keyboard bindings resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StudyCommand {
  Next,
  Previous,
  Flip,
  Restart,
}

impl StudyCommand {
  /// ArrowLeft / ArrowRight navigate, Space flips.
  pub fn from_key(key: &str) -> Option<Self> {
    match key {
      "ArrowLeft" => Some(StudyCommand::Previous),
      "ArrowRight" => Some(StudyCommand::Next),
      " " | "Space" => Some(StudyCommand::Flip),
      _ => None,
    }
  }
}

#[derive(Clone, Debug)]
pub struct StudySession {
  deck: FlashcardDeck,
  index: usize,
  face: Face,
}

impl StudySession {
  /// `None` for a deck without cards.
  pub fn new(deck: FlashcardDeck) -> Option<Self> {
    if deck.flashcards.is_empty() {
      return None;
    }
    Some(Self { deck, index: 0, face: Face::Question })
  }

  pub fn deck(&self) -> &FlashcardDeck { &self.deck }
  pub fn index(&self) -> usize { self.index }
  pub fn face(&self) -> Face { self.face }
  pub fn len(&self) -> usize { self.deck.flashcards.len() }

  pub fn current(&self) -> &Flashcard {
    &self.deck.flashcards[self.index]
  }

  /// Text on the visible face.
  pub fn visible_text(&self) -> &str {
    let card = self.current();
    match self.face {
      Face::Question => &card.question,
      Face::Answer => &card.answer,
    }
  }

  pub fn is_first(&self) -> bool { self.index == 0 }
  pub fn is_last(&self) -> bool { self.index + 1 == self.len() }

  /// Position as a percentage, 100 on the last card.
  pub fn progress(&self) -> f32 {
    (self.index + 1) as f32 / self.len() as f32 * 100.0
  }

  pub fn next(&mut self) {
    if !self.is_last() {
      self.index += 1;
    }
    self.face = Face::Question;
  }

  pub fn previous(&mut self) {
    self.index = self.index.saturating_sub(1);
    self.face = Face::Question;
  }

  pub fn flip(&mut self) {
    self.face = match self.face {
      Face::Question => Face::Answer,
      Face::Answer => Face::Question,
    };
  }

  pub fn restart(&mut self) {
    self.index = 0;
    self.face = Face::Question;
  }

  pub fn apply(&mut self, command: StudyCommand) {
    match command {
      StudyCommand::Next => self.next(),
      StudyCommand::Previous => self.previous(),
      StudyCommand::Flip => self.flip(),
      StudyCommand::Restart => self.restart(),
    }
  }
}
