//! Key-value persistence port for client-side state.
//!
//! Shaped after browser `localStorage`: string keys, string values, and every
//! call goes straight to the backing store. Deck store and settings get one
//! injected instead of reaching for ambient global state.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("storage lock poisoned")]
  Poisoned,
}

pub trait KeyValueStore {
  fn get(&self, key: &str) -> Result<Option<String>, KvError>;
  fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
  fn remove(&self, key: &str) -> Result<(), KvError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
  fn get(&self, key: &str) -> Result<Option<String>, KvError> { (**self).get(key) }
  fn set(&self, key: &str, value: &str) -> Result<(), KvError> { (**self).set(key, value) }
  fn remove(&self, key: &str) -> Result<(), KvError> { (**self).remove(key) }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
  fn get(&self, key: &str) -> Result<Option<String>, KvError> { (**self).get(key) }
  fn set(&self, key: &str, value: &str) -> Result<(), KvError> { (**self).set(key, value) }
  fn remove(&self, key: &str) -> Result<(), KvError> { (**self).remove(key) }
}

/// Process-local store; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
  inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, KvError> {
    let map = self.inner.lock().map_err(|_| KvError::Poisoned)?;
    Ok(map.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
    let mut map = self.inner.lock().map_err(|_| KvError::Poisoned)?;
    map.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), KvError> {
    let mut map = self.inner.lock().map_err(|_| KvError::Poisoned)?;
    map.remove(key);
    Ok(())
  }
}

/// All keys in one JSON object on disk. A missing file reads as empty.
///
/// Writes go to a sibling temp file that is then renamed over the original.
#[derive(Debug)]
pub struct FileStore {
  path: PathBuf,
  lock: Mutex<()>,
}

impl FileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), lock: Mutex::new(()) }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn load(&self) -> Result<BTreeMap<String, String>, KvError> {
    if !self.path.exists() {
      return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(&self.path)?;
    if content.trim().is_empty() {
      return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&content)?)
  }

  fn save(&self, map: &BTreeMap<String, String>) -> Result<(), KvError> {
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
      }
    }
    let tmp = self.path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(map)?)?;
    fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> Result<Option<String>, KvError> {
    let _guard = self.lock.lock().map_err(|_| KvError::Poisoned)?;
    Ok(self.load()?.remove(key))
  }

  fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
    let _guard = self.lock.lock().map_err(|_| KvError::Poisoned)?;
    let mut map = self.load()?;
    map.insert(key.to_string(), value.to_string());
    self.save(&map)
  }

  fn remove(&self, key: &str) -> Result<(), KvError> {
    let _guard = self.lock.lock().map_err(|_| KvError::Poisoned)?;
    let mut map = self.load()?;
    if map.remove(key).is_some() {
      self.save(&map)?;
    }
    Ok(())
  }
}
