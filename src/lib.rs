//! flashdeck · document-to-flashcards
//!
//! Server side: upload a `.txt` or `.pdf`, get back exactly N question/answer
//! flashcards generated through an OpenAI-compatible completion endpoint.
//!
//! Client side: a deck store, settings, a creation wizard and a study session,
//! all framework-free and persisted through an injected [`kv::KeyValueStore`].

pub mod client;
pub mod config;
pub mod domain;
pub mod extract;
pub mod kv;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod settings;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod util;
pub mod wizard;
