//! Application state shared by every request: configuration, the text
//! extractor, and the OpenAI client. Nothing in here is mutated after startup.

use tracing::{info, instrument};

use crate::config::ServerConfig;
use crate::extract::Extractor;
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub extractor: Extractor,
    pub openai: OpenAI,
}

impl AppState {
    /// Build state from a resolved config with the default PDF backend.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: ServerConfig) -> Result<Self, reqwest::Error> {
        Self::with_extractor(config, Extractor::default())
    }

    pub fn with_extractor(config: ServerConfig, extractor: Extractor) -> Result<Self, reqwest::Error> {
        let openai = OpenAI::from_config(&config)?;
        info!(
            target: "flashdeck",
            base_url = %openai.base_url,
            model = %openai.model,
            max_flashcards = config.max_flashcards,
            max_upload_bytes = config.max_upload_bytes,
            "Flashcard pipeline configured"
        );
        Ok(Self { config, extractor, openai })
    }
}
