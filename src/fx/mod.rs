//! Generation clients for the ImageFX and MusicFX backends
//!
//! Both clients share [`FxHttpClient`], which owns the session refresh,
//! deadline, retry and telemetry flow. The media-specific modules only build
//! payloads and map responses into [`crate::models::Artifact`]s.

pub mod client;
pub mod image;
pub mod mock;
pub mod music;
pub mod telemetry;
pub mod types;

pub use client::FxHttpClient;
pub use image::{ImageFxClient, ImagePrompt};
pub use mock::{MockImageClient, MockMusicClient};
pub use music::{MusicFxClient, MusicPrompt};

use crate::models::{Artifact, GenerationResult, ImageType, MediaKind};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate_images(
        &self,
        prompt: PromptInput<ImagePrompt>,
        max_retries: u32,
    ) -> Result<GenerationResult>;
    async fn fetch_image(&self, media_id: &str) -> Result<Artifact>;
    async fn caption_image(
        &self,
        image: &[u8],
        image_type: ImageType,
        count: u32,
    ) -> Result<Vec<String>>;
}

#[async_trait]
pub trait MusicService: Send + Sync {
    async fn generate_music(
        &self,
        prompt: PromptInput<MusicPrompt>,
        max_retries: u32,
    ) -> Result<GenerationResult>;
}

/// Payload builders that can be created from nothing but prompt text.
pub trait PromptBuilder: Sized {
    fn from_text(text: String) -> Result<Self>;
}

/// Either raw prompt text or a fully configured builder of type `P`.
#[derive(Debug, Clone)]
pub enum PromptInput<P> {
    Text(String),
    Prompt(P),
}

impl<P: PromptBuilder> PromptInput<P> {
    /// Resolve to a builder, wrapping raw text with default settings.
    pub fn into_prompt(self) -> Result<P> {
        match self {
            PromptInput::Text(text) => P::from_text(text),
            PromptInput::Prompt(prompt) => Ok(prompt),
        }
    }
}

impl<P> From<&str> for PromptInput<P> {
    fn from(text: &str) -> Self {
        PromptInput::Text(text.to_string())
    }
}

impl<P> From<String> for PromptInput<P> {
    fn from(text: String) -> Self {
        PromptInput::Text(text)
    }
}

/// The `clientContext` block stamped into every payload.
///
/// The session id is a nonce taken from the clock at creation, so each
/// serialization gets a new one while retries of one call share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    tool: &'static str,
    session_id: String,
}

impl ClientContext {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            tool: kind.tool(),
            session_id: format!(";{}", Utc::now().timestamp_millis()),
        }
    }

    pub fn tool(&self) -> &'static str {
        self.tool
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
