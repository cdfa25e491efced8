use super::client::FxHttpClient;
use super::types::MusicGenerationResponse;
use super::{ClientContext, MusicService, PromptBuilder, PromptInput};
use crate::models::{Artifact, Endpoints, GenerationResult, MediaKind, MusicModel};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct MusicPrompt {
    prompt: String,
    generation_count: u32,
    sound_length_seconds: u32,
    loop_sound: bool,
    model: MusicModel,
}

impl MusicPrompt {
    /// Defaults: two clips of 30 seconds, not looped, default model.
    pub fn new(prompt: impl Into<String>) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::InvalidInput("Prompt cannot be empty".to_string()));
        }

        Ok(Self {
            prompt,
            generation_count: 2,
            sound_length_seconds: 30,
            loop_sound: false,
            model: MusicModel::default(),
        })
    }

    pub fn with_generation_count(mut self, count: u32) -> Self {
        self.generation_count = count;
        self
    }

    pub fn with_sound_length_seconds(mut self, seconds: u32) -> Self {
        self.sound_length_seconds = seconds;
        self
    }

    pub fn with_loop(mut self, loop_sound: bool) -> Self {
        self.loop_sound = loop_sound;
        self
    }

    pub fn with_model(mut self, model: MusicModel) -> Self {
        self.model = model;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn generation_count(&self) -> u32 {
        self.generation_count
    }

    pub fn sound_length_seconds(&self) -> u32 {
        self.sound_length_seconds
    }

    pub fn is_loop(&self) -> bool {
        self.loop_sound
    }

    pub fn model(&self) -> MusicModel {
        self.model
    }

    pub fn payload(&self, context: &ClientContext) -> Value {
        json!({
            "generationCount": self.generation_count,
            "input": { "textInput": self.prompt },
            "loop": self.loop_sound,
            "soundLengthSeconds": self.sound_length_seconds,
            "model": self.model.as_str(),
            "clientContext": {
                "tool": context.tool(),
                "sessionId": context.session_id()
            }
        })
    }

    pub fn serialize(&self) -> String {
        self.payload(&ClientContext::new(MediaKind::Music)).to_string()
    }
}

impl PromptBuilder for MusicPrompt {
    fn from_text(text: String) -> Result<Self> {
        Self::new(text)
    }
}

impl From<MusicPrompt> for PromptInput<MusicPrompt> {
    fn from(prompt: MusicPrompt) -> Self {
        PromptInput::Prompt(prompt)
    }
}

pub struct MusicFxClient {
    http: FxHttpClient,
}

impl MusicFxClient {
    pub fn new(cookie: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: FxHttpClient::new(cookie)?,
        })
    }

    pub fn new_with_client(cookie: impl Into<String>, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            http: FxHttpClient::new_with_client(cookie, client)?,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.http = self.http.with_endpoints(endpoints);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub async fn generate(
        &self,
        prompt: impl Into<PromptInput<MusicPrompt>>,
        max_retries: u32,
    ) -> Result<GenerationResult> {
        let prompt = prompt.into().into_prompt()?;
        let context = ClientContext::new(MediaKind::Music);
        let body = prompt.payload(&context).to_string();

        tracing::debug!(
            "Generating {} clip(s) of {}s",
            prompt.generation_count(),
            prompt.sound_length_seconds()
        );

        let response: MusicGenerationResponse = self
            .http
            .generate(
                MediaKind::Music,
                &self.http.endpoints().music_generation,
                &context,
                body,
                max_retries,
            )
            .await?;

        Ok(response
            .sounds
            .into_iter()
            .map(Artifact::from)
            .collect::<Vec<_>>()
            .into())
    }
}

#[async_trait]
impl MusicService for MusicFxClient {
    async fn generate_music(
        &self,
        prompt: PromptInput<MusicPrompt>,
        max_retries: u32,
    ) -> Result<GenerationResult> {
        self.generate(prompt, max_retries).await
    }
}
