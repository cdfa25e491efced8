use super::{ImagePrompt, ImageService, MusicPrompt, MusicService, PromptInput};
use crate::models::{Artifact, GenerationResult, ImageType};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// 1x1 PNG
const TINY_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVR4nGP4z8AAAAMBAQDJ/pLvAAAAAElFTkSuQmCC";

// MPEG frame header followed by padding
const TINY_MP3_B64: &str = "//uQxAAAAAAAAAAAAAAAAAAAAAAA";

pub struct MockImageClient {
    generate_responses: Arc<Mutex<VecDeque<Result<GenerationResult>>>>,
    captions: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<ImagePrompt>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockImageClient {
    pub fn new() -> Self {
        Self {
            generate_responses: Arc::new(Mutex::new(VecDeque::new())),
            captions: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a response for the next `generate_images` call.
    pub fn with_generate_response(self, response: Result<GenerationResult>) -> Self {
        self.generate_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_caption(self, caption: String) -> Self {
        self.captions.lock().unwrap().push(caption);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Prompts received so far, after raw text was wrapped.
    pub fn received_prompts(&self) -> Vec<ImagePrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockImageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageService for MockImageClient {
    async fn generate_images(
        &self,
        prompt: PromptInput<ImagePrompt>,
        _max_retries: u32,
    ) -> Result<GenerationResult> {
        *self.call_count.lock().unwrap() += 1;

        let prompt = prompt.into_prompt()?;
        let count = prompt.count() as usize;
        self.prompts.lock().unwrap().push(prompt);

        match self.generate_responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(vec![Artifact::new(TINY_PNG_B64.to_string()); count].into()),
        }
    }

    async fn fetch_image(&self, media_id: &str) -> Result<Artifact> {
        *self.call_count.lock().unwrap() += 1;

        if media_id.trim().is_empty() {
            return Err(Error::InvalidInput("Media ID is required".to_string()));
        }
        Ok(Artifact {
            media_id: Some(media_id.to_string()),
            ..Artifact::new(TINY_PNG_B64.to_string())
        })
    }

    async fn caption_image(
        &self,
        image: &[u8],
        _image_type: ImageType,
        count: u32,
    ) -> Result<Vec<String>> {
        *self.call_count.lock().unwrap() += 1;

        if image.is_empty() {
            return Err(Error::InvalidInput("Image data is required".to_string()));
        }
        let captions = self.captions.lock().unwrap();
        if captions.is_empty() {
            Ok((1..=count).map(|i| format!("Mock caption {}", i)).collect())
        } else {
            Ok(captions.iter().take(count as usize).cloned().collect())
        }
    }
}

pub struct MockMusicClient {
    generate_responses: Arc<Mutex<VecDeque<Result<GenerationResult>>>>,
    prompts: Arc<Mutex<Vec<MusicPrompt>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockMusicClient {
    pub fn new() -> Self {
        Self {
            generate_responses: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_generate_response(self, response: Result<GenerationResult>) -> Self {
        self.generate_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn received_prompts(&self) -> Vec<MusicPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockMusicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MusicService for MockMusicClient {
    async fn generate_music(
        &self,
        prompt: PromptInput<MusicPrompt>,
        _max_retries: u32,
    ) -> Result<GenerationResult> {
        *self.call_count.lock().unwrap() += 1;

        let prompt = prompt.into_prompt()?;
        let count = prompt.generation_count() as usize;
        self.prompts.lock().unwrap().push(prompt);

        match self.generate_responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => {
                let sound = Artifact {
                    mime_type: Some("audio/mpeg".to_string()),
                    ..Artifact::new(TINY_MP3_B64.to_string())
                };
                Ok(vec![sound; count].into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_image_client_default_response() {
        let client = MockImageClient::new();
        let prompt = ImagePrompt::new("a fox").unwrap().with_count(3);

        let result = client.generate_images(prompt.into(), 0).await.unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.artifacts[0].decode().unwrap().starts_with(&[0x89, 0x50]));
        assert_eq!(client.received_prompts()[0].count(), 3);
    }

    #[tokio::test]
    async fn test_mock_image_client_queued_responses() {
        let client = MockImageClient::new()
            .with_generate_response(Err(Error::RateLimited { retry_after: None }))
            .with_generate_response(Ok(vec![Artifact::new("QQ==".to_string())].into()));

        let first = client.generate_images("a fox".into(), 0).await;
        assert!(matches!(first, Err(Error::RateLimited { .. })));

        let second = client.generate_images("a fox".into(), 0).await.unwrap();
        assert_eq!(second.artifacts[0].data, "QQ==");
        assert_eq!(client.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_music_client_wraps_text() {
        let client = MockMusicClient::new();

        let result = client.generate_music("ambient".into(), 0).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(client.received_prompts()[0].prompt(), "ambient");

        let err = client.generate_music("".into(), 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(client.get_call_count(), 2);
    }
}
