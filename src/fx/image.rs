use super::client::{Call, FxHttpClient};
use super::types::{
    CaptionPayload, FetchMediaPayload, ImageGenerationResponse, TrpcResponse,
};
use super::{ClientContext, ImageService, PromptBuilder, PromptInput};
use crate::models::{
    Artifact, AspectRatio, Endpoints, GenerationResult, ImageModel, ImageType, MediaKind,
};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Visual description and settings for one image generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePrompt {
    prompt: String,
    count: u32,
    aspect_ratio: AspectRatio,
    model: ImageModel,
    seed: i64,
}

impl ImagePrompt {
    /// Defaults: one image, landscape, newest model, seed 0 (backend picks).
    pub fn new(prompt: impl Into<String>) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::InvalidInput("Prompt cannot be empty".to_string()));
        }

        Ok(Self {
            prompt,
            count: 1,
            aspect_ratio: AspectRatio::default(),
            model: ImageModel::default(),
            seed: 0,
        })
    }

    /// Number of images per request. The backend maximum varies by account
    /// and is not checked here.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_model(mut self, model: ImageModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn model(&self) -> ImageModel {
        self.model
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Request body for `runImageFx` under the given client context.
    pub fn payload(&self, context: &ClientContext) -> Value {
        json!({
            "userInput": {
                "candidatesCount": self.count,
                "prompts": [self.prompt],
                "seed": self.seed
            },
            "clientContext": {
                "sessionId": context.session_id(),
                "tool": context.tool()
            },
            "modelInput": {
                "modelNameType": self.model.as_str()
            },
            "aspectRatio": self.aspect_ratio.as_str()
        })
    }

    /// Wire JSON with a freshly generated nonce.
    pub fn serialize(&self) -> String {
        self.payload(&ClientContext::new(MediaKind::Image)).to_string()
    }
}

impl PromptBuilder for ImagePrompt {
    fn from_text(text: String) -> Result<Self> {
        Self::new(text)
    }
}

impl From<ImagePrompt> for PromptInput<ImagePrompt> {
    fn from(prompt: ImagePrompt) -> Self {
        PromptInput::Prompt(prompt)
    }
}

pub struct ImageFxClient {
    http: FxHttpClient,
}

impl ImageFxClient {
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

    /// Generate images from raw text or a configured [`ImagePrompt`].
    ///
    /// `max_retries` extra attempts are spent only on server errors and
    /// connection failures.
    pub async fn generate(
        &self,
        prompt: impl Into<PromptInput<ImagePrompt>>,
        max_retries: u32,
    ) -> Result<GenerationResult> {
        let prompt = prompt.into().into_prompt()?;
        let context = ClientContext::new(MediaKind::Image);
        let body = prompt.payload(&context).to_string();

        tracing::debug!(
            "Generating {} image(s) with {}",
            prompt.count(),
            prompt.model().as_str()
        );

        let response: ImageGenerationResponse = self
            .http
            .generate(
                MediaKind::Image,
                &self.http.endpoints().image_generation,
                &context,
                body,
                max_retries,
            )
            .await?;

        Ok(GenerationResult::from(response.into_artifacts()))
    }

    /// Look up a previously generated image by its media generation id.
    pub async fn fetch_image(&self, media_id: &str) -> Result<Artifact> {
        let media_id = media_id.trim();
        if media_id.is_empty() {
            return Err(Error::InvalidInput("Media ID is required".to_string()));
        }

        let input = json!({ "json": { "mediaKey": media_id } }).to_string();
        let url = reqwest::Url::parse_with_params(
            &self.http.endpoints().fetch_media,
            &[("input", input.as_str())],
        )
        .map_err(|e| Error::Config(format!("Invalid fetch media URL: {}", e)))?;

        let response: TrpcResponse<FetchMediaPayload> = self
            .http
            .request(MediaKind::Image, Call::get(url.as_str()))
            .await?;

        let mut artifact: Artifact = response
            .into_inner()
            .result
            .image
            .map(Artifact::from)
            .ok_or_else(|| Error::MalformedResponse("No image in fetch media response".to_string()))?;
        artifact.media_id.get_or_insert_with(|| media_id.to_string());

        Ok(artifact)
    }

    /// Ask the backend to describe an image. Returns `count` captions.
    pub async fn caption(
        &self,
        image: &[u8],
        image_type: ImageType,
        count: u32,
    ) -> Result<Vec<String>> {
        if image.is_empty() {
            return Err(Error::InvalidInput("Image data is required".to_string()));
        }
        if count == 0 {
            return Err(Error::InvalidInput("Caption count must be at least 1".to_string()));
        }

        let context = ClientContext::new(MediaKind::Image);
        let body = caption_payload(image, image_type, count, &context).to_string();

        let response: TrpcResponse<CaptionPayload> = self
            .http
            .request(
                MediaKind::Image,
                Call::post(self.http.endpoints().caption.as_str(), body),
            )
            .await?;

        Ok(response
            .into_inner()
            .result
            .candidates
            .into_iter()
            .map(|c| c.output)
            .collect())
    }
}

fn caption_payload(image: &[u8], image_type: ImageType, count: u32, context: &ClientContext) -> Value {
    use base64::Engine as _;
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);

    json!({
        "json": {
            "clientContext": {
                "sessionId": context.session_id(),
                "workflowId": ""
            },
            "captionInput": {
                "candidatesCount": count,
                "mediaInput": {
                    "mediaCategory": "MEDIA_CATEGORY_SUBJECT",
                    "rawBytes": format!("data:image/{};base64,{}", image_type.as_str(), encoded)
                }
            }
        }
    })
}

#[async_trait]
impl ImageService for ImageFxClient {
    async fn generate_images(
        &self,
        prompt: PromptInput<ImagePrompt>,
        max_retries: u32,
    ) -> Result<GenerationResult> {
        self.generate(prompt, max_retries).await
    }

    async fn fetch_image(&self, media_id: &str) -> Result<Artifact> {
        ImageFxClient::fetch_image(self, media_id).await
    }

    async fn caption_image(
        &self,
        image: &[u8],
        image_type: ImageType,
        count: u32,
    ) -> Result<Vec<String>> {
        self.caption(image, image_type, count).await
    }
}
