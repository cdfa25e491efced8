//! Application orchestration for the command-line front end.

use crate::fx::{ImageFxClient, ImagePrompt, ImageService, MusicFxClient, MusicPrompt, MusicService};
use crate::mime::{extension_for_mime, resolve_mime};
use crate::models::{Artifact, Config, ImageType, MediaKind};
use crate::{Error, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Runs generation commands and writes the returned media to disk.
pub struct App {
    images: Box<dyn ImageService>,
    music: Box<dyn MusicService>,
    output_dir: PathBuf,
    retries: u32,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub images: Box<dyn ImageService>,
    pub music: Box<dyn MusicService>,
}

impl App {
    pub fn with_services(services: AppServices, output_dir: PathBuf, retries: u32) -> Self {
        Self {
            images: services.images,
            music: services.music,
            output_dir,
            retries,
        }
    }

    /// Build clients from configuration. Output lands in a fresh
    /// `<date>_<uuid>` directory under the configured output root.
    pub fn new(config: &Config) -> Result<Self> {
        // One connection pool for both clients.
        let http_client = reqwest::Client::builder()
            .user_agent(crate::fx::telemetry::USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let images = ImageFxClient::new_with_client(config.cookie.clone(), http_client.clone())?
            .with_endpoints(config.endpoints.clone())
            .with_timeout(config.timeout);
        let music = MusicFxClient::new_with_client(config.cookie.clone(), http_client)?
            .with_endpoints(config.endpoints.clone())
            .with_timeout(config.timeout);

        let date = Local::now().format("%Y-%m-%d").to_string();
        let output_dir = config
            .output_dir
            .join(format!("{}_{}", date, Uuid::new_v4()));

        Ok(Self::with_services(
            AppServices {
                images: Box::new(images),
                music: Box::new(music),
            },
            output_dir,
            config.retries,
        ))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn generate_images(&self, prompt: ImagePrompt) -> Result<Vec<PathBuf>> {
        info!(
            "Generating {} image(s) ({}, {})",
            prompt.count(),
            prompt.model().as_str(),
            prompt.aspect_ratio().label()
        );
        let result = self
            .images
            .generate_images(prompt.into(), self.retries)
            .await?;
        info!("Received {} image(s)", result.len());

        self.save_artifacts("image", MediaKind::Image, &result.artifacts)
    }

    pub async fn generate_music(&self, prompt: MusicPrompt) -> Result<Vec<PathBuf>> {
        info!(
            "Generating {} track(s) of {}s",
            prompt.generation_count(),
            prompt.sound_length_seconds()
        );
        let result = self.music.generate_music(prompt.into(), self.retries).await?;
        info!("Received {} track(s)", result.len());

        self.save_artifacts("track", MediaKind::Music, &result.artifacts)
    }

    pub async fn fetch_image(&self, media_id: &str) -> Result<PathBuf> {
        let artifact = self.images.fetch_image(media_id).await?;
        let stem = sanitize_stem(media_id);
        let mut paths = self.save_artifacts(&stem, MediaKind::Image, std::slice::from_ref(&artifact))?;
        paths
            .pop()
            .ok_or_else(|| Error::MalformedResponse("Fetched image was not saved".to_string()))
    }

    /// Caption an image file; its extension selects the declared type.
    pub async fn caption_file(&self, path: &Path, count: u32) -> Result<Vec<String>> {
        let image_type: ImageType = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Cannot determine image type of {}", path.display()))
            })?
            .parse()?;
        let bytes = fs::read(path)?;

        info!("Captioning {} ({} bytes)", path.display(), bytes.len());
        self.images.caption_image(&bytes, image_type, count).await
    }

    fn save_artifacts(
        &self,
        stem: &str,
        kind: MediaKind,
        artifacts: &[Artifact],
    ) -> Result<Vec<PathBuf>> {
        if artifacts.is_empty() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(&self.output_dir)?;
        let fallback = match kind {
            MediaKind::Image => "image/png",
            MediaKind::Music => "audio/mpeg",
        };

        let mut paths = Vec::with_capacity(artifacts.len());
        for (index, artifact) in artifacts.iter().enumerate() {
            let bytes = artifact.decode()?;
            let mime = resolve_mime(&bytes, artifact.mime_type.as_deref(), fallback);
            let file_name = if artifacts.len() == 1 {
                format!("{}.{}", stem, extension_for_mime(mime))
            } else {
                format!("{}_{}.{}", stem, index + 1, extension_for_mime(mime))
            };

            let path = self.output_dir.join(file_name);
            fs::write(&path, &bytes)?;
            info!("Saved {} ({} bytes)", path.display(), bytes.len());
            paths.push(path);
        }

        Ok(paths)
    }
}

fn sanitize_stem(raw: &str) -> String {
    let stem: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect();
    if stem.is_empty() {
        "image".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::{MockImageClient, MockMusicClient};

    fn app_with(images: MockImageClient, music: MockMusicClient, dir: &Path) -> App {
        App::with_services(
            AppServices {
                images: Box::new(images),
                music: Box::new(music),
            },
            dir.join("run"),
            0,
        )
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("CAMS/abc def"), "CAMS_abc_def");
        assert_eq!(sanitize_stem("   "), "image");
    }

    #[tokio::test]
    async fn test_images_saved_with_sniffed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(MockImageClient::new(), MockMusicClient::new(), dir.path());

        let prompt = ImagePrompt::new("a fox").unwrap().with_count(2);
        let paths = app.generate_images(prompt).await.unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("image_1.png"));
        assert!(paths[1].ends_with("image_2.png"));
        assert!(fs::read(&paths[0]).unwrap().starts_with(&[0x89, 0x50, 0x4E, 0x47]));
    }

    #[tokio::test]
    async fn test_undecodable_artifact_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let images = MockImageClient::new()
            .with_generate_response(Ok(vec![Artifact::new("***".to_string())].into()));
        let app = app_with(images, MockMusicClient::new(), dir.path());

        let err = app
            .generate_images(ImagePrompt::new("a fox").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_result_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let images = MockImageClient::new().with_generate_response(Ok(Vec::<Artifact>::new().into()));
        let app = app_with(images, MockMusicClient::new(), dir.path());

        let paths = app
            .generate_images(ImagePrompt::new("a fox").unwrap())
            .await
            .unwrap();
        assert!(paths.is_empty());
        assert!(!app.output_dir().exists());
    }

    #[tokio::test]
    async fn test_caption_file_requires_known_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("photo.heic");
        fs::write(&file, [1, 2, 3]).unwrap();

        let app = app_with(MockImageClient::new(), MockMusicClient::new(), dir.path());
        let err = app.caption_file(&file, 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
