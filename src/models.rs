//! Data models and structures
//!
//! Enumerated generation parameters, the artifacts a generation returns, and
//! the endpoint/environment configuration shared by the clients.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const LABS_BASE_URL: &str = "https://labs.google";
pub const API_BASE_URL: &str = "https://aisandbox-pa.googleapis.com";

/// Hard deadline applied to every outbound request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Which generation tool a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Music,
}

impl MediaKind {
    /// Tool identifier stamped into payloads and telemetry events.
    pub fn tool(self) -> &'static str {
        match self {
            MediaKind::Image => "IMAGE_FX",
            MediaKind::Music => "MUSICLM_V2",
        }
    }

    pub fn referer(self) -> &'static str {
        match self {
            MediaKind::Image => "https://labs.google/fx/tools/image-fx",
            MediaKind::Music => "https://labs.google/fx/tools/music-fx",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageModel {
    #[serde(rename = "IMAGEN_3")]
    Imagen3,
    #[serde(rename = "IMAGEN_3_1")]
    Imagen3_1,
    /// Newest model the backend exposes; probably Imagen 4 under the hood.
    #[default]
    #[serde(rename = "IMAGEN_3_5")]
    Imagen3_5,
}

impl ImageModel {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageModel::Imagen3 => "IMAGEN_3",
            ImageModel::Imagen3_1 => "IMAGEN_3_1",
            ImageModel::Imagen3_5 => "IMAGEN_3_5",
        }
    }
}

impl FromStr for ImageModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IMAGEN_3" => Ok(ImageModel::Imagen3),
            "IMAGEN_3_1" => Ok(ImageModel::Imagen3_1),
            "IMAGEN_3_5" => Ok(ImageModel::Imagen3_5),
            other => Err(Error::InvalidInput(format!("Unknown image model: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "IMAGE_ASPECT_RATIO_PORTRAIT_THREE_FOUR")]
    MobilePortraitThreeFour,
    #[serde(rename = "IMAGE_ASPECT_RATIO_LANDSCAPE_FOUR_THREE")]
    MobileLandscapeFourThree,
    #[default]
    #[serde(rename = "IMAGE_ASPECT_RATIO_LANDSCAPE")]
    Landscape,
    #[serde(rename = "IMAGE_ASPECT_RATIO_PORTRAIT")]
    Portrait,
    #[serde(rename = "IMAGE_ASPECT_RATIO_SQUARE")]
    Square,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::MobilePortraitThreeFour,
        AspectRatio::MobileLandscapeFourThree,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Square,
    ];

    /// Wire value sent in the `aspectRatio` field.
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::MobilePortraitThreeFour => "IMAGE_ASPECT_RATIO_PORTRAIT_THREE_FOUR",
            AspectRatio::MobileLandscapeFourThree => "IMAGE_ASPECT_RATIO_LANDSCAPE_FOUR_THREE",
            AspectRatio::Landscape => "IMAGE_ASPECT_RATIO_LANDSCAPE",
            AspectRatio::Portrait => "IMAGE_ASPECT_RATIO_PORTRAIT",
            AspectRatio::Square => "IMAGE_ASPECT_RATIO_SQUARE",
        }
    }

    /// Short name used on the command line and in configuration.
    pub fn name(self) -> &'static str {
        match self {
            AspectRatio::MobilePortraitThreeFour => "MOBILE_PORTRAIT_THREE_FOUR",
            AspectRatio::MobileLandscapeFourThree => "MOBILE_LANDSCAPE_FOUR_THREE",
            AspectRatio::Landscape => "LANDSCAPE",
            AspectRatio::Portrait => "PORTRAIT",
            AspectRatio::Square => "SQUARE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::MobilePortraitThreeFour => "Mobile Portrait (3:4)",
            AspectRatio::MobileLandscapeFourThree => "Mobile Landscape (4:3)",
            AspectRatio::Landscape => "Landscape (16:9)",
            AspectRatio::Portrait => "Portrait (9:16)",
            AspectRatio::Square => "Square",
        }
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    /// Accepts either the short name (`square`) or the wire value.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.name() == wanted || ratio.as_str() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown aspect ratio: {}", s)))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MusicModel {
    #[default]
    #[serde(rename = "DEFAULT")]
    Default,
}

impl MusicModel {
    pub fn as_str(self) -> &'static str {
        match self {
            MusicModel::Default => "DEFAULT",
        }
    }
}

impl FromStr for MusicModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(MusicModel::Default),
            other => Err(Error::InvalidInput(format!("Unknown music model: {}", other))),
        }
    }
}

/// Image formats the caption endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Jpeg,
    Jpg,
    Jpe,
    Png,
    Gif,
    Webp,
    Svg,
    Bmp,
    Tiff,
    Apng,
    Avif,
}

impl ImageType {
    pub const ALL: [ImageType; 11] = [
        ImageType::Jpeg,
        ImageType::Jpg,
        ImageType::Jpe,
        ImageType::Png,
        ImageType::Gif,
        ImageType::Webp,
        ImageType::Svg,
        ImageType::Bmp,
        ImageType::Tiff,
        ImageType::Apng,
        ImageType::Avif,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageType::Jpeg => "jpeg",
            ImageType::Jpg => "jpg",
            ImageType::Jpe => "jpe",
            ImageType::Png => "png",
            ImageType::Gif => "gif",
            ImageType::Webp => "webp",
            ImageType::Svg => "svg",
            ImageType::Bmp => "bmp",
            ImageType::Tiff => "tiff",
            ImageType::Apng => "apng",
            ImageType::Avif => "avif",
        }
    }
}

impl FromStr for ImageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        ImageType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                let supported: Vec<&str> = ImageType::ALL.iter().map(|t| t.as_str()).collect();
                Error::InvalidInput(format!(
                    "Unsupported image type: {}. Supported: {}",
                    s,
                    supported.join(", ")
                ))
            })
    }
}

/// One produced media item, in the shape the backend returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Base64-encoded media payload.
    pub data: String,
    pub mime_type: Option<String>,
    pub uri: Option<String>,
    pub download_url: Option<String>,
    /// Backend id usable with `fetch_image`.
    pub media_id: Option<String>,
    pub seed: Option<i64>,
}

impl Artifact {
    pub fn new(data: String) -> Self {
        Self {
            data,
            mime_type: None,
            uri: None,
            download_url: None,
            media_id: None,
            seed: None,
        }
    }

    /// Decode the base64 payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| Error::MalformedResponse(format!("Failed to decode base64 media: {}", e)))
    }

    /// `data:` URL suitable for embedding in a page.
    pub fn data_url(&self, fallback_mime: &str) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type.as_deref().unwrap_or(fallback_mime),
            self.data
        )
    }
}

/// Artifacts of one generation call, in backend order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
    pub artifacts: Vec<Artifact>,
}

impl GenerationResult {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.artifacts.iter()
    }
}

impl From<Vec<Artifact>> for GenerationResult {
    fn from(artifacts: Vec<Artifact>) -> Self {
        Self { artifacts }
    }
}

impl IntoIterator for GenerationResult {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.into_iter()
    }
}

/// Backend URLs. Defaults point at the production hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub session: String,
    pub telemetry: String,
    pub fetch_media: String,
    pub caption: String,
    pub image_generation: String,
    pub music_generation: String,
}

impl Endpoints {
    /// Build endpoints from the labs host (session, telemetry, media
    /// lookups) and the generation API host.
    pub fn new(labs_base_url: &str, api_base_url: &str) -> Self {
        let labs = labs_base_url.trim_end_matches('/');
        let api = api_base_url.trim_end_matches('/');

        Self {
            session: format!("{}/fx/api/auth/session", labs),
            telemetry: format!("{}/fx/api/trpc/general.submitBatchLog", labs),
            fetch_media: format!("{}/fx/api/trpc/media.fetchMedia", labs),
            caption: format!("{}/fx/api/trpc/backbone.captionImage", labs),
            image_generation: format!("{}/v1:runImageFx", api),
            music_generation: format!("{}/v1:soundDemo", api),
        }
    }

    /// Route every endpoint to one host, e.g. a local proxy or mock server.
    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(base_url, base_url)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(LABS_BASE_URL, API_BASE_URL)
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub cookie: String,
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub retries: u32,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cookie = var("FX_COOKIE")
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Config("FX_COOKIE not set".to_string()))?;

        let labs_base_url = var("FX_LABS_BASE_URL").unwrap_or_else(|| LABS_BASE_URL.to_string());
        let api_base_url = var("FX_API_BASE_URL").unwrap_or_else(|| API_BASE_URL.to_string());

        let timeout = match var("FX_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("FX_TIMEOUT_SECS", &raw)?),
            None => DEFAULT_TIMEOUT,
        };
        let retries = match var("FX_RETRIES") {
            Some(raw) => parse_number("FX_RETRIES", &raw)?,
            None => 0,
        };

        Ok(Self {
            cookie,
            endpoints: Endpoints::new(&labs_base_url, &api_base_url),
            timeout,
            retries,
            output_dir: PathBuf::from(var("FX_OUTPUT_DIR").unwrap_or_else(|| "output".to_string())),
        })
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}
