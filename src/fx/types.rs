//! Response payloads returned by the generation and media endpoints.

use crate::models::Artifact;
use serde::Deserialize;

/// `runImageFx` response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationResponse {
    pub image_panels: Vec<ImagePanel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePanel {
    pub prompt: Option<String>,
    #[serde(default)]
    pub generated_images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub encoded_image: String,
    pub seed: Option<i64>,
    pub media_generation_id: Option<String>,
    pub prompt: Option<String>,
    pub model_name_type: Option<String>,
    pub aspect_ratio: Option<String>,
}

impl From<GeneratedImage> for Artifact {
    fn from(image: GeneratedImage) -> Self {
        Artifact {
            seed: image.seed,
            media_id: image.media_generation_id,
            ..Artifact::new(image.encoded_image)
        }
    }
}

impl ImageGenerationResponse {
    /// Flatten panels into artifacts, keeping backend order.
    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.image_panels
            .into_iter()
            .flat_map(|panel| panel.generated_images)
            .map(Artifact::from)
            .collect()
    }
}

/// `soundDemo` response envelope.
#[derive(Debug, Deserialize)]
pub struct MusicGenerationResponse {
    pub sounds: Vec<Sound>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub data: String,
    pub mime_type: Option<String>,
    pub audio_uri: Option<String>,
    pub download_url: Option<String>,
}

impl From<Sound> for Artifact {
    fn from(sound: Sound) -> Self {
        Artifact {
            mime_type: sound.mime_type,
            uri: sound.audio_uri,
            download_url: sound.download_url,
            ..Artifact::new(sound.data)
        }
    }
}

/// tRPC endpoints nest their payload under `result.data.json`.
#[derive(Debug, Deserialize)]
pub struct TrpcResponse<T> {
    pub result: TrpcResult<T>,
}

#[derive(Debug, Deserialize)]
pub struct TrpcResult<T> {
    pub data: TrpcData<T>,
}

#[derive(Debug, Deserialize)]
pub struct TrpcData<T> {
    pub json: T,
}

impl<T> TrpcResponse<T> {
    pub fn into_inner(self) -> T {
        self.result.data.json
    }
}

#[derive(Debug, Deserialize)]
pub struct FetchMediaPayload {
    pub result: FetchedMedia,
}

#[derive(Debug, Deserialize)]
pub struct FetchedMedia {
    pub image: Option<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
pub struct CaptionPayload {
    pub result: CaptionResult,
}

#[derive(Debug, Deserialize)]
pub struct CaptionResult {
    #[serde(default)]
    pub candidates: Vec<CaptionCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct CaptionCandidate {
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_panels_flatten_in_order() {
        let response: ImageGenerationResponse = serde_json::from_value(serde_json::json!({
            "imagePanels": [
                { "prompt": "p", "generatedImages": [
                    { "encodedImage": "AAA", "seed": 1, "mediaGenerationId": "m1" },
                    { "encodedImage": "BBB", "seed": 2, "mediaGenerationId": "m2" }
                ]},
                { "prompt": "p", "generatedImages": [
                    { "encodedImage": "CCC", "seed": 3 }
                ]}
            ]
        }))
        .unwrap();

        let artifacts = response.into_artifacts();
        let data: Vec<&str> = artifacts.iter().map(|a| a.data.as_str()).collect();
        assert_eq!(data, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(artifacts[0].media_id.as_deref(), Some("m1"));
        assert_eq!(artifacts[2].seed, Some(3));
        assert_eq!(artifacts[2].media_id, None);
    }

    #[test]
    fn test_sound_maps_optional_fields() {
        let sound: Sound = serde_json::from_value(serde_json::json!({
            "data": "SUQz",
            "mimeType": "audio/mpeg",
            "downloadUrl": "https://example.com/a.mp3"
        }))
        .unwrap();

        let artifact = Artifact::from(sound);
        assert_eq!(artifact.mime_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(artifact.uri, None);
        assert_eq!(artifact.download_url.as_deref(), Some("https://example.com/a.mp3"));
    }

    #[test]
    fn test_missing_sounds_is_rejected() {
        let parsed = serde_json::from_str::<MusicGenerationResponse>("{}");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_trpc_envelope_unwraps() {
        let response: TrpcResponse<CaptionPayload> = serde_json::from_value(serde_json::json!({
            "result": { "data": { "json": { "result": {
                "candidates": [{ "output": "a fox" }, { "output": "a dog" }]
            }}}}
        }))
        .unwrap();

        let captions: Vec<String> = response
            .into_inner()
            .result
            .candidates
            .into_iter()
            .map(|c| c.output)
            .collect();
        assert_eq!(captions, vec!["a fox", "a dog"]);
    }
}
