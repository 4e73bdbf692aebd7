//! Wire types for the `generateContent` exchange and the inline image payloads
//! carried inside it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{Scene, StoryboardData};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";
pub const WIDE_ASPECT_RATIO: &str = "16:9";
pub const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(image: InlineData) -> Self {
        Self {
            text: None,
            inline_data: Some(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl InlineData {
    /// Splits a `data:<mime>;base64,<payload>` reference. A bare payload is
    /// accepted as-is and assumed to be PNG.
    pub fn from_data_url(reference: &str) -> Self {
        let mime_type = reference
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(mime, _)| mime.to_string())
            .filter(|mime| !mime.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
        let data = reference
            .split_once(',')
            .map(|(_, payload)| payload)
            .filter(|payload| !payload.is_empty())
            .unwrap_or(reference)
            .to_string();
        Self { mime_type, data }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.data.trim())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

impl GenerationConfig {
    pub fn json(schema: Value) -> Self {
        Self {
            response_mime_type: Some(JSON_MIME.to_string()),
            response_schema: Some(schema),
            image_config: None,
        }
    }

    pub fn image(image_size: &str) -> Self {
        Self {
            image_config: Some(ImageConfig {
                image_size: image_size.to_string(),
                aspect_ratio: WIDE_ASPECT_RATIO.to_string(),
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub image_size: String,
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate, `None` when there is none.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }

    pub fn first_inline_image(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationPayload {
    pub new_scenes: Vec<Scene>,
}

/// Removes a leading ```` ```json ```` or ```` ``` ```` fence and a trailing
/// ```` ``` ```` before JSON parsing.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    body = body.trim_start();
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

pub fn parse_storyboard(text: &str) -> Result<StoryboardData, serde_json::Error> {
    serde_json::from_str(strip_code_fences(text))
}

pub fn parse_continuation(text: &str) -> Result<Vec<Scene>, serde_json::Error> {
    serde_json::from_str::<ContinuationPayload>(strip_code_fences(text)).map(|p| p.new_scenes)
}

fn scene_item_schema(visual_prompt_description: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "sceneNumber": { "type": "INTEGER" },
            "title": { "type": "STRING" },
            "narrativeScript": {
                "type": "STRING",
                "description": "The script content, dialogue or action text"
            },
            "visualPrompt": {
                "type": "STRING",
                "description": visual_prompt_description
            },
            "cameraShot": {
                "type": "STRING",
                "description": "Camera angle/lens description"
            }
        },
        "required": ["sceneNumber", "title", "narrativeScript", "visualPrompt", "cameraShot"]
    })
}

pub fn storyboard_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING", "description": "Title of the short film" },
            "artStyle": {
                "type": "STRING",
                "description": "The global visual style description for image consistency"
            },
            "scenes": {
                "type": "ARRAY",
                "items": scene_item_schema(
                    "Detailed visual description for image generation. MUST include specific physical details of characters if reference images were provided."
                )
            }
        },
        "required": ["title", "artStyle", "scenes"]
    })
}

pub fn continuation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "newScenes": {
                "type": "ARRAY",
                "items": scene_item_schema(
                    "Detailed visual description, consistent with previous style and characters."
                )
            }
        },
        "required": ["newScenes"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn malformed_storyboard_is_an_error() {
        assert!(parse_storyboard("```json\n{\"title\": \"x\",").is_err());
        assert!(parse_storyboard("{\"title\":\"x\",\"artStyle\":\"y\"}").is_err());
    }

    #[test]
    fn parses_fenced_continuation() {
        let text = "```json\n{\"newScenes\":[{\"sceneNumber\":4,\"title\":\"t\",\"narrativeScript\":\"n\",\"visualPrompt\":\"v\",\"cameraShot\":\"c\"}]}\n```";
        let scenes = parse_continuation(text).expect("continuation");
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].scene_number, 4);
    }

    #[test]
    fn inline_data_reads_mime_from_data_url() {
        let data = InlineData::from_data_url("data:image/jpeg;base64,/9j/AAA=");
        assert_eq!(data.mime_type, "image/jpeg");
        assert_eq!(data.data, "/9j/AAA=");
        assert_eq!(data.to_data_url(), "data:image/jpeg;base64,/9j/AAA=");
    }

    #[test]
    fn inline_data_accepts_bare_payload() {
        let data = InlineData::from_data_url("iVBORw0KGgo=");
        assert_eq!(data.mime_type, DEFAULT_IMAGE_MIME);
        assert_eq!(data.data, "iVBORw0KGgo=");
    }

    #[test]
    fn response_helpers_find_text_and_image() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "hello " },
                        { "text": "world" },
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } }
                    ]
                }
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(raw).expect("response");
        assert_eq!(response.text().as_deref(), Some("hello world"));
        assert_eq!(
            response.first_inline_image().map(|d| d.data.as_str()),
            Some("AAAA")
        );
        assert!(GenerateContentResponse::default().text().is_none());
    }

    #[test]
    fn image_config_uses_wide_aspect_ratio() {
        let encoded = serde_json::to_value(GenerationConfig::image("2K")).expect("encode");
        assert_eq!(encoded["imageConfig"]["aspectRatio"], "16:9");
        assert_eq!(encoded["imageConfig"]["imageSize"], "2K");
        assert!(encoded.get("responseSchema").is_none());
    }
}
