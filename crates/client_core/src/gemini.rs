//! `generateContent` client for the Gemini REST API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{ImageResolution, Language, Scene, StoryboardData},
    error::GenerationError,
    protocol::{
        continuation_schema, parse_continuation, parse_storyboard, storyboard_schema, Content,
        ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
        InlineData, Part,
    },
};
use tracing::{debug, info};
use url::Url;

use crate::{config::Settings, prompts, retry::RetryPolicy, GenerationBackend, GenerationResult};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    text_model: String,
    image_model: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("invalid API base url '{base}'"))?;
        Ok(Self {
            http: Client::new(),
            base_url,
            api_key,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_settings(settings: &Settings, api_key: Option<String>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build HTTP client")?;
        let mut client = Self::new(&settings.api_base_url, api_key)?
            .with_models(&settings.text_model, &settings.image_model)
            .with_retry_policy(RetryPolicy::new(
                settings.max_retries,
                Duration::from_millis(settings.retry_delay_ms),
            ));
        client.http = http;
        Ok(client)
    }

    pub fn with_models(mut self, text_model: &str, image_model: &str) -> Self {
        self.text_model = text_model.to_string();
        self.image_model = image_model.to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_ok()
    }

    fn api_key(&self) -> GenerationResult<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::CredentialMissing)
    }

    fn endpoint(&self, model: &str) -> GenerationResult<Url> {
        self.base_url
            .join(&format!("v1beta/models/{model}:generateContent"))
            .map_err(|e| GenerationError::from_failure(None, format!("invalid endpoint: {e}")))
    }

    async fn send(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GenerationResult<GenerateContentResponse> {
        let api_key = self.api_key()?;
        let url = self.endpoint(model)?;
        let parts: usize = request.contents.iter().map(|c| c.parts.len()).sum();
        debug!(model, parts, "generation: sending request");

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                GenerationError::from_failure(e.status().map(|s| s.as_u16()), e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            return Err(GenerationError::from_failure(Some(status.as_u16()), message));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GenerationError::parse(format!("invalid response envelope: {e}")))
    }

    async fn send_with_retry(
        &self,
        operation: &str,
        model: &str,
        request: GenerateContentRequest,
    ) -> GenerationResult<GenerateContentResponse> {
        let request = &request;
        self.retry
            .run(operation, move || self.send(model, request))
            .await
    }
}

fn reference_parts(reference_images: &[String]) -> Vec<Part> {
    reference_images
        .iter()
        .map(|r| Part::inline(InlineData::from_data_url(r)))
        .collect()
}

fn first_image(
    response: &GenerateContentResponse,
    missing: GenerationError,
) -> GenerationResult<String> {
    response
        .first_inline_image()
        .map(InlineData::to_data_url)
        .ok_or(missing)
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn enhance_prompt(&self, text: &str, language: Language) -> GenerationResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(prompts::enhance_request(
                text, language,
            ))])],
            ..GenerateContentRequest::default()
        };
        let response = self
            .send_with_retry("enhance_prompt", &self.text_model, request)
            .await
            .map_err(|e| GenerationError::Enhancement(Box::new(e)))?;
        let enhanced = response
            .text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| text.to_string());
        info!(chars = enhanced.chars().count(), "generation: prompt enhanced");
        Ok(enhanced)
    }

    async fn generate_script(
        &self,
        prompt: &str,
        reference_images: &[String],
        language: Language,
    ) -> GenerationResult<StoryboardData> {
        let mut parts = reference_parts(reference_images);
        parts.push(Part::text(prompts::script_user_text(
            prompt,
            !reference_images.is_empty(),
        )));
        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: Some(Content::system(prompts::script_system_instruction(language))),
            generation_config: Some(GenerationConfig::json(storyboard_schema())),
        };

        let response = self
            .send_with_retry("generate_script", &self.text_model, request)
            .await?;
        let text = response.text().ok_or(GenerationError::NoResponse)?;
        let storyboard = parse_storyboard(&text).map_err(|e| GenerationError::parse(e.to_string()))?;
        info!(
            title = %storyboard.title,
            scenes = storyboard.scenes.len(),
            "generation: script generated"
        );
        Ok(storyboard)
    }

    async fn continue_script(
        &self,
        storyboard: &StoryboardData,
        continuation_text: &str,
        reference_images: &[String],
        language: Language,
    ) -> GenerationResult<Vec<Scene>> {
        let mut parts = reference_parts(reference_images);
        parts.push(Part::text(prompts::continuation_user_text(continuation_text)));
        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: Some(Content::system(prompts::continuation_system_instruction(
                storyboard, language,
            ))),
            generation_config: Some(GenerationConfig::json(continuation_schema())),
        };

        let response = self
            .send_with_retry("continue_script", &self.text_model, request)
            .await?;
        let text = response.text().ok_or(GenerationError::NoResponse)?;
        let scenes = parse_continuation(&text).map_err(|e| GenerationError::parse(e.to_string()))?;
        info!(new_scenes = scenes.len(), "generation: script continued");
        Ok(scenes)
    }

    async fn generate_image(
        &self,
        style_guide: &str,
        visual_prompt: &str,
        resolution: ImageResolution,
        reference_images: &[String],
    ) -> GenerationResult<String> {
        let mut parts = reference_parts(reference_images);
        parts.push(Part::text(prompts::image_prompt(
            style_guide,
            visual_prompt,
            !reference_images.is_empty(),
        )));
        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: None,
            generation_config: Some(GenerationConfig::image(resolution.as_str())),
        };

        let response = self
            .send_with_retry("generate_image", &self.image_model, request)
            .await?;
        first_image(&response, GenerationError::NoImage)
    }

    async fn edit_image(
        &self,
        original_image: &str,
        instruction: &str,
        resolution: ImageResolution,
        reference_images: &[String],
    ) -> GenerationResult<String> {
        let mut parts = vec![Part::inline(InlineData::from_data_url(original_image))];
        parts.extend(reference_parts(reference_images));
        parts.push(Part::text(prompts::edit_prompt(instruction)));
        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: None,
            generation_config: Some(GenerationConfig::image(resolution.as_str())),
        };

        let response = self
            .send_with_retry("edit_image", &self.image_model, request)
            .await?;
        first_image(&response, GenerationError::NoEdit)
    }
}
