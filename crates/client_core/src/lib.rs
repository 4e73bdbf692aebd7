use async_trait::async_trait;
use shared::{
    domain::{ImageResolution, Language, Scene, StoryboardData},
    error::GenerationError,
};
use thiserror::Error;

pub mod config;
pub mod controller;
pub mod credentials;
pub mod gemini;
pub mod i18n;
pub mod media;
mod prompts;
pub mod retry;
pub mod selection;
pub mod session;

pub use controller::{
    BatchReport, Notice, NoticeKind, SceneImageOutcome, ScriptOutcome, SessionEvent,
    StoryboardController,
};
pub use gemini::GeminiClient;
pub use media::ExportError;
pub use session::StoryboardSession;

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Remote generative capability consumed by the session controller.
///
/// Reference images and image payloads are inline `data:` URLs. Implementations
/// own their retry behaviour; callers see only the final outcome.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn enhance_prompt(&self, text: &str, language: Language) -> GenerationResult<String>;

    async fn generate_script(
        &self,
        prompt: &str,
        reference_images: &[String],
        language: Language,
    ) -> GenerationResult<StoryboardData>;

    async fn continue_script(
        &self,
        storyboard: &StoryboardData,
        continuation_text: &str,
        reference_images: &[String],
        language: Language,
    ) -> GenerationResult<Vec<Scene>>;

    async fn generate_image(
        &self,
        style_guide: &str,
        visual_prompt: &str,
        resolution: ImageResolution,
        reference_images: &[String],
    ) -> GenerationResult<String>;

    async fn edit_image(
        &self,
        original_image: &str,
        instruction: &str,
        resolution: ImageResolution,
        reference_images: &[String],
    ) -> GenerationResult<String>;
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("no storyboard in the session")]
    NoStoryboard,
    #[error("scene index {index} out of range ({len} scenes)")]
    SceneOutOfRange { index: usize, len: usize },
    #[error("scene {0} has no image to edit")]
    NoImageForScene(usize),
    #[error("an image batch is already running")]
    BatchInProgress,
    #[error("no selection with an edit instruction is ready")]
    NoEditRequest,
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
