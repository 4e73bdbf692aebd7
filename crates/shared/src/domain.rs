use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub const FAILED_TO_GENERATE: &str = "Failed to generate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub scene_number: i64,
    pub title: String,
    pub narrative_script: String,
    pub visual_prompt: String,
    pub camera_shot: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneField {
    Title,
    NarrativeScript,
    VisualPrompt,
    CameraShot,
}

impl Scene {
    pub fn set_field(&mut self, field: SceneField, value: impl Into<String>) {
        let slot = match field {
            SceneField::Title => &mut self.title,
            SceneField::NarrativeScript => &mut self.narrative_script,
            SceneField::VisualPrompt => &mut self.visual_prompt,
            SceneField::CameraShot => &mut self.camera_shot,
        };
        *slot = value.into();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardData {
    pub title: String,
    pub art_style: String,
    pub scenes: Vec<Scene>,
}

impl StoryboardData {
    /// Number of the last scene in array order, or 0 for an empty storyboard.
    pub fn last_scene_number(&self) -> i64 {
        self.scenes.last().map(|s| s.scene_number).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub scene_number: i64,
    pub image_url: String,
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GeneratedImage {
    pub fn loading(scene_number: i64) -> Self {
        Self {
            scene_number,
            image_url: String::new(),
            is_loading: true,
            error: None,
        }
    }

    pub fn ready(scene_number: i64, image_url: impl Into<String>) -> Self {
        Self {
            scene_number,
            image_url: image_url.into(),
            is_loading: false,
            error: None,
        }
    }

    pub fn failed(scene_number: i64) -> Self {
        Self {
            scene_number,
            image_url: String::new(),
            is_loading: false,
            error: Some(FAILED_TO_GENERATE.to_string()),
        }
    }

    /// True when the scene holds a usable image: a payload and no error.
    pub fn is_complete(&self) -> bool {
        !self.image_url.is_empty() && self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageResolution {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1K" => Ok(Self::OneK),
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            other => Err(format!("unknown resolution tier '{other}' (expected 1K, 2K or 4K)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    /// Language name used inside model instructions.
    pub fn instruction_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Zh => "Chinese (Simplified)",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::En => Self::Zh,
            Self::Zh => Self::En,
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.starts_with("zh") {
            Ok(Self::Zh)
        } else if lower.starts_with("en") {
            Ok(Self::En)
        } else {
            Err(format!("unsupported language '{s}' (expected en or zh)"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionBox {
    pub start_x: f64,
    pub start_y: f64,
    pub width: f64,
    pub height: f64,
}
