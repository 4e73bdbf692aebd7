//! Reference image import and storyboard image export.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use shared::{
    domain::{GeneratedImage, StoryboardData},
    protocol::InlineData,
};
use thiserror::Error;
use tracing::info;

const SAFE_TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no images to export")]
    NothingToExport,
    #[error("image for scene {scene_number} is not valid base64: {source}")]
    Decode {
        scene_number: i64,
        #[source]
        source: base64::DecodeError,
    },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Reads an image file into an inline `data:` reference.
pub fn import_reference_file(path: &Path) -> Result<String> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        bail!("{} is not an image file ({mime})", path.display());
    }
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    let reference = InlineData::from_bytes(mime.essence_str(), &bytes).to_data_url();
    info!(
        path = %path.display(),
        mime = mime.essence_str(),
        bytes = bytes.len(),
        "media: reference image imported"
    );
    Ok(reference)
}

fn replace_non_alphanumeric(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Lowercased title with non-alphanumerics replaced, at most 30 characters.
pub fn safe_title(title: &str) -> String {
    replace_non_alphanumeric(title)
        .to_ascii_lowercase()
        .chars()
        .take(SAFE_TITLE_MAX_CHARS)
        .collect()
}

pub fn scene_image_filename(scene_number: i64, title: &str) -> String {
    format!("scene_{scene_number}_{}.png", safe_title(title))
}

pub fn export_dir_name(storyboard_title: &str) -> String {
    format!("{}_storyboard", replace_non_alphanumeric(storyboard_title))
}

/// Writes one scene image into `dir` and returns its path.
pub fn export_scene_image(
    dir: &Path,
    scene_number: i64,
    title: &str,
    image_url: &str,
) -> Result<PathBuf, ExportError> {
    let bytes = InlineData::from_data_url(image_url)
        .decode()
        .map_err(|source| ExportError::Decode {
            scene_number,
            source,
        })?;
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(scene_image_filename(scene_number, title));
    fs::write(&path, bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Exports every scene whose image is complete into
/// `{parent}/{title}_storyboard/`.
pub fn export_storyboard(
    parent: &Path,
    storyboard: &StoryboardData,
    images: &HashMap<usize, GeneratedImage>,
) -> Result<ExportSummary, ExportError> {
    let exportable: Vec<_> = storyboard
        .scenes
        .iter()
        .enumerate()
        .filter_map(|(index, scene)| {
            images
                .get(&index)
                .filter(|image| image.is_complete())
                .map(|image| (scene, image))
        })
        .collect();
    if exportable.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let directory = parent.join(export_dir_name(&storyboard.title));
    let mut files = Vec::with_capacity(exportable.len());
    for (scene, image) in exportable {
        files.push(export_scene_image(
            &directory,
            scene.scene_number,
            &scene.title,
            &image.image_url,
        )?);
    }
    info!(
        directory = %directory.display(),
        files = files.len(),
        "media: storyboard exported"
    );
    Ok(ExportSummary { directory, files })
}

#[cfg(test)]
#[path = "tests/media_tests.rs"]
mod tests;
