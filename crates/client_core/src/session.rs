use std::{cmp::Ordering, collections::HashMap};

use shared::domain::{
    GeneratedImage, ImageResolution, Language, Scene, SceneField, StoryboardData,
};
use tracing::debug;

use crate::selection::EditRegionSelector;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFlags {
    pub generating_script: bool,
    pub enhancing_prompt: bool,
    pub generating_images: bool,
    pub continuing_script: bool,
    pub editing_image: bool,
    pub exporting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Image,
    Edit,
}

/// Identity of one in-flight image or edit request. The slot it targets is
/// tracked by the session and follows scene deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestTicket {
    kind: RequestKind,
    id: u64,
}

/// In-memory state of one storyboard session.
///
/// Image results are keyed by scene *index*; scene numbers come from the
/// generator and may repeat.
#[derive(Debug, Clone, Default)]
pub struct StoryboardSession {
    prompt: String,
    storyboard: Option<StoryboardData>,
    images: HashMap<usize, GeneratedImage>,
    reference_images: Vec<String>,
    continuation_text: String,
    resolution: ImageResolution,
    language: Language,
    pub(crate) activity: ActivityFlags,
    selector: EditRegionSelector,
    pending_images: HashMap<usize, u64>,
    pending_edits: HashMap<usize, u64>,
    next_ticket: u64,
}

impl StoryboardSession {
    pub fn new(language: Language, resolution: ImageResolution) -> Self {
        Self {
            language,
            resolution,
            ..Self::default()
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
    }

    pub fn storyboard(&self) -> Option<&StoryboardData> {
        self.storyboard.as_ref()
    }

    pub fn scene_count(&self) -> usize {
        self.storyboard.as_ref().map_or(0, |s| s.scenes.len())
    }

    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.storyboard.as_ref()?.scenes.get(index)
    }

    pub fn images(&self) -> &HashMap<usize, GeneratedImage> {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&GeneratedImage> {
        self.images.get(&index)
    }

    pub fn has_any_images(&self) -> bool {
        self.images.values().any(GeneratedImage::is_complete)
    }

    pub fn reference_images(&self) -> &[String] {
        &self.reference_images
    }

    pub fn continuation_text(&self) -> &str {
        &self.continuation_text
    }

    pub fn set_continuation_text(&mut self, text: impl Into<String>) {
        self.continuation_text = text.into();
    }

    pub fn resolution(&self) -> ImageResolution {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: ImageResolution) {
        self.resolution = resolution;
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn toggle_language(&mut self) -> Language {
        self.language = self.language.toggled();
        self.language
    }

    pub fn activity(&self) -> ActivityFlags {
        self.activity
    }

    pub fn selector(&self) -> &EditRegionSelector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut EditRegionSelector {
        &mut self.selector
    }

    /// Drops the storyboard and every image result ahead of a new script.
    /// Reference images survive; they are reusable across stories.
    pub fn begin_new_script(&mut self) {
        self.storyboard = None;
        self.images.clear();
        self.forget_requests();
        self.selector.reset();
    }

    pub fn replace_storyboard(&mut self, storyboard: StoryboardData) {
        debug!(scenes = storyboard.scenes.len(), "session: storyboard replaced");
        self.storyboard = Some(storyboard);
        self.images.clear();
        self.forget_requests();
        self.selector.reset();
    }

    /// Appends continuation scenes. Returns `false` when the storyboard was
    /// cleared while the continuation was pending.
    pub fn append_scenes(&mut self, scenes: Vec<Scene>) -> bool {
        let Some(storyboard) = self.storyboard.as_mut() else {
            return false;
        };
        storyboard.scenes.extend(scenes);
        true
    }

    pub fn set_art_style(&mut self, art_style: impl Into<String>) -> bool {
        let Some(storyboard) = self.storyboard.as_mut() else {
            return false;
        };
        storyboard.art_style = art_style.into();
        true
    }

    pub fn update_scene_field(
        &mut self,
        index: usize,
        field: SceneField,
        value: impl Into<String>,
    ) -> bool {
        let Some(scene) = self
            .storyboard
            .as_mut()
            .and_then(|s| s.scenes.get_mut(index))
        else {
            return false;
        };
        scene.set_field(field, value);
        true
    }

    /// Removes the scene at `index` and shifts every later image result down
    /// one slot so keys stay aligned with scene positions.
    pub fn delete_scene(&mut self, index: usize) -> bool {
        let Some(storyboard) = self.storyboard.as_mut() else {
            return false;
        };
        if index >= storyboard.scenes.len() {
            return false;
        }
        storyboard.scenes.remove(index);

        self.images = shift_down(std::mem::take(&mut self.images), index);
        self.pending_images = shift_down(std::mem::take(&mut self.pending_images), index);
        self.pending_edits = shift_down(std::mem::take(&mut self.pending_edits), index);
        self.selector.on_scene_removed(index);
        debug!(index, remaining = storyboard.scenes.len(), "session: scene deleted");
        true
    }

    /// Adds `payload` unless an identical reference is already present.
    pub fn add_reference_image(&mut self, payload: impl Into<String>) -> bool {
        let payload = payload.into();
        if self.reference_images.contains(&payload) {
            return false;
        }
        self.reference_images.push(payload);
        true
    }

    pub fn remove_reference_image(&mut self, index: usize) -> Option<String> {
        (index < self.reference_images.len()).then(|| self.reference_images.remove(index))
    }

    pub fn promote_generated_image(&mut self, image_url: &str) -> bool {
        if image_url.is_empty() {
            return false;
        }
        self.add_reference_image(image_url)
    }

    pub fn mark_image_loading(&mut self, index: usize, scene_number: i64) {
        self.images
            .insert(index, GeneratedImage::loading(scene_number));
    }

    pub fn mark_image_ready(&mut self, index: usize, scene_number: i64, image_url: String) {
        self.images
            .insert(index, GeneratedImage::ready(scene_number, image_url));
    }

    pub fn mark_image_failed(&mut self, index: usize, scene_number: i64) {
        self.images.insert(index, GeneratedImage::failed(scene_number));
    }

    /// Swaps in an edited payload for the scene, keeping its scene number.
    pub fn replace_image_payload(&mut self, index: usize, image_url: String) {
        let scene_number = self
            .images
            .get(&index)
            .map(|i| i.scene_number)
            .or_else(|| self.scene(index).map(|s| s.scene_number))
            .unwrap_or_default();
        self.mark_image_ready(index, scene_number, image_url);
    }

    /// Registers a request against the scene at `index`. A newer request of
    /// the same kind for the same slot supersedes it.
    pub(crate) fn issue_ticket(&mut self, index: usize, kind: RequestKind) -> RequestTicket {
        self.next_ticket += 1;
        let id = self.next_ticket;
        self.pending_mut(kind).insert(index, id);
        RequestTicket { kind, id }
    }

    /// Current slot of the request, removing it from the pending set.
    /// `None` when its scene was deleted, the storyboard was replaced, or a
    /// newer request took over the slot.
    pub(crate) fn redeem_ticket(&mut self, ticket: RequestTicket) -> Option<usize> {
        let pending = self.pending_mut(ticket.kind);
        let slot = pending
            .iter()
            .find_map(|(slot, id)| (*id == ticket.id).then_some(*slot))?;
        pending.remove(&slot);
        Some(slot)
    }

    fn pending_mut(&mut self, kind: RequestKind) -> &mut HashMap<usize, u64> {
        match kind {
            RequestKind::Image => &mut self.pending_images,
            RequestKind::Edit => &mut self.pending_edits,
        }
    }

    fn forget_requests(&mut self) {
        self.pending_images.clear();
        self.pending_edits.clear();
    }
}

/// Drops the entry at `removed` and moves every later key down one slot.
fn shift_down<V>(map: HashMap<usize, V>, removed: usize) -> HashMap<usize, V> {
    map.into_iter()
        .filter_map(|(key, value)| match key.cmp(&removed) {
            Ordering::Less => Some((key, value)),
            Ordering::Equal => None,
            Ordering::Greater => Some((key - 1, value)),
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
