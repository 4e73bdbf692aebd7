use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use shared::{
    domain::{ImageResolution, Language, StoryboardData},
    error::GenerationError,
};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::{
    i18n,
    media::{self, ExportError, ExportSummary},
    prompts::DEFAULT_CONTINUATION,
    session::{RequestKind, StoryboardSession},
    GenerationBackend, SessionError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    ScriptFailed,
    ContinueFailed,
    EnhancementFailed,
    EditFailed,
    NothingToExport,
    ExportFailed,
}

/// Localized, user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn localized(kind: NoticeKind, language: Language) -> Self {
        let messages = i18n::messages(language);
        let message = match kind {
            NoticeKind::ScriptFailed | NoticeKind::ContinueFailed => messages.script_failed,
            NoticeKind::EnhancementFailed => messages.enhancement_failed,
            NoticeKind::EditFailed => messages.edit_failed,
            NoticeKind::NothingToExport => messages.no_images_to_download,
            NoticeKind::ExportFailed => messages.failed_to_export,
        };
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PromptEnhanced,
    StoryboardCleared,
    StoryboardReplaced { scenes: usize },
    ScenesAppended { count: usize },
    SceneDeleted { index: usize },
    ImageUpdated { index: usize },
    BatchFinished(BatchReport),
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    Generated { scenes: usize },
    /// The user stopped the request; its response was discarded.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneImageOutcome {
    Ready,
    Failed,
    /// The scene was deleted, superseded, or the storyboard replaced while
    /// its request was in flight.
    Discarded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub generated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Drives a [`StoryboardSession`] against a [`GenerationBackend`].
///
/// The session lock is released before every backend call, so edits made by
/// the user while a request is pending land immediately.
pub struct StoryboardController {
    backend: Arc<dyn GenerationBackend>,
    inner: Mutex<StoryboardSession>,
    script_cancelled: AtomicBool,
    images_cancelled: AtomicBool,
    batch_running: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

struct BatchSlot<'a>(&'a AtomicBool);

impl Drop for BatchSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl StoryboardController {
    pub fn new(backend: Arc<dyn GenerationBackend>, session: StoryboardSession) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            backend,
            inner: Mutex::new(session),
            script_cancelled: AtomicBool::new(false),
            images_cancelled: AtomicBool::new(false),
            batch_running: AtomicBool::new(false),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn session(&self) -> MutexGuard<'_, StoryboardSession> {
        self.inner.lock().await
    }

    /// Runs a synchronous mutation against the session.
    pub async fn with_session<R>(&self, f: impl FnOnce(&mut StoryboardSession) -> R) -> R {
        let mut session = self.inner.lock().await;
        f(&mut session)
    }

    pub async fn snapshot(&self) -> StoryboardSession {
        self.inner.lock().await.clone()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn notify(&self, kind: NoticeKind, language: Language) {
        self.emit(SessionEvent::Notice(Notice::localized(kind, language)));
    }

    pub async fn enhance_prompt(&self) -> Result<String, SessionError> {
        let (prompt, language) = {
            let mut session = self.inner.lock().await;
            if session.prompt().trim().is_empty() {
                return Err(GenerationError::EmptyInput.into());
            }
            session.activity.enhancing_prompt = true;
            (session.prompt().to_string(), session.language())
        };

        let result = self.backend.enhance_prompt(&prompt, language).await;

        let mut session = self.inner.lock().await;
        session.activity.enhancing_prompt = false;
        match result {
            Ok(enhanced) => {
                session.set_prompt(enhanced.clone());
                self.emit(SessionEvent::PromptEnhanced);
                Ok(enhanced)
            }
            Err(err) => {
                warn!(error = %err, "session: prompt enhancement failed");
                self.notify(NoticeKind::EnhancementFailed, language);
                Err(err.into())
            }
        }
    }

    /// Replaces the storyboard with a freshly generated one.
    ///
    /// The previous storyboard and all image results are dropped up front.
    /// When [`cancel_script`](Self::cancel_script) is called before the
    /// response arrives, the response is discarded without any notice.
    pub async fn generate_script(&self) -> Result<ScriptOutcome, SessionError> {
        let (prompt, references, language) = {
            let mut session = self.inner.lock().await;
            if session.prompt().trim().is_empty() {
                return Err(GenerationError::EmptyInput.into());
            }
            self.script_cancelled.store(false, Ordering::SeqCst);
            session.begin_new_script();
            session.activity.generating_script = true;
            (
                session.prompt().to_string(),
                session.reference_images().to_vec(),
                session.language(),
            )
        };
        self.emit(SessionEvent::StoryboardCleared);

        let result = self
            .backend
            .generate_script(&prompt, &references, language)
            .await;

        let mut session = self.inner.lock().await;
        session.activity.generating_script = false;
        if self.script_cancelled.load(Ordering::SeqCst) {
            info!("session: script response discarded after cancel");
            return Ok(ScriptOutcome::Cancelled);
        }
        match result {
            Ok(storyboard) => {
                let scenes = storyboard.scenes.len();
                session.replace_storyboard(storyboard);
                self.emit(SessionEvent::StoryboardReplaced { scenes });
                Ok(ScriptOutcome::Generated { scenes })
            }
            Err(err) => {
                warn!(error = %err, "session: script generation failed");
                self.notify(NoticeKind::ScriptFailed, language);
                Err(err.into())
            }
        }
    }

    pub fn cancel_script(&self) {
        self.script_cancelled.store(true, Ordering::SeqCst);
    }

    /// Appends newly generated scenes after the current last one.
    ///
    /// Returns `Ok(None)` when the storyboard was cleared while the request
    /// was pending; the new scenes are dropped in that case.
    pub async fn continue_script(&self) -> Result<Option<usize>, SessionError> {
        let (storyboard, text, references, language) = {
            let mut session = self.inner.lock().await;
            let storyboard = session
                .storyboard()
                .cloned()
                .ok_or(SessionError::NoStoryboard)?;
            session.activity.continuing_script = true;
            let text = match session.continuation_text().trim() {
                "" => DEFAULT_CONTINUATION.to_string(),
                other => other.to_string(),
            };
            (
                storyboard,
                text,
                session.reference_images().to_vec(),
                session.language(),
            )
        };

        let result = self
            .backend
            .continue_script(&storyboard, &text, &references, language)
            .await;

        let mut session = self.inner.lock().await;
        session.activity.continuing_script = false;
        match result {
            Ok(scenes) => {
                let count = scenes.len();
                if !session.append_scenes(scenes) {
                    info!("session: continuation dropped, storyboard was cleared");
                    return Ok(None);
                }
                session.set_continuation_text("");
                self.emit(SessionEvent::ScenesAppended { count });
                Ok(Some(count))
            }
            Err(err) => {
                warn!(error = %err, "session: script continuation failed");
                self.notify(NoticeKind::ContinueFailed, language);
                Err(err.into())
            }
        }
    }

    pub async fn delete_scene(&self, index: usize) -> bool {
        let deleted = self.inner.lock().await.delete_scene(index);
        if deleted {
            self.emit(SessionEvent::SceneDeleted { index });
        }
        deleted
    }

    /// Renders one scene. Also serves manual retry and regenerate.
    pub async fn generate_image_for_scene(
        &self,
        index: usize,
    ) -> Result<SceneImageOutcome, SessionError> {
        let (ticket, (scene_number, visual_prompt, style_guide, resolution, references)) = {
            let mut session = self.inner.lock().await;
            let request = image_request(&session, index)?;
            session.mark_image_loading(index, request.0);
            (session.issue_ticket(index, RequestKind::Image), request)
        };
        self.emit(SessionEvent::ImageUpdated { index });

        let result = self
            .backend
            .generate_image(&style_guide, &visual_prompt, resolution, &references)
            .await;

        let mut session = self.inner.lock().await;
        let Some(slot) = session.redeem_ticket(ticket) else {
            info!(index, scene_number, "session: scene image discarded, its slot is gone");
            return Ok(SceneImageOutcome::Discarded);
        };
        let outcome = match result {
            Ok(image_url) => {
                session.mark_image_ready(slot, scene_number, image_url);
                SceneImageOutcome::Ready
            }
            Err(err) => {
                warn!(index = slot, scene_number, error = %err, "session: scene image failed");
                session.mark_image_failed(slot, scene_number);
                SceneImageOutcome::Failed
            }
        };
        drop(session);
        self.emit(SessionEvent::ImageUpdated { index: slot });
        Ok(outcome)
    }

    /// Renders every scene without a complete image, one request at a time.
    pub async fn generate_all_images(&self) -> Result<BatchReport, SessionError> {
        if self.batch_running.swap(true, Ordering::SeqCst) {
            return Err(SessionError::BatchInProgress);
        }
        let _slot = BatchSlot(&self.batch_running);
        self.images_cancelled.store(false, Ordering::SeqCst);

        let total = {
            let mut session = self.inner.lock().await;
            if session.storyboard().is_none() {
                return Err(SessionError::NoStoryboard);
            }
            session.activity.generating_images = true;
            session.scene_count()
        };
        info!(total, "session: image batch started");

        let mut report = BatchReport::default();
        for index in 0..total {
            if self.images_cancelled.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            {
                let session = self.inner.lock().await;
                if index >= session.scene_count() {
                    break;
                }
                if session.image(index).is_some_and(|i| i.is_complete()) {
                    report.skipped += 1;
                    continue;
                }
            }
            match self.generate_image_for_scene(index).await {
                Ok(SceneImageOutcome::Ready) => report.generated += 1,
                Ok(SceneImageOutcome::Failed) => report.failed += 1,
                Ok(SceneImageOutcome::Discarded) => {}
                // The scene list shrank under us.
                Err(_) => break,
            }
        }

        self.inner.lock().await.activity.generating_images = false;
        info!(
            generated = report.generated,
            failed = report.failed,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "session: image batch finished"
        );
        self.emit(SessionEvent::BatchFinished(report));
        Ok(report)
    }

    /// Stops the batch before its next scene; the in-flight image completes.
    pub fn cancel_images(&self) {
        self.images_cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_batch_running(&self) -> bool {
        self.batch_running.load(Ordering::SeqCst)
    }

    /// Sends the armed scene's image and instruction for a scoped edit.
    ///
    /// The edited image lands on whichever slot the scene occupies when the
    /// response arrives; it is discarded if the scene is gone by then.
    pub async fn submit_edit(&self) -> Result<SceneImageOutcome, SessionError> {
        let (ticket, request, original, resolution, references, language) = {
            let mut session = self.inner.lock().await;
            let request = session
                .selector()
                .edit_request()
                .ok_or(SessionError::NoEditRequest)?;
            let original = session
                .image(request.scene_index)
                .filter(|i| i.is_complete())
                .map(|i| i.image_url.clone())
                .ok_or(SessionError::NoImageForScene(request.scene_index))?;
            session.activity.editing_image = true;
            (
                session.issue_ticket(request.scene_index, RequestKind::Edit),
                request,
                original,
                session.resolution(),
                session.reference_images().to_vec(),
                session.language(),
            )
        };

        let result = self
            .backend
            .edit_image(&original, &request.instruction, resolution, &references)
            .await;

        let mut session = self.inner.lock().await;
        session.activity.editing_image = false;
        let slot = session.redeem_ticket(ticket);
        match result {
            Ok(image_url) => {
                let Some(slot) = slot else {
                    info!(index = request.scene_index, "session: edit discarded, its scene is gone");
                    return Ok(SceneImageOutcome::Discarded);
                };
                session.replace_image_payload(slot, image_url);
                session.selector_mut().finish();
                drop(session);
                self.emit(SessionEvent::ImageUpdated { index: slot });
                Ok(SceneImageOutcome::Ready)
            }
            Err(err) => {
                warn!(index = request.scene_index, error = %err, "session: image edit failed");
                self.notify(NoticeKind::EditFailed, language);
                Err(err.into())
            }
        }
    }

    /// Writes every complete scene image under `parent`.
    pub async fn export_all(&self, parent: &Path) -> Result<ExportSummary, SessionError> {
        let (storyboard, images, language) = {
            let mut session = self.inner.lock().await;
            let storyboard = session
                .storyboard()
                .cloned()
                .ok_or(SessionError::NoStoryboard)?;
            session.activity.exporting = true;
            (storyboard, session.images().clone(), session.language())
        };

        let result = media::export_storyboard(parent, &storyboard, &images);

        self.inner.lock().await.activity.exporting = false;
        result.map_err(|err| {
            let kind = match err {
                ExportError::NothingToExport => NoticeKind::NothingToExport,
                _ => NoticeKind::ExportFailed,
            };
            warn!(error = %err, "session: export failed");
            self.notify(kind, language);
            err.into()
        })
    }

    pub async fn export_scene(&self, index: usize, dir: &Path) -> Result<PathBuf, SessionError> {
        let session = self.inner.lock().await;
        let storyboard = session.storyboard().ok_or(SessionError::NoStoryboard)?;
        let scene = storyboard
            .scenes
            .get(index)
            .ok_or(SessionError::SceneOutOfRange {
                index,
                len: storyboard.scenes.len(),
            })?;
        let image = session
            .image(index)
            .filter(|i| i.is_complete())
            .ok_or(SessionError::NoImageForScene(index))?;
        Ok(media::export_scene_image(
            dir,
            scene.scene_number,
            &scene.title,
            &image.image_url,
        )?)
    }
}

type ImageRequest = (i64, String, String, ImageResolution, Vec<String>);

fn image_request(session: &StoryboardSession, index: usize) -> Result<ImageRequest, SessionError> {
    let storyboard: &StoryboardData = session.storyboard().ok_or(SessionError::NoStoryboard)?;
    let scene = storyboard
        .scenes
        .get(index)
        .ok_or(SessionError::SceneOutOfRange {
            index,
            len: storyboard.scenes.len(),
        })?;
    Ok((
        scene.scene_number,
        scene.visual_prompt.clone(),
        storyboard.art_style.clone(),
        session.resolution(),
        session.reference_images().to_vec(),
    ))
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
