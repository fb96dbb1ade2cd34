//! Per-user workspace session.
//!
//! A [`Workspace`] holds what one user currently sees (the selected image,
//! its enhanced version, generated variations) and runs at most one
//! mutating operation at a time. The session is a two-state machine,
//! `Idle` and `Busy(kind)`; an operation may only start from `Idle`. A
//! second trigger while busy is rejected with [`AetheriaError::Busy`] and an
//! "Operation Rejected" notification, never queued.
//!
//! Failures never disturb the view. The error is returned to the caller and
//! a notification carrying a prefixed description ("Failed to enhance
//! image: ...") is queued for display.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::{info, warn};

use crate::dispatch::TransformOp;
use crate::encoding::EncodedImage;
use crate::error::{AetheriaError, Result};
use crate::history::GalleryEntry;
use crate::pipeline::ImagePipeline;
use crate::records::{EnhancementRecord, ImageRecord, VariationRecord};

/// Mutating operations a workspace can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Upload,
    Enhance,
    GenerateVariations,
    Desaturate,
    SelectFromGallery,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upload => "upload",
            Self::Enhance => "enhance",
            Self::GenerateVariations => "generate variations",
            Self::Desaturate => "desaturate",
            Self::SelectFromGallery => "select from gallery",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    #[default]
    Idle,
    Busy(OperationKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    fn info(title: &str, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.to_string(),
            description: description.into(),
        }
    }

    fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.to_string(),
            description: description.into(),
        }
    }
}

/// What the user currently sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub selected: Option<ImageRecord>,
    pub original: Option<EncodedImage>,
    pub enhanced: Option<EncodedImage>,
    pub variations: Vec<EncodedImage>,
    /// Black-and-white rendition of the original.
    pub transformed: Option<EncodedImage>,
}

impl ViewState {
    fn select(&mut self, record: ImageRecord, original: EncodedImage, transformed: Option<EncodedImage>) {
        *self = Self {
            selected: Some(record),
            original: Some(original),
            transformed,
            ..Self::default()
        };
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Returns the session to `Idle` when dropped.
struct BusyGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = SessionState::Idle;
    }
}

pub struct Workspace {
    owner: String,
    pipeline: ImagePipeline,
    state: Mutex<SessionState>,
    view: Mutex<ViewState>,
    notifications: Mutex<Vec<Notification>>,
}

impl Workspace {
    pub fn new(owner: impl Into<String>, pipeline: ImagePipeline) -> Self {
        Self {
            owner: owner.into(),
            pipeline,
            state: Mutex::new(SessionState::Idle),
            view: Mutex::new(ViewState::default()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state(), SessionState::Busy(_))
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> ViewState {
        lock(&self.view).clone()
    }

    /// Drain queued notifications.
    pub fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut *lock(&self.notifications))
    }

    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }

    /// Transition `Idle -> Busy(kind)`.
    fn begin(&self, kind: OperationKind) -> Result<BusyGuard<'_>> {
        let mut state = lock(&self.state);
        match *state {
            SessionState::Idle => {
                *state = SessionState::Busy(kind);
                Ok(BusyGuard { state: &self.state })
            }
            SessionState::Busy(current) => {
                drop(state);
                warn!(requested = %kind, current = %current, "Operation rejected while busy");
                self.notify(Notification::error(
                    "Operation Rejected",
                    format!("Cannot {kind} while {current} is in progress."),
                ));
                Err(AetheriaError::Busy(current.to_string()))
            }
        }
    }

    /// Record a failure notification and hand the error back.
    fn fail<T>(&self, title: &str, prefix: &str, error: AetheriaError) -> Result<T> {
        warn!(error = %error, "{prefix}");
        self.notify(Notification::error(title, format!("{prefix}: {error}")));
        Err(error)
    }

    fn current_source(&self) -> Result<(ImageRecord, EncodedImage)> {
        let view = lock(&self.view);
        match (&view.selected, &view.original) {
            (Some(record), Some(original)) => Ok((record.clone(), original.clone())),
            _ => Err(AetheriaError::Validation("No image data provided.".into())),
        }
    }

    /// Upload a new image and make it the current selection.
    pub async fn upload(
        &self,
        file_name: &str,
        image: EncodedImage,
        desaturate: bool,
    ) -> Result<ImageRecord> {
        let _busy = self.begin(OperationKind::Upload)?;

        match self
            .pipeline
            .upload_with_output(&self.owner, file_name, image.clone(), desaturate)
            .await
        {
            Ok(upload) => {
                lock(&self.view).select(upload.record.clone(), image, upload.transformed);
                self.notify(Notification::info(
                    "Upload Complete",
                    format!("{} has been saved to your history.", upload.record.original_file_name),
                ));
                info!(id = %upload.record.id, "Workspace upload complete");
                Ok(upload.record)
            }
            Err(e) => self.fail("Upload Failed", "Failed to upload image", e),
        }
    }

    /// Enhance the selected image.
    pub async fn enhance(&self) -> Result<EnhancementRecord> {
        let _busy = self.begin(OperationKind::Enhance)?;

        let outcome = match self.current_source() {
            Ok((record, source)) => self.pipeline.enhance_with_output(&record, &source).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(enhancement) => {
                lock(&self.view).enhanced = Some(enhancement.image);
                self.notify(Notification::info(
                    "Enhancement Complete",
                    "Your image has been successfully enhanced.",
                ));
                Ok(enhancement.record)
            }
            Err(e) => self.fail("Enhancement Failed", "Failed to enhance image", e),
        }
    }

    /// Generate stylistic variations of the selected image.
    ///
    /// Variations the model could not produce are skipped; an empty result
    /// is still a success.
    pub async fn generate_variations(&self, prompt: &str) -> Result<Vec<VariationRecord>> {
        let _busy = self.begin(OperationKind::GenerateVariations)?;

        let outcome = match self.current_source() {
            Ok((record, source)) => {
                self.pipeline
                    .stylize_with_output(&record, &source, prompt)
                    .await
            }
            Err(e) => Err(e),
        };
        let outputs = match outcome {
            Ok(outputs) => outputs,
            Err(e) => return self.fail("Generation Failed", "Failed to generate variations", e),
        };

        let (variations, images): (Vec<_>, Vec<_>) = outputs
            .into_iter()
            .map(|variation| (variation.record, variation.image))
            .unzip();
        lock(&self.view).variations = images;

        if variations.is_empty() {
            self.notify(Notification::info(
                "Variations Generated",
                "No variations could be generated. Try a different prompt.",
            ));
        } else {
            self.notify(Notification::info(
                "Variations Generated",
                "Stylistic variations have been created.",
            ));
        }
        Ok(variations)
    }

    /// Render a black-and-white version of the selected image locally.
    pub async fn desaturate_preview(&self) -> Result<EncodedImage> {
        let _busy = self.begin(OperationKind::Desaturate)?;

        let outcome = match self.current_source() {
            Ok((_, source)) => {
                self.pipeline
                    .preview(TransformOp::Desaturate, source, &self.owner)
                    .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(image) => {
                lock(&self.view).transformed = Some(image.clone());
                Ok(image)
            }
            Err(e) => self.fail("Transform Failed", "Failed to desaturate image", e),
        }
    }

    /// Re-select a previously uploaded image from history.
    pub async fn select_from_gallery(&self, record_id: &str) -> Result<ImageRecord> {
        let _busy = self.begin(OperationKind::SelectFromGallery)?;

        let outcome = async {
            let record = self
                .pipeline
                .history()
                .get(&self.owner, record_id)
                .await?
                .ok_or_else(|| {
                    AetheriaError::Validation(format!("image '{record_id}' not found"))
                })?;
            let original = self.pipeline.load_source(&record).await?;
            let transformed = match &record.transformed_storage_path {
                Some(path) => Some(self.pipeline.store().load(path).await?),
                None => None,
            };
            Ok::<_, AetheriaError>((record, original, transformed))
        }
        .await;

        match outcome {
            Ok((record, original, transformed)) => {
                lock(&self.view).select(record.clone(), original, transformed);
                Ok(record)
            }
            Err(e) => self.fail("Selection Failed", "Failed to load image", e),
        }
    }

    /// This user's upload history, newest first.
    pub async fn history(&self) -> Result<Vec<ImageRecord>> {
        self.pipeline.history().list(&self.owner).await
    }

    /// This user's uploads with everything derived from them.
    pub async fn gallery(&self) -> Result<Vec<GalleryEntry>> {
        self.pipeline.history().gallery(&self.owner).await
    }
}
