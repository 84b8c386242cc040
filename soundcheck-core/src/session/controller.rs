use std::sync::Arc;

use chrono::Local;

use crate::models::error::{CaptureError, StoreError, TakeError};
use crate::models::state::RecorderState;
use crate::session::recorder::Recorder;
use crate::storage::store::{validate_title, RecordingStore};
use crate::traits::confirm::{ConfirmPrompt, ConfirmRequest, ConfirmTone};
use crate::traits::encoder::ChunkEncoder;
use crate::traits::media_devices::MediaDevices;

/// Drives a [`Recorder`] from the user's side: confirms destructive
/// actions and persists finished takes into a [`RecordingStore`].
pub struct TakeController<M: MediaDevices, E: ChunkEncoder + 'static> {
    recorder: Recorder<M, E>,
    store: Arc<RecordingStore>,
    prompt: Arc<dyn ConfirmPrompt>,
}

impl<M: MediaDevices, E: ChunkEncoder + 'static> TakeController<M, E> {
    pub fn new(recorder: Recorder<M, E>, store: Arc<RecordingStore>, prompt: Arc<dyn ConfirmPrompt>) -> Self {
        Self {
            recorder,
            store,
            prompt,
        }
    }

    pub fn recorder(&self) -> &Recorder<M, E> {
        &self.recorder
    }

    pub fn store(&self) -> &RecordingStore {
        &self.store
    }

    /// Title offered in the save dialog.
    pub fn suggested_title(&self) -> String {
        format!("Recording {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }

    /// Persist the finished take under `title` and reset the recorder.
    ///
    /// On failure the take is kept so the save can be retried.
    pub fn save(&self, title: &str) -> Result<i64, TakeError> {
        if self.recorder.state() != RecorderState::Stopped {
            return Err(CaptureError::InvalidState("no finished recording to save".into()).into());
        }
        let take = self
            .recorder
            .take()
            .ok_or_else(|| CaptureError::InvalidState("no finished recording to save".into()))?;
        if take.payload.is_empty() {
            return Err(StoreError::Validation("recording is empty".into()).into());
        }
        validate_title(title, self.store.config().max_title_len)?;

        let id = self.store.create(&take.payload, title, take.duration_secs)?;
        self.recorder.reset();
        Ok(id)
    }

    /// Throw away a finished, unsaved take after confirmation. Returns
    /// whether it was discarded.
    pub fn discard(&self) -> bool {
        if self.recorder.state() != RecorderState::Stopped {
            return false;
        }
        let request = ConfirmRequest {
            title: "Discard Recording".into(),
            message: "Are you sure you want to discard this recording?".into(),
            confirm_text: "Discard".into(),
            cancel_text: "Keep".into(),
            tone: ConfirmTone::Neutral,
        };
        if !self.prompt.confirm(&request) {
            log::debug!("Discard declined");
            return false;
        }
        self.recorder.reset()
    }

    /// Abort the in-progress session after confirmation. Returns whether it
    /// was cancelled.
    pub fn cancel(&self) -> bool {
        if !self.recorder.state().is_active() {
            return false;
        }
        let request = ConfirmRequest {
            title: "Cancel Recording".into(),
            message: "Are you sure you want to cancel this recording?".into(),
            confirm_text: "Yes, Cancel".into(),
            cancel_text: "Keep Recording".into(),
            tone: ConfirmTone::Neutral,
        };
        if !self.prompt.confirm(&request) {
            log::debug!("Cancel declined");
            return false;
        }
        self.recorder.cancel()
    }

    /// Delete a saved recording after confirmation. Returns whether the
    /// user agreed.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let request = ConfirmRequest::danger(
            "Delete Recording",
            "Are you sure you want to delete this recording? This action cannot be undone.",
            "Yes, Delete",
        );
        if !self.prompt.confirm(&request) {
            return Ok(false);
        }
        self.store.delete(id)?;
        Ok(true)
    }

    pub fn rename(&self, id: i64, new_title: &str) -> Result<(), StoreError> {
        self.store.rename(id, new_title)
    }
}
