use std::sync::Arc;

use crate::models::audio_models::{AudioDevice, MediaConstraints, StreamFormat};
use crate::models::error::CaptureError;

/// Callback invoked when a track has audio available.
///
/// `samples` are interleaved f32 frames in the owning stream's
/// [`StreamFormat`]. The callback fires on the backend's audio thread, so
/// keep processing minimal.
pub type SampleCallback = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

/// Callback invoked when the platform reports a device topology change.
pub type DeviceChangeCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// One hardware track inside a [`LiveStream`].
///
/// Implemented by backends (e.g. `CpalMicTrack`) and by in-memory tracks in
/// tests.
pub trait MediaTrack: Send {
    fn label(&self) -> &str;

    /// Begin delivering samples to `sink`.
    fn connect(&mut self, sink: SampleCallback) -> Result<(), CaptureError>;

    /// Stop the track and release the device. Must be idempotent.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}

/// Microphone capability of the host platform.
pub trait MediaDevices: Send + Sync {
    /// Open a live stream honoring `constraints`.
    ///
    /// Fails with `PermissionDenied`, `DeviceNotFound` or `DeviceBusy` when
    /// the platform reports those faults, `CaptureUnavailable` otherwise.
    fn get_user_media(&self, constraints: &MediaConstraints) -> Result<LiveStream, CaptureError>;

    /// All media devices currently known to the platform.
    fn enumerate_devices(&self) -> Result<Vec<AudioDevice>, CaptureError>;

    /// Register `callback` for device hot-plug events. Dropping the returned
    /// subscription unregisters it.
    fn on_device_change(&self, callback: DeviceChangeCallback) -> Result<Subscription, CaptureError>;
}

/// Single-owner handle over the tracks of an open microphone stream.
///
/// Not `Clone`: whoever holds the handle is the only party able to touch
/// the hardware. Every track is stopped on [`LiveStream::release`] or on
/// drop, whichever comes first.
pub struct LiveStream {
    format: StreamFormat,
    tracks: Vec<Box<dyn MediaTrack>>,
    released: bool,
}

impl LiveStream {
    pub fn new(format: StreamFormat, tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self {
            format,
            tracks,
            released: false,
        }
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn labels(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.label().to_string()).collect()
    }

    /// Whether any track is still delivering audio.
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| t.is_live())
    }

    /// Route every track's samples into `sink`.
    pub fn connect(&mut self, sink: SampleCallback) -> Result<(), CaptureError> {
        if self.released {
            return Err(CaptureError::InvalidState("stream already released".into()));
        }
        for track in &mut self.tracks {
            track.connect(Arc::clone(&sink))?;
        }
        Ok(())
    }

    /// Stop every track and give up the handle.
    pub fn release(mut self) {
        self.stop_tracks();
    }

    fn stop_tracks(&mut self) {
        if self.released {
            return;
        }
        for track in &mut self.tracks {
            track.stop();
        }
        self.released = true;
        log::debug!("Released live stream ({} track(s))", self.tracks.len());
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

impl std::fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStream")
            .field("format", &self.format)
            .field("tracks", &self.labels())
            .field("released", &self.released)
            .finish()
    }
}

/// Registration handle returned by [`MediaDevices::on_device_change`].
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to undo.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
