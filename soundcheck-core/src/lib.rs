//! # soundcheck-core
//!
//! Platform-agnostic core of the soundcheck audio note-taking tool.
//!
//! Provides the recorder state machine, microphone discovery, WAV encoding,
//! and a local SQLite store for saved recordings. Platform backends (e.g.
//! `soundcheck-cpal`) implement the `MediaDevices` trait and plug into the
//! generic `Recorder` and `DeviceProbe`.
//!
//! ## Architecture
//!
//! ```text
//! soundcheck-core (this crate)
//! ├── traits/       ← MediaDevices, ChunkEncoder, RecorderDelegate, ConfirmPrompt
//! ├── models/       ← CaptureError, StoreError, RecorderState, configurations, Recording
//! ├── processing/   ← WavEncoder, WAV header generation
//! ├── probe/        ← DeviceProbe (permission, enumeration, selection, hot-plug)
//! ├── session/      ← Recorder (state machine), TakeController
//! └── storage/      ← RecordingStore, export
//! ```

pub mod models;
pub mod probe;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioDevice, DeviceKind, MediaConstraints, StreamFormat};
pub use models::config::{RecorderConfiguration, StoreConfiguration};
pub use models::error::{CaptureError, StoreError, TakeError};
pub use models::recording::{Payload, Recording, RecordingMetadata, Take};
pub use models::state::RecorderState;
pub use probe::device_probe::{DeviceListener, DeviceProbe};
pub use processing::wav_encoder::WavEncoder;
pub use session::controller::TakeController;
pub use session::recorder::Recorder;
pub use storage::store::{shared_store, RecordingStore};
pub use traits::confirm::{AlwaysConfirm, ConfirmPrompt, ConfirmRequest, ConfirmTone};
pub use traits::encoder::{ChunkCallback, ChunkEncoder};
pub use traits::media_devices::{
    DeviceChangeCallback, LiveStream, MediaDevices, MediaTrack, SampleCallback, Subscription,
};
pub use traits::recorder_delegate::RecorderDelegate;
