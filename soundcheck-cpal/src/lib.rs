//! # soundcheck-cpal
//!
//! Native microphone backend for soundcheck, built on cpal.
//!
//! Provides:
//! - `CpalMediaDevices`: `MediaDevices` over the default cpal host
//! - `CpalMicTrack`: microphone track on a dedicated stream thread
//! - `DeviceWatcher`: polling hot-plug detection
//!
//! The cpal-backed pieces are behind the `cpal` feature; the watcher and
//! error mapping build everywhere.
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use soundcheck_core::{Recorder, RecorderConfiguration, WavEncoder};
//! use soundcheck_cpal::CpalMediaDevices;
//!
//! let media = Arc::new(CpalMediaDevices::new());
//! let recorder = Recorder::new(media, WavEncoder::new(), RecorderConfiguration::default())?;
//! recorder.start(None)?;
//! ```

pub mod device_watcher;
pub mod error_map;

#[cfg(feature = "cpal")]
pub mod cpal_mic;
#[cfg(feature = "cpal")]
pub mod device_enumerator;
#[cfg(feature = "cpal")]
pub mod media_devices;

pub use device_watcher::{DeviceLister, DeviceWatcher, DEFAULT_POLL_INTERVAL};

#[cfg(feature = "cpal")]
pub use cpal_mic::CpalMicTrack;
#[cfg(feature = "cpal")]
pub use media_devices::CpalMediaDevices;
