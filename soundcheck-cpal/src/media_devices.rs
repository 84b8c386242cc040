use std::sync::Arc;
use std::time::Duration;

use soundcheck_core::models::audio_models::{AudioDevice, MediaConstraints};
use soundcheck_core::models::error::CaptureError;
use soundcheck_core::traits::media_devices::{DeviceChangeCallback, LiveStream, MediaDevices, Subscription};

use crate::cpal_mic::CpalMicTrack;
use crate::device_enumerator::{input_device_ids, list_input_devices};
use crate::device_watcher::{DeviceLister, DeviceWatcher, DEFAULT_POLL_INTERVAL};

/// [`MediaDevices`] over the default cpal host.
///
/// Desktop hosts grant microphone access at the OS level, so opening a
/// stream doubles as the permission request. Echo cancellation, noise
/// suppression and gain control are not available through cpal and are
/// ignored.
pub struct CpalMediaDevices {
    watcher: DeviceWatcher,
}

impl CpalMediaDevices {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(interval: Duration) -> Self {
        let lister: DeviceLister = Arc::new(input_device_ids);
        Self {
            watcher: DeviceWatcher::new(lister, interval),
        }
    }
}

impl Default for CpalMediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDevices for CpalMediaDevices {
    fn get_user_media(&self, constraints: &MediaConstraints) -> Result<LiveStream, CaptureError> {
        if constraints.echo_cancellation || constraints.noise_suppression || constraints.auto_gain_control {
            log::debug!("Audio processing constraints are not supported by cpal; capturing raw input");
        }
        let (track, format) = CpalMicTrack::open(constraints.device_id.clone())?;
        Ok(LiveStream::new(format, vec![Box::new(track)]))
    }

    fn enumerate_devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        list_input_devices(&cpal::default_host())
    }

    fn on_device_change(&self, callback: DeviceChangeCallback) -> Result<Subscription, CaptureError> {
        self.watcher.subscribe(callback)
    }
}
