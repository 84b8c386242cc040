//! In-memory media backend used by unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, DeviceKind, MediaConstraints, StreamFormat};
use crate::models::error::CaptureError;
use crate::traits::media_devices::{
    DeviceChangeCallback, LiveStream, MediaDevices, MediaTrack, SampleCallback, Subscription,
};

#[derive(Default)]
struct TrackShared {
    stopped: AtomicBool,
    stop_calls: AtomicUsize,
    sink: Mutex<Option<SampleCallback>>,
}

/// Test-side view of a [`FakeTrack`].
#[derive(Clone)]
pub struct TrackProbe {
    shared: Arc<TrackShared>,
}

impl TrackProbe {
    pub fn stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.shared.stop_calls.load(Ordering::SeqCst)
    }

    /// Deliver samples as if the hardware produced them.
    pub fn push(&self, samples: &[f32]) {
        if self.stopped() {
            return;
        }
        let sink = self.shared.sink.lock().clone();
        if let Some(sink) = sink {
            sink(samples);
        }
    }
}

pub struct FakeTrack {
    label: String,
    initial: Vec<f32>,
    shared: Arc<TrackShared>,
}

impl FakeTrack {
    /// A track that delivers `initial` as soon as it is connected.
    pub fn new(label: &str, initial: Vec<f32>) -> (Self, TrackProbe) {
        let shared = Arc::new(TrackShared::default());
        let track = Self {
            label: label.to_string(),
            initial,
            shared: Arc::clone(&shared),
        };
        (track, TrackProbe { shared })
    }
}

impl MediaTrack for FakeTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn connect(&mut self, sink: SampleCallback) -> Result<(), CaptureError> {
        *self.shared.sink.lock() = Some(Arc::clone(&sink));
        if !self.initial.is_empty() {
            sink(self.initial.as_slice());
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.sink.lock().take();
    }

    fn is_live(&self) -> bool {
        !self.shared.stopped.load(Ordering::SeqCst)
    }
}

type Listeners = Arc<Mutex<Vec<(u64, DeviceChangeCallback)>>>;

/// Scriptable [`MediaDevices`] implementation.
pub struct FakeMediaDevices {
    devices: Mutex<Vec<AudioDevice>>,
    stream_failure: Mutex<Option<CaptureError>>,
    enumerate_failure: Mutex<Option<CaptureError>>,
    initial_samples: Vec<f32>,
    tracks: Mutex<Vec<TrackProbe>>,
    requests: Mutex<Vec<MediaConstraints>>,
    listeners: Listeners,
    next_listener_id: AtomicU64,
}

impl FakeMediaDevices {
    pub fn new(devices: Vec<AudioDevice>) -> Self {
        Self {
            devices: Mutex::new(devices),
            stream_failure: Mutex::new(None),
            enumerate_failure: Mutex::new(None),
            initial_samples: vec![0.25; 160],
            tracks: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn with_microphones(ids: &[&str]) -> Self {
        Self::new(ids.iter().map(|id| AudioDevice::input(*id, format!("Mic {}", id))).collect())
    }

    /// Fail every stream request with `error` until cleared.
    pub fn fail_streams_with(&self, error: Option<CaptureError>) {
        *self.stream_failure.lock() = error;
    }

    pub fn fail_enumeration_with(&self, error: Option<CaptureError>) {
        *self.enumerate_failure.lock() = error;
    }

    pub fn set_devices(&self, devices: Vec<AudioDevice>) {
        *self.devices.lock() = devices;
    }

    /// Invoke every registered device-change listener.
    pub fn fire_device_change(&self) {
        let listeners: Vec<DeviceChangeCallback> =
            self.listeners.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn tracks(&self) -> Vec<TrackProbe> {
        self.tracks.lock().clone()
    }

    pub fn last_track(&self) -> Option<TrackProbe> {
        self.tracks.lock().last().cloned()
    }

    pub fn requests(&self) -> Vec<MediaConstraints> {
        self.requests.lock().clone()
    }
}

impl MediaDevices for FakeMediaDevices {
    fn get_user_media(&self, constraints: &MediaConstraints) -> Result<LiveStream, CaptureError> {
        self.requests.lock().push(constraints.clone());
        if let Some(error) = self.stream_failure.lock().clone() {
            return Err(error);
        }

        let devices = self.devices.lock();
        let device = match constraints.device_id {
            Some(ref id) => devices.iter().find(|d| &d.id == id),
            None => devices.iter().find(|d| d.kind == DeviceKind::AudioInput),
        }
        .ok_or(CaptureError::DeviceNotFound)?;

        let (track, probe) = FakeTrack::new(&device.label, self.initial_samples.clone());
        self.tracks.lock().push(probe);

        let format = StreamFormat {
            sample_rate: 8000,
            channels: 1,
        };
        Ok(LiveStream::new(format, vec![Box::new(track)]))
    }

    fn enumerate_devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        if let Some(error) = self.enumerate_failure.lock().clone() {
            return Err(error);
        }
        Ok(self.devices.lock().clone())
    }

    fn on_device_change(&self, callback: DeviceChangeCallback) -> Result<Subscription, CaptureError> {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, callback));
        let listeners = Arc::clone(&self.listeners);
        Ok(Subscription::new(move || {
            listeners.lock().retain(|(listener_id, _)| *listener_id != id);
        }))
    }
}
