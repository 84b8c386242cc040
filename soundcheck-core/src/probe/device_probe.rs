use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, DeviceKind, MediaConstraints};
use crate::models::error::CaptureError;
use crate::traits::media_devices::{MediaDevices, Subscription};

/// Receives the refreshed input list after every successful enumeration.
pub type DeviceListener = Arc<dyn Fn(&[AudioDevice]) + Send + Sync + 'static>;

type Listeners = Arc<Mutex<Vec<(u64, DeviceListener)>>>;

#[derive(Default)]
struct ProbeState {
    devices: Vec<AudioDevice>,
    selected: Option<String>,
    error: Option<CaptureError>,
    loading: bool,
}

/// Keep an explicit selection while its device is present; otherwise fall
/// back to the first device (or nothing).
pub fn reconcile_selection(selected: Option<&str>, devices: &[AudioDevice]) -> Option<String> {
    match selected {
        Some(id) if devices.iter().any(|d| d.id == id) => Some(id.to_string()),
        _ => devices.first().map(|d| d.id.clone()),
    }
}

/// Only the faults a user can act on keep their identity.
fn classify(error: CaptureError) -> CaptureError {
    match error {
        CaptureError::PermissionDenied | CaptureError::DeviceNotFound | CaptureError::DeviceBusy => error,
        CaptureError::CaptureUnavailable(reason) | CaptureError::InvalidState(reason) => {
            CaptureError::CaptureUnavailable(reason)
        }
    }
}

/// Discovers microphones, tracks the current selection, and follows
/// hot-plug events.
pub struct DeviceProbe<M: MediaDevices + 'static> {
    media: Arc<M>,
    state: Mutex<ProbeState>,
    listeners: Listeners,
    next_listener_id: AtomicU64,
    watch: Mutex<Option<Subscription>>,
    refresh_lock: Mutex<()>,
}

impl<M: MediaDevices + 'static> DeviceProbe<M> {
    pub fn new(media: Arc<M>) -> Self {
        Self {
            media,
            state: Mutex::new(ProbeState::default()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
            watch: Mutex::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Request microphone access with a throwaway stream, then enumerate
    /// audio inputs.
    ///
    /// Blank labels are replaced with `Microphone <id prefix>`. The selection
    /// is reconciled against the new list and subscribers are notified.
    pub fn request_permission_and_list_inputs(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        let _refresh = self.refresh_lock.lock();
        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
        }

        let result = self.enumerate_inputs();

        let devices = {
            let mut state = self.state.lock();
            state.loading = false;
            match result {
                Ok(devices) => {
                    state.selected = reconcile_selection(state.selected.as_deref(), &devices);
                    state.devices = devices.clone();
                    devices
                }
                Err(e) => {
                    log::warn!("Device refresh failed: {}", e);
                    state.error = Some(e.clone());
                    return Err(e);
                }
            }
        };

        log::debug!("Found {} audio inputs", devices.len());
        let listeners: Vec<DeviceListener> =
            self.listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(&devices);
        }
        Ok(devices)
    }

    fn enumerate_inputs(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        self.media
            .get_user_media(&MediaConstraints::default())
            .map_err(classify)?
            .release();

        let devices = self.media.enumerate_devices().map_err(classify)?;
        Ok(devices
            .into_iter()
            .filter(|d| d.kind == DeviceKind::AudioInput)
            .map(|d| AudioDevice {
                label: d.display_label(),
                ..d
            })
            .collect())
    }

    /// Refresh whenever the platform reports a topology change, until
    /// [`DeviceProbe::unwatch`] or drop.
    pub fn watch(self: &Arc<Self>) -> Result<(), CaptureError> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let subscription = self.media.on_device_change(Arc::new(move || {
            if let Some(probe) = weak.upgrade() {
                log::info!("Audio devices changed, refreshing");
                // Failures are kept in `error()`.
                let _ = probe.request_permission_and_list_inputs();
            }
        }))?;
        *self.watch.lock() = Some(subscription);
        Ok(())
    }

    pub fn unwatch(&self) {
        self.watch.lock().take();
    }

    /// Register a listener for refreshed device lists. Dropping the
    /// returned subscription removes it.
    pub fn subscribe(&self, listener: DeviceListener) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, listener));
        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            listeners.lock().retain(|(listener_id, _)| *listener_id != id);
        })
    }

    /// Explicitly choose an input from the current list.
    pub fn select(&self, device_id: &str) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if !state.devices.iter().any(|d| d.id == device_id) {
            return Err(CaptureError::DeviceNotFound);
        }
        state.selected = Some(device_id.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<String> {
        self.state.lock().selected.clone()
    }

    pub fn devices(&self) -> Vec<AudioDevice> {
        self.state.lock().devices.clone()
    }

    pub fn error(&self) -> Option<CaptureError> {
        self.state.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }
}
