//! Polling hot-plug detection.
//!
//! cpal has no device-change notification, so a background thread lists
//! input devices periodically and notifies subscribers when the set of ids
//! changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use soundcheck_core::models::error::CaptureError;
use soundcheck_core::traits::media_devices::{DeviceChangeCallback, Subscription};

/// Default period between device scans.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Returns the ids of the currently attached input devices.
pub type DeviceLister = Arc<dyn Fn() -> Result<Vec<String>, CaptureError> + Send + Sync + 'static>;

type Listeners = Arc<Mutex<Vec<(u64, DeviceChangeCallback)>>>;

/// Take a fresh snapshot into `last`. Returns `true` if it differs from the
/// previous one; the first snapshot only sets the baseline.
///
/// A failed scan keeps the previous baseline.
pub fn poll_devices(lister: &DeviceLister, last: &mut Option<Vec<String>>) -> bool {
    let mut ids = match lister() {
        Ok(ids) => ids,
        Err(e) => {
            log::debug!("Device scan failed: {}", e);
            return false;
        }
    };
    ids.sort();
    ids.dedup();

    let changed = last.as_ref().is_some_and(|previous| *previous != ids);
    *last = Some(ids);
    changed
}

fn notify(listeners: &Listeners) {
    let callbacks: Vec<DeviceChangeCallback> =
        listeners.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
    for callback in callbacks {
        callback();
    }
}

struct Poller {
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Fans device-change events out to subscribers.
///
/// The polling thread starts with the first subscription and runs until the
/// watcher is dropped.
pub struct DeviceWatcher {
    lister: DeviceLister,
    interval: Duration,
    listeners: Listeners,
    next_id: AtomicU64,
    poller: Mutex<Option<Poller>>,
}

impl DeviceWatcher {
    pub fn new(lister: DeviceLister, interval: Duration) -> Self {
        Self {
            lister,
            interval,
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            poller: Mutex::new(None),
        }
    }

    pub fn subscribe(&self, callback: DeviceChangeCallback) -> Result<Subscription, CaptureError> {
        self.ensure_polling()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, callback));
        let listeners = Arc::clone(&self.listeners);
        Ok(Subscription::new(move || {
            listeners.lock().retain(|(listener_id, _)| *listener_id != id);
        }))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.lock().is_some()
    }

    fn ensure_polling(&self) -> Result<(), CaptureError> {
        let mut poller = self.poller.lock();
        if poller.is_some() {
            return Ok(());
        }

        let mut last = None;
        poll_devices(&self.lister, &mut last);

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let lister = Arc::clone(&self.lister);
        let listeners = Arc::clone(&self.listeners);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("device-watcher".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                if poll_devices(&lister, &mut last) {
                    log::info!("Input device set changed");
                    notify(&listeners);
                }
            })
            .map_err(|e| CaptureError::CaptureUnavailable(format!("failed to spawn device watcher: {}", e)))?;

        *poller = Some(Poller { stop_tx, handle });
        log::debug!("Device watcher polling every {:?}", interval);
        Ok(())
    }
}

impl Drop for DeviceWatcher {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.lock().take() {
            drop(poller.stop_tx);
            if poller.handle.join().is_err() {
                log::error!("Device watcher thread panicked");
            }
        }
    }
}
