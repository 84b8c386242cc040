use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::config::RecorderConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording::{Payload, Take};
use crate::models::state::RecorderState;
use crate::traits::encoder::{ChunkCallback, ChunkEncoder};
use crate::traits::media_devices::{LiveStream, MediaDevices};
use crate::traits::recorder_delegate::RecorderDelegate;

type Fragments = Arc<Mutex<Vec<Vec<u8>>>>;

/// Notification queued while the state lock is held and delivered after it
/// is released.
#[derive(Debug, Clone)]
enum RecorderEvent {
    State(RecorderState),
    Elapsed(u32),
    Error(CaptureError),
    Finished(Take),
}

fn dispatch(delegate: &Option<Arc<dyn RecorderDelegate>>, events: Vec<RecorderEvent>) {
    let Some(delegate) = delegate else {
        return;
    };
    for event in events {
        match event {
            RecorderEvent::State(state) => delegate.on_state_changed(state),
            RecorderEvent::Elapsed(secs) => delegate.on_elapsed(secs),
            RecorderEvent::Error(ref error) => delegate.on_error(error),
            RecorderEvent::Finished(ref take) => delegate.on_take_finished(take),
        }
    }
}

/// Session state shared between the caller and the tick thread.
struct SessionState<E> {
    state: RecorderState,
    elapsed_secs: u32,
    encoder: E,
    stream: Option<LiveStream>,
    take: Option<Take>,
    error: Option<CaptureError>,
    /// Ticker allowed to advance `elapsed_secs`; `None` while not recording.
    active_ticker: Option<u64>,
}

impl<E: ChunkEncoder> SessionState<E> {
    fn new(encoder: E) -> Self {
        Self {
            state: RecorderState::Idle,
            elapsed_secs: 0,
            encoder,
            stream: None,
            take: None,
            error: None,
            active_ticker: None,
        }
    }

    /// Advance elapsed time by one tick. Returns the events to deliver and
    /// whether the ticker should exit.
    fn tick(&mut self, fragments: &Fragments, ticker_id: u64, ceiling: Option<u32>) -> (Vec<RecorderEvent>, bool) {
        if self.active_ticker != Some(ticker_id) || !self.state.is_recording() {
            return (Vec::new(), true);
        }

        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        let mut events = vec![RecorderEvent::Elapsed(self.elapsed_secs)];

        if ceiling.is_some_and(|max| self.elapsed_secs >= max) {
            log::info!("Recording reached {}s ceiling, stopping", self.elapsed_secs);
            events.extend(self.finish(fragments));
            return (events, true);
        }

        (events, false)
    }

    /// Finalize the session into a take: flush the encoder, assemble the
    /// payload, release the stream.
    fn finish(&mut self, fragments: &Fragments) -> Vec<RecorderEvent> {
        self.active_ticker = None;
        let flushed = self.encoder.stop();

        let mut bytes = std::mem::take(&mut *fragments.lock()).concat();
        self.encoder.seal(&mut bytes);
        self.release_stream();

        if let Err(e) = flushed {
            log::error!("Encoder failed to finalize: {}", e);
            self.elapsed_secs = 0;
            self.state = RecorderState::Idle;
            self.error = Some(e.clone());
            return vec![RecorderEvent::Error(e), RecorderEvent::State(RecorderState::Idle)];
        }

        let take = Take {
            payload: Payload::new(bytes, self.encoder.mime_type()),
            duration_secs: self.elapsed_secs,
        };
        log::info!(
            "Recording stopped: {}s, {} bytes",
            take.duration_secs,
            take.payload.size()
        );
        self.take = Some(take.clone());
        self.state = RecorderState::Stopped;
        vec![
            RecorderEvent::State(RecorderState::Stopped),
            RecorderEvent::Finished(take),
        ]
    }

    /// Abort the session and discard everything it produced.
    fn abort(&mut self, fragments: &Fragments) {
        self.active_ticker = None;
        if let Err(e) = self.encoder.stop() {
            log::warn!("Encoder failed while aborting: {}", e);
        }
        fragments.lock().clear();
        self.release_stream();
        self.take = None;
        self.elapsed_secs = 0;
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
    }
}

/// Periodic elapsed-time timer running on its own thread.
struct Ticker {
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl Ticker {
    /// Signal the thread and wait for it, unless called from the tick
    /// thread itself (a delegate reacting to a tick).
    fn stop(self) {
        drop(self.stop_tx);
        if self.handle.thread().id() == thread::current().id() {
            return;
        }
        if self.handle.join().is_err() {
            log::error!("Tick thread panicked");
        }
    }
}

/// The recording state machine.
///
/// Owns the live stream for the duration of a session, feeds it through a
/// [`ChunkEncoder`], accumulates the encoded fragments, and enforces the
/// duration ceiling with a one-second tick.
///
/// ```text
/// [MediaDevices] → LiveStream → [ChunkEncoder] → fragments → Take
///                                      ↑
///                        tick thread (elapsed, auto-stop)
/// ```
///
/// All operations take `&self`; they are serialized internally so calls
/// issued one after another observe transitions in that order.
pub struct Recorder<M: MediaDevices, E: ChunkEncoder + 'static> {
    media: Arc<M>,
    config: RecorderConfiguration,
    session: Arc<Mutex<SessionState<E>>>,
    fragments: Fragments,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    op_lock: Mutex<()>,
    ticker: Mutex<Option<Ticker>>,
    next_ticker_id: AtomicU64,
}

impl<M: MediaDevices, E: ChunkEncoder + 'static> Recorder<M, E> {
    pub fn new(media: Arc<M>, encoder: E, config: RecorderConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::CaptureUnavailable)?;
        Ok(Self {
            media,
            config,
            session: Arc::new(Mutex::new(SessionState::new(encoder))),
            fragments: Arc::new(Mutex::new(Vec::new())),
            delegate: None,
            op_lock: Mutex::new(()),
            ticker: Mutex::new(None),
            next_ticker_id: AtomicU64::new(1),
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &RecorderConfiguration {
        &self.config
    }

    pub fn state(&self) -> RecorderState {
        self.session.lock().state
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.session.lock().elapsed_secs
    }

    /// The finalized take, available while `Stopped`.
    pub fn take(&self) -> Option<Take> {
        self.session.lock().take.clone()
    }

    /// Last reported failure, cleared by `start` and `reset`.
    pub fn error(&self) -> Option<CaptureError> {
        self.session.lock().error.clone()
    }

    pub fn has_open_stream(&self) -> bool {
        self.session.lock().stream.is_some()
    }

    /// Open a stream (optionally pinned to `device_id`) and begin
    /// recording. Transitions: idle → recording.
    ///
    /// On failure the recorder stays idle and the error is kept in
    /// [`Recorder::error`].
    pub fn start(&self, device_id: Option<&str>) -> Result<(), CaptureError> {
        let _op = self.op_lock.lock();

        {
            let mut s = self.session.lock();
            if !s.state.is_idle() {
                return Err(CaptureError::InvalidState(format!(
                    "cannot start while {:?}",
                    s.state
                )));
            }
            s.error = None;
        }

        let constraints = self
            .config
            .constraints
            .clone()
            .with_device(device_id.map(str::to_string));

        let mut stream = match self.media.get_user_media(&constraints) {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail_start(e)),
        };

        self.fragments.lock().clear();
        let fragments = Arc::clone(&self.fragments);
        let sink: ChunkCallback = Arc::new(move |fragment: Vec<u8>| {
            if !fragment.is_empty() {
                fragments.lock().push(fragment);
            }
        });

        let ticker_id = self.next_ticker_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut s = self.session.lock();
            if let Err(e) = s.encoder.start(&mut stream, sink) {
                drop(s);
                stream.release();
                return Err(self.fail_start(e));
            }
            s.stream = Some(stream);
            s.elapsed_secs = 0;
            s.take = None;
            s.active_ticker = Some(ticker_id);
            s.state = RecorderState::Recording;
        }

        if let Err(e) = self.spawn_ticker(ticker_id) {
            self.session.lock().abort(&self.fragments);
            self.session.lock().state = RecorderState::Idle;
            return Err(self.fail_start(e));
        }

        log::info!(
            "Recording started (device: {})",
            device_id.unwrap_or("default")
        );
        dispatch(&self.delegate, vec![RecorderEvent::State(RecorderState::Recording)]);
        Ok(())
    }

    /// Suspend encoding and freeze elapsed time. Transitions:
    /// recording → paused. Returns `false` (no-op) in any other state.
    pub fn pause(&self) -> bool {
        let ticker = {
            let _op = self.op_lock.lock();
            let mut s = self.session.lock();
            if !s.state.is_recording() {
                log::debug!("Ignoring pause while {:?}", s.state);
                return false;
            }
            s.encoder.pause();
            s.active_ticker = None;
            s.state = RecorderState::Paused;
            self.ticker.lock().take()
        };
        if let Some(ticker) = ticker {
            ticker.stop();
        }

        log::info!("Recording paused at {}s", self.elapsed_secs());
        dispatch(&self.delegate, vec![RecorderEvent::State(RecorderState::Paused)]);
        true
    }

    /// Resume encoding and restart the tick. Transitions:
    /// paused → recording. Returns `Ok(false)` (no-op) in any other state.
    pub fn resume(&self) -> Result<bool, CaptureError> {
        let _op = self.op_lock.lock();
        let ticker_id = self.next_ticker_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut s = self.session.lock();
            if !s.state.is_paused() {
                log::debug!("Ignoring resume while {:?}", s.state);
                return Ok(false);
            }
            s.encoder.resume();
            s.active_ticker = Some(ticker_id);
            s.state = RecorderState::Recording;
        }

        if let Err(e) = self.spawn_ticker(ticker_id) {
            let mut s = self.session.lock();
            s.encoder.pause();
            s.active_ticker = None;
            s.state = RecorderState::Paused;
            s.error = Some(e.clone());
            drop(s);
            dispatch(&self.delegate, vec![RecorderEvent::Error(e.clone())]);
            return Err(e);
        }

        log::info!("Recording resumed");
        dispatch(&self.delegate, vec![RecorderEvent::State(RecorderState::Recording)]);
        Ok(true)
    }

    /// Finalize the session into a take and release the stream.
    /// Transitions: recording/paused → stopped. Returns `Ok(None)` (no-op)
    /// when no session is active.
    pub fn stop(&self) -> Result<Option<Take>, CaptureError> {
        let (events, ticker) = {
            let _op = self.op_lock.lock();
            let mut s = self.session.lock();
            if !s.state.is_active() {
                log::debug!("Ignoring stop while {:?}", s.state);
                return Ok(None);
            }
            let events = s.finish(&self.fragments);
            (events, self.ticker.lock().take())
        };
        if let Some(ticker) = ticker {
            ticker.stop();
        }

        let take = events.iter().find_map(|event| match event {
            RecorderEvent::Finished(take) => Some(take.clone()),
            _ => None,
        });
        let error = events.iter().find_map(|event| match event {
            RecorderEvent::Error(e) => Some(e.clone()),
            _ => None,
        });
        dispatch(&self.delegate, events);

        match error {
            Some(e) => Err(e),
            None => Ok(take),
        }
    }

    /// Abort the session, discarding everything recorded. Passes through
    /// `Cancelled` and settles in `Idle`. Returns `false` (no-op) when no
    /// session is active.
    pub fn cancel(&self) -> bool {
        let ticker = {
            let _op = self.op_lock.lock();
            let mut s = self.session.lock();
            if !s.state.is_active() {
                log::debug!("Ignoring cancel while {:?}", s.state);
                return false;
            }
            s.abort(&self.fragments);
            s.state = RecorderState::Idle;
            self.ticker.lock().take()
        };
        if let Some(ticker) = ticker {
            ticker.stop();
        }

        log::info!("Recording cancelled");
        dispatch(
            &self.delegate,
            vec![
                RecorderEvent::State(RecorderState::Cancelled),
                RecorderEvent::State(RecorderState::Idle),
            ],
        );
        true
    }

    /// Discard the finalized take and any error. Transitions:
    /// stopped/cancelled/idle → idle. Returns `false` (no-op) while a
    /// session is active.
    pub fn reset(&self) -> bool {
        let (changed, ticker) = {
            let _op = self.op_lock.lock();
            let mut s = self.session.lock();
            if !s.state.can_reset() {
                log::debug!("Ignoring reset while {:?}", s.state);
                return false;
            }
            let changed = s.state != RecorderState::Idle;
            s.take = None;
            s.error = None;
            s.elapsed_secs = 0;
            s.state = RecorderState::Idle;
            (changed, self.ticker.lock().take())
        };
        // Left behind by an auto-stop; already finished.
        if let Some(ticker) = ticker {
            ticker.stop();
        }

        if changed {
            dispatch(&self.delegate, vec![RecorderEvent::State(RecorderState::Idle)]);
        }
        true
    }

    fn fail_start(&self, error: CaptureError) -> CaptureError {
        log::warn!("Failed to start recording: {}", error);
        self.session.lock().error = Some(error.clone());
        dispatch(&self.delegate, vec![RecorderEvent::Error(error.clone())]);
        error
    }

    fn spawn_ticker(&self, ticker_id: u64) -> Result<(), CaptureError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let session = Arc::clone(&self.session);
        let fragments = Arc::clone(&self.fragments);
        let delegate = self.delegate.clone();
        let interval = self.config.tick_interval;
        let ceiling = self.config.max_duration_secs;

        let handle = thread::Builder::new()
            .name("recorder-tick".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                let (events, done) = session.lock().tick(&fragments, ticker_id, ceiling);
                dispatch(&delegate, events);
                if done {
                    break;
                }
            })
            .map_err(|e| CaptureError::CaptureUnavailable(format!("failed to spawn tick thread: {}", e)))?;

        let previous = self.ticker.lock().replace(Ticker { stop_tx, handle });
        if let Some(previous) = previous {
            previous.stop();
        }
        Ok(())
    }
}

impl<M: MediaDevices, E: ChunkEncoder + 'static> Drop for Recorder<M, E> {
    fn drop(&mut self) {
        {
            let mut s = self.session.lock();
            if s.state.is_active() {
                log::info!("Recorder dropped mid-session; discarding");
                s.abort(&self.fragments);
                s.state = RecorderState::Idle;
            }
            s.release_stream();
        }
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::wav_encoder::WavEncoder;
    use crate::processing::wav_format::WAV_HEADER_SIZE;
    use crate::testing::FakeMediaDevices;
    use std::time::{Duration, Instant};

    type TestRecorder = Recorder<FakeMediaDevices, WavEncoder>;

    /// A recorder whose tick thread never fires on its own; tests drive
    /// ticks by hand.
    fn manual_recorder(media: Arc<FakeMediaDevices>, ceiling: Option<u32>) -> TestRecorder {
        let config = RecorderConfiguration {
            max_duration_secs: ceiling,
            tick_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        Recorder::new(media, WavEncoder::new(), config).unwrap()
    }

    fn tick(recorder: &TestRecorder, times: u32) {
        for _ in 0..times {
            let mut s = recorder.session.lock();
            let Some(id) = s.active_ticker else {
                // Not recording: a tick from any ticker is a no-op.
                let (events, done) = s.tick(&recorder.fragments, u64::MAX, recorder.config.max_duration_secs);
                assert!(events.is_empty());
                assert!(done);
                continue;
            };
            let _ = s.tick(&recorder.fragments, id, recorder.config.max_duration_secs);
        }
    }

    fn wait_for(recorder: &TestRecorder, state: RecorderState) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if recorder.state() == state {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[derive(Default)]
    struct RecordingDelegate {
        states: Mutex<Vec<RecorderState>>,
        errors: Mutex<Vec<CaptureError>>,
        finished: Mutex<Vec<u32>>,
    }

    impl RecorderDelegate for RecordingDelegate {
        fn on_state_changed(&self, state: RecorderState) {
            self.states.lock().push(state);
        }
        fn on_elapsed(&self, _elapsed_secs: u32) {}
        fn on_error(&self, error: &CaptureError) {
            self.errors.lock().push(error.clone());
        }
        fn on_take_finished(&self, take: &Take) {
            self.finished.lock().push(take.duration_secs);
        }
    }

    #[test]
    fn start_then_stop_yields_take() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(Arc::clone(&media), Some(60));

        recorder.start(None).unwrap();
        assert_eq!(recorder.state(), RecorderState::Recording);
        assert!(recorder.has_open_stream());

        let take = recorder.stop().unwrap().expect("take");
        assert_eq!(recorder.state(), RecorderState::Stopped);
        assert_eq!(take.duration_secs, 0);
        assert!(take.payload.size() > WAV_HEADER_SIZE as u64);
        assert_eq!(take.payload.mime_type(), "audio/wav");
        assert_eq!(recorder.take(), Some(take));
        assert!(!recorder.has_open_stream());
        assert!(media.last_track().unwrap().stopped());
    }

    #[test]
    fn stop_reports_elapsed_ticks() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(media, Some(60));

        recorder.start(None).unwrap();
        tick(&recorder, 7);
        assert_eq!(recorder.elapsed_secs(), 7);

        let take = recorder.stop().unwrap().unwrap();
        assert_eq!(take.duration_secs, 7);
    }

    #[test]
    fn start_pins_requested_device() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1", "usb-2"]));
        let recorder = manual_recorder(Arc::clone(&media), None);

        recorder.start(Some("usb-2")).unwrap();

        let request = media.requests().pop().unwrap();
        assert_eq!(request.device_id.as_deref(), Some("usb-2"));
        assert!(request.noise_suppression);
    }

    #[test]
    fn start_rejected_while_session_open() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(Arc::clone(&media), None);

        recorder.start(None).unwrap();
        let second = recorder.start(None);

        assert!(matches!(second, Err(CaptureError::InvalidState(_))));
        assert_eq!(media.tracks().len(), 1);
        assert_eq!(recorder.state(), RecorderState::Recording);
    }

    #[test]
    fn acquisition_failure_leaves_recorder_idle_and_usable() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let delegate = Arc::new(RecordingDelegate::default());
        let mut recorder = manual_recorder(Arc::clone(&media), None);
        recorder.set_delegate(delegate.clone());

        media.fail_streams_with(Some(CaptureError::PermissionDenied));
        assert_eq!(recorder.start(None), Err(CaptureError::PermissionDenied));
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.error(), Some(CaptureError::PermissionDenied));
        assert_eq!(delegate.errors.lock().len(), 1);

        media.fail_streams_with(None);
        recorder.start(None).unwrap();
        assert_eq!(recorder.state(), RecorderState::Recording);
        assert_eq!(recorder.error(), None);
    }

    #[test]
    fn unknown_device_reports_not_found() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(media, None);

        assert_eq!(recorder.start(Some("gone")), Err(CaptureError::DeviceNotFound));
        assert!(recorder.state().is_idle());
    }

    #[test]
    fn pause_and_resume_are_noops_in_wrong_state() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(media, None);

        assert!(!recorder.pause());
        assert_eq!(recorder.resume(), Ok(false));
        assert_eq!(recorder.state(), RecorderState::Idle);

        recorder.start(None).unwrap();
        assert_eq!(recorder.resume(), Ok(false));
        assert_eq!(recorder.state(), RecorderState::Recording);

        assert!(recorder.pause());
        assert!(!recorder.pause());
        assert_eq!(recorder.state(), RecorderState::Paused);
    }

    #[test]
    fn elapsed_frozen_while_paused() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(media, Some(60));

        recorder.start(None).unwrap();
        tick(&recorder, 3);
        assert!(recorder.pause());
        tick(&recorder, 10);
        assert_eq!(recorder.elapsed_secs(), 3);

        assert_eq!(recorder.resume(), Ok(true));
        tick(&recorder, 2);
        assert_eq!(recorder.elapsed_secs(), 5);
    }

    #[test]
    fn stale_ticker_cannot_advance_time() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(media, None);

        recorder.start(None).unwrap();
        let old_id = recorder.session.lock().active_ticker.unwrap();
        recorder.pause();
        recorder.resume().unwrap();

        let (events, done) = recorder.session.lock().tick(&recorder.fragments, old_id, None);
        assert!(events.is_empty());
        assert!(done);
        assert_eq!(recorder.elapsed_secs(), 0);
    }

    #[test]
    fn ceiling_auto_stops_at_limit() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(Arc::clone(&media), Some(60));

        recorder.start(None).unwrap();
        tick(&recorder, 65);

        assert_eq!(recorder.state(), RecorderState::Stopped);
        assert_eq!(recorder.elapsed_secs(), 60);
        assert_eq!(recorder.take().unwrap().duration_secs, 60);
        assert!(media.last_track().unwrap().stopped());
    }

    #[test]
    fn tick_thread_auto_stops_without_caller() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let delegate = Arc::new(RecordingDelegate::default());
        let config = RecorderConfiguration {
            max_duration_secs: Some(5),
            tick_interval: Duration::from_millis(2),
            ..Default::default()
        };
        let mut recorder = Recorder::new(Arc::clone(&media), WavEncoder::new(), config).unwrap();
        recorder.set_delegate(delegate.clone());

        recorder.start(None).unwrap();
        assert!(wait_for(&recorder, RecorderState::Stopped));
        assert_eq!(recorder.take().unwrap().duration_secs, 5);
        assert!(media.last_track().unwrap().stopped());

        let deadline = Instant::now() + Duration::from_secs(5);
        while delegate.finished.lock().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*delegate.finished.lock(), vec![5]);
        let states = delegate.states.lock().clone();
        assert!(states.contains(&RecorderState::Recording));
        assert_eq!(states.last(), Some(&RecorderState::Stopped));

        // The finished ticker is reaped by reset.
        assert!(recorder.reset());
        assert!(recorder.ticker.lock().is_none());
    }

    #[test]
    fn elapsed_never_decreases_while_recording() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let config = RecorderConfiguration {
            max_duration_secs: None,
            tick_interval: Duration::from_millis(1),
            ..Default::default()
        };
        let recorder = Recorder::new(media, WavEncoder::new(), config).unwrap();

        recorder.start(None).unwrap();
        let mut last = 0;
        for _ in 0..50 {
            let now = recorder.elapsed_secs();
            assert!(now >= last);
            last = now;
            thread::sleep(Duration::from_millis(1));
        }
        recorder.stop().unwrap();
    }

    #[test]
    fn cancel_from_recording_discards_everything() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let delegate = Arc::new(RecordingDelegate::default());
        let mut recorder = manual_recorder(Arc::clone(&media), None);
        recorder.set_delegate(delegate.clone());

        recorder.start(None).unwrap();
        tick(&recorder, 4);
        assert!(recorder.cancel());

        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.elapsed_secs(), 0);
        assert!(recorder.take().is_none());
        assert!(!recorder.has_open_stream());
        assert!(media.last_track().unwrap().stopped());
        assert!(recorder.fragments.lock().is_empty());
        assert_eq!(
            *delegate.states.lock(),
            vec![RecorderState::Recording, RecorderState::Cancelled, RecorderState::Idle]
        );
    }

    #[test]
    fn cancel_from_paused_discards_everything() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(Arc::clone(&media), None);

        recorder.start(None).unwrap();
        tick(&recorder, 2);
        recorder.pause();
        assert!(recorder.cancel());

        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.elapsed_secs(), 0);
        assert!(recorder.take().is_none());
        assert!(media.last_track().unwrap().stopped());
    }

    #[test]
    fn cancel_and_stop_are_noops_when_idle() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(media, None);

        assert!(!recorder.cancel());
        assert_eq!(recorder.stop(), Ok(None));
        assert!(recorder.state().is_idle());
    }

    #[test]
    fn reset_clears_take_and_error() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(Arc::clone(&media), None);

        recorder.start(None).unwrap();
        tick(&recorder, 2);
        recorder.stop().unwrap();
        assert!(recorder.reset());

        assert_eq!(recorder.state(), RecorderState::Idle);
        assert!(recorder.take().is_none());
        assert_eq!(recorder.elapsed_secs(), 0);

        media.fail_streams_with(Some(CaptureError::DeviceBusy));
        let _ = recorder.start(None);
        assert!(recorder.error().is_some());
        assert!(recorder.reset());
        assert!(recorder.error().is_none());
    }

    #[test]
    fn reset_refused_mid_session() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(media, None);

        recorder.start(None).unwrap();
        assert!(!recorder.reset());
        assert_eq!(recorder.state(), RecorderState::Recording);
    }

    #[test]
    fn stop_from_paused_releases_stream() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(Arc::clone(&media), None);

        recorder.start(None).unwrap();
        tick(&recorder, 1);
        recorder.pause();
        let take = recorder.stop().unwrap().unwrap();

        assert_eq!(take.duration_secs, 1);
        assert_eq!(recorder.state(), RecorderState::Stopped);
        assert!(media.last_track().unwrap().stopped());
    }

    #[test]
    fn drop_releases_stream_in_any_state() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(Arc::clone(&media), None);

        recorder.start(None).unwrap();
        recorder.pause();
        drop(recorder);

        let track = media.last_track().unwrap();
        assert!(track.stopped());
        assert_eq!(track.stop_calls(), 1);
    }

    #[test]
    fn audio_while_paused_is_not_recorded() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let recorder = manual_recorder(Arc::clone(&media), None);

        recorder.start(None).unwrap();
        let track = media.last_track().unwrap();
        recorder.pause();
        track.push(&[0.5; 1000]);
        recorder.resume().unwrap();
        let take = recorder.stop().unwrap().unwrap();

        // Header plus the 160 samples delivered on connect.
        assert_eq!(take.payload.size(), (WAV_HEADER_SIZE + 320) as u64);
    }

    #[test]
    fn invalid_configuration_rejected() {
        let media = Arc::new(FakeMediaDevices::with_microphones(&["mic-1"]));
        let config = RecorderConfiguration {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(Recorder::new(media, WavEncoder::new(), config).is_err());
    }
}
