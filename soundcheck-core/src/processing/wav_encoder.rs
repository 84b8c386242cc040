use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::processing::wav_format::{self, WavSpec, WAV_MIME_TYPE};
use crate::traits::encoder::{ChunkCallback, ChunkEncoder};
use crate::traits::media_devices::LiveStream;

/// Default amount of audio buffered before a fragment is emitted.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(250);

struct EncoderState {
    running: bool,
    paused: bool,
    pending: Vec<u8>,
    flush_bytes: usize,
    sink: Option<ChunkCallback>,
}

impl EncoderState {
    fn idle() -> Self {
        Self {
            running: false,
            paused: false,
            pending: Vec::new(),
            flush_bytes: 0,
            sink: None,
        }
    }

    fn emit_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let fragment = std::mem::take(&mut self.pending);
        if let Some(ref sink) = self.sink {
            sink(fragment);
        }
    }
}

/// Streaming 16-bit PCM WAV encoder.
///
/// Emits the RIFF header as the first fragment, then PCM fragments of
/// roughly `flush_interval` worth of audio. Sizes in the header are zero
/// until [`ChunkEncoder::seal`] patches them on the assembled payload.
///
/// Fragments are emitted while the internal lock is held, so nothing
/// reaches the sink after [`ChunkEncoder::stop`] returns.
pub struct WavEncoder {
    flush_interval: Duration,
    state: Arc<Mutex<EncoderState>>,
}

impl WavEncoder {
    pub fn new() -> Self {
        Self::with_flush_interval(DEFAULT_FLUSH_INTERVAL)
    }

    pub fn with_flush_interval(flush_interval: Duration) -> Self {
        Self {
            flush_interval,
            state: Arc::new(Mutex::new(EncoderState::idle())),
        }
    }

    fn flush_bytes_for(&self, spec: &WavSpec) -> usize {
        let bytes = spec.byte_rate() as f64 * self.flush_interval.as_secs_f64();
        (bytes as usize).max(spec.block_align() as usize)
    }
}

impl Default for WavEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkEncoder for WavEncoder {
    fn mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }

    fn start(&mut self, stream: &mut LiveStream, on_chunk: ChunkCallback) -> Result<(), CaptureError> {
        let format = stream.format();
        let spec = WavSpec::pcm16(format.sample_rate, format.channels);

        {
            let mut state = self.state.lock();
            *state = EncoderState::idle();
            state.flush_bytes = self.flush_bytes_for(&spec);
            state.sink = Some(Arc::clone(&on_chunk));
            state.running = true;
        }

        on_chunk(spec.header(0).to_vec());

        let state = Arc::clone(&self.state);
        let connected = stream.connect(Arc::new(move |samples: &[f32]| {
            let mut s = state.lock();
            if !s.running || s.paused {
                return;
            }
            wav_format::encode_pcm16(samples, &mut s.pending);
            if s.pending.len() >= s.flush_bytes {
                s.emit_pending();
            }
        }));

        if let Err(e) = connected {
            *self.state.lock() = EncoderState::idle();
            return Err(e);
        }

        log::debug!(
            "WAV encoder started ({} Hz, {} ch)",
            spec.sample_rate,
            spec.channels
        );
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        state.emit_pending();
        state.paused = true;
    }

    fn resume(&mut self) {
        self.state.lock().paused = false;
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if !state.running {
            return Ok(());
        }
        state.emit_pending();
        *state = EncoderState::idle();
        Ok(())
    }

    fn seal(&self, payload: &mut Vec<u8>) {
        if !wav_format::seal(payload) {
            log::warn!("Payload is not a WAV container; sizes left unpatched");
        }
    }
}
