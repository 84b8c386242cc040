use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::traits::media_devices::LiveStream;

/// Callback receiving encoded fragments as the encoder produces them.
pub type ChunkCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync + 'static>;

/// Streaming encoder that turns a live stream into binary fragments.
///
/// The recorder owns the fragment accumulator: the encoder only emits
/// fragments through the callback handed to [`ChunkEncoder::start`]. On
/// finalize the recorder concatenates every fragment and passes the result
/// to [`ChunkEncoder::seal`] so the container can be fixed up.
///
/// Implemented by `WavEncoder`.
pub trait ChunkEncoder: Send {
    /// Media type of the produced payload (e.g. `audio/wav`).
    fn mime_type(&self) -> &str;

    /// Begin encoding `stream`. Resets any state left from a previous run.
    fn start(&mut self, stream: &mut LiveStream, on_chunk: ChunkCallback) -> Result<(), CaptureError>;

    /// Stop emitting fragments until resumed. Incoming audio is dropped.
    fn pause(&mut self);

    fn resume(&mut self);

    /// Flush any buffered audio through the callback and stop encoding.
    /// No fragment is emitted after this returns.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Fix up container fields once the full payload is known.
    fn seal(&self, _payload: &mut Vec<u8>) {}
}
