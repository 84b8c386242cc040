//! cpal microphone track.
//!
//! `cpal::Stream` is not `Send` on every host, so each track owns a
//! dedicated thread that builds the stream, keeps it playing, and drops it
//! when the track is stopped. Samples are delivered as interleaved f32 in
//! the device's default input format.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;

use soundcheck_core::models::audio_models::StreamFormat;
use soundcheck_core::models::error::CaptureError;
use soundcheck_core::traits::media_devices::{MediaTrack, SampleCallback};

use crate::device_enumerator::find_input_device;
use crate::error_map::{from_build_error, from_config_error, from_play_error};

type SinkSlot = Arc<Mutex<Option<SampleCallback>>>;

/// A live microphone opened through cpal.
pub struct CpalMicTrack {
    label: String,
    sink: SinkSlot,
    live: Arc<AtomicBool>,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CpalMicTrack {
    /// Open `device_id` (or the default input) and start it playing.
    ///
    /// Blocks until the stream thread reports the stream running or failed.
    pub fn open(device_id: Option<String>) -> Result<(Self, StreamFormat), CaptureError> {
        let sink: SinkSlot = Arc::new(Mutex::new(None));
        let live = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(String, StreamFormat), CaptureError>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread_sink = Arc::clone(&sink);
        let thread_live = Arc::clone(&live);
        let handle = thread::Builder::new()
            .name("cpal-mic-stream".into())
            .spawn(move || {
                let stream = match build_stream(device_id.as_deref(), thread_sink, Arc::clone(&thread_live)) {
                    Ok((stream, label, format)) => {
                        thread_live.store(true, Ordering::SeqCst);
                        let _ = ready_tx.send(Ok((label, format)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Park until stopped or the track is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                thread_live.store(false, Ordering::SeqCst);
                log::debug!("Mic stream thread exiting");
            })
            .map_err(|e| CaptureError::CaptureUnavailable(format!("failed to spawn mic thread: {}", e)))?;

        let ready = ready_rx
            .recv()
            .map_err(|_| CaptureError::CaptureUnavailable("mic stream thread exited".into()));
        let (label, format) = match ready.and_then(|result| result) {
            Ok(opened) => opened,
            Err(e) => {
                let _ = handle.join();
                return Err(e);
            }
        };

        log::info!(
            "Opened microphone '{}' ({} Hz, {} ch)",
            label,
            format.sample_rate,
            format.channels
        );
        let track = Self {
            label,
            sink,
            live,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        };
        Ok((track, format))
    }
}

impl MediaTrack for CpalMicTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn connect(&mut self, sink: SampleCallback) -> Result<(), CaptureError> {
        if self.stop_tx.is_none() {
            return Err(CaptureError::InvalidState("track already stopped".into()));
        }
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.sink.lock().take();
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Mic stream thread panicked");
            }
        }
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for CpalMicTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs on the stream thread.
fn build_stream(
    device_id: Option<&str>,
    sink: SinkSlot,
    live: Arc<AtomicBool>,
) -> Result<(Stream, String, StreamFormat), CaptureError> {
    let host = cpal::default_host();
    let device = find_input_device(&host, device_id)?;
    let label = device
        .name()
        .unwrap_or_else(|_| device_id.unwrap_or("Default Microphone").to_string());

    let supported = device.default_input_config().map_err(from_config_error)?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let stream = match sample_format {
        SampleFormat::F32 => input_stream::<f32>(&device, &config, sink, live),
        SampleFormat::I16 => input_stream::<i16>(&device, &config, sink, live),
        SampleFormat::U16 => input_stream::<u16>(&device, &config, sink, live),
        SampleFormat::I32 => input_stream::<i32>(&device, &config, sink, live),
        other => {
            return Err(CaptureError::CaptureUnavailable(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(from_build_error)?;

    stream.play().map_err(from_play_error)?;

    let format = StreamFormat {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };
    Ok((stream, label, format))
}

fn input_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    sink: SinkSlot,
    live: Arc<AtomicBool>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut converted: Vec<f32> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let Some(sink) = sink.lock().clone() else {
                return;
            };
            converted.clear();
            converted.extend(data.iter().map(|s| s.to_sample::<f32>()));
            sink(&converted);
        },
        move |err| {
            log::error!("Mic stream error: {}", err);
            live.store(false, Ordering::SeqCst);
        },
        None,
    )
}
