//! Microphone capture for voice input.
//!
//! A [`Microphone`] hands out a [`CaptureHandle`] while it streams byte chunks
//! into a channel. [`AudioCaptureSession`] owns that handle between `start`
//! and `stop`, and on stop releases the device and concatenates the chunks
//! in arrival order into a single [`CapturedAudio`].

use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, CaptureError};

pub type ChunkSender = mpsc::UnboundedSender<Vec<u8>>;

/// Layout of the bytes inside a [`CapturedAudio`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioFormat {
    /// Interleaved signed 16-bit little-endian PCM.
    Pcm16 { sample_rate: u32, channels: u16 },
    /// Already-containerised audio, for a [`CaptureHandle`] whose device
    /// delivers an encoded stream (e.g. webm from a browser recorder). The
    /// bytes are uploaded as-is under `file_name` and `mime`.
    Encoded { mime: String, file_name: String },
}

/// The finished recording produced once per capture session.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub format: AudioFormat,
    pub bytes: Vec<u8>,
}

/// What gets attached to the speech-to-text upload.
#[derive(Debug)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

impl CapturedAudio {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Wrap raw PCM in a WAV container; encoded audio passes through.
    pub fn to_upload(&self) -> Result<AudioUpload, ApiError> {
        match &self.format {
            AudioFormat::Encoded { mime, file_name } => Ok(AudioUpload {
                bytes: self.bytes.clone(),
                mime: mime.clone(),
                file_name: file_name.clone(),
            }),
            AudioFormat::Pcm16 {
                sample_rate,
                channels,
            } => {
                let spec = hound::WavSpec {
                    channels: *channels,
                    sample_rate: *sample_rate,
                    bits_per_sample: 16,
                    sample_format: hound::SampleFormat::Int,
                };
                let mut cursor = Cursor::new(Vec::with_capacity(self.bytes.len() + 44));
                {
                    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
                    for pair in self.bytes.chunks_exact(2) {
                        writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
                    }
                    writer.finalize()?;
                }
                Ok(AudioUpload {
                    bytes: cursor.into_inner(),
                    mime: "audio/wav".to_string(),
                    file_name: "audio.wav".to_string(),
                })
            }
        }
    }
}

/// A capture device that can be acquired for exclusive use.
pub trait Microphone: Send {
    /// Acquire the device and start delivering chunks to `sink`.
    ///
    /// Must not leave anything running when it returns an error.
    fn acquire(&mut self, sink: ChunkSender) -> Result<Box<dyn CaptureHandle>, CaptureError>;
}

/// Exclusive hold on an acquired device.
pub trait CaptureHandle: Send {
    fn format(&self) -> AudioFormat;

    /// Stop the device. Consuming `self` makes a second release impossible.
    /// No chunk is sent after this returns.
    fn release(self: Box<Self>);
}

struct ActiveCapture {
    handle: Box<dyn CaptureHandle>,
    chunks: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// One microphone, at most one recording at a time.
pub struct AudioCaptureSession {
    microphone: Box<dyn Microphone>,
    active: Option<ActiveCapture>,
}

impl AudioCaptureSession {
    pub fn new(microphone: Box<dyn Microphone>) -> Self {
        Self {
            microphone,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Acquire the microphone and start buffering chunks.
    ///
    /// Starting while already recording is a no-op.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            debug!("capture already running");
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.microphone.acquire(tx)?;
        info!("microphone acquired: {:?}", handle.format());
        self.active = Some(ActiveCapture { handle, chunks: rx });
        Ok(())
    }

    /// Release the device and assemble the buffered chunks.
    ///
    /// Returns `None` when nothing was being recorded.
    pub fn stop(&mut self) -> Option<CapturedAudio> {
        let ActiveCapture { handle, mut chunks } = self.active.take()?;
        let format = handle.format();
        handle.release();

        let mut bytes = Vec::new();
        let mut count = 0usize;
        while let Ok(chunk) = chunks.try_recv() {
            if chunk.is_empty() {
                continue;
            }
            bytes.extend_from_slice(&chunk);
            count += 1;
        }
        info!("microphone released after {} chunks ({} bytes)", count, bytes.len());

        Some(CapturedAudio { format, bytes })
    }
}

impl Drop for AudioCaptureSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.release();
        }
    }
}

/// The system microphone via cpal.
///
/// The cpal stream lives on a dedicated thread for the duration of a
/// recording; releasing the handle signals that thread, which drops the stream.
///
/// `acquire` waits for the device to open and `release` joins the capture
/// thread. Both block the calling task briefly, so an async caller stalls for
/// as long as the audio backend takes to open or close the device.
pub struct CpalMicrophone {
    preferred_device: Option<String>,
}

impl CpalMicrophone {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self { preferred_device }
    }

    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::Device(format!("cannot enumerate devices: {e}")))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

impl Microphone for CpalMicrophone {
    fn acquire(&mut self, sink: ChunkSender) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let preferred = self.preferred_device.clone();

        let thread = std::thread::spawn(move || {
            let stream = match open_input_stream(preferred.as_deref(), sink) {
                Ok((stream, format)) => {
                    let _ = ready_tx.send(Ok(format));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            // Blocks until release() sends or drops the stop sender.
            let _ = stop_rx.recv();
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(format)) => Ok(Box::new(CpalHandle {
                format,
                stop: stop_tx,
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CaptureError::Device("capture thread exited early".into()))
            }
        }
    }
}

struct CpalHandle {
    format: AudioFormat,
    stop: std_mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle for CpalHandle {
    fn format(&self) -> AudioFormat {
        self.format.clone()
    }

    fn release(mut self: Box<Self>) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("capture thread panicked");
            }
        }
    }
}

fn open_input_stream(
    preferred: Option<&str>,
    sink: ChunkSender,
) -> Result<(cpal::Stream, AudioFormat), CaptureError> {
    let host = cpal::default_host();
    let device = match preferred {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::Device(format!("cannot enumerate devices: {e}")))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or(CaptureError::NoDevice)?,
        None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
    };

    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;
    let config = supported.config();
    let format = AudioFormat::Pcm16 {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, sink, |s| {
            (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        })?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, sink, |s| s)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, sink, |s| {
            (s as i32 - 32768) as i16
        })?,
        other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
    };

    stream
        .play()
        .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

    Ok((stream, format))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sink: ChunkSender,
    to_i16: fn(T) -> i16,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample + Copy + 'static,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                if data.is_empty() {
                    return;
                }
                let mut chunk = Vec::with_capacity(data.len() * 2);
                for &sample in data {
                    chunk.extend_from_slice(&to_i16(sample).to_le_bytes());
                }
                // The receiver is gone once the session stopped; nothing to do then.
                let _ = sink.send(chunk);
            },
            |err| error!("audio input stream error: {err}"),
            None,
        )
        .map_err(|e| CaptureError::PermissionDenied(e.to_string()))
}
