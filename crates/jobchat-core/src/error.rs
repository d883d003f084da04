//! Typed errors raised at the library's outer edges.
//!
//! The controller never lets these escape: every variant is turned into a
//! fallback message or a user alert at the operation that started the work.

use thiserror::Error;

/// Failure talking to the chat backend or the speech-to-text service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("failed to encode captured audio: {0}")]
    Encode(#[from] hound::Error),

    #[error("no speech-to-text API key configured")]
    MissingApiKey,
}

/// Failure acquiring or driving the microphone.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("no input device available")]
    NoDevice,

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("input device failed: {0}")]
    Device(String),
}

/// Failure reaching the platform text-to-speech capability.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech synthesis is not available on this platform")]
    Unavailable,

    #[error("failed to start speech synthesis: {0}")]
    Spawn(#[from] std::io::Error),
}
