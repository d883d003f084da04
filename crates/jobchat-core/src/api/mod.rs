pub mod chat;
pub mod transcribe;

pub use chat::ChatClient;
pub use transcribe::TranscriptionClient;

use async_trait::async_trait;

use crate::audio::CapturedAudio;
use crate::error::ApiError;

/// The remote chat endpoint: one user input in, one reply out.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, token: &str, user_input: &str) -> Result<String, ApiError>;
}

/// Remote speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &CapturedAudio) -> Result<String, ApiError>;
}
