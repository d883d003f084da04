pub mod api;
pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod render;
pub mod session;
pub mod speech;
pub mod state;
pub mod stream;

// Re-export main types for convenience
pub use api::{ChatBackend, ChatClient, Transcriber, TranscriptionClient};
pub use audio::{AudioCaptureSession, AudioFormat, CapturedAudio, CpalMicrophone, Microphone};
pub use config::Config;
pub use controller::{ChatController, Collaborators, SessionEvent, StreamSettings, SubmitOutcome};
pub use error::{ApiError, CaptureError, SpeechError};
pub use render::{render, RenderedText, Segment};
pub use session::{SessionStore, TokenSource, TOKEN_KEY};
pub use speech::{CommandSynthesizer, SpeechOutput, SpeechSynthesizer};
pub use state::{Alert, ChatRole, ConversationLog, Message, RecordingState, TurnState};
pub use stream::{RevealHandle, StreamingPresenter};
