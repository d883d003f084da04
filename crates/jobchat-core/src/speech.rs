//! Spoken playback of assistant replies.

use std::io;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

use crate::error::SpeechError;

/// Replies mentioning interviews are read aloud when TTS is on.
const TRIGGER: &str = "면접";

pub fn is_speech_trigger(text: &str) -> bool {
    text.contains(TRIGGER)
}

/// Platform text-to-speech with cancel-and-replace semantics.
pub trait SpeechSynthesizer: Send {
    /// Start speaking `text`. Returns once playback has started.
    fn speak(&mut self, text: &str) -> Result<(), SpeechError>;

    /// Silence the current utterance, if any.
    fn cancel(&mut self);
}

/// Gate in front of a [`SpeechSynthesizer`]: the enable flag, the trigger
/// predicate, and the one-utterance-at-a-time rule.
pub struct SpeechOutput {
    enabled: bool,
    synth: Box<dyn SpeechSynthesizer>,
}

impl SpeechOutput {
    pub fn new(synth: Box<dyn SpeechSynthesizer>, enabled: bool) -> Self {
        Self { enabled, synth }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.synth.cancel();
        }
        self.enabled = enabled;
    }

    /// Speak `text` if TTS is on and the text qualifies.
    ///
    /// Returns whether an utterance was started.
    pub fn announce(&mut self, text: &str) -> Result<bool, SpeechError> {
        if !self.enabled || !is_speech_trigger(text) {
            return Ok(false);
        }
        self.synth.cancel();
        self.synth.speak(text)?;
        Ok(true)
    }

    pub fn cancel(&mut self) {
        self.synth.cancel();
    }
}

/// Speaks through the system's command-line synthesizer (`say` on macOS,
/// `espeak-ng` elsewhere).
pub struct CommandSynthesizer {
    program: &'static str,
    language: String,
    current: Option<Child>,
}

impl CommandSynthesizer {
    pub fn new(language: &str) -> Self {
        let program = if cfg!(target_os = "macos") {
            "say"
        } else {
            "espeak-ng"
        };
        Self {
            program,
            language: language.to_string(),
            current: None,
        }
    }

    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(self.program);
        if self.program == "espeak-ng" {
            cmd.arg("-v").arg(&self.language);
        }
        cmd.arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        match self.command(text).spawn() {
            Ok(child) => {
                debug!("speaking {} chars via {}", text.chars().count(), self.program);
                self.current = Some(child);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("{} not found; speech output unavailable", self.program);
                Err(SpeechError::Unavailable)
            }
            Err(e) => Err(SpeechError::Spawn(e)),
        }
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}
