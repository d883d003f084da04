//! The chat session controller.
//!
//! [`ChatController`] is the single owner of the conversation log, the input
//! buffer, and the turn and recording state machines. Operations that need
//! the network or a timer spawn a tokio task which reports back through a
//! [`SessionEvent`]; the owner feeds those events into
//! [`ChatController::handle_event`] one at a time, so every state change
//! happens on the owner's task between suspension points.
//!
//! All operations that spawn work must be called from within a tokio runtime.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ChatBackend, Transcriber};
use crate::audio::{AudioCaptureSession, CapturedAudio, Microphone};
use crate::config::Config;
use crate::error::ApiError;
use crate::session::TokenSource;
use crate::speech::SpeechOutput;
use crate::state::{Alert, ConversationLog, Message, RecordingState, TurnState};
use crate::stream::{
    should_stream, RevealHandle, StreamingPresenter, DEFAULT_REVEAL_INTERVAL,
    DEFAULT_STREAM_THRESHOLD,
};

pub const WELCOME_MESSAGE: &str = "안녕하세요, 취업 지원 서비스 챗봇입니다! 채용 공고, 자기소개서 초안 작성, 모의 면접 기능이 있습니다. 무엇을 도와드릴까요?";
pub const LOGIN_REQUIRED_MESSAGE: &str = "로그인 후 사용해 주세요.";
pub const SERVER_ERROR_MESSAGE: &str = "죄송합니다. 서버와의 통신 중 오류가 발생했습니다.";
pub const EMPTY_REPLY_MESSAGE: &str = "죄송합니다. 응답을 받지 못했습니다.";
pub const VOICE_ERROR_MESSAGE: &str = "음성 처리 중 오류가 발생했습니다.";
pub const CANCELLED_MESSAGE: &str = "요청이 취소되었습니다.";

/// Completion notices from work the controller spawned.
#[derive(Debug)]
pub enum SessionEvent {
    Reply {
        turn: u64,
        result: Result<String, ApiError>,
    },
    Transcript {
        job: u64,
        result: Result<String, ApiError>,
    },
    RevealTick {
        stream: u64,
    },
}

/// What happened to a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// Nothing but whitespace; nothing changed.
    Empty,
    /// Another exchange or transcription is outstanding; nothing changed.
    Busy,
    /// No token: a login prompt was appended and the network was not touched.
    LoginRequired,
    /// No usable recording; an alert was raised.
    NoAudio,
}

/// Where the user text of an exchange came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Typed,
    Voice,
}

struct PendingReply {
    turn: u64,
    origin: Origin,
    task: JoinHandle<()>,
}

struct PendingTranscript {
    job: u64,
    task: JoinHandle<()>,
}

struct ActiveReveal {
    stream: u64,
    presenter: StreamingPresenter,
    handle: RevealHandle,
}

/// Reveal tuning: replies shorter than `threshold` characters appear at once,
/// longer ones grow one token every `interval`.
#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub threshold: usize,
    pub interval: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_STREAM_THRESHOLD,
            interval: DEFAULT_REVEAL_INTERVAL,
        }
    }
}

impl From<&Config> for StreamSettings {
    fn from(config: &Config) -> Self {
        Self {
            threshold: config.stream_threshold,
            interval: config.reveal_interval(),
        }
    }
}

/// External collaborators, injected so tests can substitute fakes.
pub struct Collaborators {
    pub backend: Arc<dyn ChatBackend>,
    pub transcriber: Arc<dyn Transcriber>,
    pub tokens: Arc<dyn TokenSource>,
    pub microphone: Box<dyn Microphone>,
    pub speech: SpeechOutput,
}

pub struct ChatController {
    log: ConversationLog,
    input: String,
    turn: TurnState,
    recording: RecordingState,
    captured: Option<CapturedAudio>,
    alerts: VecDeque<Alert>,
    progress: Option<u8>,

    capture: AudioCaptureSession,
    speech: SpeechOutput,
    backend: Arc<dyn ChatBackend>,
    transcriber: Arc<dyn Transcriber>,
    tokens: Arc<dyn TokenSource>,
    settings: StreamSettings,

    pending_reply: Option<PendingReply>,
    pending_transcript: Option<PendingTranscript>,
    reveal: Option<ActiveReveal>,
    next_id: u64,

    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,

    initialized: bool,
    closed: bool,
}

impl ChatController {
    pub fn new(collaborators: Collaborators, settings: StreamSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let Collaborators {
            backend,
            transcriber,
            tokens,
            microphone,
            speech,
        } = collaborators;

        Self {
            log: ConversationLog::new(),
            input: String::new(),
            turn: TurnState::Idle,
            recording: RecordingState::Idle,
            captured: None,
            alerts: VecDeque::new(),
            progress: None,
            capture: AudioCaptureSession::new(microphone),
            speech,
            backend,
            transcriber,
            tokens,
            settings,
            pending_reply: None,
            pending_transcript: None,
            reveal: None,
            next_id: 0,
            events_tx,
            events_rx,
            initialized: false,
            closed: false,
        }
    }

    /// Seed the log with the welcome message. Only the first call has an effect.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            debug!("initialize called again; ignoring");
            return false;
        }
        self.initialized = true;
        self.push_assistant(WELCOME_MESSAGE);
        true
    }

    // --- Read access ---

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Loading progress in percent while a reply is awaited, `None` when hidden.
    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn has_captured_audio(&self) -> bool {
        self.captured.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the send action should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.closed
            && self.turn == TurnState::Idle
            && self.recording != RecordingState::Transcribing
    }

    /// Whether the recorded audio can be sent right now.
    pub fn can_submit_audio(&self) -> bool {
        self.captured.is_some() && self.can_submit() && self.recording == RecordingState::Idle
    }

    /// True while any spawned work still has to report back.
    pub fn is_busy(&self) -> bool {
        self.turn != TurnState::Idle || self.recording == RecordingState::Transcribing
    }

    pub fn peek_alert(&self) -> Option<Alert> {
        self.alerts.front().copied()
    }

    pub fn take_alert(&mut self) -> Option<Alert> {
        self.alerts.pop_front()
    }

    pub fn tts_enabled(&self) -> bool {
        self.speech.is_enabled()
    }

    pub fn set_tts_enabled(&mut self, enabled: bool) {
        info!("text-to-speech {}", if enabled { "on" } else { "off" });
        self.speech.set_enabled(enabled);
    }

    pub fn toggle_tts(&mut self) -> bool {
        let enabled = !self.speech.is_enabled();
        self.set_tts_enabled(enabled);
        enabled
    }

    // --- Typed input ---

    /// Send whatever is in the input buffer.
    pub fn submit_input(&mut self) -> SubmitOutcome {
        let text = self.input.clone();
        self.submit_text(&text)
    }

    pub fn submit_text(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Empty;
        }
        if !self.can_submit() {
            debug!("submit rejected: turn {:?}, recording {:?}", self.turn, self.recording);
            return SubmitOutcome::Busy;
        }
        let Some(token) = self.tokens.token() else {
            info!("no auth token; asking user to log in");
            self.push_assistant(LOGIN_REQUIRED_MESSAGE);
            return SubmitOutcome::LoginRequired;
        };

        self.log.push(Message::user(text));
        self.input.clear();
        self.begin_exchange(token, text.to_string(), Origin::Typed);
        SubmitOutcome::Sent
    }

    fn begin_exchange(&mut self, token: String, text: String, origin: Origin) {
        let turn = self.allocate_id();
        self.turn = TurnState::AwaitingReply;
        self.progress = Some(0);
        debug!("turn {} awaiting reply ({:?})", turn, origin);

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let result = backend.send(&token, &text).await;
            let _ = tx.send(SessionEvent::Reply { turn, result });
        });

        self.pending_reply = Some(PendingReply { turn, origin, task });
    }

    // --- Voice input ---

    /// Acquire the microphone. On failure an alert is raised and nothing else changes.
    pub fn start_capture(&mut self) -> bool {
        if self.closed || self.recording != RecordingState::Idle {
            return false;
        }
        if let Some(stale) = self.captured.take() {
            debug!("discarding unsent recording of {} bytes", stale.len());
        }

        match self.capture.start() {
            Ok(()) => {
                self.recording = RecordingState::Recording;
                true
            }
            Err(e) => {
                warn!("microphone unavailable: {}", e);
                self.alerts.push_back(Alert::MicrophoneUnavailable);
                false
            }
        }
    }

    pub fn stop_capture(&mut self) -> bool {
        if self.recording != RecordingState::Recording {
            return false;
        }
        self.captured = self.capture.stop();
        self.recording = RecordingState::Idle;
        true
    }

    /// Transcribe the last recording and send the transcript as a chat message.
    pub fn submit_captured_audio(&mut self) -> SubmitOutcome {
        if !self.can_submit() {
            return SubmitOutcome::Busy;
        }
        if self.recording == RecordingState::Recording {
            debug!("audio submit while still recording");
            return SubmitOutcome::Busy;
        }

        let Some(audio) = self.captured.take() else {
            self.alerts.push_back(Alert::NoRecordedAudio);
            return SubmitOutcome::NoAudio;
        };
        if audio.is_empty() {
            warn!("recording produced no audio; not uploading");
            self.alerts.push_back(Alert::NoRecordedAudio);
            return SubmitOutcome::NoAudio;
        }
        if self.tokens.token().is_none() {
            info!("no auth token; discarding recording of {} bytes", audio.len());
            self.push_assistant(LOGIN_REQUIRED_MESSAGE);
            return SubmitOutcome::LoginRequired;
        }

        let job = self.allocate_id();
        self.recording = RecordingState::Transcribing;
        debug!("transcription job {} started ({} bytes)", job, audio.len());

        let transcriber = Arc::clone(&self.transcriber);
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let result = transcriber.transcribe(&audio).await;
            let _ = tx.send(SessionEvent::Transcript { job, result });
        });

        self.pending_transcript = Some(PendingTranscript { job, task });
        SubmitOutcome::Sent
    }

    // --- Interruptions ---

    /// Abandon the outstanding chat request or transcription.
    pub fn cancel_request(&mut self) -> bool {
        if let Some(pending) = self.pending_reply.take() {
            pending.task.abort();
            self.turn = TurnState::Idle;
            self.progress = None;
            if pending.origin == Origin::Voice {
                self.recording = RecordingState::Idle;
            }
            info!("turn {} cancelled by user", pending.turn);
            self.push_assistant(CANCELLED_MESSAGE);
            return true;
        }
        if let Some(pending) = self.pending_transcript.take() {
            pending.task.abort();
            self.recording = RecordingState::Idle;
            info!("transcription job {} cancelled by user", pending.job);
            self.push_assistant(CANCELLED_MESSAGE);
            return true;
        }
        false
    }

    /// Show the rest of a streaming reply immediately.
    pub fn finish_reveal(&mut self) -> bool {
        if self.reveal.is_none() {
            return false;
        }
        self.end_reveal();
        true
    }

    /// Advance the loading indicator; call on every UI tick.
    pub fn tick_progress(&mut self) {
        self.progress = match (self.turn, self.progress) {
            (TurnState::AwaitingReply, Some(p)) => Some((p + 10).min(90)),
            (_, Some(100)) => None,
            (_, other) => other,
        };
    }

    // --- Event plumbing ---

    /// Wait for the next completion from spawned work.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Apply events until no chat exchange, reveal, or transcription is outstanding.
    pub async fn run_until_idle(&mut self) {
        while self.is_busy() && !self.closed {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        if self.closed {
            debug!("dropping event after shutdown");
            return;
        }
        match event {
            SessionEvent::Reply { turn, result } => self.apply_reply(turn, result),
            SessionEvent::Transcript { job, result } => self.apply_transcript(job, result),
            SessionEvent::RevealTick { stream } => self.apply_tick(stream),
        }
    }

    fn apply_reply(&mut self, turn: u64, result: Result<String, ApiError>) {
        let pending = match self.pending_reply.take() {
            Some(pending) if pending.turn == turn => pending,
            other => {
                self.pending_reply = other;
                debug!("ignoring reply for stale turn {}", turn);
                return;
            }
        };
        self.progress = Some(100);

        match result {
            Ok(reply) if !reply.trim().is_empty() => self.present_reply(reply),
            other => {
                let fallback = match (&other, pending.origin) {
                    (_, Origin::Voice) => VOICE_ERROR_MESSAGE,
                    (Ok(_), Origin::Typed) | (Err(ApiError::MissingField(_)), Origin::Typed) => {
                        EMPTY_REPLY_MESSAGE
                    }
                    (Err(_), Origin::Typed) => SERVER_ERROR_MESSAGE,
                };
                match other {
                    Err(e) => warn!("turn {} failed: {}", turn, e),
                    Ok(_) => warn!("turn {} returned an empty reply", turn),
                }
                self.push_assistant(fallback);
                self.turn = TurnState::Idle;
            }
        }

        if pending.origin == Origin::Voice {
            self.recording = RecordingState::Idle;
        }
    }

    fn present_reply(&mut self, reply: String) {
        if !should_stream(&reply, self.settings.threshold) {
            self.push_assistant(&reply);
            self.turn = TurnState::Idle;
            return;
        }

        self.announce(&reply);
        self.log.push_placeholder();
        self.turn = TurnState::Streaming;

        let stream = self.allocate_id();
        let tx = self.events_tx.clone();
        let handle = RevealHandle::spawn(self.settings.interval, move || {
            tx.send(SessionEvent::RevealTick { stream }).is_ok()
        });
        let presenter = StreamingPresenter::new(reply);
        debug!("revealing reply {} in {} steps", stream, presenter.total_steps());

        self.reveal = Some(ActiveReveal {
            stream,
            presenter,
            handle,
        });
    }

    fn apply_tick(&mut self, stream: u64) {
        let Some(reveal) = self.reveal.as_mut() else {
            return;
        };
        if reveal.stream != stream {
            return;
        }
        if let Some(prefix) = reveal.presenter.advance() {
            self.log.update_placeholder(prefix);
        }
        if reveal.presenter.is_complete() {
            self.end_reveal();
        }
    }

    fn end_reveal(&mut self) {
        if let Some(reveal) = self.reveal.take() {
            reveal.handle.stop();
            self.log.update_placeholder(reveal.presenter.reply());
            self.log.seal_placeholder();
        }
        self.turn = TurnState::Idle;
    }

    fn apply_transcript(&mut self, job: u64, result: Result<String, ApiError>) {
        match self.pending_transcript.take() {
            Some(pending) if pending.job == job => {}
            other => {
                self.pending_transcript = other;
                debug!("ignoring transcript for stale job {}", job);
                return;
            }
        }

        let transcript = match result {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("transcription job {} recognized no speech", job);
                self.fail_voice();
                return;
            }
            Err(e) => {
                warn!("transcription job {} failed: {}", job, e);
                self.fail_voice();
                return;
            }
        };

        let Some(token) = self.tokens.token() else {
            self.push_assistant(LOGIN_REQUIRED_MESSAGE);
            self.recording = RecordingState::Idle;
            return;
        };

        // Recording stays Transcribing until this exchange resolves.
        self.log.push(Message::user(&transcript));
        self.begin_exchange(token, transcript, Origin::Voice);
    }

    fn fail_voice(&mut self) {
        self.push_assistant(VOICE_ERROR_MESSAGE);
        self.recording = RecordingState::Idle;
    }

    // --- Helpers ---

    fn push_assistant(&mut self, text: &str) {
        self.log.push(Message::assistant(text));
        self.announce(text);
    }

    fn announce(&mut self, text: &str) {
        if let Err(e) = self.speech.announce(text) {
            warn!("speech output failed: {}", e);
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Tear down the screen: stop timers, abandon requests, release the
    /// microphone. Events arriving afterwards are discarded.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(reveal) = self.reveal.take() {
            reveal.handle.stop();
        }
        if let Some(pending) = self.pending_reply.take() {
            pending.task.abort();
        }
        if let Some(pending) = self.pending_transcript.take() {
            pending.task.abort();
        }
        if self.capture.is_recording() {
            let _ = self.capture.stop();
        }
        self.captured = None;
        self.speech.cancel();
        info!("chat session closed with {} messages", self.log.len());
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
