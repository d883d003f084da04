//! End-to-end behaviour of the chat controller against scripted collaborators.
//!
//! Time is paused so reveal ticks advance deterministically.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobchat_core::audio::{CaptureHandle, ChunkSender};
use jobchat_core::controller::{
    CANCELLED_MESSAGE, EMPTY_REPLY_MESSAGE, LOGIN_REQUIRED_MESSAGE, SERVER_ERROR_MESSAGE,
    VOICE_ERROR_MESSAGE, WELCOME_MESSAGE,
};
use jobchat_core::{
    Alert, ApiError, AudioFormat, CaptureError, CapturedAudio, ChatBackend, ChatController,
    ChatRole, Collaborators, Microphone, RecordingState, SessionEvent, SessionStore, SpeechError,
    SpeechOutput, SpeechSynthesizer, StreamSettings, SubmitOutcome, Transcriber, TurnState,
    TOKEN_KEY,
};
use reqwest::StatusCode;
use tokio::sync::Notify;

// ────────────────────────────────────────────────────────────────────────────
// Fakes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Script {
    Reply(String),
    Status(u16),
    Missing(&'static str),
}

impl Script {
    fn reply(text: impl Into<String>) -> Self {
        Script::Reply(text.into())
    }

    fn into_result(self) -> Result<String, ApiError> {
        match self {
            Script::Reply(text) => Ok(text),
            Script::Status(code) => Err(ApiError::Status(
                StatusCode::from_u16(code).expect("valid status code"),
            )),
            Script::Missing(field) => Err(ApiError::MissingField(field)),
        }
    }
}

struct FakeBackend {
    script: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<(String, String)>>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn send(&self, token: &str, user_input: &str) -> Result<String, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((token.to_string(), user_input.to_string()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Script::reply("ok")).into_result()
    }
}

struct FakeTranscriber {
    script: Mutex<VecDeque<Script>>,
    uploads: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &CapturedAudio) -> Result<String, ApiError> {
        self.uploads.lock().unwrap().push(audio.bytes.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Script::reply("")).into_result()
    }
}

/// `None` chunks means permission is denied.
struct FakeMicrophone {
    chunks: Option<Vec<Vec<u8>>>,
    releases: Arc<Mutex<usize>>,
}

struct FakeHandle {
    releases: Arc<Mutex<usize>>,
}

impl CaptureHandle for FakeHandle {
    fn format(&self) -> AudioFormat {
        AudioFormat::Pcm16 {
            sample_rate: 16_000,
            channels: 1,
        }
    }

    fn release(self: Box<Self>) {
        *self.releases.lock().unwrap() += 1;
    }
}

impl Microphone for FakeMicrophone {
    fn acquire(&mut self, sink: ChunkSender) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let Some(chunks) = &self.chunks else {
            return Err(CaptureError::PermissionDenied("NotAllowedError".into()));
        };
        for chunk in chunks {
            sink.send(chunk.clone()).unwrap();
        }
        Ok(Box::new(FakeHandle {
            releases: Arc::clone(&self.releases),
        }))
    }
}

#[derive(Default)]
struct SpeechLog {
    spoken: Vec<String>,
    cancels: usize,
}

struct FakeSpeech(Arc<Mutex<SpeechLog>>);

impl SpeechSynthesizer for FakeSpeech {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        self.0.lock().unwrap().spoken.push(text.to_string());
        Ok(())
    }

    fn cancel(&mut self) {
        self.0.lock().unwrap().cancels += 1;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────────────

struct Setup {
    replies: Vec<Script>,
    transcripts: Vec<Script>,
    chunks: Option<Vec<Vec<u8>>>,
    token: Option<&'static str>,
    tts: bool,
    gate: Option<Arc<Notify>>,
    settings: StreamSettings,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            replies: Vec::new(),
            transcripts: Vec::new(),
            chunks: Some(vec![vec![1, 0], vec![2, 0]]),
            token: Some("tok"),
            tts: false,
            gate: None,
            settings: StreamSettings::default(),
        }
    }
}

struct Harness {
    controller: ChatController,
    backend: Arc<FakeBackend>,
    transcriber: Arc<FakeTranscriber>,
    store: SessionStore,
    speech: Arc<Mutex<SpeechLog>>,
    releases: Arc<Mutex<usize>>,
}

impl Setup {
    fn build(self) -> Harness {
        let backend = Arc::new(FakeBackend {
            script: Mutex::new(self.replies.into()),
            calls: Mutex::new(Vec::new()),
            gate: self.gate,
        });
        let transcriber = Arc::new(FakeTranscriber {
            script: Mutex::new(self.transcripts.into()),
            uploads: Mutex::new(Vec::new()),
        });
        let store = SessionStore::new();
        if let Some(token) = self.token {
            store.set(TOKEN_KEY, token);
        }
        let releases = Arc::new(Mutex::new(0));
        let speech = Arc::new(Mutex::new(SpeechLog::default()));

        let mut controller = ChatController::new(
            Collaborators {
                backend: backend.clone(),
                transcriber: transcriber.clone(),
                tokens: Arc::new(store.clone()),
                microphone: Box::new(FakeMicrophone {
                    chunks: self.chunks,
                    releases: Arc::clone(&releases),
                }),
                speech: SpeechOutput::new(Box::new(FakeSpeech(Arc::clone(&speech))), self.tts),
            },
            self.settings,
        );
        controller.initialize();

        Harness {
            controller,
            backend,
            transcriber,
            store,
            speech,
            releases,
        }
    }
}

impl Harness {
    fn texts(&self) -> Vec<String> {
        self.controller.messages().iter().map(|m| m.text()).collect()
    }

    fn last_text(&self) -> String {
        self.controller
            .messages()
            .last()
            .map(|m| m.text())
            .unwrap_or_default()
    }

    fn backend_calls(&self) -> Vec<(String, String)> {
        self.backend.calls.lock().unwrap().clone()
    }
}

fn long_reply() -> String {
    (0..50)
        .map(|i| format!("단어{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ────────────────────────────────────────────────────────────────────────────
// Typed chat
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_initialize_seeds_welcome_once() {
    let mut h = Setup::default().build();

    assert!(!h.controller.initialize());
    assert_eq!(h.texts(), vec![WELCOME_MESSAGE.to_string()]);
    assert_eq!(h.controller.messages()[0].sender, ChatRole::Assistant);
}

#[tokio::test(start_paused = true)]
async fn test_no_token_prompts_login_without_network() {
    let mut h = Setup {
        token: None,
        ..Setup::default()
    }
    .build();

    let outcome = h.controller.submit_text("안녕");
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(outcome, SubmitOutcome::LoginRequired);
    assert_eq!(h.controller.messages().len(), 2);
    assert_eq!(h.last_text(), LOGIN_REQUIRED_MESSAGE);
    assert_eq!(h.controller.turn_state(), TurnState::Idle);
    assert!(h.backend_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_short_reply_is_appended_in_one_piece() {
    let mut h = Setup {
        replies: vec![Script::reply("면접 준비를 도와드릴게요")],
        ..Setup::default()
    }
    .build();

    h.controller.set_input("안녕");
    assert_eq!(h.controller.submit_input(), SubmitOutcome::Sent);
    assert_eq!(h.controller.input(), "");
    assert_eq!(h.controller.turn_state(), TurnState::AwaitingReply);
    assert_eq!(h.controller.progress(), Some(0));
    assert_eq!(h.last_text(), "안녕");

    let event = h.controller.next_event().await.unwrap();
    h.controller.handle_event(event);

    assert_eq!(
        h.texts(),
        vec![WELCOME_MESSAGE, "안녕", "면접 준비를 도와드릴게요"]
    );
    assert_eq!(h.controller.turn_state(), TurnState::Idle);
    assert_eq!(h.controller.log().streaming_index(), None);
    assert_eq!(h.backend_calls(), vec![("tok".to_string(), "안녕".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_long_reply_grows_monotonically() {
    let reply = long_reply();
    let mut h = Setup {
        replies: vec![Script::reply(reply.clone())],
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("자기소개서 보여줘");
    let event = h.controller.next_event().await.unwrap();
    h.controller.handle_event(event);

    assert_eq!(h.controller.turn_state(), TurnState::Streaming);
    assert_eq!(h.last_text(), "");
    let placeholder = h.controller.log().streaming_index().unwrap();
    assert_eq!(placeholder, h.controller.messages().len() - 1);

    let mut seen = vec![String::new()];
    while h.controller.turn_state() == TurnState::Streaming {
        let event = h.controller.next_event().await.unwrap();
        h.controller.handle_event(event);
        seen.push(h.controller.messages()[placeholder].text());
    }

    for pair in seen.windows(2) {
        assert!(pair[1].starts_with(&pair[0]), "{:?} !<= {:?}", pair[0], pair[1]);
        assert!(pair[1].len() > pair[0].len());
    }
    assert_eq!(seen.last().unwrap(), &reply);
    assert_eq!(seen.len(), 51);
    assert_eq!(h.controller.log().streaming_index(), None);
    assert_eq!(h.controller.messages().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_submit_rejected_while_awaiting_and_streaming() {
    let gate = Arc::new(Notify::new());
    let reply = long_reply();
    let mut h = Setup {
        replies: vec![Script::reply(reply.clone())],
        gate: Some(Arc::clone(&gate)),
        ..Setup::default()
    }
    .build();

    assert_eq!(h.controller.submit_text("첫 질문"), SubmitOutcome::Sent);
    assert!(!h.controller.can_submit());
    assert_eq!(h.controller.submit_text("두 번째"), SubmitOutcome::Busy);

    gate.notify_one();
    let event = h.controller.next_event().await.unwrap();
    h.controller.handle_event(event);
    assert_eq!(h.controller.turn_state(), TurnState::Streaming);
    assert_eq!(h.controller.submit_text("세 번째"), SubmitOutcome::Busy);

    assert!(h.controller.finish_reveal());
    assert_eq!(h.controller.turn_state(), TurnState::Idle);
    assert_eq!(h.last_text(), reply);
    assert_eq!(h.backend_calls().len(), 1);

    // A tick that was already queued must not touch the sealed message.
    tokio::time::sleep(Duration::from_millis(300)).await;
    while let Some(event) = h.controller.try_next_event() {
        h.controller.handle_event(event);
    }
    assert_eq!(h.last_text(), reply);
}

#[tokio::test(start_paused = true)]
async fn test_whitespace_input_is_ignored() {
    let mut h = Setup::default().build();
    h.controller.set_input("   \n ");

    assert_eq!(h.controller.submit_input(), SubmitOutcome::Empty);
    assert_eq!(h.controller.messages().len(), 1);
    assert_eq!(h.controller.input(), "   \n ");
}

#[tokio::test(start_paused = true)]
async fn test_server_error_uses_fallback_message() {
    let mut h = Setup {
        replies: vec![Script::Status(500)],
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("안녕");
    h.controller.run_until_idle().await;

    assert_eq!(h.last_text(), SERVER_ERROR_MESSAGE);
    assert_eq!(h.controller.turn_state(), TurnState::Idle);
    assert_eq!(h.controller.progress(), Some(100));
    h.controller.tick_progress();
    assert_eq!(h.controller.progress(), None);
}

#[tokio::test(start_paused = true)]
async fn test_missing_message_field_uses_empty_reply_notice() {
    let mut h = Setup {
        replies: vec![Script::Missing("message")],
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("안녕");
    h.controller.run_until_idle().await;

    assert_eq!(h.last_text(), EMPTY_REPLY_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn test_progress_caps_at_ninety_while_waiting() {
    let gate = Arc::new(Notify::new());
    let mut h = Setup {
        gate: Some(Arc::clone(&gate)),
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("안녕");
    h.controller.tick_progress();
    assert_eq!(h.controller.progress(), Some(10));
    for _ in 0..20 {
        h.controller.tick_progress();
    }
    assert_eq!(h.controller.progress(), Some(90));

    gate.notify_one();
    h.controller.run_until_idle().await;
    assert_eq!(h.controller.progress(), Some(100));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_request_discards_reply() {
    let gate = Arc::new(Notify::new());
    let mut h = Setup {
        replies: vec![Script::reply("늦은 답변")],
        gate: Some(Arc::clone(&gate)),
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("안녕");
    tokio::task::yield_now().await;

    assert!(h.controller.cancel_request());
    assert_eq!(h.last_text(), CANCELLED_MESSAGE);
    assert_eq!(h.controller.turn_state(), TurnState::Idle);
    assert_eq!(h.controller.progress(), None);
    assert!(!h.controller.cancel_request());

    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.controller.try_next_event().is_none());
    assert!(!h.texts().iter().any(|t| t == "늦은 답변"));
}

#[tokio::test(start_paused = true)]
async fn test_stale_events_are_ignored() {
    let mut h = Setup::default().build();

    h.controller.handle_event(SessionEvent::Reply {
        turn: 42,
        result: Ok("유령 답변".to_string()),
    });
    h.controller.handle_event(SessionEvent::RevealTick { stream: 7 });
    h.controller.handle_event(SessionEvent::Transcript {
        job: 9,
        result: Ok("유령 음성".to_string()),
    });

    assert_eq!(h.controller.messages().len(), 1);
    assert_eq!(h.controller.turn_state(), TurnState::Idle);
    assert_eq!(h.controller.recording_state(), RecordingState::Idle);
}

// ────────────────────────────────────────────────────────────────────────────
// Voice input
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_microphone_denied_raises_alert() {
    let mut h = Setup {
        chunks: None,
        ..Setup::default()
    }
    .build();

    assert!(!h.controller.start_capture());
    assert_eq!(h.controller.recording_state(), RecordingState::Idle);
    assert_eq!(h.controller.messages().len(), 1);
    assert_eq!(h.controller.take_alert(), Some(Alert::MicrophoneUnavailable));
    assert_eq!(h.controller.take_alert(), None);
}

#[tokio::test(start_paused = true)]
async fn test_zero_chunks_never_uploads() {
    let mut h = Setup {
        chunks: Some(Vec::new()),
        ..Setup::default()
    }
    .build();

    assert!(h.controller.start_capture());
    assert!(h.controller.stop_capture());
    assert_eq!(h.controller.submit_captured_audio(), SubmitOutcome::NoAudio);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.controller.peek_alert(), Some(Alert::NoRecordedAudio));
    assert_eq!(h.controller.recording_state(), RecordingState::Idle);
    assert!(h.transcriber.uploads.lock().unwrap().is_empty());
    assert_eq!(*h.releases.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_submit_without_recording_alerts() {
    let mut h = Setup::default().build();
    assert_eq!(h.controller.submit_captured_audio(), SubmitOutcome::NoAudio);
    assert_eq!(h.controller.take_alert(), Some(Alert::NoRecordedAudio));
}

#[tokio::test(start_paused = true)]
async fn test_voice_pipeline_sends_transcript_as_chat() {
    let mut h = Setup {
        transcripts: vec![Script::reply("자기소개서 도와줘")],
        replies: vec![Script::reply("좋아요, 시작할게요")],
        ..Setup::default()
    }
    .build();

    assert!(h.controller.start_capture());
    assert_eq!(h.controller.recording_state(), RecordingState::Recording);
    assert_eq!(h.controller.submit_captured_audio(), SubmitOutcome::Busy);
    assert!(h.controller.stop_capture());
    assert!(h.controller.can_submit_audio());

    assert_eq!(h.controller.submit_captured_audio(), SubmitOutcome::Sent);
    assert_eq!(h.controller.recording_state(), RecordingState::Transcribing);
    assert!(!h.controller.can_submit());

    h.controller.run_until_idle().await;

    assert_eq!(
        h.texts(),
        vec![WELCOME_MESSAGE, "자기소개서 도와줘", "좋아요, 시작할게요"]
    );
    assert_eq!(h.controller.recording_state(), RecordingState::Idle);
    assert_eq!(h.controller.turn_state(), TurnState::Idle);
    assert_eq!(*h.transcriber.uploads.lock().unwrap(), vec![vec![1, 0, 2, 0]]);
    assert_eq!(
        h.backend_calls(),
        vec![("tok".to_string(), "자기소개서 도와줘".to_string())]
    );
    assert!(!h.controller.has_captured_audio());
}

#[tokio::test(start_paused = true)]
async fn test_transcription_failure_reports_voice_error() {
    let mut h = Setup {
        transcripts: vec![Script::Status(500)],
        ..Setup::default()
    }
    .build();

    h.controller.start_capture();
    h.controller.stop_capture();
    h.controller.submit_captured_audio();
    h.controller.run_until_idle().await;

    assert_eq!(h.last_text(), VOICE_ERROR_MESSAGE);
    assert_eq!(h.controller.recording_state(), RecordingState::Idle);
    assert!(h.backend_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_blank_transcript_reports_voice_error() {
    let mut h = Setup {
        transcripts: vec![Script::reply("  ")],
        ..Setup::default()
    }
    .build();

    h.controller.start_capture();
    h.controller.stop_capture();
    h.controller.submit_captured_audio();
    h.controller.run_until_idle().await;

    assert_eq!(h.last_text(), VOICE_ERROR_MESSAGE);
    assert!(h.backend_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_voice_chat_failure_reports_voice_error() {
    let mut h = Setup {
        transcripts: vec![Script::reply("면접 연습")],
        replies: vec![Script::Status(502)],
        ..Setup::default()
    }
    .build();

    h.controller.start_capture();
    h.controller.stop_capture();
    h.controller.submit_captured_audio();
    h.controller.run_until_idle().await;

    assert_eq!(h.last_text(), VOICE_ERROR_MESSAGE);
    assert_eq!(h.controller.recording_state(), RecordingState::Idle);
    assert_eq!(h.controller.turn_state(), TurnState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_voice_without_token_prompts_login() {
    let mut h = Setup {
        token: None,
        transcripts: vec![Script::reply("안녕하세요")],
        ..Setup::default()
    }
    .build();

    h.controller.start_capture();
    h.controller.stop_capture();
    assert_eq!(
        h.controller.submit_captured_audio(),
        SubmitOutcome::LoginRequired
    );
    assert_eq!(h.last_text(), LOGIN_REQUIRED_MESSAGE);
    assert!(!h.controller.has_captured_audio());
    assert_eq!(h.controller.recording_state(), RecordingState::Idle);
    assert!(h.transcriber.uploads.lock().unwrap().is_empty());

    // After logging in, a fresh recording goes through
    h.store.set(TOKEN_KEY, "fresh");
    h.controller.start_capture();
    h.controller.stop_capture();
    assert_eq!(h.controller.submit_captured_audio(), SubmitOutcome::Sent);
    h.controller.run_until_idle().await;
    assert_eq!(
        h.backend_calls(),
        vec![("fresh".to_string(), "안녕하세요".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_new_recording_discards_unsent_one() {
    let mut h = Setup::default().build();

    h.controller.start_capture();
    h.controller.stop_capture();
    assert!(h.controller.has_captured_audio());

    assert!(h.controller.start_capture());
    assert!(!h.controller.has_captured_audio());
    assert!(!h.controller.start_capture());
    assert_eq!(*h.releases.lock().unwrap(), 1);
}

// ────────────────────────────────────────────────────────────────────────────
// Lifecycle and speech
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_shutdown_discards_late_work() {
    let gate = Arc::new(Notify::new());
    let mut h = Setup {
        gate: Some(Arc::clone(&gate)),
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("안녕");
    h.controller.shutdown();
    assert!(h.controller.is_closed());

    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.controller.handle_event(SessionEvent::Reply {
        turn: 1,
        result: Ok("늦은 답변".to_string()),
    });

    assert_eq!(h.controller.messages().len(), 2);
    assert_eq!(h.controller.submit_text("또"), SubmitOutcome::Busy);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_reveal_freezes_placeholder() {
    let mut h = Setup {
        replies: vec![Script::reply(long_reply())],
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("자기소개서 보여줘");
    let event = h.controller.next_event().await.unwrap();
    h.controller.handle_event(event);
    for _ in 0..3 {
        let event = h.controller.next_event().await.unwrap();
        h.controller.handle_event(event);
    }
    assert_eq!(h.controller.turn_state(), TurnState::Streaming);
    let placeholder = h.controller.log().streaming_index().unwrap();
    let frozen = h.controller.messages()[placeholder].text();
    assert_eq!(frozen, "단어0 단어1 단어2");

    h.controller.shutdown();
    tokio::time::sleep(Duration::from_secs(10)).await;
    while let Some(event) = h.controller.try_next_event() {
        h.controller.handle_event(event);
    }
    h.controller.handle_event(SessionEvent::RevealTick { stream: 2 });

    assert_eq!(h.controller.messages()[placeholder].text(), frozen);
    assert_eq!(h.controller.messages().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_reveal_interval_still_completes() {
    let reply = long_reply();
    let mut h = Setup {
        replies: vec![Script::reply(reply.clone())],
        settings: StreamSettings {
            threshold: 10,
            interval: Duration::ZERO,
        },
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("안녕");
    h.controller.run_until_idle().await;

    assert_eq!(h.controller.turn_state(), TurnState::Idle);
    assert_eq!(h.last_text(), reply);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_microphone() {
    let mut h = Setup::default().build();

    assert!(h.controller.start_capture());
    h.controller.shutdown();
    h.controller.shutdown();

    assert_eq!(*h.releases.lock().unwrap(), 1);
    assert!(!h.controller.start_capture());
}

#[tokio::test(start_paused = true)]
async fn test_tts_reads_interview_replies() {
    let mut h = Setup {
        tts: true,
        replies: vec![Script::reply("모의 면접을 시작합니다"), Script::reply("좋아요")],
        ..Setup::default()
    }
    .build();

    h.controller.submit_text("면접 연습");
    h.controller.run_until_idle().await;
    h.controller.submit_text("다음");
    h.controller.run_until_idle().await;

    let spoken = h.speech.lock().unwrap().spoken.clone();
    assert_eq!(spoken.last().map(String::as_str), Some("모의 면접을 시작합니다"));
    assert!(!spoken.iter().any(|s| s == "좋아요"));
    assert!(!spoken.iter().any(|s| s == "면접 연습"));
}

#[tokio::test(start_paused = true)]
async fn test_tts_toggle() {
    let mut h = Setup {
        replies: vec![Script::reply("면접 질문 드립니다")],
        ..Setup::default()
    }
    .build();

    assert!(!h.controller.tts_enabled());
    h.controller.submit_text("시작");
    h.controller.run_until_idle().await;
    assert!(h.speech.lock().unwrap().spoken.is_empty());

    assert!(h.controller.toggle_tts());
    assert!(!h.controller.toggle_tts());
    assert!(h.speech.lock().unwrap().cancels >= 1);
}
