//! Simulated streaming: reveal an already-received reply one token at a time.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Replies shorter than this many characters are shown in one piece.
pub const DEFAULT_STREAM_THRESHOLD: usize = 100;
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(100);
const MIN_REVEAL_INTERVAL: Duration = Duration::from_millis(1);

/// Whether `reply` is long enough to be revealed incrementally.
pub fn should_stream(reply: &str, threshold: usize) -> bool {
    reply.chars().count() >= threshold
}

/// Tracks how much of a reply has been revealed.
///
/// Each step exposes one more whitespace-delimited token. Every revealed
/// prefix is a prefix of the next one, and the last step yields the reply
/// exactly (including trailing whitespace).
#[derive(Debug)]
pub struct StreamingPresenter {
    reply: String,
    boundaries: Vec<usize>,
    revealed: usize,
}

impl StreamingPresenter {
    pub fn new(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        let mut boundaries = token_ends(&reply);
        match boundaries.last_mut() {
            Some(last) => *last = reply.len(),
            None => boundaries.push(reply.len()),
        }
        Self {
            reply,
            boundaries,
            revealed: 0,
        }
    }

    /// Reveal the next token and return the visible prefix, or `None` once done.
    pub fn advance(&mut self) -> Option<&str> {
        let end = *self.boundaries.get(self.revealed)?;
        self.revealed += 1;
        Some(&self.reply[..end])
    }

    pub fn is_complete(&self) -> bool {
        self.revealed >= self.boundaries.len()
    }

    pub fn total_steps(&self) -> usize {
        self.boundaries.len()
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }
}

/// Byte offsets just past each non-whitespace run.
fn token_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut in_token = false;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_token {
                ends.push(idx);
            }
            in_token = false;
        } else {
            in_token = true;
        }
    }
    if in_token {
        ends.push(text.len());
    }
    ends
}

/// Handle to a running reveal timer. Stopping (or dropping) it guarantees no
/// further ticks are delivered by the timer task.
pub struct RevealHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RevealHandle {
    /// Call `on_tick` every `interval` until stopped or until it returns `false`.
    ///
    /// Intervals below one millisecond are raised to one millisecond.
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let interval = interval.max(MIN_REVEAL_INTERVAL);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of an interval completes immediately; skip it so
            // the placeholder is visible for one interval before growing.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
        });

        Self { cancel, task }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
