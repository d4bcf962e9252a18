//! User-facing progress feedback.
//!
//! The feedback sink is the only narration of the client's milestones a user
//! sees (discovery result, connect, handshake progress and failure, received
//! items). It is passed to the client explicitly.

use parking_lot::Mutex;

/// Receives user-facing progress messages.
pub trait Feedback: Send + Sync {
    /// Handles one message.
    fn message(&self, text: &str);
}

impl<F> Feedback for F
where
    F: Fn(&str) + Send + Sync,
{
    fn message(&self, text: &str) {
        self(text)
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeedback;

impl Feedback for NullFeedback {
    fn message(&self, _text: &str) {}
}

/// Keeps every message in order.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    messages: Mutex<Vec<String>>,
}

impl RecordingFeedback {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages received so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Returns the position of the first message containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.messages.lock().iter().position(|m| m.contains(needle))
    }
}

impl Feedback for RecordingFeedback {
    fn message(&self, text: &str) {
        self.messages.lock().push(text.to_string());
    }
}
