//! Conversation transcript shown by the front ends.
//!
//! Display state only: the flow service keeps its own memory of the conversation, so nothing
//! here is sent back upstream or persisted.

use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn avatar(&self) -> &'static str {
        match self {
            Role::User => "👩",
            Role::Assistant => "🧶",
        }
    }
}

/// A single message in the transcript.
#[derive(Debug, Clone)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Local>,
}

impl TranscriptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            at: Local::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            at: Local::now(),
        }
    }
}

/// Ordered message history for the current UI session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<TranscriptMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: TranscriptMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut t = Transcript::new();
        t.push(TranscriptMessage::user("what to wear?"));
        t.push(TranscriptMessage::assistant("a wrap dress"));
        let roles: Vec<Role> = t.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(t.messages()[1].content, "a wrap dress");
    }

    #[test]
    fn avatars_per_role() {
        assert_eq!(Role::User.avatar(), "👩");
        assert_eq!(Role::Assistant.avatar(), "🧶");
    }

    #[test]
    fn clear_empties_history() {
        let mut t = Transcript::new();
        t.push(TranscriptMessage::user("hi"));
        t.clear();
        assert!(t.is_empty());
    }
}
