//! Conversation history for a planning session.
//!
//! History is append-only; prompts only ever see a bounded window of recent
//! turns, while the full sequence is retained for display and replay.

use serde::{Deserialize, Serialize};

/// Number of recent turns included in prompts.
pub const PROMPT_WINDOW: usize = 5;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Append-only ordered sequence of conversation turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Renders up to `window` turns preceding the most recent one as
    /// `Usuario:`/`Asistente:` lines for prompt interpolation.
    ///
    /// The most recent turn is excluded: it is the in-flight user message,
    /// which the prompt carries separately.
    pub fn render_recent(&self, window: usize) -> String {
        if self.turns.len() < 2 {
            return String::new();
        }
        let end = self.turns.len() - 1;
        let start = end.saturating_sub(window);
        let mut rendered = String::new();
        for turn in &self.turns[start..end] {
            let speaker = match turn.role {
                TurnRole::User => "Usuario",
                TurnRole::Assistant => "Asistente",
            };
            rendered.push_str(speaker);
            rendered.push_str(": ");
            rendered.push_str(&turn.text);
            rendered.push('\n');
        }
        rendered
    }
}
