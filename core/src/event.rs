//! Composition events delivered by the input method.
//!
//! A `CompositionEvent` is a snapshot of the IME composition at one point in
//! time: its lifecycle state, the composing (or committed) text and the caret
//! position inside it.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionState {
    /// No composition information
    #[default]
    None,
    /// A composition has started
    Start,
    /// The composition was closed by the input method
    End,
    /// The composing text or caret changed
    Compose,
    /// Text was committed
    Result,
}

impl CompositionState {
    /// Terminal states close the composition slot they are written to.
    pub fn is_terminal(self) -> bool {
        matches!(self, CompositionState::End | CompositionState::Result)
    }
}

/// One composition notification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompositionEvent {
    /// Lifecycle state
    pub state: CompositionState,
    /// Composing text for `Compose`, committed text for `Result`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Caret position inside the composing text, as reported by the OS
    #[serde(default)]
    pub cursor_pos: i32,
}

impl CompositionEvent {
    /// Create an empty event (`None` state, no text, caret at 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an event with a state and text.
    pub fn with_text<T: Into<String>>(state: CompositionState, text: T) -> Self {
        Self {
            state,
            text: Some(text.into()),
            cursor_pos: 0,
        }
    }

    /// Create an event carrying only a state.
    pub fn with_state(state: CompositionState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Clear all fields.
    pub fn reset(&mut self) {
        self.text = None;
        self.cursor_pos = 0;
        self.state = CompositionState::None;
    }

    /// Overwrite every field of `self` with `other`.
    pub fn copy_from(&mut self, other: &CompositionEvent) {
        self.state = other.state;
        self.text.clone_from(&other.text);
        self.cursor_pos = other.cursor_pos;
    }

    /// Text of the event, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
