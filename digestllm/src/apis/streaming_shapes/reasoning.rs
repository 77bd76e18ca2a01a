//! Inline reasoning demultiplexer.
//!
//! Some OpenAI-compatible providers return chain-of-thought inside the normal
//! content channel, wrapped in `<think>...</think>`. [`ReasoningSplitter`]
//! separates that text into a visible channel and a reasoning channel while
//! fragments arrive, including markers split across fragments.

use serde::{Deserialize, Serialize};

pub const DEFAULT_REASONING_START: &str = "<think>";
pub const DEFAULT_REASONING_END: &str = "</think>";

/// Literal strings delimiting an inline reasoning region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningMarkers {
    pub start: String,
    pub end: String,
}

impl Default for ReasoningMarkers {
    fn default() -> Self {
        Self {
            start: DEFAULT_REASONING_START.to_string(),
            end: DEFAULT_REASONING_END.to_string(),
        }
    }
}

impl ReasoningMarkers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// The marker that would end the given state.
    fn closing(&self, state: ReasoningState) -> &str {
        match state {
            ReasoningState::Visible => &self.start,
            ReasoningState::Reasoning => &self.end,
        }
    }
}

/// Which channel text is currently routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningState {
    #[default]
    Visible,
    Reasoning,
}

impl ReasoningState {
    fn toggled(self) -> Self {
        match self {
            ReasoningState::Visible => ReasoningState::Reasoning,
            ReasoningState::Reasoning => ReasoningState::Visible,
        }
    }
}

/// A piece of text routed to one output channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "text", rename_all = "lowercase")]
pub enum ChannelDelta {
    Visible(String),
    Reasoning(String),
}

impl ChannelDelta {
    pub fn text(&self) -> &str {
        match self {
            ChannelDelta::Visible(text) | ChannelDelta::Reasoning(text) => text,
        }
    }

    pub fn is_reasoning(&self) -> bool {
        matches!(self, ChannelDelta::Reasoning(_))
    }
}

/// Streaming splitter for inline reasoning markers.
///
/// Regions are flat: a start marker seen while already inside a reasoning
/// region is ordinary reasoning text. The holdback never exceeds
/// `max(start.len(), end.len()) - 1` bytes between calls.
#[derive(Debug)]
pub struct ReasoningSplitter {
    markers: ReasoningMarkers,
    state: ReasoningState,
    buffer: String,
}

impl Default for ReasoningSplitter {
    fn default() -> Self {
        Self::new(ReasoningMarkers::default())
    }
}

impl ReasoningSplitter {
    pub fn new(markers: ReasoningMarkers) -> Self {
        Self {
            markers,
            state: ReasoningState::Visible,
            buffer: String::new(),
        }
    }

    /// Feed a fragment and return the text that can be routed with certainty.
    pub fn push(&mut self, fragment: &str) -> Vec<ChannelDelta> {
        self.buffer.push_str(fragment);
        let mut emitted = Vec::new();

        loop {
            let marker = self.markers.closing(self.state);
            if marker.is_empty() {
                let ready = std::mem::take(&mut self.buffer);
                push_delta(&mut emitted, self.state, ready);
                break;
            }

            if let Some(position) = self.buffer.find(marker) {
                let before: String = self.buffer.drain(..position).collect();
                push_delta(&mut emitted, self.state, before);
                self.buffer.drain(..marker.len());
                self.state = self.state.toggled();
                continue;
            }

            let held = partial_marker_len(&self.buffer, marker);
            let ready_len = self.buffer.len() - held;
            let ready: String = self.buffer.drain(..ready_len).collect();
            push_delta(&mut emitted, self.state, ready);
            break;
        }

        emitted
    }

    /// Emit whatever is held back to the channel of the current state. An
    /// unterminated region belongs to that channel.
    pub fn flush(&mut self) -> Vec<ChannelDelta> {
        let mut emitted = Vec::new();
        let rest = std::mem::take(&mut self.buffer);
        push_delta(&mut emitted, self.state, rest);
        emitted
    }

    pub fn state(&self) -> ReasoningState {
        self.state
    }

    /// Text held back because it may be the beginning of a marker.
    pub fn held_back(&self) -> &str {
        &self.buffer
    }
}

fn push_delta(emitted: &mut Vec<ChannelDelta>, state: ReasoningState, text: String) {
    if text.is_empty() {
        return;
    }
    emitted.push(match state {
        ReasoningState::Visible => ChannelDelta::Visible(text),
        ReasoningState::Reasoning => ChannelDelta::Reasoning(text),
    });
}

/// Length of the longest suffix of `text` that is a strict, non-empty prefix
/// of `marker`.
fn partial_marker_len(text: &str, marker: &str) -> usize {
    let longest = marker.len().saturating_sub(1).min(text.len());
    (1..=longest)
        .rev()
        .find(|&len| {
            text.is_char_boundary(text.len() - len)
                && marker.is_char_boundary(len)
                && text.ends_with(&marker[..len])
        })
        .unwrap_or(0)
}
