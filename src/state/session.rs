//! Link session mode
//!
//! The link is either idle, ready for synchronous commands, or waiting for
//! the outcome of a recognition it started.

use tracing::{debug, info, trace};

use super::recognition::{ParseState, RecognitionKind, Transition};
use crate::events::DeviceEvent;

/// What the link is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Idle,
    /// Waiting for a built-in word result for the given group
    AwaitingWordRecognition(u8),
    /// Waiting for a custom command result for the given group
    AwaitingCommandRecognition(u8),
}

impl SessionMode {
    pub fn awaiting(kind: RecognitionKind, group: u8) -> Self {
        match kind {
            RecognitionKind::Word => SessionMode::AwaitingWordRecognition(group),
            RecognitionKind::Command => SessionMode::AwaitingCommandRecognition(group),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionMode::Idle)
    }

    /// Outstanding recognition, if any
    pub fn recognition(&self) -> Option<(RecognitionKind, u8)> {
        match *self {
            SessionMode::Idle => None,
            SessionMode::AwaitingWordRecognition(g) => Some((RecognitionKind::Word, g)),
            SessionMode::AwaitingCommandRecognition(g) => Some((RecognitionKind::Command, g)),
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Idle => write!(f, "Idle"),
            SessionMode::AwaitingWordRecognition(g) => write!(f, "AwaitingWordRecognition({})", g),
            SessionMode::AwaitingCommandRecognition(g) => {
                write!(f, "AwaitingCommandRecognition({})", g)
            }
        }
    }
}

/// Session mode plus the decoder position of the outstanding recognition
#[derive(Debug, Default)]
pub struct Session {
    mode: SessionMode,
    parse: ParseState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn parse_state(&self) -> ParseState {
        self.parse
    }

    /// Enter an awaiting mode with a fresh decoder
    pub fn begin(&mut self, kind: RecognitionKind, group: u8) {
        self.transition_to(SessionMode::awaiting(kind, group));
        self.parse = ParseState::Start;
    }

    /// Drop any outstanding recognition
    pub fn reset(&mut self) {
        if !self.mode.is_idle() {
            self.transition_to(SessionMode::Idle);
        }
        self.parse = ParseState::Start;
    }

    /// Feed one received byte; yields the event once the result is complete
    pub fn feed(&mut self, byte: u8) -> Option<DeviceEvent> {
        let Some((kind, group)) = self.mode.recognition() else {
            trace!(byte, "byte received while idle, ignored");
            return None;
        };

        match self.parse.advance(kind, byte) {
            Transition::Continue(next) => {
                trace!(byte, from = ?self.parse, to = ?next, "recognition decoder step");
                self.parse = next;
                None
            }
            Transition::Finish(value) => {
                self.reset();
                let event = DeviceEvent::recognized(kind, group, value);
                debug!(?event, "recognition complete");
                Some(event)
            }
        }
    }

    fn transition_to(&mut self, mode: SessionMode) {
        info!(from = %self.mode, to = %mode, "session mode change");
        self.mode = mode;
    }
}
