//! Recognition result decoder
//!
//! After a recognition command the module eventually sends one of:
//! - a result marker and the recognized index (`'r'` for custom commands,
//!   `'s'` for built-in words),
//! - `'e'` and an error code split into a high and a low nibble,
//! - anything else, meaning nothing was recognized.
//!
//! The decoder consumes exactly one byte per transition.

use crate::protocol::codec::decode_arg;
use crate::protocol::frame::{CMD_RECOG_SD, CMD_RECOG_SI, STS_ERROR, STS_RESULT, STS_SIMILAR};

/// Value reported when the first byte is not a known marker
pub const NO_MATCH: i32 = -1;

/// Which kind of recognition is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionKind {
    /// Speaker-independent built-in word
    Word,
    /// Speaker-dependent custom command
    Command,
}

impl RecognitionKind {
    /// Tag of the command that starts this recognition
    pub fn command_tag(self) -> u8 {
        match self {
            RecognitionKind::Word => CMD_RECOG_SI,
            RecognitionKind::Command => CMD_RECOG_SD,
        }
    }

    /// Marker byte that announces a recognized index
    pub fn result_marker(self) -> u8 {
        match self {
            RecognitionKind::Word => STS_SIMILAR,
            RecognitionKind::Command => STS_RESULT,
        }
    }
}

impl std::fmt::Display for RecognitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionKind::Word => write!(f, "word"),
            RecognitionKind::Command => write!(f, "command"),
        }
    }
}

/// Position inside the result sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    #[default]
    Start,
    /// Word recognition saw `'s'`
    SawSimilarMarker,
    /// Command recognition saw `'r'`
    SawResultMarker,
    SawErrorHighNibble,
    SawErrorLowNibblePending {
        high: i32,
    },
}

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continue(ParseState),
    /// Recognized index (>= 0) or negated error code
    Finish(i32),
}

impl ParseState {
    pub fn advance(self, kind: RecognitionKind, byte: u8) -> Transition {
        match self {
            ParseState::Start if byte == kind.result_marker() => Transition::Continue(match kind {
                RecognitionKind::Word => ParseState::SawSimilarMarker,
                RecognitionKind::Command => ParseState::SawResultMarker,
            }),
            ParseState::Start if byte == STS_ERROR => {
                Transition::Continue(ParseState::SawErrorHighNibble)
            }
            ParseState::Start => Transition::Finish(NO_MATCH),
            ParseState::SawSimilarMarker | ParseState::SawResultMarker => {
                Transition::Finish(decode_arg(byte))
            }
            ParseState::SawErrorHighNibble => {
                Transition::Continue(ParseState::SawErrorLowNibblePending {
                    high: 16 * decode_arg(byte),
                })
            }
            ParseState::SawErrorLowNibblePending { high } => {
                Transition::Finish(-(high + decode_arg(byte)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::encode_arg;

    fn run(kind: RecognitionKind, bytes: &[u8]) -> Option<i32> {
        let mut state = ParseState::Start;
        for &b in bytes {
            match state.advance(kind, b) {
                Transition::Continue(next) => state = next,
                Transition::Finish(value) => return Some(value),
            }
        }
        None
    }

    #[test]
    fn test_word_result() {
        assert_eq!(run(RecognitionKind::Word, &[b's', encode_arg(5)]), Some(5));
    }

    #[test]
    fn test_command_result() {
        assert_eq!(run(RecognitionKind::Command, &[b'r', encode_arg(12)]), Some(12));
    }

    #[test]
    fn test_error_code_nibbles() {
        let bytes = [b'e', encode_arg(1), encode_arg(2)];
        assert_eq!(run(RecognitionKind::Word, &bytes), Some(-18));
        assert_eq!(run(RecognitionKind::Command, &bytes), Some(-18));
    }

    #[test]
    fn test_unknown_first_byte_is_no_match() {
        assert_eq!(run(RecognitionKind::Word, b"x"), Some(NO_MATCH));
        assert_eq!(run(RecognitionKind::Command, b"x"), Some(NO_MATCH));
    }

    #[test]
    fn test_markers_are_mode_specific() {
        // 'r' is a result only for custom commands
        assert_eq!(run(RecognitionKind::Word, &[b'r', encode_arg(3)]), Some(NO_MATCH));
        assert_eq!(run(RecognitionKind::Command, &[b's', encode_arg(3)]), Some(NO_MATCH));
    }

    #[test]
    fn test_partial_sequence_pending() {
        assert_eq!(run(RecognitionKind::Command, &[b'e', encode_arg(1)]), None);
        assert_eq!(
            ParseState::SawErrorHighNibble.advance(RecognitionKind::Command, encode_arg(3)),
            Transition::Continue(ParseState::SawErrorLowNibblePending { high: 48 })
        );
    }
}
