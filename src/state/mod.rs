//! Link state: session mode and the recognition result decoder
//!
//! - Idle: synchronous commands may run
//! - AwaitingWordRecognition: a built-in word recognition is outstanding
//! - AwaitingCommandRecognition: a custom command recognition is outstanding

mod recognition;
mod session;

pub use recognition::{ParseState, RecognitionKind, Transition, NO_MATCH};
pub use session::{Session, SessionMode};
