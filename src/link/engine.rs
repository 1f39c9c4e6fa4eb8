//! Synchronous command engine
//!
//! Every command holds the command lock for its whole exchange: clear stale
//! input, write the frame, read the response through the flow-controlled
//! reader and check it. Nothing is retried except the break handshake.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::reader::read_n;
use super::Link;
use crate::error::{CommandError, ProtocolError};
use crate::events::EventSink;
use crate::protocol::codec::{decode_arg, decode_label, decode_unsigned, encode_label, ARG_MAX};
use crate::protocol::frame::*;
use crate::state::{RecognitionKind, SessionMode};
use crate::transport::Transport;

/// Default wait for each response byte
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(2000);
/// Playback blocks the module until it finishes
pub const RESPONSE_LONG_TIMEOUT: Duration = Duration::from_millis(60000);
/// The module gives up training after 3 seconds
pub const TRAIN_TIMEOUT: Duration = Duration::from_millis(5000);
/// Break handshake attempts before giving up
pub const BREAK_ATTEMPTS: usize = 100;

/// Count reported for a group with no free slot
const FULL_GROUP: u8 = 32;
/// Sound table entries addressable by the two-argument index
const SOUND_INDEX_LIMIT: u16 = 32 * (ARG_MAX as u16 + 1);

/// State guarded by the command lock
#[derive(Debug, Default)]
struct CommandState {
    /// Last recognition timeout the module accepted
    recognition_timeout: Option<u8>,
}

/// Training data of a custom command as reported by the dump command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDump {
    /// -1 when empty, otherwise training count plus conflict flags
    pub info: i32,
    /// Position of the conflicting command, meaningful only when trained
    pub conflict: i32,
    pub label: String,
}

impl CommandDump {
    const SD_CONFLICT: i32 = 8;
    const SI_CONFLICT: i32 = 16;

    pub fn is_empty(&self) -> bool {
        self.info < 0
    }

    pub fn training_count(&self) -> u8 {
        if self.is_empty() {
            0
        } else {
            (self.info & 0x07) as u8
        }
    }

    /// Conflicts with another custom command or a password
    pub fn has_sd_conflict(&self) -> bool {
        !self.is_empty() && self.info & Self::SD_CONFLICT != 0
    }

    /// Conflicts with a built-in word
    pub fn has_si_conflict(&self) -> bool {
        !self.is_empty() && self.info & Self::SI_CONFLICT != 0
    }
}

impl fmt::Display for CommandDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.info, self.conflict, self.label)
    }
}

/// Result of a training attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    Trained,
    /// Too similar to the custom command at this position
    SimilarToCommand(i32),
    /// Too similar to the built-in word at this index
    SimilarToWord(i32),
    /// Module reported an error code, negated like recognition errors
    Error(i32),
}

impl fmt::Display for TrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainOutcome::Trained => write!(f, "trained"),
            TrainOutcome::SimilarToCommand(i) => write!(f, "similar_to_sd {}", i),
            TrainOutcome::SimilarToWord(i) => write!(f, "similar_to_si {}", i),
            TrainOutcome::Error(code) => write!(f, "error {}", code),
        }
    }
}

/// Issues commands to the module, one at a time
pub struct CommandEngine {
    link: Arc<Link>,
    state: Mutex<CommandState>,
}

impl CommandEngine {
    pub fn new(transport: Arc<dyn Transport>, events: Arc<dyn EventSink>) -> Self {
        Self {
            link: Arc::new(Link::new(transport, events)),
            state: Mutex::new(CommandState::default()),
        }
    }

    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    pub fn mode(&self) -> SessionMode {
        self.link.mode()
    }

    /// Interrupt any pending recognition or playback and resynchronize
    pub fn break_link(&self) -> Result<(), CommandError> {
        let _state = self.state.lock();
        self.break_locked()
    }

    /// Set the delay the module waits before transmitting a response
    pub fn set_transmit_delay(&self, delay: u8) -> Result<(), CommandError> {
        self.simple(Frame::new(CMD_DELAY).arg(arg("delay", delay)?))
    }

    /// Query the module ID
    pub fn identify(&self) -> Result<u8, CommandError> {
        let frame = Frame::new(CMD_ID);
        let _state = self.state.lock();
        self.ensure_idle();
        let response = self.exchange(&frame, 2, RESPONSE_TIMEOUT)?;
        expect_tag(&frame, response[0])?;
        let id = decode_unsigned(response[1])?;
        info!(id, "module identified");
        Ok(id)
    }

    /// Set the recognition timeout in seconds (0 = infinite)
    pub fn set_recognition_timeout(&self, seconds: u8) -> Result<(), CommandError> {
        let frame = Frame::new(CMD_TIMEOUT).arg(arg("timeout", seconds)?);
        let mut state = self.state.lock();
        if state.recognition_timeout == Some(seconds) {
            debug!(seconds, "recognition timeout unchanged");
            return Ok(());
        }
        self.ensure_idle();
        self.expect_success(&frame, RESPONSE_TIMEOUT)?;
        state.recognition_timeout = Some(seconds);
        Ok(())
    }

    /// Set the custom command strictness level (1 easy - 5 hard)
    pub fn set_sd_level(&self, level: u8) -> Result<(), CommandError> {
        self.simple(Frame::new(CMD_LEVEL).arg(arg("level", level)?))
    }

    /// Set the built-in word confidence threshold (0 loosest - 4 tightest)
    pub fn set_si_knob(&self, knob: u8) -> Result<(), CommandError> {
        self.simple(Frame::new(CMD_KNOB).arg(arg("knob", knob)?))
    }

    pub fn set_si_language(&self, language: u8) -> Result<(), CommandError> {
        self.simple(Frame::new(CMD_LANGUAGE).arg(arg("language", language)?))
    }

    pub fn set_mic_distance(&self, distance: u8) -> Result<(), CommandError> {
        self.simple(Frame::new(CMD_KNOB).raw(SUB_EXTENDED).arg(arg("distance", distance)?))
    }

    /// Erase all custom commands, groups and passwords
    pub fn reset_all(&self) -> Result<(), CommandError> {
        self.simple(Frame::new(CMD_RESETALL).raw(RESETALL_CONFIRM))
    }

    /// Add a custom command to a group and name it
    ///
    /// The encoded label must fit one argument byte (at most 63 bytes, each
    /// digit taking two). The slot allocated by the first phase stays
    /// allocated when naming fails.
    pub fn add_command(&self, group: u8, position: u8, label: &str) -> Result<(), CommandError> {
        let (group, position) = slot(group, position)?;
        let encoded = encode_label(label);
        let length = i32::try_from(encoded.len()).unwrap_or(i32::MAX);
        let length = arg("label length", length)?;

        let _state = self.state.lock();
        self.ensure_idle();
        self.expect_success(
            &Frame::new(CMD_GROUP_SD).arg(group).arg(position),
            RESPONSE_TIMEOUT,
        )?;
        let name = Frame::new(CMD_NAME_SD)
            .arg(group)
            .arg(position)
            .arg(length)
            .payload(&encoded);
        self.expect_success(&name, RESPONSE_TIMEOUT)?;
        info!(group, position, label, "custom command added");
        Ok(())
    }

    /// Erase the training data of a custom command
    pub fn erase_command(&self, group: u8, position: u8) -> Result<(), CommandError> {
        let (group, position) = slot(group, position)?;
        self.simple(Frame::new(CMD_ERASE_SD).arg(group).arg(position))
    }

    /// Remove a custom command from its group
    pub fn remove_command(&self, group: u8, position: u8) -> Result<(), CommandError> {
        let (group, position) = slot(group, position)?;
        self.simple(Frame::new(CMD_UNGROUP_SD).arg(group).arg(position))
    }

    /// Number of custom commands in a group
    pub fn count_commands(&self, group: u8) -> Result<u8, CommandError> {
        let frame = Frame::new(CMD_COUNT_SD).arg(arg("group", group)?);
        let _state = self.state.lock();
        self.ensure_idle();
        let response = self.exchange(&frame, 2, RESPONSE_TIMEOUT)?;
        expect_tag(&frame, response[0])?;
        match decode_arg(response[1]) {
            -1 => Ok(FULL_GROUP),
            _ => Ok(decode_unsigned(response[1])?),
        }
    }

    /// Read back a custom command's training data and label
    pub fn dump_command(&self, group: u8, position: u8) -> Result<CommandDump, CommandError> {
        let (group, position) = slot(group, position)?;
        let frame = Frame::new(CMD_DUMP_SD).arg(group).arg(position);
        let _state = self.state.lock();
        self.ensure_idle();
        let header = self.exchange(&frame, 4, RESPONSE_TIMEOUT)?;
        if header[0] != STS_DATA {
            return Err(unexpected(&frame, header[0]));
        }

        let expected = usize::from(decode_unsigned(header[3])?);
        let label = read_n(self.link.transport(), expected, RESPONSE_TIMEOUT)?;
        if label.len() != expected {
            return Err(ProtocolError::LengthMismatch {
                expected,
                actual: label.len(),
            }
            .into());
        }

        Ok(CommandDump {
            info: decode_arg(header[1]),
            conflict: decode_arg(header[2]),
            label: decode_label(&label)?,
        })
    }

    /// Train a custom command; the user must speak within 3 seconds
    pub fn train_command(&self, group: u8, position: u8) -> Result<TrainOutcome, CommandError> {
        let (g, p) = slot(group, position)?;
        let frame = Frame::new(CMD_TRAIN_SD).arg(g).arg(p);
        let _state = self.state.lock();
        self.ensure_idle();
        let status = self.exchange(&frame, 1, TRAIN_TIMEOUT)?[0];
        let outcome = match status {
            STS_SUCCESS => TrainOutcome::Trained,
            STS_RESULT => TrainOutcome::SimilarToCommand(decode_arg(self.read(&frame, 1)?[0])),
            STS_SIMILAR => TrainOutcome::SimilarToWord(decode_arg(self.read(&frame, 1)?[0])),
            STS_ERROR => {
                let code = self.read(&frame, 2)?;
                TrainOutcome::Error(-(16 * decode_arg(code[0]) + decode_arg(code[1])))
            }
            other => return Err(unexpected(&frame, other)),
        };
        info!(group, position, %outcome, "training finished");
        Ok(outcome)
    }

    /// Play a phone tone
    ///
    /// `tone` is 0-9 for digits, 10 for `*`, 11 for `#`, 12-15 for `A`-`D`
    /// and -1 for the dial tone. `duration` is 1-32 in 40 ms units, or
    /// seconds for the dial tone.
    pub fn play_phone_tone(&self, tone: i8, duration: u8) -> Result<(), CommandError> {
        let tone = match tone {
            -1 => -1,
            other => arg("tone", other)?,
        };
        let frame = Frame::new(CMD_PLAY)
            .raw(SUB_EXTENDED)
            .arg(tone)
            .arg(arg("duration", duration)?);
        let _state = self.state.lock();
        self.ensure_idle();
        self.expect_success(&frame, RESPONSE_LONG_TIMEOUT)
    }

    /// Play entry `index` of the sound table (0 = beep) at `volume` (0-31)
    pub fn play_sound(&self, index: u16, volume: u8) -> Result<(), CommandError> {
        if index >= SOUND_INDEX_LIMIT {
            return Err(CommandError::InvalidArgument {
                name: "index",
                value: index.into(),
            });
        }
        let index = i32::from(index);
        let frame = Frame::new(CMD_PLAY)
            .arg(index / 32)
            .arg(index % 32)
            .arg(arg("volume", volume)?);
        let _state = self.state.lock();
        self.ensure_idle();
        self.expect_success(&frame, RESPONSE_LONG_TIMEOUT)
    }

    /// Start recognizing a custom command of `group`
    ///
    /// Returns as soon as the request is written; the outcome arrives as a
    /// `CommandRecognized` event.
    pub fn recognize_command(&self, group: u8) -> Result<(), CommandError> {
        self.start_recognition(RecognitionKind::Command, group)
    }

    /// Start recognizing a built-in word of `group`
    ///
    /// Returns as soon as the request is written; the outcome arrives as a
    /// `WordRecognized` event.
    pub fn recognize_word(&self, group: u8) -> Result<(), CommandError> {
        self.start_recognition(RecognitionKind::Word, group)
    }

    fn start_recognition(&self, kind: RecognitionKind, group: u8) -> Result<(), CommandError> {
        let frame = Frame::new(kind.command_tag()).arg(arg("group", group)?);
        let _state = self.state.lock();
        self.ensure_idle();

        let transport = self.link.transport();
        transport.clear_input_buffer()?;
        self.link.begin_recognition(kind, group);
        let started = transport
            .attach_listener(self.link.clone())
            .and_then(|()| transport.write(frame.as_bytes()));

        if let Err(e) = started {
            warn!(%kind, group, error = %e, "recognition start failed");
            let _ = transport.detach_listener();
            self.link.force_idle();
            return Err(e.into());
        }
        debug!(%kind, group, "recognition started");
        Ok(())
    }

    /// Break out of an outstanding recognition before a new command
    fn ensure_idle(&self) {
        if self.link.mode().is_idle() {
            return;
        }
        if let Err(e) = self.break_locked() {
            warn!(error = %e, "break before command failed");
        }
    }

    fn break_locked(&self) -> Result<(), CommandError> {
        let transport = self.link.transport();
        if let Err(e) = transport.detach_listener() {
            debug!(error = %e, "listener detach failed");
        }
        self.link.force_idle();

        let frame = Frame::new(CMD_BREAK);
        for attempt in 1..=BREAK_ATTEMPTS {
            transport.clear_input_buffer()?;
            transport.write(frame.as_bytes())?;
            let response = read_n(transport, 1, RESPONSE_TIMEOUT)?;
            if response.first() == Some(&STS_SUCCESS) {
                debug!(attempt, "break acknowledged");
                return Ok(());
            }
        }

        warn!(attempts = BREAK_ATTEMPTS, "break not acknowledged");
        Err(CommandError::BreakFailed {
            attempts: BREAK_ATTEMPTS,
        })
    }

    /// Lock, then run a command whose only answer is the success byte
    fn simple(&self, frame: Frame) -> Result<(), CommandError> {
        let _state = self.state.lock();
        self.ensure_idle();
        self.expect_success(&frame, RESPONSE_TIMEOUT)
    }

    fn expect_success(&self, frame: &Frame, timeout: Duration) -> Result<(), CommandError> {
        let status = self.exchange(frame, 1, timeout)?[0];
        if status == STS_SUCCESS {
            Ok(())
        } else {
            Err(unexpected(frame, status))
        }
    }

    /// Send `frame` and read exactly `len` response bytes
    fn exchange(&self, frame: &Frame, len: usize, timeout: Duration) -> Result<Vec<u8>, CommandError> {
        let transport = self.link.transport();
        transport.clear_input_buffer()?;
        transport.write(frame.as_bytes())?;
        debug!(command = %char::from(frame.tag()), "command sent");
        self.read_timed(frame, len, timeout)
    }

    /// Read `len` more bytes of the current response
    fn read(&self, frame: &Frame, len: usize) -> Result<Vec<u8>, CommandError> {
        self.read_timed(frame, len, RESPONSE_TIMEOUT)
    }

    fn read_timed(&self, frame: &Frame, len: usize, timeout: Duration) -> Result<Vec<u8>, CommandError> {
        let response = read_n(self.link.transport(), len, timeout)?;
        if response.len() < len {
            return Err(CommandError::Timeout {
                command: char::from(frame.tag()),
                expected: len,
                received: response.len(),
            });
        }
        Ok(response)
    }
}

/// Check a numeric argument against the one-byte encoding
fn arg(name: &'static str, value: impl Into<i32>) -> Result<i32, CommandError> {
    let value = value.into();
    if (0..=ARG_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(CommandError::InvalidArgument { name, value })
    }
}

fn slot(group: u8, position: u8) -> Result<(i32, i32), CommandError> {
    Ok((arg("group", group)?, arg("position", position)?))
}

fn expect_tag(frame: &Frame, byte: u8) -> Result<(), CommandError> {
    if byte == frame.tag() {
        Ok(())
    } else {
        Err(unexpected(frame, byte))
    }
}

fn unexpected(frame: &Frame, byte: u8) -> CommandError {
    let command = char::from(frame.tag());
    warn!(%command, byte, "unexpected response");
    ProtocolError::UnexpectedResponse { command, byte }.into()
}
