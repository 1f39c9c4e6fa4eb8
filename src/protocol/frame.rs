//! Command frames, command tags and response status bytes

use super::codec::encode_arg;

pub const CMD_BREAK: u8 = b'b';
pub const CMD_DELAY: u8 = b'y';
pub const CMD_ID: u8 = b'x';
pub const CMD_TIMEOUT: u8 = b'o';
pub const CMD_LEVEL: u8 = b'v';
pub const CMD_KNOB: u8 = b'k';
pub const CMD_LANGUAGE: u8 = b'l';
pub const CMD_RESETALL: u8 = b'r';
pub const CMD_GROUP_SD: u8 = b'g';
pub const CMD_NAME_SD: u8 = b'n';
pub const CMD_ERASE_SD: u8 = b'e';
pub const CMD_UNGROUP_SD: u8 = b'u';
pub const CMD_COUNT_SD: u8 = b'c';
pub const CMD_DUMP_SD: u8 = b'p';
pub const CMD_TRAIN_SD: u8 = b't';
pub const CMD_PLAY: u8 = b'w';
pub const CMD_RECOG_SD: u8 = b'd';
pub const CMD_RECOG_SI: u8 = b'i';

/// Sub-command selector for mic distance and DTMF playback
pub const SUB_EXTENDED: u8 = b'@';
/// Confirmation byte for reset-all
pub const RESETALL_CONFIRM: u8 = b'R';

/// Command accepted
pub const STS_SUCCESS: u8 = b'o';
/// Dump data follows
pub const STS_DATA: u8 = b'd';
/// Custom command recognized (or trained one is similar to it)
pub const STS_RESULT: u8 = b'r';
/// Built-in word recognized (or trained one is similar to it)
pub const STS_SIMILAR: u8 = b's';
/// Error code follows as two nibbles
pub const STS_ERROR: u8 = b'e';

/// Flow-control acknowledgement written after every received byte
pub const ACK: u8 = b' ';

/// A command tag followed by encoded arguments and an optional raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    pub fn new(tag: u8) -> Self {
        Self { bytes: vec![tag] }
    }

    /// Append an encoded numeric argument
    pub fn arg(mut self, value: i32) -> Self {
        self.bytes.push(encode_arg(value));
        self
    }

    /// Append a byte as-is
    pub fn raw(mut self, byte: u8) -> Self {
        self.bytes.push(byte);
        self
    }

    pub fn payload(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn tag(&self) -> u8 {
        self.bytes[0]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
