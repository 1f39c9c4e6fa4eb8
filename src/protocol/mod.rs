//! EasyVR serial protocol definitions
//!
//! Frames are a single command tag byte followed by arguments encoded as
//! `'A' + value`. Every byte the device sends must be acknowledged with a
//! space before it sends the next one.

pub mod codec;
pub mod frame;

pub use codec::{decode_arg, decode_label, encode_arg, encode_label};
pub use frame::Frame;
