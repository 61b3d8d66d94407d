//! Protocol definitions for EVT inverter communication.
//!
//! This module contains the wire-level pieces of the protocol:
//! - Command frame construction (poll, acknowledge)
//! - The status frame layout table
//! - Status frame decoding

pub mod frame;
pub mod layout;
pub mod parser;

pub use frame::{
    COMMAND_FRAME_LEN, CommandFrame, FRAME_END, FRAME_START, MessageKind, SERIAL_DIGITS,
    encode_bcd,
};
pub use layout::STATUS_FRAME_LEN;
pub use parser::decode_status_frame;
