//! Command frame construction for the EVT protocol.
//!
//! Poll and acknowledge commands share a single fixed-size envelope and
//! differ only in their control and check bytes:
//! ```text
//! ┌──────┬──────────┬──────┬──────┬─────────┬────────────┬──────────┬───────┬──────┐
//! │ 0x68 │ len (BE) │ 0x68 │ 0x10 │ control │ serial BCD │ reserved │ check │ 0x16 │
//! │  1   │    2     │  1   │  1   │    1    │     4      │    5     │   1   │  1   │
//! └──────┴──────────┴──────┴──────┴─────────┴────────────┴──────────┴───────┴──────┘
//! ```

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Frame start marker, repeated after the length field.
pub const FRAME_START: u8 = 0x68;

/// Frame end marker.
pub const FRAME_END: u8 = 0x16;

/// Address byte of host-to-inverter commands.
pub const COMMAND_ADDRESS: u8 = 0x10;

/// Value of the length field in command frames.
pub const COMMAND_LENGTH_FIELD: u16 = 0x0010;

/// Total size of a command frame on the wire.
pub const COMMAND_FRAME_LEN: usize = 17;

/// Number of decimal digits in an inverter serial number.
pub const SERIAL_DIGITS: usize = 8;

/// Zero-filled bytes between the serial number and the check byte.
const RESERVED_LEN: usize = 5;

/// Kind of command sent to the inverter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Prompts the inverter to report its status.
    Poll,
    /// Confirms receipt of a status frame.
    Acknowledge,
}

impl MessageKind {
    /// Control byte identifying the command.
    #[must_use]
    pub const fn control(self) -> u8 {
        match self {
            Self::Poll => 0x77,
            Self::Acknowledge => 0x50,
        }
    }

    /// Check byte transmitted before the end marker.
    #[must_use]
    pub const fn check(self) -> u8 {
        match self {
            Self::Poll => 0x9f,
            Self::Acknowledge => 0x78,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll => f.write_str("poll"),
            Self::Acknowledge => f.write_str("ack"),
        }
    }
}

/// Packs an 8-digit decimal serial number into 4 BCD bytes.
///
/// # Example
///
/// ```
/// use openevt::protocol::encode_bcd;
///
/// assert_eq!(encode_bcd("31583078").unwrap(), [0x31, 0x58, 0x30, 0x78]);
/// assert!(encode_bcd("3158307").is_err());
/// ```
pub fn encode_bcd(serial: &str) -> Result<[u8; SERIAL_DIGITS / 2]> {
    let digits = serial.as_bytes();

    if digits.len() != SERIAL_DIGITS {
        return Err(Error::InvalidSerial {
            serial: serial.to_owned(),
            reason: "expected exactly 8 digits",
        });
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(Error::InvalidSerial {
            serial: serial.to_owned(),
            reason: "serial number must be decimal",
        });
    }

    let mut packed = [0u8; SERIAL_DIGITS / 2];
    for (byte, pair) in packed.iter_mut().zip(digits.chunks_exact(2)) {
        *byte = ((pair[0] - b'0') << 4) | (pair[1] - b'0');
    }
    Ok(packed)
}

/// An outbound command, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    kind: MessageKind,
    bytes: Bytes,
}

impl CommandFrame {
    /// Builds a command of the given kind addressed to `serial`.
    pub fn new(kind: MessageKind, serial: &str) -> Result<Self> {
        let serial = encode_bcd(serial)?;

        let mut buf = BytesMut::with_capacity(COMMAND_FRAME_LEN);
        buf.put_u8(FRAME_START);
        buf.put_u16(COMMAND_LENGTH_FIELD);
        buf.put_u8(FRAME_START);
        buf.put_u8(COMMAND_ADDRESS);
        buf.put_u8(kind.control());
        buf.put_slice(&serial);
        buf.put_bytes(0, RESERVED_LEN);
        buf.put_u8(kind.check());
        buf.put_u8(FRAME_END);

        Ok(Self {
            kind,
            bytes: buf.freeze(),
        })
    }

    /// Builds a poll command.
    pub fn poll(serial: &str) -> Result<Self> {
        Self::new(MessageKind::Poll, serial)
    }

    /// Builds an acknowledge command.
    pub fn acknowledge(serial: &str) -> Result<Self> {
        Self::new(MessageKind::Acknowledge, serial)
    }

    /// Returns the command kind.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns the wire bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns a cheap handle to the wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_frame_bytes() {
        let frame = CommandFrame::acknowledge("31583078").unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[
                0x68, 0x00, 0x10, 0x68, 0x10, 0x50, 0x31, 0x58, 0x30, 0x78, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x78, 0x16
            ]
        );
        assert_eq!(frame.to_string(), "6800106810503158307800000000007816");
    }

    #[test]
    fn test_poll_frame_layout() {
        let frame = CommandFrame::poll("31583078").unwrap();
        let bytes = frame.as_bytes();

        assert_eq!(frame.kind(), MessageKind::Poll);
        assert_eq!(bytes[0], FRAME_START);
        assert_eq!(&bytes[1..3], &[0x00, 0x10]);
        assert_eq!(bytes[3], FRAME_START);
        assert_eq!(bytes[5], MessageKind::Poll.control());
        assert_eq!(&bytes[6..10], &[0x31, 0x58, 0x30, 0x78]);
        assert_eq!(bytes[15], MessageKind::Poll.check());
        assert_eq!(bytes[16], FRAME_END);
    }

    #[test]
    fn test_poll_and_ack_differ_only_in_control_and_check() {
        let poll = CommandFrame::poll("00000001").unwrap();
        let ack = CommandFrame::acknowledge("00000001").unwrap();

        let differing: Vec<usize> = (0..COMMAND_FRAME_LEN)
            .filter(|&i| poll.as_bytes()[i] != ack.as_bytes()[i])
            .collect();
        assert_eq!(differing, vec![5, 15]);
    }

    #[test]
    fn test_valid_serials_have_fixed_length() {
        for serial in ["00000000", "99999999", "12345678", "31583078"] {
            assert_eq!(CommandFrame::poll(serial).unwrap().as_bytes().len(), COMMAND_FRAME_LEN);
            assert_eq!(
                CommandFrame::acknowledge(serial).unwrap().as_bytes().len(),
                COMMAND_FRAME_LEN
            );
        }
    }

    #[test]
    fn test_rejects_illegal_serials() {
        for serial in ["", "315g3078", "3158307", "315830781", " 3158307", "3158307８"] {
            assert!(
                matches!(CommandFrame::poll(serial), Err(Error::InvalidSerial { .. })),
                "poll accepted {serial:?}"
            );
            assert!(
                matches!(CommandFrame::acknowledge(serial), Err(Error::InvalidSerial { .. })),
                "ack accepted {serial:?}"
            );
        }
    }

    #[test]
    fn test_bcd_packing() {
        assert_eq!(encode_bcd("12345678").unwrap(), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(encode_bcd("09090909").unwrap(), [0x09, 0x09, 0x09, 0x09]);
    }
}
