//! Raw uplink framing for the point-to-point LoRa link
//!
//! Used when no LoRaWAN network stack is present: the receiving station needs
//! the application port and an integrity check around the payload.
//!
//! ```text
//! [version: u8][port: u8][length: u8][payload: [u8; length]][crc16: u16 LE]
//! ```
//!
//! The CRC is CRC-16-XMODEM over every preceding byte.

use crate::config::frame::{FRAME_VERSION, MAX_FRAME_SIZE};
use crc::{Crc, CRC_16_XMODEM};
use heapless::Vec;

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Header bytes before the payload
const HEADER_LEN: usize = 3;
/// Trailing CRC bytes
const CRC_LEN: usize = 2;

/// Largest payload a single frame can carry
pub const MAX_FRAME_PAYLOAD: usize = MAX_FRAME_SIZE - HEADER_LEN - CRC_LEN;

/// Errors from building or parsing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Payload too large for one frame
    TooLarge,
    /// Frame shorter than its header claims
    Truncated,
    /// Unsupported frame version
    InvalidVersion(u8),
    /// Checksum mismatch
    CrcMismatch,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::TooLarge => write!(f, "payload exceeds {} bytes", MAX_FRAME_PAYLOAD),
            FrameError::Truncated => write!(f, "frame truncated"),
            FrameError::InvalidVersion(v) => write!(f, "unsupported frame version {}", v),
            FrameError::CrcMismatch => write!(f, "CRC mismatch"),
        }
    }
}

impl core::error::Error for FrameError {}

/// A parsed uplink frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UplinkFrame {
    pub port: u8,
    pub payload: Vec<u8, MAX_FRAME_PAYLOAD>,
}

/// Build a frame around an application payload
pub fn build_frame(port: u8, payload: &[u8]) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(FrameError::TooLarge);
    }

    let mut frame: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
    let _ = frame.push(FRAME_VERSION);
    let _ = frame.push(port);
    let _ = frame.push(payload.len() as u8);
    let _ = frame.extend_from_slice(payload);

    let crc = CRC.checksum(&frame);
    let _ = frame.extend_from_slice(&crc.to_le_bytes());

    Ok(frame)
}

/// Parse and verify a received frame
pub fn parse_frame(data: &[u8]) -> Result<UplinkFrame, FrameError> {
    if data.len() < HEADER_LEN + CRC_LEN {
        return Err(FrameError::Truncated);
    }

    let version = data[0];
    if version != FRAME_VERSION {
        return Err(FrameError::InvalidVersion(version));
    }

    let port = data[1];
    let length = data[2] as usize;
    let body_end = HEADER_LEN + length;
    if data.len() < body_end + CRC_LEN {
        return Err(FrameError::Truncated);
    }

    let received_crc = u16::from_le_bytes([data[body_end], data[body_end + 1]]);
    if CRC.checksum(&data[..body_end]) != received_crc {
        return Err(FrameError::CrcMismatch);
    }

    let mut payload = Vec::new();
    payload
        .extend_from_slice(&data[HEADER_LEN..body_end])
        .map_err(|_| FrameError::TooLarge)?;

    Ok(UplinkFrame { port, payload })
}
