//! The `0x55 0x55` servo bus framing.
//!
//! ```text
//! | 0x55 | 0x55 | target | len | cmd | params .. | checksum |
//! ```
//!
//! `len` counts the parameters plus the `len`, `cmd` and checksum bytes. The
//! checksum covers everything from `target` up to the last parameter byte.

use std::fmt;

use crate::{util::algo::checksum_calc, Error, Result};

pub mod servo;

pub use servo::{encode_change_id, encode_move, ChangeId, Move, RangePolicy};

pub const FRAME_HEADER: u8 = 0x55;
pub const BROADCAST_ID: u8 = 0xfe;

const FRAME_HEADER_SIZE: usize = 5;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdId {
    /// "DO": move one servo to a position over a duration.
    Move = 0x01,
    ChangeId = 0x0d,
}

impl TryFrom<u8> for CmdId {
    type Error = Error;

    fn try_from(val: u8) -> Result<Self> {
        match val {
            0x01 => Ok(CmdId::Move),
            0x0d => Ok(CmdId::ChangeId),
            other => Err(Error::InvalidData(
                format!("unknown command id {:#04x}", other).into(),
            )),
        }
    }
}

pub trait Serialize {
    const SIZE: usize;

    /// Writes exactly `SIZE` parameter bytes into `buf`.
    fn ser(&self, buf: &mut [u8]);
}

pub trait Message: Serialize {
    const CMD: CmdId;

    fn target(&self) -> u8;
}

/// A complete, checksummed frame. Immutable once packed.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    buf: Vec<u8>,
}

impl Packet {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn target(&self) -> u8 {
        self.buf[2]
    }

    pub fn command(&self) -> Result<CmdId> {
        self.buf[4].try_into()
    }

    #[inline]
    pub fn checksum(&self) -> u8 {
        self.buf[self.buf.len() - 1]
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({})", self)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.buf.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl TryFrom<&[u8]> for Packet {
    type Error = Error;

    /// Accepts a raw frame after checking header, length and checksum.
    fn try_from(buf: &[u8]) -> Result<Self> {
        if buf.len() < FRAME_HEADER_SIZE + 1 {
            return Err(Error::InvalidData(
                format!("frame too short: {} bytes", buf.len()).into(),
            ));
        }

        if buf[0] != FRAME_HEADER || buf[1] != FRAME_HEADER {
            return Err(Error::InvalidData("invalid frame header".into()));
        }

        if buf[3] as usize + 3 != buf.len() {
            return Err(Error::InvalidData("frame length mismatch".into()));
        }

        let last = buf.len() - 1;
        if checksum_calc(&buf[2..last]) != buf[last] {
            return Err(Error::InvalidData("invalid checksum".into()));
        }

        Ok(Packet { buf: buf.to_vec() })
    }
}

pub fn pack_msg<M: Message>(msg: &M) -> Packet {
    let size = FRAME_HEADER_SIZE + M::SIZE + 1;
    let mut buf = vec![0u8; size];
    buf[0] = FRAME_HEADER;
    buf[1] = FRAME_HEADER;
    buf[2] = msg.target();
    buf[3] = (M::SIZE + 3) as u8;
    buf[4] = M::CMD as u8;

    msg.ser(&mut buf[FRAME_HEADER_SIZE..size - 1]);

    buf[size - 1] = checksum_calc(&buf[2..size - 1]);
    Packet { buf }
}
