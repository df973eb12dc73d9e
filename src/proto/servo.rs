use byteorder::{ByteOrder, LE};

use super::{pack_msg, CmdId, Message, Packet, Serialize, BROADCAST_ID};
use crate::{ensure_range, Result};

pub const MOVE_FRAME_SIZE: usize = 10;
pub const CHANGE_ID_FRAME_SIZE: usize = 7;

pub const MAX_ANGLE_DEG: u32 = 240;
pub const MAX_POSITION: u16 = 1000;
pub const MAX_TIME_MS: u32 = u16::MAX as u32;

/// How out-of-range angles and durations are handled before encoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RangePolicy {
    /// Wrap into 16 bits, matching frames produced by earlier recordings.
    #[default]
    Truncate,
    /// Refuse with `Error::OutOfRange`.
    Reject,
}

/// Maps 0..=240 degrees onto the servo's native 0..=1000 position range.
/// Results beyond 16 bits wrap.
#[inline]
pub fn angle_to_position(angle_deg: u32) -> u16 {
    (angle_deg as u64 * MAX_POSITION as u64 / MAX_ANGLE_DEG as u64) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub servo_id: u8,
    pub position: u16,
    pub time_ms: u16,
}

impl Move {
    pub fn new(servo_id: u8, angle_deg: u32, time_ms: u32) -> Self {
        Move {
            servo_id,
            position: angle_to_position(angle_deg),
            time_ms: time_ms as u16,
        }
    }

    pub fn checked(servo_id: u8, angle_deg: u32, time_ms: u32) -> Result<Self> {
        ensure_range!("angle_deg", angle_deg, MAX_ANGLE_DEG);
        ensure_range!("time_ms", time_ms, MAX_TIME_MS);
        Ok(Self::new(servo_id, angle_deg, time_ms))
    }

    pub fn with_policy(
        policy: RangePolicy,
        servo_id: u8,
        angle_deg: u32,
        time_ms: u32,
    ) -> Result<Self> {
        match policy {
            RangePolicy::Truncate => Ok(Self::new(servo_id, angle_deg, time_ms)),
            RangePolicy::Reject => Self::checked(servo_id, angle_deg, time_ms),
        }
    }
}

impl Serialize for Move {
    const SIZE: usize = 4;

    fn ser(&self, buf: &mut [u8]) {
        LE::write_u16(&mut buf[0..2], self.position);
        LE::write_u16(&mut buf[2..4], self.time_ms);
    }
}

impl Message for Move {
    const CMD: CmdId = CmdId::Move;

    fn target(&self) -> u8 {
        self.servo_id
    }
}

/// Reassigns the bus address. Always broadcast, so only one servo may be
/// attached while it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeId {
    pub new_id: u8,
}

impl Serialize for ChangeId {
    const SIZE: usize = 1;

    fn ser(&self, buf: &mut [u8]) {
        buf[0] = self.new_id;
    }
}

impl Message for ChangeId {
    const CMD: CmdId = CmdId::ChangeId;

    fn target(&self) -> u8 {
        BROADCAST_ID
    }
}

pub fn encode_move(servo_id: u8, angle_deg: u32, time_ms: u32) -> Packet {
    pack_msg(&Move::new(servo_id, angle_deg, time_ms))
}

pub fn encode_change_id(new_id: u8) -> Packet {
    pack_msg(&ChangeId { new_id })
}
