use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::{
    config::RobotConfig,
    proto::{pack_msg, ChangeId, Move, Packet, RangePolicy},
    transport::TransportSink,
    Error, Result, SERVO_COUNT,
};

/// Duration of every move issued by [`ServoController::init_pose`].
pub const INIT_POSE_TIME_MS: u32 = 500;

const INIT_POSE_SPACING: Duration = Duration::from_micros(10);

/// Encodes servo commands and writes them to the link.
pub struct ServoController<S> {
    sink: S,
    policy: RangePolicy,
}

impl<S: TransportSink> ServoController<S> {
    pub fn new(sink: S) -> Self {
        ServoController {
            sink,
            policy: RangePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RangePolicy {
        self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_open()
    }

    pub fn send_move(&mut self, servo_id: u8, angle_deg: u32, time_ms: u32) -> Result<()> {
        if !self.sink.is_open() {
            warn!(servo_id, "link not open, move dropped");
            return Err(Error::NotOpen);
        }

        let msg = Move::with_policy(self.policy, servo_id, angle_deg, time_ms).map_err(|e| {
            warn!(servo_id, angle_deg, time_ms, "move refused: {}", e);
            e
        })?;

        self.write(&pack_msg(&msg))?;
        info!("DO -> id={} angle={}° time={}ms", servo_id, angle_deg, time_ms);
        Ok(())
    }

    pub fn send_change_id(&mut self, new_id: u8) -> Result<()> {
        if !self.sink.is_open() {
            warn!(new_id, "link not open, id change dropped");
            return Err(Error::NotOpen);
        }

        self.write(&pack_msg(&ChangeId { new_id }))?;
        info!(new_id, "servo id changed");
        Ok(())
    }

    /// Moves every channel to its configured angle. Returns the number of
    /// moves that reached the link; failures are logged and skipped.
    pub fn init_pose(&mut self, config: &RobotConfig) -> Result<usize> {
        if !self.sink.is_open() {
            warn!("link not open, init pose skipped");
            return Err(Error::NotOpen);
        }

        let mut sent = 0;
        for idx in 1..=SERVO_COUNT as u8 {
            let angle = config.initial_angle(idx);
            let Ok(angle_deg) = u32::try_from(angle) else {
                warn!(servo_id = idx, angle, "negative init angle, skipped");
                continue;
            };

            match self.send_move(idx, angle_deg, INIT_POSE_TIME_MS) {
                Ok(()) => sent += 1,
                Err(e) => warn!(servo_id = idx, "init move failed: {}", e),
            }
            thread::sleep(INIT_POSE_SPACING);
        }

        info!(sent, name = %config.name, "robot init done");
        Ok(sent)
    }

    fn write(&mut self, pkt: &Packet) -> Result<()> {
        self.sink.write(pkt.as_bytes()).map_err(|e| {
            warn!(target_id = pkt.target(), "frame write failed: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        proto::{encode_change_id, encode_move},
        transport::MemorySink,
    };

    #[test]
    fn move_reaches_sink() {
        let sink = MemorySink::new();
        let mut ctrl = ServoController::new(sink.clone());
        ctrl.send_move(3, 120, 500).expect("send");
        ctrl.send_change_id(9).expect("send");
        assert_eq!(
            sink.frames(),
            vec![
                encode_move(3, 120, 500).into_vec(),
                encode_change_id(9).into_vec()
            ]
        );
    }

    #[test]
    fn closed_link_fails_without_writing() {
        let sink = MemorySink::new();
        sink.set_open(false);
        let mut ctrl = ServoController::new(sink.clone());
        assert!(matches!(ctrl.send_move(1, 1, 1), Err(Error::NotOpen)));
        assert!(matches!(ctrl.send_change_id(1), Err(Error::NotOpen)));
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn policy_decides_out_of_range_moves() {
        let sink = MemorySink::new();
        let mut ctrl = ServoController::new(sink.clone());
        ctrl.send_move(5, 999, 100).expect("truncated");

        let mut strict = ServoController::new(sink.clone()).with_policy(RangePolicy::Reject);
        assert!(matches!(
            strict.send_move(5, 999, 100),
            Err(Error::OutOfRange { .. })
        ));
        assert_eq!(sink.frames(), vec![encode_move(5, 999, 100).into_vec()]);
    }

    #[test]
    fn init_pose_moves_every_channel() {
        let sink = MemorySink::new();
        let mut ctrl = ServoController::new(sink.clone());
        let cfg = RobotConfig::new("bot", BTreeMap::from([(1, 60), (2, -5)]));

        assert_eq!(ctrl.init_pose(&cfg).expect("init"), SERVO_COUNT - 1);

        let frames = sink.frames();
        assert_eq!(frames.len(), SERVO_COUNT - 1);
        assert_eq!(frames[0], encode_move(1, 60, INIT_POSE_TIME_MS).into_vec());
        assert_eq!(frames[1], encode_move(3, 120, INIT_POSE_TIME_MS).into_vec());
        assert_eq!(frames[22], encode_move(24, 120, INIT_POSE_TIME_MS).into_vec());
    }
}
