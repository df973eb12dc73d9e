mod error;
pub mod config;
pub mod controller;
pub mod playback;
pub mod program;
pub mod proto;
pub mod studio;
pub mod transport;
pub(crate) mod util;

pub use error::*;

/// Servo channels on one robot.
pub const SERVO_COUNT: usize = 24;
