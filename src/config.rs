//! Robot configuration file: the initial angle of every servo channel.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use tracing::{debug, info};

use crate::{Error, Result, SERVO_COUNT};

pub const DEFAULT_NAME: &str = "DanceRobot";
pub const DEFAULT_DESCRIPTION: &str = "Initial servo angles for the robot.";
pub const DEFAULT_VERSION: &str = "1.0";

/// Angle used for channels the config does not mention.
pub const NEUTRAL_ANGLE: i32 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotConfig {
    pub name: String,
    pub description: String,
    pub version: String,
    pub created: String,
    /// Keyed by servo index, 1-based.
    pub servos: BTreeMap<u8, i32>,
}

impl RobotConfig {
    /// A fresh config stamped with today's date. An empty name falls back to
    /// [`DEFAULT_NAME`].
    pub fn new(name: &str, servos: BTreeMap<u8, i32>) -> Self {
        RobotConfig {
            name: if name.is_empty() {
                DEFAULT_NAME.to_owned()
            } else {
                name.to_owned()
            },
            description: DEFAULT_DESCRIPTION.to_owned(),
            version: DEFAULT_VERSION.to_owned(),
            created: chrono::Local::now().format("%Y-%m-%d").to_string(),
            servos,
        }
    }

    /// Every channel at [`NEUTRAL_ANGLE`].
    pub fn neutral(name: &str) -> Self {
        let servos = (1..=SERVO_COUNT as u8).map(|i| (i, NEUTRAL_ANGLE)).collect();
        Self::new(name, servos)
    }

    pub fn initial_angle(&self, index: u8) -> i32 {
        self.servos.get(&index).copied().unwrap_or(NEUTRAL_ANGLE)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(data)?;
        if !validate(&value) {
            return Err(Error::InvalidData(
                "config needs a servos object holding keys 1..24 with integer values".into(),
            ));
        }

        // only channel keys are kept; other entries under servos are ignored
        let mut servos = BTreeMap::new();
        if let Some(obj) = value.get("servos").and_then(Value::as_object) {
            for i in 1..=SERVO_COUNT as u8 {
                if let Some(angle) = obj.get(&i.to_string()).and_then(as_int) {
                    servos.insert(i, angle);
                }
            }

            for key in obj.keys().filter(|k| !is_channel_key(k)) {
                debug!(key = %key, "ignoring non-channel servos entry");
            }
        }

        let text = |key: &str, default: &str| -> Result<String> {
            match value.get(key) {
                None | Some(Value::Null) => Ok(default.to_owned()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(Error::InvalidData(
                    format!("config field {} must be a string, got {}", key, other).into(),
                )),
            }
        };

        Ok(RobotConfig {
            name: text("name", DEFAULT_NAME)?,
            description: text("description", DEFAULT_DESCRIPTION)?,
            version: text("version", DEFAULT_VERSION)?,
            created: text("created", "")?,
            servos,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::InvalidData(e.to_string().into()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let cfg = Self::from_json(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), name = %cfg.name, "config loaded");
        Ok(cfg)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), name = %self.name, "config saved");
        Ok(())
    }
}

/// A config is usable when `servos` maps every key "1".."24" to an integer,
/// an integral float, or a string holding an integer. Other keys are allowed.
pub fn validate(value: &Value) -> bool {
    let Some(servos) = value.get("servos").and_then(Value::as_object) else {
        return false;
    };

    (1..=SERVO_COUNT).all(|i| servos.get(&i.to_string()).and_then(as_int).is_some())
}

fn is_channel_key(key: &str) -> bool {
    key.parse::<usize>()
        .map_or(false, |i| (1..=SERVO_COUNT).contains(&i) && key == i.to_string())
}

fn as_int(v: &Value) -> Option<i32> {
    match v {
        Value::Number(n) => match n.as_i64() {
            Some(n) => i32::try_from(n).ok(),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i32::MIN as f64 && *f <= i32::MAX as f64)
                .map(|f| f as i32),
        },
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
