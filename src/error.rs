use std::borrow::Cow;
use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Json(serde_json::Error),
    InvalidData(Cow<'static, str>),
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
    /// The transport link is not open.
    NotOpen,
    /// A playback is active on the program.
    Busy,
    Other(Cow<'static, str>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IO(e) => write!(f, "io error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            Error::OutOfRange { field, value, max } => {
                write!(f, "{} {} out of range (max {})", field, value, max)
            }
            Error::NotOpen => f.write_str("link not open"),
            Error::Busy => f.write_str("playback in progress"),
            Error::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IO(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

macro_rules! ensure_range {
    ($field:literal, $val:expr, $max:expr) => {
        if ($val as u64) > ($max as u64) {
            return Err($crate::Error::OutOfRange {
                field: $field,
                value: $val as u64,
                max: $max as u64,
            });
        }
    };
}

pub(crate) use ensure_range;
