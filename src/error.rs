use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

/// Errors raised by the GRIB metadata and range-extraction subsystem
/// (components C1-C4: bit codec, `JumpInfo`, range extractor, metadata
/// sidecar).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JumpError {
    UnsupportedEdition(i64),
    UnsupportedPacking(String),
    OutOfRange { start: u64, end: u64, limit: u64 },
    Overlapping { start: u64, end: u64 },
    Truncated { needed: u64, available: u64 },
    Io(String),
    VersionMismatch { found: u8, expected: u8 },
    ShortRead { expected: usize, actual: usize },
}

impl Error for JumpError {}

impl Display for JumpError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::UnsupportedEdition(n) => write!(f, "unsupported GRIB edition number: {n}"),
            Self::UnsupportedPacking(s) => write!(f, "unsupported packing: {s}"),
            Self::OutOfRange { start, end, limit } => write!(
                f,
                "range [{start}, {end}) is out of bounds for {limit} data points"
            ),
            Self::Overlapping { start, end } => {
                write!(f, "range [{start}, {end}) overlaps a preceding range")
            }
            Self::Truncated { needed, available } => write!(
                f,
                "message declares {available} bytes but a read needs {needed}"
            ),
            Self::Io(s) => write!(f, "I/O error: {s}"),
            Self::VersionMismatch { found, expected } => write!(
                f,
                "sidecar record version {found} does not match current version {expected}"
            ),
            Self::ShortRead { expected, actual } => {
                write!(f, "short read: expected {expected} bytes, got {actual}")
            }
        }
    }
}

impl From<io::Error> for JumpError {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Errors raised while parsing, expanding, or algebraically combining MARS
/// requests (components C5-C9: parameter, request, type registry, parser,
/// expansion engine).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarsError {
    Parse {
        message: String,
        line: usize,
        column: usize,
    },
    UnknownKey(String),
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    MissingRequiredKey(String),
    ConstraintViolated {
        key: String,
        other: String,
        reason: String,
    },
    AmbiguousSingleValue(String),
}

impl Error for MarsError {}

impl Display for MarsError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Parse {
                message,
                line,
                column,
            } => write!(f, "parse error at {line}:{column}: {message}"),
            Self::UnknownKey(k) => write!(f, "unknown key '{k}'"),
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value '{value}' for key '{key}': {reason}")
            }
            Self::MissingRequiredKey(k) => write!(f, "missing required key '{k}'"),
            Self::ConstraintViolated { key, other, reason } => write!(
                f,
                "key '{key}' violates a constraint involving '{other}': {reason}"
            ),
            Self::AmbiguousSingleValue(k) => write!(
                f,
                "key '{k}' has more than one value where exactly one was expected"
            ),
        }
    }
}
