//! `devconf-types` – shared vocabulary for the configuration engine.
//!
//! Response codes, lifecycle states, log levels and the [`ConfigError`]
//! taxonomy used by every other `devconf` crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Status code reported in `res_info.code`.
///
/// `Ok` is the only success value; every other code marks a rejected or
/// partially applied configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ResponseCode {
    #[default]
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl ResponseCode {
    /// Numeric wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decode a wire value; unknown values map to `None`.
    pub fn from_u32(value: u32) -> Option<Self> {
        use ResponseCode::*;
        Some(match value {
            0 => Ok,
            1 => Cancelled,
            2 => Unknown,
            3 => InvalidArgument,
            4 => DeadlineExceeded,
            5 => NotFound,
            6 => AlreadyExists,
            7 => PermissionDenied,
            8 => ResourceExhausted,
            9 => FailedPrecondition,
            10 => Aborted,
            11 => OutOfRange,
            12 => Unimplemented,
            13 => Internal,
            14 => Unavailable,
            15 => DataLoss,
            16 => Unauthenticated,
            _ => return None,
        })
    }
}

/// Lifecycle state of the device application.
///
/// Only `Idle` and `Running` can be requested through
/// `common_settings.process_state`; `Destroying` is accepted from the
/// lifecycle itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessState {
    Creating,
    #[default]
    Idle,
    Running,
    Destroying,
    Exiting,
}

impl ProcessState {
    /// Value used for `common_settings.process_state`.
    pub fn as_u32(self) -> u32 {
        match self {
            ProcessState::Creating => 0,
            ProcessState::Idle => 1,
            ProcessState::Running => 2,
            ProcessState::Destroying => 3,
            ProcessState::Exiting => 4,
        }
    }

    /// Map a `process_state` document value to a state.
    ///
    /// Unknown values map to [`ProcessState::Exiting`].
    pub fn from_document(value: u32) -> Self {
        match value {
            1 => ProcessState::Idle,
            2 => ProcessState::Running,
            3 => ProcessState::Destroying,
            _ => ProcessState::Exiting,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Creating => "creating",
            ProcessState::Idle => "idle",
            ProcessState::Running => "running",
            ProcessState::Destroying => "destroying",
            ProcessState::Exiting => "exiting",
        };
        f.write_str(name)
    }
}

/// Log verbosity as carried by `common_settings.log_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Critical = 0,
    Error = 1,
    #[default]
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decode a document value; values above `5` saturate to `Trace`.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => LogLevel::Critical,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Critical | LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// JSON value kinds that a validation rule can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Number,
    String,
    Boolean,
    Object,
    Array,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Boolean => "boolean",
            JsonKind::Object => "object",
            JsonKind::Array => "array",
        };
        f.write_str(name)
    }
}

/// Serializable form of the `res_info` section.
///
/// Used wherever a response has to be produced outside the document tree,
/// e.g. error payloads returned by an application configure hook.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResInfoRecord {
    pub res_id: String,
    pub code: u32,
    pub detail_msg: String,
}

/// Envelope `{"res_info": {...}}` for standalone error responses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub res_info: ResInfoRecord,
}

/// Error taxonomy for parsing, verifying, applying and serializing a
/// configuration document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Document parse error: {0}")]
    Parse(String),

    #[error("Document root is not an object")]
    NotAnObject,

    #[error("{0} missing")]
    MissingField(String),

    #[error("{message}")]
    InvalidField { code: ResponseCode, message: String },

    #[error("{message}")]
    Sensor { code: ResponseCode, message: String },

    #[error("{message}")]
    Configure { code: ResponseCode, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ConfigError {
    /// Shorthand for an `INVALID_ARGUMENT` field error.
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            code: ResponseCode::InvalidArgument,
            message: message.into(),
        }
    }

    /// Code written to `res_info.code` when this error rejects a request.
    pub fn code(&self) -> ResponseCode {
        match self {
            ConfigError::Parse(_) | ConfigError::NotAnObject | ConfigError::MissingField(_) => {
                ResponseCode::InvalidArgument
            }
            ConfigError::InvalidField { code, .. }
            | ConfigError::Sensor { code, .. }
            | ConfigError::Configure { code, .. } => *code,
            ConfigError::Serialization(_) => ResponseCode::Internal,
        }
    }
}
