//! Result codes, result values, and run modes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enumerated outcome of one test/action execution.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Success,
    CompileFailed,
    ExecFailed,
    ExecTimeout,
    Error,
    /// The action is not applicable on this configuration. Outcomes with
    /// this code classify as `ResultValue::Ignore` regardless of any
    /// expectation.
    Unsupported,
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::CompileFailed => "COMPILE_FAILED",
            ResultCode::ExecFailed => "EXEC_FAILED",
            ResultCode::ExecTimeout => "EXEC_TIMEOUT",
            ResultCode::Error => "ERROR",
            ResultCode::Unsupported => "UNSUPPORTED",
        };
        f.write_str(s)
    }
}

/// Tri-state classification of an outcome against its expectation.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ResultValue {
    Ok,
    Fail,
    Ignore,
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultValue::Ok => "ok",
            ResultValue::Fail => "fail",
            ResultValue::Ignore => "ignore",
        };
        f.write_str(s)
    }
}

/// Named execution context scoping which expectations apply.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Local,
    Ci,
    Device,
    Emulator,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Local => "local",
            Mode::Ci => "ci",
            Mode::Device => "device",
            Mode::Emulator => "emulator",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown mode {0:?} (expected local|ci|device|emulator)")]
pub struct ModeParseError(pub String);

impl FromStr for Mode {
    type Err = ModeParseError;

    // Mode lists in expectations files are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Mode::Local),
            "ci" => Ok(Mode::Ci),
            "device" => Ok(Mode::Device),
            "emulator" => Ok(Mode::Emulator),
            _ => Err(ModeParseError(s.to_string())),
        }
    }
}
