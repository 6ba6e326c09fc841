//! Shared types for omen.
//!
//! Design goal: versioned, explicit, boring.
//! The domain model (`Outcome`, `Expectation`) lives here next to the
//! serde contracts used for run logs and receipts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod expectation;
mod outcome;
mod result;

pub use expectation::{Expectation, ExpectationError, MATCH_ALL_PATTERN};
pub use outcome::{sanitize_output, Outcome};
pub use result::{Mode, ModeParseError, ResultCode, ResultValue};

pub const RUN_LOG_SCHEMA_V1: &str = "omen.runlog.v1";
pub const RESOLVE_SCHEMA_V1: &str = "omen.resolve.v1";
pub const REPORT_SCHEMA_V1: &str = "omen.report.v1";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// One recorded run of a test suite: the input surface of `omen resolve`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunLog {
    pub schema: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// RFC3339; also the history key for this run.
    pub recorded_at: String,

    pub outcomes: Vec<OutcomeRecord>,
}

/// Raw outcome as recorded by a runner, before sanitization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub name: String,

    pub result: ResultCode,

    #[serde(default)]
    pub output: String,

    /// RFC3339; defaults to the run log's `recorded_at` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct VerdictCounts {
    pub ok: u32,
    pub fail: u32,
    pub ignore: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub reasons: Vec<String>,
}

/// One outcome resolved against its effective expectation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ResolvedOutcome {
    pub name: String,
    pub result: ResultCode,
    pub result_value: ResultValue,

    /// Description of the expectation that matched, when it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bug: Option<u64>,

    #[serde(default)]
    pub bug_is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ResolveReceipt {
    pub schema: String,
    pub tool: ToolInfo,
    pub mode: Mode,
    pub resolved_at: String,
    pub outcomes: Vec<ResolvedOutcome>,
    pub counts: VerdictCounts,
    pub verdict: Verdict,
}

/// One current outcome annotated with history, as surfaced by `omen report`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReportEntry {
    pub name: String,
    pub result: ResultCode,
    pub result_value: ResultValue,

    /// Oldest first, parallel to the historical runs that saw this action.
    pub previous_result_values: Vec<ResultValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_result_value: Option<ResultValue>,

    /// Raw structural change versus the most recent historical outcome.
    pub changed: bool,

    pub noteworthy: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReportReceipt {
    pub schema: String,
    pub tool: ToolInfo,
    pub mode: Mode,
    pub generated_at: String,

    /// `recorded_at` of the run under report.
    pub current_run: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,

    pub entries: Vec<ReportEntry>,
}
