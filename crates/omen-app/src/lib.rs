//! Application layer for omen.
//!
//! The app layer coordinates the store and the history logic.
//! It does not parse CLI flags and it does not do filesystem I/O.

use omen_store::ExpectationStore;
use omen_types::{
    Mode, Outcome, ResolveReceipt, ResolvedOutcome, ResultValue, RunLog, ToolInfo, Verdict,
    VerdictCounts, VerdictStatus, RESOLVE_SCHEMA_V1,
};

mod report;

pub use report::{
    annotate_run, build_report, github_annotations, render_markdown, ReportRequest,
};

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

/// Turns raw run-log records into sanitized outcomes. Records without
/// their own date inherit the log's `recorded_at`.
pub fn outcomes_from_run_log(log: &RunLog) -> Vec<Outcome> {
    log.outcomes
        .iter()
        .map(|record| {
            let date = record.date.as_deref().unwrap_or(&log.recorded_at);
            Outcome::new(&record.name, record.result, &record.output, date)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub outcomes: Vec<Outcome>,
    pub mode: Mode,
    pub tool: ToolInfo,
}

pub struct ResolveUseCase<C: Clock> {
    clock: C,
}

impl<C: Clock> ResolveUseCase<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Resolves every outcome against the store and rolls the verdict up.
    /// `ignore` outcomes never affect the verdict.
    pub fn execute(&self, store: &ExpectationStore, req: ResolveRequest) -> ResolveReceipt {
        let mut counts = VerdictCounts::default();
        let mut reasons: Vec<String> = Vec::new();
        let mut resolved: Vec<ResolvedOutcome> = Vec::new();

        for outcome in &req.outcomes {
            let expectation = store.get(outcome);
            let result_value = outcome.result_value(expectation);

            match result_value {
                ResultValue::Ok => counts.ok += 1,
                ResultValue::Fail => {
                    counts.fail += 1;
                    reasons.push(format!(
                        "{name}: expected {expected}, got {actual}",
                        name = outcome.name(),
                        expected = expectation.result(),
                        actual = outcome.result(),
                    ));
                }
                ResultValue::Ignore => counts.ignore += 1,
            }

            let description = if expectation.description().is_empty() {
                None
            } else {
                Some(expectation.description().to_string())
            };

            resolved.push(ResolvedOutcome {
                name: outcome.name().to_string(),
                result: outcome.result(),
                result_value,
                description,
                bug: expectation.bug(),
                bug_is_open: expectation.bug_is_open(),
            });
        }

        let status = if counts.fail > 0 {
            VerdictStatus::Fail
        } else {
            VerdictStatus::Pass
        };

        ResolveReceipt {
            schema: RESOLVE_SCHEMA_V1.to_string(),
            tool: req.tool,
            mode: req.mode,
            resolved_at: self.clock.now_rfc3339(),
            outcomes: resolved,
            counts,
            verdict: Verdict { status, reasons },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omen_types::ResultCode;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_rfc3339(&self) -> String {
            "2026-06-01T00:00:00Z".to_string()
        }
    }

    fn store(text: &str) -> ExpectationStore {
        let mut store = ExpectationStore::default();
        store.parse_str(text, Mode::Ci, "test").unwrap();
        store
    }

    fn tool() -> ToolInfo {
        ToolInfo {
            name: "omen".to_string(),
            version: "0.0.0".to_string(),
        }
    }

    #[test]
    fn resolve_counts_and_verdict() {
        let store = store(r#"{"name": "a.B#known_bad", "result": "EXEC_FAILED"}"#);
        let outcomes = vec![
            Outcome::new("a.B#passes", ResultCode::Success, "", "2026-01-01T00:00:00Z"),
            Outcome::new("a.B#known_bad", ResultCode::ExecFailed, "boom", "2026-01-01T00:00:00Z"),
            Outcome::new("a.B#breaks", ResultCode::Error, "oops", "2026-01-01T00:00:00Z"),
            Outcome::new("a.B#skipped", ResultCode::Unsupported, "", "2026-01-01T00:00:00Z"),
        ];

        let receipt = ResolveUseCase::new(FixedClock).execute(
            &store,
            ResolveRequest {
                outcomes,
                mode: Mode::Ci,
                tool: tool(),
            },
        );

        assert_eq!(receipt.schema, RESOLVE_SCHEMA_V1);
        assert_eq!(receipt.resolved_at, "2026-06-01T00:00:00Z");
        assert_eq!(receipt.counts.ok, 2);
        assert_eq!(receipt.counts.fail, 1);
        assert_eq!(receipt.counts.ignore, 1);
        assert_eq!(receipt.verdict.status, VerdictStatus::Fail);
        assert_eq!(receipt.verdict.reasons.len(), 1);
        assert!(receipt.verdict.reasons[0].contains("a.B#breaks"));
    }

    #[test]
    fn resolve_passes_when_nothing_fails() {
        let store = ExpectationStore::default();
        let outcomes = vec![Outcome::new(
            "a.B#passes",
            ResultCode::Success,
            "",
            "2026-01-01T00:00:00Z",
        )];

        let receipt = ResolveUseCase::new(FixedClock).execute(
            &store,
            ResolveRequest {
                outcomes,
                mode: Mode::Local,
                tool: tool(),
            },
        );
        assert_eq!(receipt.verdict.status, VerdictStatus::Pass);
        assert!(receipt.verdict.reasons.is_empty());
    }

    #[test]
    fn resolve_surfaces_expectation_metadata() {
        let store = store(
            r#"{"name": "a.B#flaky", "result": "EXEC_FAILED", "bug": 77, "description": "tracked flake"}"#,
        );
        let outcomes = vec![Outcome::new(
            "a.B#flaky",
            ResultCode::ExecFailed,
            "boom",
            "2026-01-01T00:00:00Z",
        )];

        let receipt = ResolveUseCase::new(FixedClock).execute(
            &store,
            ResolveRequest {
                outcomes,
                mode: Mode::Ci,
                tool: tool(),
            },
        );
        let resolved = &receipt.outcomes[0];
        assert_eq!(resolved.result_value, ResultValue::Ok);
        assert_eq!(resolved.bug, Some(77));
        assert_eq!(resolved.description.as_deref(), Some("tracked flake"));
    }

    #[test]
    fn outcomes_inherit_the_run_log_date() {
        let log: RunLog = serde_json::from_str(
            r#"{
                "schema": "omen.runlog.v1",
                "recorded_at": "2026-03-04T05:06:07Z",
                "outcomes": [
                    {"name": "a.B#t", "result": "SUCCESS"},
                    {"name": "a.B#u", "result": "SUCCESS", "date": "2026-03-04T05:00:00Z"}
                ]
            }"#,
        )
        .unwrap();

        let outcomes = outcomes_from_run_log(&log);
        assert_eq!(outcomes[0].date(), "2026-03-04T05:06:07Z");
        assert_eq!(outcomes[1].date(), "2026-03-04T05:00:00Z");
    }
}
