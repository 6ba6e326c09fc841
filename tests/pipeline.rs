//! Workspace integration tests: the full resolve/report pipeline wired
//! together through the library crates, no CLI involved.

use omen_app::{
    build_report, outcomes_from_run_log, Clock, ReportRequest, ResolveRequest, ResolveUseCase,
};
use omen_store::ExpectationStore;
use omen_types::{
    Mode, OutcomeRecord, ResultCode, ResultValue, RunLog, ToolInfo, VerdictStatus,
    RUN_LOG_SCHEMA_V1,
};

struct FixedClock;

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        "2026-06-01T00:00:00Z".to_string()
    }
}

fn tool() -> ToolInfo {
    ToolInfo {
        name: "omen".to_string(),
        version: "0.0.0-test".to_string(),
    }
}

fn run_log(recorded_at: &str, outcomes: &[(&str, ResultCode, &str)]) -> RunLog {
    RunLog {
        schema: RUN_LOG_SCHEMA_V1.to_string(),
        run_id: None,
        recorded_at: recorded_at.to_string(),
        outcomes: outcomes
            .iter()
            .map(|(name, result, output)| OutcomeRecord {
                name: name.to_string(),
                result: *result,
                output: output.to_string(),
                date: None,
            })
            .collect(),
    }
}

const EXPECTATIONS: &str = r#"
{
  "name": "libcore.java.util.FormatterTest#testUptime",
  "result": "EXEC_FAILED",
  "substring": "IllegalFormatConversionException",
  "bug": 1234,
  "description": "Known formatter regression, tracked upstream."
}
{
  "failure": "java.net.SocketTest",
  "result": "EXEC_FAILED",
  "pattern": "Connection refused.*",
  "modes": ["device", "ci"]
}
"#;

#[test]
fn resolve_then_report_round_trip() {
    let mut store = ExpectationStore::default();
    store.parse_str(EXPECTATIONS, Mode::Ci, "inline").unwrap();

    let current = run_log(
        "2026-01-03T00:00:00Z",
        &[
            (
                "libcore.java.util.FormatterTest#testUptime",
                ResultCode::ExecFailed,
                "threw IllegalFormatConversionException at line 3",
            ),
            (
                "java.net.SocketTest#testBind",
                ResultCode::Success,
                "Connection refused by peer",
            ),
        ],
    );

    // Resolve: the expected failure counts as ok, and the failure-routed
    // expectation only reroutes outcomes that actually failed.
    let receipt = ResolveUseCase::new(FixedClock).execute(
        &store,
        ResolveRequest {
            outcomes: outcomes_from_run_log(&current),
            mode: Mode::Ci,
            tool: tool(),
        },
    );
    assert_eq!(receipt.verdict.status, VerdictStatus::Pass);
    assert_eq!(receipt.counts.ok, 2);
    assert_eq!(receipt.counts.fail, 0);
    assert_eq!(receipt.outcomes[0].bug, Some(1234));
    assert_eq!(
        receipt.outcomes[0].description.as_deref(),
        Some("Known formatter regression, tracked upstream.")
    );

    // Report: nothing is noteworthy when the run matches both its
    // expectations and its history.
    let history = vec![current.clone()];
    let mut next = run_log(
        "2026-01-04T00:00:00Z",
        &[(
            "libcore.java.util.FormatterTest#testUptime",
            ResultCode::ExecFailed,
            "threw IllegalFormatConversionException at line 3",
        )],
    );
    next.outcomes.push(OutcomeRecord {
        name: "java.net.SocketTest#testBind".to_string(),
        result: ResultCode::Success,
        output: "Connection refused by peer".to_string(),
        date: None,
    });

    let report = build_report(
        &store,
        &ReportRequest {
            current: next,
            history,
            tag: None,
            mode: Mode::Ci,
            tool: tool(),
        },
        &FixedClock,
    );
    assert!(report.entries.iter().all(|e| !e.noteworthy));
    assert_eq!(report.entries[0].last_run.as_deref(), Some("2026-01-03T00:00:00Z"));
}

#[test]
fn a_regression_is_noteworthy_and_fails_the_resolve() {
    let mut store = ExpectationStore::default();
    store.parse_str(EXPECTATIONS, Mode::Ci, "inline").unwrap();

    let history = vec![run_log(
        "2026-01-03T00:00:00Z",
        &[("java.net.SocketTest#testBind", ResultCode::Success, "ok")],
    )];
    let current = run_log(
        "2026-01-04T00:00:00Z",
        &[(
            "java.net.SocketTest#testBind",
            ResultCode::ExecTimeout,
            "timed out after 60s",
        )],
    );

    let receipt = ResolveUseCase::new(FixedClock).execute(
        &store,
        ResolveRequest {
            outcomes: outcomes_from_run_log(&current),
            mode: Mode::Ci,
            tool: tool(),
        },
    );
    assert_eq!(receipt.verdict.status, VerdictStatus::Fail);
    assert_eq!(receipt.counts.fail, 1);
    assert!(receipt.verdict.reasons[0].contains("java.net.SocketTest#testBind"));

    let report = build_report(
        &store,
        &ReportRequest {
            current,
            history,
            tag: None,
            mode: Mode::Ci,
            tool: tool(),
        },
        &FixedClock,
    );
    let entry = &report.entries[0];
    assert_eq!(entry.result_value, ResultValue::Fail);
    assert!(entry.changed);
    assert!(entry.noteworthy);
    assert_eq!(entry.previous_result_values, vec![ResultValue::Ok]);
}

#[test]
fn mode_scoping_drops_expectations_for_other_modes() {
    let mut store = ExpectationStore::default();
    store.parse_str(EXPECTATIONS, Mode::Local, "inline").unwrap();

    // The socket failure expectation is device/ci only, so under local
    // mode the failing socket test is a real failure.
    let current = run_log(
        "2026-01-04T00:00:00Z",
        &[(
            "java.net.SocketTest#testBind",
            ResultCode::ExecFailed,
            "Connection refused by peer",
        )],
    );

    let receipt = ResolveUseCase::new(FixedClock).execute(
        &store,
        ResolveRequest {
            outcomes: outcomes_from_run_log(&current),
            mode: Mode::Local,
            tool: tool(),
        },
    );
    assert_eq!(receipt.verdict.status, VerdictStatus::Fail);
}
