//! Report building: history annotation and rendering.
//!
//! A report looks at one current run next to everything recorded before
//! it and keeps only what a reviewer should actually read: failures,
//! fresh flips, and divergence from a release tag.

use crate::{outcomes_from_run_log, Clock};
use omen_history::AnnotatedOutcome;
use omen_store::ExpectationStore;
use omen_types::{
    Mode, Outcome, ReportEntry, ReportReceipt, ResultValue, RunLog, ToolInfo, REPORT_SCHEMA_V1,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub current: RunLog,

    /// Prior run logs; anything not strictly older than `current` is
    /// dropped so the current run never shadows itself.
    pub history: Vec<RunLog>,

    /// Named baseline run, e.g. the last released build.
    pub tag: Option<(String, RunLog)>,

    pub mode: Mode,
    pub tool: ToolInfo,
}

/// Annotates every outcome of the current run with its history and the
/// optional tag baseline.
pub fn annotate_run(
    store: &ExpectationStore,
    current: &RunLog,
    history: &[RunLog],
    tag: Option<(&str, &RunLog)>,
) -> Vec<AnnotatedOutcome> {
    let prior_runs: Vec<(&str, BTreeMap<String, Outcome>)> = history
        .iter()
        .filter(|log| log.recorded_at < current.recorded_at)
        .map(|log| {
            let by_name = outcomes_from_run_log(log)
                .into_iter()
                .map(|o| (o.name().to_string(), o))
                .collect();
            (log.recorded_at.as_str(), by_name)
        })
        .collect();
    let has_metadata = !prior_runs.is_empty();

    let tag_outcomes: Option<(&str, BTreeMap<String, Outcome>)> = tag.map(|(name, log)| {
        let by_name = outcomes_from_run_log(log)
            .into_iter()
            .map(|o| (o.name().to_string(), o))
            .collect();
        (name, by_name)
    });

    outcomes_from_run_log(current)
        .into_iter()
        .map(|outcome| {
            let expectation = store.get(&outcome).clone();

            let previous: BTreeMap<String, Outcome> = prior_runs
                .iter()
                .filter_map(|(at, by_name)| {
                    by_name
                        .get(outcome.name())
                        .map(|o| ((*at).to_string(), o.clone()))
                })
                .collect();

            let tag = tag_outcomes.as_ref().and_then(|(name, by_name)| {
                by_name
                    .get(outcome.name())
                    .map(|o| (name.to_string(), o.clone()))
            });

            AnnotatedOutcome::new(outcome, expectation, previous, tag, has_metadata)
        })
        .collect()
}

pub fn build_report(
    store: &ExpectationStore,
    req: &ReportRequest,
    clock: &dyn Clock,
) -> ReportReceipt {
    let annotated = annotate_run(
        store,
        &req.current,
        &req.history,
        req.tag.as_ref().map(|(name, log)| (name.as_str(), log)),
    );

    let entries = annotated
        .iter()
        .map(|a| ReportEntry {
            name: a.name().to_string(),
            result: a.outcome().result(),
            result_value: a.result_value(),
            previous_result_values: a.previous_result_values(),
            tag_result_value: a.tag_result_value(),
            changed: a.outcome_changed(),
            noteworthy: a.is_noteworthy(),
            last_run: a.last_run().map(str::to_string),
        })
        .collect();

    ReportReceipt {
        schema: REPORT_SCHEMA_V1.to_string(),
        tool: req.tool.clone(),
        mode: req.mode,
        generated_at: clock.now_rfc3339(),
        current_run: req.current.recorded_at.clone(),
        tag_name: req.tag.as_ref().map(|(name, _)| name.clone()),
        entries,
    }
}

pub fn render_markdown(report: &ReportReceipt) -> String {
    let noteworthy: Vec<&ReportEntry> =
        report.entries.iter().filter(|e| e.noteworthy).collect();

    let mut out = String::new();

    if noteworthy.is_empty() {
        out.push_str("✅ omen: nothing noteworthy\n\n");
    } else {
        out.push_str(&format!(
            "🔔 omen: {} noteworthy outcome(s)\n\n",
            noteworthy.len()
        ));
    }

    out.push_str(&format!(
        "**Run:** `{}` (mode `{}`)\n\n",
        report.current_run, report.mode
    ));

    if noteworthy.is_empty() {
        return out;
    }

    out.push_str("| action | result | value | previous | tag | last run |\n");
    out.push_str("|---|---|---|---|---|---|\n");

    for entry in &noteworthy {
        let previous = entry
            .previous_result_values
            .last()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let tag = entry
            .tag_result_value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let last_run = entry.last_run.as_deref().unwrap_or("-");

        out.push_str(&format!(
            "| `{name}` | {result} | {value} | {previous} | {tag} | {last_run} |\n",
            name = entry.name,
            result = entry.result,
            value = entry.result_value,
        ));
    }

    out
}

/// GitHub Actions annotation lines: errors for failing outcomes,
/// warnings for noteworthy outcomes that still pass.
pub fn github_annotations(report: &ReportReceipt) -> Vec<String> {
    let mut lines = Vec::new();

    for entry in &report.entries {
        if !entry.noteworthy {
            continue;
        }

        let prefix = match entry.result_value {
            ResultValue::Fail => "::error",
            ResultValue::Ok | ResultValue::Ignore => "::warning",
        };

        lines.push(format!(
            "{prefix}::omen {name}: {value} ({result})",
            name = entry.name,
            value = entry.result_value,
            result = entry.result,
        ));
    }

    lines
}
