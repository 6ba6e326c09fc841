//! History-aware view over a single outcome.
//!
//! This crate is intentionally I/O-free: it combines a current outcome,
//! its resolved expectation, prior outcomes of the same action, and an
//! optional named baseline, and decides whether the result is worth
//! surfacing. All verdicts are computed, never stored.

use omen_types::{Expectation, Outcome, ResultValue};
use std::collections::BTreeMap;

/// A current outcome plus everything known about its past.
///
/// `previous` is keyed by run timestamp (RFC3339, so iteration order is
/// chronological ascending) and excludes the current run.
/// `has_metadata` records whether historical run data was available at
/// all for this action; an action can have metadata and still an empty
/// history (it is simply new).
#[derive(Debug, Clone)]
pub struct AnnotatedOutcome {
    outcome: Outcome,
    expectation: Expectation,
    previous: BTreeMap<String, Outcome>,
    tag_name: Option<String>,
    tag_outcome: Option<Outcome>,
    has_metadata: bool,
}

impl AnnotatedOutcome {
    pub fn new(
        outcome: Outcome,
        expectation: Expectation,
        previous: BTreeMap<String, Outcome>,
        tag: Option<(String, Outcome)>,
        has_metadata: bool,
    ) -> Self {
        let (tag_name, tag_outcome) = match tag {
            Some((name, outcome)) => (Some(name), Some(outcome)),
            None => (None, None),
        };
        Self {
            outcome,
            expectation,
            previous,
            tag_name,
            tag_outcome,
            has_metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.outcome.name()
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn expectation(&self) -> &Expectation {
        &self.expectation
    }

    pub fn result_value(&self) -> ResultValue {
        self.outcome.result_value(&self.expectation)
    }

    /// Historical result values, oldest first, classified under the same
    /// expectation as the current outcome.
    pub fn previous_result_values(&self) -> Vec<ResultValue> {
        self.previous
            .values()
            .map(|o| o.result_value(&self.expectation))
            .collect()
    }

    /// Result value of the most recent prior run, if any.
    pub fn most_recent_result_value(&self) -> Option<ResultValue> {
        self.previous
            .values()
            .next_back()
            .map(|o| o.result_value(&self.expectation))
    }

    pub fn has_tag(&self) -> bool {
        self.tag_outcome.is_some()
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.tag_name.as_deref()
    }

    pub fn tag_result_value(&self) -> Option<ResultValue> {
        self.tag_outcome
            .as_ref()
            .map(|o| o.result_value(&self.expectation))
    }

    /// Raw structural change: true on the very first recorded run, and
    /// whenever the current outcome differs from the most recent prior
    /// one in any way (output text included), even if the result value is
    /// unchanged.
    pub fn outcome_changed(&self) -> bool {
        match self.previous.values().next_back() {
            Some(last) => *last != self.outcome,
            None => true,
        }
    }

    /// The single decision gate for reporting: a run is surfaced only if
    /// it fails, just started or stopped failing, or diverges from the
    /// baseline tag.
    pub fn is_noteworthy(&self) -> bool {
        self.result_value() != ResultValue::Ok || self.recently_changed() || self.changed_since_tag()
    }

    fn recently_changed(&self) -> bool {
        match self.most_recent_result_value() {
            Some(previous) => previous != self.result_value(),
            None => false,
        }
    }

    fn changed_since_tag(&self) -> bool {
        match self.tag_result_value() {
            Some(tag) => tag != self.result_value(),
            None => false,
        }
    }

    /// Timestamp of the most recent prior run. `None` when no historical
    /// metadata exists for this action, or when history is empty despite
    /// metadata being present.
    pub fn last_run(&self) -> Option<&str> {
        if !self.has_metadata {
            return None;
        }
        self.previous.keys().next_back().map(String::as_str)
    }
}
