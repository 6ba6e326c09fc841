//! Expected outcome definitions.

use crate::outcome::Outcome;
use crate::result::ResultCode;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

/// Pattern that matches any output, including none.
pub const MATCH_ALL_PATTERN: &str = ".*";

static SUCCESS: LazyLock<Expectation> = LazyLock::new(|| {
    Expectation::new(ResultCode::Success, MATCH_ALL_PATTERN, Vec::new(), "", None)
        .expect("match-all pattern compiles")
});

#[derive(Debug, thiserror::Error)]
pub enum ExpectationError {
    #[error("invalid expectation pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
}

/// An expected result for a test (or class of tests), parsed from the
/// expectations database.
///
/// Everything here is frozen after construction except `bug_is_open`,
/// which an external bug-tracker query flips in place once per store.
/// The flag lives in an atomic cell so the rest of the record stays
/// immutable and matching stays pure.
#[derive(Debug)]
pub struct Expectation {
    result: ResultCode,
    pattern: Regex,
    tags: Vec<String>,
    description: String,
    bug: Option<u64>,
    bug_is_open: AtomicBool,
}

impl Expectation {
    /// Compiles `pattern` as a full-output match with multiline + dotall
    /// semantics.
    pub fn new(
        result: ResultCode,
        pattern: &str,
        tags: Vec<String>,
        description: impl Into<String>,
        bug: Option<u64>,
    ) -> Result<Self, ExpectationError> {
        // \A/\z anchor the whole output even under the m flag.
        let anchored = format!(r"\A(?sm:{pattern})\z");
        let compiled = Regex::new(&anchored).map_err(|source| ExpectationError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(source),
        })?;
        Ok(Self {
            result,
            pattern: compiled,
            tags,
            description: description.into(),
            bug,
            bug_is_open: AtomicBool::new(false),
        })
    }

    /// The universal default: expect `SUCCESS`, match any output.
    pub fn success() -> &'static Expectation {
        &SUCCESS
    }

    pub fn result(&self) -> ResultCode {
        self.result
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn bug(&self) -> Option<u64> {
        self.bug
    }

    pub fn bug_is_open(&self) -> bool {
        self.bug_is_open.load(Ordering::Relaxed)
    }

    /// Mutation point for the bug-status pass. An open bug relaxes
    /// `matches` to tolerate any result while the bug is unresolved.
    pub fn set_bug_is_open(&self, open: bool) {
        self.bug_is_open.store(open, Ordering::Relaxed);
    }

    /// True when the outcome's full output matches the pattern and either
    /// the tracked bug is open or the result codes agree.
    pub fn matches(&self, outcome: &Outcome) -> bool {
        self.pattern.is_match(outcome.output())
            && (self.bug_is_open() || self.result == outcome.result())
    }
}

impl Clone for Expectation {
    fn clone(&self) -> Self {
        Self {
            result: self.result,
            pattern: self.pattern.clone(),
            tags: self.tags.clone(),
            description: self.description.clone(),
            bug: self.bug,
            bug_is_open: AtomicBool::new(self.bug_is_open()),
        }
    }
}
