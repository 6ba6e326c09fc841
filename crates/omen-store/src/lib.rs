//! The parsed expectations database.
//!
//! An expectations file is a stream of whitespace-separated JSON objects,
//! each declaring the expected result for one test name (or list of
//! names) or one cross-cutting failure pattern. The store is built once
//! per run and read-only afterward, except for the single bug-status
//! pass that flips `bug_is_open` flags in place.

use omen_adapters::{AdapterError, CommandSpec, ProcessRunner};
use omen_types::{Expectation, ExpectationError, Mode, Outcome, MATCH_ALL_PATTERN};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {origin}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed expectation in {origin}: {message}")]
    Malformed { origin: String, message: String },

    #[error("expectation needs at least one name or failure in {origin} (description {description:?})")]
    MissingName { origin: String, description: String },

    #[error("duplicate expectations for {name:?} in {origin}")]
    DuplicateName { name: String, origin: String },

    #[error("bad pattern in {origin}")]
    Pattern {
        origin: String,
        #[source]
        source: ExpectationError,
    },

    #[error("bug status command failed")]
    BugStatus(#[from] AdapterError),
}

/// Maps test names and failure patterns to expectations.
///
/// Two mappings on purpose: `outcomes` resolves exact and package/class
/// prefix names; `failures` holds cross-cutting patterns matched against
/// output regardless of name, in insertion order. The precedence contract
/// lives in [`ExpectationStore::get`].
#[derive(Debug, Default)]
pub struct ExpectationStore {
    outcomes: BTreeMap<String, Expectation>,
    failures: Vec<(String, Expectation)>,
}

impl ExpectationStore {
    /// Parses every file that exists; files that don't are skipped.
    pub fn parse(files: &[PathBuf], mode: Mode) -> Result<Self, StoreError> {
        let mut store = Self::default();
        for file in files {
            if !file.exists() {
                tracing::debug!(file = %file.display(), "skipping missing expectations file");
                continue;
            }
            store.parse_file(file, mode)?;
        }
        Ok(store)
    }

    pub fn parse_file(&mut self, path: &Path, mode: Mode) -> Result<(), StoreError> {
        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&text, mode, &path.display().to_string())
    }

    /// Parses one expectations document. `origin` names the source in
    /// errors and warnings.
    pub fn parse_str(&mut self, text: &str, mode: Mode, origin: &str) -> Result<(), StoreError> {
        for value in serde_json::Deserializer::from_str(text).into_iter::<Value>() {
            let value = value.map_err(|source| StoreError::Json {
                origin: origin.to_string(),
                source,
            })?;
            match value {
                Value::Object(record) => self.add_record(&record, mode, origin)?,
                other => {
                    return Err(StoreError::Malformed {
                        origin: origin.to_string(),
                        message: format!("expected a JSON object, got {other}"),
                    });
                }
            }
        }
        Ok(())
    }

    fn add_record(
        &mut self,
        record: &Map<String, Value>,
        mode: Mode,
        origin: &str,
    ) -> Result<(), StoreError> {
        let mut names: Vec<String> = Vec::new();
        let mut is_failure = false;
        let mut result = None;
        let mut pattern: Option<String> = None;
        let mut substring: Option<String> = None;
        let mut tags: Vec<String> = Vec::new();
        let mut description = String::new();
        let mut bug: Option<u64> = None;
        let mut modes: Option<Vec<Mode>> = None;

        for (key, value) in record {
            match key.as_str() {
                "result" => {
                    result = Some(
                        serde_json::from_value(value.clone()).map_err(|_| malformed(
                            origin,
                            format!("unknown result {value}"),
                        ))?,
                    );
                }
                "name" => names.push(string_field(value, key, origin)?),
                "names" => names.extend(string_list_field(value, key, origin)?),
                "failure" => {
                    is_failure = true;
                    names.push(string_field(value, key, origin)?);
                }
                "pattern" => pattern = Some(string_field(value, key, origin)?),
                "substring" => substring = Some(string_field(value, key, origin)?),
                "tags" => tags = string_list_field(value, key, origin)?,
                "description" => {
                    description = join_description(&string_field(value, key, origin)?);
                }
                "bug" => {
                    bug = Some(value.as_u64().ok_or_else(|| {
                        malformed(origin, format!("bug must be a non-negative integer, got {value}"))
                    })?);
                }
                "modes" => {
                    let mut parsed = Vec::new();
                    for raw in string_list_field(value, key, origin)? {
                        let m = raw.parse::<Mode>().map_err(|e| malformed(origin, e.to_string()))?;
                        parsed.push(m);
                    }
                    modes = Some(parsed);
                }
                other => {
                    // Forward-compatible: unknown fields are dropped, not fatal.
                    tracing::warn!(field = other, origin, "ignoring unrecognized expectation field");
                }
            }
        }

        if let Some(modes) = &modes {
            if !modes.contains(&mode) {
                return Ok(());
            }
        }

        if names.is_empty() {
            return Err(StoreError::MissingName {
                origin: origin.to_string(),
                description,
            });
        }

        let result = result
            .ok_or_else(|| malformed(origin, format!("expectation for {names:?} has no result")))?;

        let pattern = match (pattern, substring) {
            (Some(_), Some(_)) => {
                return Err(malformed(
                    origin,
                    format!("expectation for {names:?} sets both pattern and substring"),
                ));
            }
            (Some(p), None) => p,
            (None, Some(s)) => format!(".*{}.*", regex::escape(&s)),
            (None, None) => MATCH_ALL_PATTERN.to_string(),
        };

        for name in names {
            let expectation =
                Expectation::new(result, &pattern, tags.clone(), description.clone(), bug)
                    .map_err(|source| StoreError::Pattern {
                        origin: origin.to_string(),
                        source,
                    })?;
            if is_failure {
                if self.failures.iter().any(|(n, _)| *n == name) {
                    return Err(StoreError::DuplicateName {
                        name,
                        origin: origin.to_string(),
                    });
                }
                self.failures.push((name, expectation));
            } else if self.outcomes.insert(name.clone(), expectation).is_some() {
                return Err(StoreError::DuplicateName {
                    name,
                    origin: origin.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Resolves by name only: exact match first, then progressively
    /// truncated package/class prefixes, bottoming out at the universal
    /// `SUCCESS` expectation. Total: never fails.
    pub fn get_by_name(&self, name: &str) -> &Expectation {
        let mut key = name;
        loop {
            if let Some(expectation) = self.outcomes.get(key) {
                return expectation;
            }
            match key.rfind(['.', '#']) {
                Some(i) => key = &key[..i],
                None => return Expectation::success(),
            }
        }
    }

    /// Resolution precedence: exact name match wins outright; else the
    /// first failure pattern (insertion order) that matches the outcome;
    /// else the hierarchical name lookup of [`get_by_name`].
    ///
    /// [`get_by_name`]: ExpectationStore::get_by_name
    pub fn get(&self, outcome: &Outcome) -> &Expectation {
        if let Some(expectation) = self.outcomes.get(outcome.name()) {
            return expectation;
        }
        if let Some((_, expectation)) = self.failures.iter().find(|(_, e)| e.matches(outcome)) {
            return expectation;
        }
        self.get_by_name(outcome.name())
    }

    /// Distinct bug ids referenced anywhere in the store.
    pub fn bugs(&self) -> BTreeSet<u64> {
        self.expectations().filter_map(Expectation::bug).collect()
    }

    /// Queries the external bug tracker and flips `bug_is_open` on every
    /// expectation accordingly. The command is invoked once with all
    /// distinct bug ids appended to its argv and must print the currently
    /// open ids one per line; its exit code is not inspected. No-ops when
    /// the store references no bugs.
    pub fn load_bug_statuses<R: ProcessRunner>(
        &self,
        runner: &R,
        command: &[String],
    ) -> Result<(), StoreError> {
        let bugs = self.bugs();
        if bugs.is_empty() {
            return Ok(());
        }

        let mut argv: Vec<String> = command.to_vec();
        argv.extend(bugs.iter().map(u64::to_string));
        let output = runner.run(&CommandSpec::new(argv))?;

        let mut open = BTreeSet::new();
        for line in &output.stdout_lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<u64>() {
                Ok(id) => {
                    open.insert(id);
                }
                Err(_) => {
                    tracing::warn!(line, "ignoring unparseable bug id from status command");
                }
            }
        }

        for expectation in self.expectations() {
            if let Some(bug) = expectation.bug() {
                expectation.set_bug_is_open(open.contains(&bug));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty() && self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    fn expectations(&self) -> impl Iterator<Item = &Expectation> {
        self.outcomes
            .values()
            .chain(self.failures.iter().map(|(_, e)| e))
    }
}

fn malformed(origin: &str, message: String) -> StoreError {
    StoreError::Malformed {
        origin: origin.to_string(),
        message,
    }
}

fn string_field(value: &Value, key: &str, origin: &str) -> Result<String, StoreError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(origin, format!("{key} must be a string, got {value}")))
}

fn string_list_field(value: &Value, key: &str, origin: &str) -> Result<Vec<String>, StoreError> {
    let items = value
        .as_array()
        .ok_or_else(|| malformed(origin, format!("{key} must be a list of strings, got {value}")))?;
    items
        .iter()
        .map(|item| string_field(item, key, origin))
        .collect()
}

/// Trims each line, drops blank ones, and rejoins.
fn join_description(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
