//! One completed test execution.

use crate::expectation::Expectation;
use crate::result::{ResultCode, ResultValue};

/// Immutable record of one test execution result.
///
/// Output text is sanitized at construction so outcomes can be embedded in
/// reports without re-escaping. Equality is structural on
/// (name, result, output); the date is deliberately excluded so that two
/// runs producing identical results compare equal.
#[derive(Debug, Clone)]
pub struct Outcome {
    name: String,
    result: ResultCode,
    output: String,
    /// RFC3339 execution timestamp.
    date: String,
}

impl Outcome {
    pub fn new(
        name: impl Into<String>,
        result: ResultCode,
        output: &str,
        date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            result,
            output: sanitize_output(output),
            date: date.into(),
        }
    }

    /// Builds an outcome from captured output lines.
    pub fn from_lines<S: AsRef<str>>(
        name: impl Into<String>,
        result: ResultCode,
        lines: &[S],
        date: impl Into<String>,
    ) -> Self {
        let joined = lines
            .iter()
            .map(|l| l.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(name, result, &joined, date)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn result(&self) -> ResultCode {
        self.result
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Portion of the name before the last `#` (or `.` when there is no
    /// hash). A name with no separator is its own suite.
    pub fn suite_name(&self) -> &str {
        match split_index(&self.name) {
            Some(i) => &self.name[..i],
            None => &self.name,
        }
    }

    /// Portion of the name after the last `#` or `.`.
    pub fn test_name(&self) -> &str {
        match split_index(&self.name) {
            Some(i) => &self.name[i + 1..],
            None => &self.name,
        }
    }

    /// Name with `.` and `#` replaced by `/`, for hierarchical storage.
    pub fn path(&self) -> String {
        self.name.replace(['.', '#'], "/")
    }

    /// Classifies this outcome against its resolved expectation.
    ///
    /// `UNSUPPORTED` outcomes are `Ignore` regardless of the expectation.
    pub fn result_value(&self, expectation: &Expectation) -> ResultValue {
        if self.result == ResultCode::Unsupported {
            ResultValue::Ignore
        } else if expectation.matches(self) {
            ResultValue::Ok
        } else {
            ResultValue::Fail
        }
    }
}

impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.result == other.result && self.output == other.output
    }
}

impl Eq for Outcome {}

fn split_index(name: &str) -> Option<usize> {
    name.rfind('#').or_else(|| name.rfind('.'))
}

/// Normalizes line breaks and escapes XML-unsafe characters.
///
/// `\r\n` and bare `\r` become `\n`; `&`, `<`, `>` become entities; C0
/// control characters other than `\n` and `\t` become U+FFFD.
pub fn sanitize_output(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' | '\t' => out.push(c),
            c if c.is_control() => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn outcome(name: &str) -> Outcome {
        Outcome::new(name, ResultCode::Success, "", "2026-01-01T00:00:00Z")
    }

    #[test]
    fn suite_and_test_split_at_hash() {
        let o = outcome("pkg.Class#method");
        assert_eq!(o.suite_name(), "pkg.Class");
        assert_eq!(o.test_name(), "method");
    }

    #[test]
    fn suite_and_test_split_at_last_dot_without_hash() {
        let o = outcome("pkg.sub.Class");
        assert_eq!(o.suite_name(), "pkg.sub");
        assert_eq!(o.test_name(), "Class");
    }

    #[test]
    fn name_without_separator_is_its_own_suite() {
        let o = outcome("standalone");
        assert_eq!(o.suite_name(), "standalone");
        assert_eq!(o.test_name(), "standalone");
    }

    #[test]
    fn path_replaces_separators() {
        assert_eq!(outcome("pkg.Class#method").path(), "pkg/Class/method");
    }

    #[test]
    fn equality_ignores_date() {
        let a = Outcome::new("x", ResultCode::Success, "out", "2026-01-01T00:00:00Z");
        let b = Outcome::new("x", ResultCode::Success, "out", "2026-02-01T00:00:00Z");
        assert_eq!(a, b);
    }

    #[test]
    fn equality_sees_output_changes() {
        let a = Outcome::new("x", ResultCode::Success, "one", "2026-01-01T00:00:00Z");
        let b = Outcome::new("x", ResultCode::Success, "two", "2026-01-01T00:00:00Z");
        assert_ne!(a, b);
    }

    #[test]
    fn sanitize_normalizes_line_breaks() {
        assert_eq!(sanitize_output("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn sanitize_escapes_xml_unsafe_chars() {
        assert_eq!(sanitize_output("a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn sanitize_replaces_control_chars() {
        assert_eq!(sanitize_output("a\u{0007}b\tc"), "a\u{FFFD}b\tc");
    }

    #[test]
    fn from_lines_joins_with_newlines() {
        let o = Outcome::from_lines(
            "x",
            ResultCode::ExecFailed,
            &["first", "second"],
            "2026-01-01T00:00:00Z",
        );
        assert_eq!(o.output(), "first\nsecond");
    }

    #[test]
    fn unsupported_is_ignored_regardless_of_expectation() {
        let never = Expectation::new(
            ResultCode::Success,
            "will not match",
            Vec::new(),
            "",
            None,
        )
        .unwrap();
        let o = Outcome::new("x", ResultCode::Unsupported, "whatever", "2026-01-01T00:00:00Z");
        assert_eq!(o.result_value(&never), ResultValue::Ignore);
    }

    proptest! {
        #[test]
        fn sanitize_leaves_no_carriage_returns_or_raw_angles(raw in ".{0,200}") {
            let clean = sanitize_output(&raw);
            prop_assert!(!clean.contains('\r'));
            prop_assert!(!clean.contains('<'));
            prop_assert!(!clean.contains('>'));
        }
    }
}
