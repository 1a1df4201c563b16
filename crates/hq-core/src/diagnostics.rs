//! Issue collection for loading and validation.
//!
//! Row-level problems (a line that references an unknown bus, a generator
//! with a malformed control string) are recorded here instead of aborting
//! the whole load, then reported together.
//!
//! ```
//! use hq_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("structure", "Network has no loads");
//! diag.add_error_with_entity("reference", "Unknown bus 'Manic-5'", "Line L0007");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The element was kept, possibly with a defaulted value
    Warning,
    /// The element was dropped, or the network cannot be studied
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Grouping key ("parse", "reference", "structure", "slack", ...)
    pub category: String,
    pub message: String,
    /// 1-based data row in the source table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Element label, e.g. "Bus Manic-5"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            line: None,
            entity: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7} {:<10} {}", self.severity, self.category, self.message)?;
        match (&self.entity, self.line) {
            (Some(entity), Some(line)) => write!(f, " [{entity}, row {line}]"),
            (Some(entity), None) => write!(f, " [{entity}]"),
            (None, Some(line)) => write!(f, " [row {line}]"),
            (None, None) => Ok(()),
        }
    }
}

/// Warning and error counts of a list of issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    warnings: usize,
    errors: usize,
}

impl Tally {
    fn of(issues: &[DiagnosticIssue]) -> Self {
        issues.iter().fold(Self::default(), |mut t, issue| {
            match issue.severity {
                Severity::Warning => t.warnings += 1,
                Severity::Error => t.errors += 1,
            }
            t
        })
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = |n: usize| if n == 1 { "" } else { "s" };
        match (self.warnings, self.errors) {
            (0, 0) => f.write_str("No issues"),
            (w, 0) => write!(f, "{w} warning{}", s(w)),
            (0, e) => write!(f, "{e} error{}", s(e)),
            (w, e) => write!(f, "{w} warning{}, {e} error{}", s(w), s(e)),
        }
    }
}

/// Findings of a validation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_at_line(&mut self, category: &str, message: &str, line: usize) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message).with_line(line));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn warning_count(&self) -> usize {
        Tally::of(&self.issues).warnings
    }

    pub fn error_count(&self) -> usize {
        Tally::of(&self.issues).errors
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(DiagnosticIssue::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| !i.is_error())
    }

    /// Appends issues found elsewhere, e.g. while importing.
    pub fn merge(&mut self, issues: impl IntoIterator<Item = DiagnosticIssue>) {
        self.issues.extend(issues);
    }

    pub fn summary(&self) -> String {
        Tally::of(&self.issues).to_string()
    }
}

impl fmt::Display for Diagnostics {
    /// Errors first, then warnings, each in insertion order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in self.errors().chain(self.warnings()) {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Element counts gathered while loading a data directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStats {
    pub buses: usize,
    pub lines: usize,
    pub line_types: usize,
    pub carriers: usize,
    pub generators: usize,
    pub loads: usize,
    /// Rows or elements dropped because of an error
    pub skipped_rows: usize,
    pub defaulted_values: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buses, {} lines, {} generators, {} loads, {} line types, {} carriers",
            self.buses, self.lines, self.generators, self.loads, self.line_types, self.carriers
        )
    }
}

/// What one import produced and what it had to drop or default.
///
/// Every error recorded here stands for a dropped row and is counted in
/// [`ImportStats::skipped_rows`]; every defaulted value in
/// [`ImportStats::defaulted_values`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportDiagnostics {
    pub stats: ImportStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl ImportDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, issue: DiagnosticIssue) {
        if issue.is_error() {
            self.stats.skipped_rows += 1;
        }
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.record(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.record(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_defaulted(&mut self, entity: &str, message: &str) {
        self.stats.defaulted_values += 1;
        self.add_warning_with_entity("default", message, entity);
    }

    pub fn add_error_at_line(&mut self, category: &str, message: &str, line: usize) {
        self.record(DiagnosticIssue::new(Severity::Error, category, message).with_line(line));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.record(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        Tally::of(&self.issues).warnings
    }

    pub fn error_count(&self) -> usize {
        Tally::of(&self.issues).errors
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(DiagnosticIssue::is_error)
    }

    pub fn summary(&self) -> String {
        format!("{} | {}", self.stats, Tally::of(&self.issues))
    }
}

impl fmt::Display for ImportDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Import: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut diag = Diagnostics::new();
        diag.add_warning("structure", "Network has no loads");
        diag.add_error("structure", "Network has no generators");
        diag.add_warning_at_line("parse", "empty v_nom", 42);

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_errors());
        assert!(diag.has_warnings());
        assert_eq!(diag.summary(), "2 warnings, 1 error");
        assert_eq!(Diagnostics::new().summary(), "No issues");
    }

    #[test]
    fn issue_display_names_entity_and_row() {
        let issue = DiagnosticIssue::new(Severity::Error, "reference", "Unknown bus")
            .with_entity("Line L0003")
            .with_line(4);
        let text = issue.to_string();
        assert!(text.starts_with("error"));
        assert!(text.contains("reference"));
        assert!(text.ends_with("[Line L0003, row 4]"));
    }

    #[test]
    fn display_lists_errors_before_warnings() {
        let mut diag = Diagnostics::new();
        diag.add_warning("capacity", "short");
        diag.add_error_with_entity("slack", "Island has 0 slack generators", "Island 1");
        let text = diag.to_string();
        let error_at = text.find("slack").unwrap();
        let warning_at = text.find("capacity").unwrap();
        assert!(error_at < warning_at);

        let mut import = ImportDiagnostics::new();
        import.add_warning("parse", "empty v_nom");
        diag.merge(import.issues);
        assert_eq!(diag.warning_count(), 2);
    }

    #[test]
    fn serializes_severity_and_entity() {
        let mut diag = Diagnostics::new();
        diag.add_error_with_entity("slack", "Island has 0 slack generators", "Island 1");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"entity\":\"Island 1\""));
    }

    #[test]
    fn import_errors_count_as_skipped_rows() {
        let mut diag = ImportDiagnostics::new();
        diag.stats.buses = 3;
        diag.add_defaulted("Generator G1", "control defaulted to PQ");
        diag.add_error_at_line("parse", "bad number", 7);
        diag.add_error_with_entity("reference", "unknown bus", "Load L9");

        assert_eq!(diag.stats.defaulted_values, 1);
        assert_eq!(diag.stats.skipped_rows, 2);
        assert!(diag.summary().starts_with("3 buses"));
        assert!(diag.summary().ends_with("1 warning, 2 errors"));
    }
}
