use std::fmt;

use crate::scenario::ScenarioResult;

/// The results of a set of scenarios, in the order they were run.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Report {
    results: Vec<ScenarioResult>,
}

impl Report {
    pub fn from_results(results: Vec<ScenarioResult>) -> Report {
        Report { results }
    }

    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    pub fn passed(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Failures of scenarios tagged with a known issue.
    pub fn known_issues(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.failed().filter(|r| r.known_issue.is_some())
    }

    /// Failures that count against the run.
    pub fn unexpected_failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.failed().filter(|r| r.known_issue.is_none())
    }

    /// True iff every failure is tagged with a known issue.
    pub fn is_success(&self) -> bool {
        self.unexpected_failures().next().is_none()
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(crate::error::builder)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            let verdict = match (result.success, result.known_issue) {
                (true, _) => "PASS".to_owned(),
                (false, Some(issue)) => format!("FAIL (known issue #{issue})"),
                (false, None) => "FAIL".to_owned(),
            };
            writeln!(
                f,
                "{:<24} {:<8} {:<28} {:>6}ms",
                result.name,
                result.scheme,
                verdict,
                result.elapsed.as_millis()
            )?;
            for line in &result.diagnostics {
                writeln!(f, "    {line}")?;
            }
        }

        write!(
            f,
            "{} passed, {} failed ({} known issues)",
            self.passed().count(),
            self.failed().count(),
            self.known_issues().count()
        )
    }
}
