//! Run report
//!
//! Counts step outcomes and prints the colored console report.

use colored::Colorize;
use std::time::Duration;

use crate::api::Method;

const RULE_WIDTH: usize = 80;

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed(String),
    Failed(String),
    /// Precondition missing; no request was made
    Skipped(String),
    /// Attempted but not counted as pass or fail
    Warned(String),
}

/// Outcome kind without the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Passed,
    Failed,
    Skipped,
    Warned,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Passed(_) => OutcomeKind::Passed,
            Outcome::Failed(_) => OutcomeKind::Failed,
            Outcome::Skipped(_) => OutcomeKind::Skipped,
            Outcome::Warned(_) => OutcomeKind::Warned,
        }
    }
}

/// Outcome plus informational lines shown under it
#[derive(Debug, Clone)]
pub struct StepResult {
    pub outcome: Outcome,
    pub details: Vec<String>,
}

impl StepResult {
    pub fn pass(message: impl Into<String>) -> Self {
        Self::from(Outcome::Passed(message.into()))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::from(Outcome::Failed(message.into()))
    }

    pub fn skip(message: impl Into<String>) -> Self {
        Self::from(Outcome::Skipped(message.into()))
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::from(Outcome::Warned(message.into()))
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    /// Downgrade a failure to a warning
    pub fn soften(self) -> Self {
        match self.outcome {
            Outcome::Failed(message) => Self {
                outcome: Outcome::Warned(message),
                details: self.details,
            },
            _ => self,
        }
    }
}

impl From<Outcome> for StepResult {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            details: Vec::new(),
        }
    }
}

/// Counters and console output for one run
#[derive(Debug, Default)]
pub struct Report {
    passed: usize,
    failed: usize,
    skipped: usize,
    warnings: usize,
    rate_limits: usize,
    request_time: Duration,
    quiet: bool,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// A report that counts but prints nothing
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Number of requests that hit HTTP 429 and were retried
    pub fn rate_limits(&self) -> usize {
        self.rate_limits
    }

    /// Cumulative time spent in requests
    pub fn request_time(&self) -> Duration {
        self.request_time
    }

    pub fn add_request_time(&mut self, elapsed: Duration) {
        self.request_time += elapsed;
    }

    /// Percentage of counted steps that passed
    pub fn success_rate(&self) -> f64 {
        let total = self.passed + self.failed;
        if total == 0 {
            0.0
        } else {
            self.passed as f64 / total as f64 * 100.0
        }
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }

    /// Count and print a step result
    pub fn record(&mut self, result: &StepResult) {
        match &result.outcome {
            Outcome::Passed(message) => {
                self.passed += 1;
                if message.is_empty() {
                    self.line(format!("  {}", "✓ PASS".green()));
                } else {
                    self.line(format!("  {} - {}", "✓ PASS".green(), message));
                }
            }
            Outcome::Failed(message) => {
                self.failed += 1;
                self.line(format!("  {} - {}", "✗ FAIL".red(), message));
            }
            Outcome::Skipped(message) => {
                self.skipped += 1;
                self.line(format!("  {} - {}", "⚠ SKIP".yellow(), message));
            }
            Outcome::Warned(message) => self.warn(message),
        }
        for detail in &result.details {
            self.info(detail);
        }
    }

    pub fn warn(&mut self, message: &str) {
        self.warnings += 1;
        self.line(format!("  {} - {}", "⚠ WARN".yellow(), message));
    }

    /// Note a 429 that was retried; not counted as a step warning
    pub fn rate_limited(&mut self, delay: Duration) {
        self.rate_limits += 1;
        self.line(format!(
            "  {} - Rate limit hit. Retried after {}s",
            "⚠ WARN".yellow(),
            delay.as_secs()
        ));
    }

    pub fn info(&self, message: &str) {
        self.line(format!("  {} - {}", "ℹ INFO".blue(), message));
    }

    /// Title line at the start of the run
    pub fn title(&self, title: &str, base_url: &str) {
        self.line(format!("{}", format!("{:^width$}", title, width = RULE_WIDTH).bold()));
        self.line(format!("Base URL: {}\n", base_url.bold()));
    }

    /// Banner printed before a step
    pub fn header(&self, text: &str) {
        let rule = "=".repeat(RULE_WIDTH);
        self.line(format!("\n{}", rule.blue().bold()));
        self.line(format!(
            "{}",
            format!("{:^width$}", text, width = RULE_WIDTH).blue().bold()
        ));
        self.line(format!("{}\n", rule.blue().bold()));
    }

    /// The request a step is about to make
    pub fn request(&self, method: Method, path: &str) {
        self.line(format!(
            "{}",
            format!("▶ {:<6} {}", method.as_str(), path).bold()
        ));
    }

    /// Highlighted notice outside any step
    pub fn notice(&self, message: &str) {
        self.line(format!("\n{}\n", message.red()));
    }

    pub fn print_summary(&self) {
        if self.quiet {
            return;
        }
        let rule = "=".repeat(RULE_WIDTH);
        let total = self.passed + self.failed;
        let rate = format!("{:.1}%", self.success_rate());
        let rate = if self.failed == 0 && total > 0 {
            rate.green()
        } else {
            rate.red()
        };

        println!("\n{}", rule.bold());
        println!("{}", "Test Summary".bold());
        println!("{}", rule.bold());
        println!("Total: {}", total.to_string().bold());
        println!("  {}", format!("✓ Passed: {}", self.passed).green());
        println!("  {}", format!("✗ Failed: {}", self.failed).red());
        if self.skipped > 0 {
            println!("  {}", format!("⚠ Skipped: {}", self.skipped).yellow());
        }
        if self.warnings > 0 {
            println!("  {}", format!("⚠ Warnings: {}", self.warnings).yellow());
        }
        if self.rate_limits > 0 {
            println!(
                "  {}",
                format!("⚠ Rate limited requests: {}", self.rate_limits).yellow()
            );
        }
        println!("Success rate: {}", rate.bold());
        println!(
            "Total request time: {}",
            format!("{:.2}s", self.request_time.as_secs_f64()).bold()
        );
        println!("{}\n", rule.bold());
    }

    fn line(&self, text: String) {
        if !self.quiet {
            println!("{}", text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_outcome() {
        let mut report = Report::quiet();
        report.record(&StepResult::pass("ok"));
        report.record(&StepResult::pass("ok").with_detail("more"));
        report.record(&StepResult::fail("Status code: 500"));
        report.record(&StepResult::skip("No channel id"));
        report.record(&StepResult::warn("login failed"));

        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.warnings(), 1);
        assert_eq!(report.exit_code(), 1);
        assert!((report.success_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_empty_report() {
        let report = Report::quiet();
        assert_eq!(report.success_rate(), 0.0);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.request_time(), Duration::ZERO);
    }

    #[test]
    fn test_soften_only_touches_failures() {
        let result = StepResult::fail("boom").with_detail("d").soften();
        assert_eq!(result.outcome, Outcome::Warned("boom".to_string()));
        assert_eq!(result.details, vec!["d".to_string()]);

        let result = StepResult::pass("fine").soften();
        assert_eq!(result.outcome.kind(), OutcomeKind::Passed);
    }

    #[test]
    fn test_rate_limits_are_not_warnings() {
        let mut report = Report::quiet();
        report.rate_limited(Duration::from_secs(2));
        report.record(&StepResult::warn("login failed"));

        assert_eq!(report.rate_limits(), 1);
        assert_eq!(report.warnings(), 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_request_time_accumulates() {
        let mut report = Report::quiet();
        report.add_request_time(Duration::from_millis(250));
        report.add_request_time(Duration::from_millis(750));
        assert_eq!(report.request_time(), Duration::from_secs(1));
    }
}
