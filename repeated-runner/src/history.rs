// Copyright (c) The repeated Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-attempt outcome record produced by the repetition executor.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Captured detail for a non-assertion error raised by a test body.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// The error's type name.
    pub kind: String,

    /// The error's display message.
    pub message: String,

    /// A formatted trace: the error followed by its source chain.
    pub trace: String,
}

impl ErrorDetail {
    /// Creates a detail record from explicit parts.
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        trace: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Captures a concrete error's type name, message, and source chain.
    pub fn from_error<E: Error>(err: &E) -> Self {
        let mut trace = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push_str("\n  caused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            kind: std::any::type_name::<E>().to_owned(),
            message: err.to_string(),
            trace,
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The classification of one attempt at running a test body.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RunOutcome {
    /// The body returned normally.
    Pass,

    /// The body raised an assertion-style failure: a statistical miss,
    /// counted toward the tally.
    ExpectedFailure,

    /// The body raised any other error: treated as a programming defect,
    /// not a sample from the variable under test.
    FatalError(ErrorDetail),
}

impl RunOutcome {
    /// Returns true for [`RunOutcome::Pass`].
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// A short lowercase label for this outcome kind.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::ExpectedFailure => "expected failure",
            Self::FatalError(_) => "fatal error",
        }
    }
}

/// The ordered record of one test's repeated executions.
///
/// Index 0 is the first attempt. If [`stopped_early`](Self::stopped_early)
/// is true, the last outcome is a [`RunOutcome::FatalError`] and no attempt
/// ran after it; otherwise the length equals the requested count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    outcomes: Vec<RunOutcome>,
    requested: u32,
    stopped_early: bool,
}

impl RunHistory {
    pub(crate) fn new(requested: u32) -> Self {
        Self {
            outcomes: Vec::with_capacity(requested as usize),
            requested,
            stopped_early: false,
        }
    }

    pub(crate) fn record(&mut self, outcome: RunOutcome) {
        debug_assert!(
            !self.stopped_early,
            "no outcomes may be recorded after an early stop"
        );
        if matches!(outcome, RunOutcome::FatalError(_)) {
            self.stopped_early = true;
        }
        self.outcomes.push(outcome);
    }

    pub(crate) fn finish(mut self) -> Self {
        if self.stopped_early {
            debug_assert!((self.outcomes.len() as u32) <= self.requested);
            debug_assert!(matches!(
                self.outcomes.last(),
                Some(RunOutcome::FatalError(_))
            ));
        } else {
            debug_assert_eq!(self.outcomes.len() as u32, self.requested);
        }
        self.outcomes.shrink_to_fit();
        self
    }

    /// The outcomes in execution order.
    pub fn outcomes(&self) -> &[RunOutcome] {
        &self.outcomes
    }

    /// The number of attempts that were actually executed.
    pub fn len(&self) -> u32 {
        self.outcomes.len() as u32
    }

    /// Returns true if no attempts were executed. Histories produced by the
    /// executor always contain at least one attempt.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// The repetition count that was requested.
    pub fn requested(&self) -> u32 {
        self.requested
    }

    /// True if repetition stopped before the requested count because of a
    /// fatal error.
    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }

    /// The number of attempts classified as [`RunOutcome::Pass`].
    pub fn pass_count(&self) -> u32 {
        self.outcomes.iter().filter(|o| o.is_pass()).count() as u32
    }

    /// The number of attempts classified as [`RunOutcome::ExpectedFailure`].
    pub fn expected_failure_count(&self) -> u32 {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RunOutcome::ExpectedFailure))
            .count() as u32
    }

    /// The captured detail of the fatal error, if repetition stopped early.
    pub fn fatal_error(&self) -> Option<&ErrorDetail> {
        match self.outcomes.last() {
            Some(RunOutcome::FatalError(detail)) => Some(detail),
            _ => None,
        }
    }

    /// One line per attempt for the host's verbose mode: the attempt number,
    /// the outcome kind, and for fatal errors the captured detail.
    pub fn attempt_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.outcomes.iter().enumerate().map(|(i, outcome)| {
            let attempt = i + 1;
            match outcome {
                RunOutcome::FatalError(detail) => {
                    format!("attempt {attempt}: fatal error: {detail}")
                }
                other => format!("attempt {attempt}: {}", other.kind_label()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_detail() -> ErrorDetail {
        ErrorDetail::new("io::Error", "connection refused", "connection refused")
    }

    #[test]
    fn tallies_count_each_kind() {
        let mut history = RunHistory::new(4);
        history.record(RunOutcome::Pass);
        history.record(RunOutcome::ExpectedFailure);
        history.record(RunOutcome::Pass);
        history.record(RunOutcome::ExpectedFailure);
        let history = history.finish();

        assert_eq!(history.len(), 4);
        assert_eq!(history.pass_count(), 2);
        assert_eq!(history.expected_failure_count(), 2);
        assert!(!history.stopped_early());
        assert_eq!(history.fatal_error(), None);
    }

    #[test]
    fn fatal_outcome_sets_stopped_early() {
        let mut history = RunHistory::new(5);
        history.record(RunOutcome::Pass);
        history.record(RunOutcome::FatalError(sample_detail()));
        let history = history.finish();

        assert!(history.stopped_early());
        assert_eq!(history.len(), 2);
        assert_eq!(history.fatal_error(), Some(&sample_detail()));
    }

    #[test]
    fn attempt_lines_render_in_execution_order() {
        let mut history = RunHistory::new(3);
        history.record(RunOutcome::ExpectedFailure);
        history.record(RunOutcome::FatalError(sample_detail()));
        let history = history.finish();

        let lines: Vec<_> = history.attempt_lines().collect();
        assert_eq!(
            lines,
            vec![
                "attempt 1: expected failure".to_owned(),
                "attempt 2: fatal error: io::Error: connection refused".to_owned(),
            ]
        );
    }

    #[test]
    fn from_error_captures_the_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer failed")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::other("inner failed"));
        let detail = ErrorDetail::from_error(&err);
        assert!(detail.kind.ends_with("Outer"), "kind: {}", detail.kind);
        assert_eq!(detail.message, "outer failed");
        assert_eq!(detail.trace, "outer failed\n  caused by: inner failed");
    }

    #[test]
    fn outcomes_round_trip_through_serde() {
        let outcome = RunOutcome::FatalError(sample_detail());
        let json = serde_json::to_value(&outcome).expect("serializes");
        assert_eq!(json["outcome"], "fatal-error");
        let back: RunOutcome = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, outcome);
    }
}
