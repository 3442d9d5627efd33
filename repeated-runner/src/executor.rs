// Copyright (c) The repeated Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The repetition executor: runs a test body N times and classifies each
//! attempt.

use crate::history::{ErrorDetail, RunHistory, RunOutcome};
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};

/// The failure signal a test body reports for one attempt.
///
/// The two variants are the two-way error classification every decision
/// procedure shares: an assertion-style failure is a statistical miss, and
/// anything else is a defect that must stop repetition.
#[derive(Clone, Debug)]
pub enum BodyError {
    /// An assertion-style failure. Counted toward the tally; repetition
    /// continues.
    Assertion {
        /// The assertion's failure message.
        message: String,
    },

    /// Any other error. Stops repetition immediately and fails the test
    /// unconditionally.
    Fatal(ErrorDetail),
}

impl BodyError {
    /// Creates an assertion-style failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Creates a fatal failure from captured error detail.
    pub fn fatal(detail: ErrorDetail) -> Self {
        Self::Fatal(detail)
    }
}

/// Runs `body` up to `repetitions` times, classifying each attempt.
///
/// Attempts run strictly sequentially and in order. A normal return records
/// [`RunOutcome::Pass`]; a [`BodyError::Assertion`] records
/// [`RunOutcome::ExpectedFailure`] and continues; a [`BodyError::Fatal`]
/// records [`RunOutcome::FatalError`] and stops immediately, regardless of
/// how many repetitions remain or what the tally so far looks like.
///
/// # Panics
///
/// Panics if `repetitions` is zero. Callers obtain the count from a
/// validated [`ParameterSet`](crate::params::ParameterSet), which guarantees
/// it is positive.
pub fn run_repeated<F>(repetitions: u32, mut body: F) -> RunHistory
where
    F: FnMut() -> Result<(), BodyError>,
{
    assert!(repetitions > 0, "repetition count must be positive");

    let mut history = RunHistory::new(repetitions);
    for attempt in 1..=repetitions {
        match body() {
            Ok(()) => {
                tracing::debug!(attempt, repetitions, "attempt passed");
                history.record(RunOutcome::Pass);
            }
            Err(BodyError::Assertion { message }) => {
                tracing::debug!(attempt, repetitions, %message, "attempt missed");
                history.record(RunOutcome::ExpectedFailure);
            }
            Err(BodyError::Fatal(detail)) => {
                tracing::warn!(
                    attempt,
                    repetitions,
                    error = %detail,
                    "fatal error; stopping repetition"
                );
                history.record(RunOutcome::FatalError(detail));
                break;
            }
        }
    }
    history.finish()
}

/// Adapts a plain fallible closure into a classified test body.
///
/// Panics raised by the closure (Rust's assertion convention, e.g.
/// `assert!` and `assert_eq!`) become [`BodyError::Assertion`]; a returned
/// `Err` becomes [`BodyError::Fatal`] carrying the concrete error's type
/// name, message, and source chain.
pub fn catch_body<F, E>(mut body: F) -> impl FnMut() -> Result<(), BodyError>
where
    F: FnMut() -> Result<(), E>,
    E: Error,
{
    move || match panic::catch_unwind(AssertUnwindSafe(&mut body)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(BodyError::Fatal(ErrorDetail::from_error(&err))),
        Err(payload) => Err(BodyError::assertion(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::RunOutcome;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn detail(message: &str) -> ErrorDetail {
        ErrorDetail::new("DbError", message, message)
    }

    #[test]
    fn all_passes_fill_the_requested_count() {
        let history = run_repeated(5, || Ok(()));
        assert_eq!(history.len(), 5);
        assert_eq!(history.pass_count(), 5);
        assert!(!history.stopped_early());
    }

    #[test]
    fn assertion_failures_do_not_stop_repetition() {
        let mut attempt = 0;
        let history = run_repeated(4, || {
            attempt += 1;
            if attempt % 2 == 0 {
                Err(BodyError::assertion("flaked"))
            } else {
                Ok(())
            }
        });
        assert_eq!(history.len(), 4);
        assert_eq!(history.pass_count(), 2);
        assert_eq!(history.expected_failure_count(), 2);
    }

    #[test]
    fn fatal_error_stops_immediately() {
        let mut attempt = 0;
        let history = run_repeated(10, || {
            attempt += 1;
            if attempt == 3 {
                Err(BodyError::fatal(detail("connection reset")))
            } else {
                Ok(())
            }
        });
        assert_eq!(history.len(), 3);
        assert!(history.stopped_early());
        assert_eq!(history.fatal_error(), Some(&detail("connection reset")));
        // No attempt after the fatal one ran.
        assert_eq!(attempt, 3);
    }

    #[test]
    fn fatal_error_on_last_attempt_still_stops_early() {
        let mut attempt = 0;
        let history = run_repeated(3, || {
            attempt += 1;
            if attempt == 3 {
                Err(BodyError::fatal(detail("oops")))
            } else {
                Ok(())
            }
        });
        assert_eq!(history.len(), 3);
        assert!(history.stopped_early());
        assert!(matches!(
            history.outcomes().last(),
            Some(RunOutcome::FatalError(_))
        ));
    }

    #[test]
    #[should_panic(expected = "repetition count must be positive")]
    fn zero_repetitions_is_an_invariant_violation() {
        let _ = run_repeated(0, || Ok(()));
    }

    #[test]
    fn catch_body_maps_panics_to_assertions() {
        let mut attempt = 0;
        let history = run_repeated(
            3,
            catch_body(|| -> Result<(), std::io::Error> {
                attempt += 1;
                assert!(attempt != 2, "attempt {attempt} flaked");
                Ok(())
            }),
        );
        assert_eq!(history.pass_count(), 2);
        assert_eq!(history.expected_failure_count(), 1);
        assert!(!history.stopped_early());
    }

    #[test]
    fn catch_body_maps_returned_errors_to_fatal() {
        let history = run_repeated(
            5,
            catch_body(|| Err(std::io::Error::other("db unreachable"))),
        );
        assert_eq!(history.len(), 1);
        assert!(history.stopped_early());
        let detail = history.fatal_error().expect("fatal detail present");
        // Type-name paths can include private modules (io::error::Error),
        // so only anchor on the stable leaf.
        assert!(detail.kind.ends_with("Error"), "kind: {}", detail.kind);
        assert!(detail.kind.contains("io"), "kind: {}", detail.kind);
        assert_eq!(detail.message, "db unreachable");
    }

    proptest! {
        // A body that fails fatally on attempt j <= N yields a history of
        // exactly j outcomes with the terminal flag set.
        #[test]
        fn early_stop_invariant(n in 1u32..60, j in 1u32..60) {
            prop_assume!(j <= n);
            let mut attempt = 0;
            let history = run_repeated(n, || {
                attempt += 1;
                if attempt == j {
                    Err(BodyError::fatal(detail("boom")))
                } else {
                    Ok(())
                }
            });
            prop_assert_eq!(history.len(), j);
            prop_assert!(history.stopped_early());
        }

        // Without fatal errors the history length always equals the request.
        #[test]
        fn completed_histories_match_the_request(n in 1u32..60, misses in proptest::collection::vec(any::<bool>(), 60)) {
            let mut attempt = 0usize;
            let history = run_repeated(n, || {
                let miss = misses[attempt];
                attempt += 1;
                if miss {
                    Err(BodyError::assertion("miss"))
                } else {
                    Ok(())
                }
            });
            prop_assert_eq!(history.len(), n);
            prop_assert!(!history.stopped_early());
            prop_assert_eq!(history.pass_count() + history.expected_failure_count(), n);
        }
    }
}
