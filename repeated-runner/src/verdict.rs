// Copyright (c) The repeated Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The verdict engine: reduces a run history to a final pass/fail verdict
//! under the selected decision procedure.

use crate::history::RunHistory;
use crate::params::{DecisionPolicy, ParameterSet};
use crate::stats::{beta_tail_probability, wilson_lower_bound};
use serde::{Deserialize, Serialize};

/// The final outcome of one repeated-test evaluation.
///
/// Produced exactly once per test by [`evaluate`]; immutable afterwards.
/// The rationale is sufficient to reconstruct the decision without
/// re-running the test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the test passed overall.
    pub passed: bool,

    /// A human-readable explanation of the decision.
    pub rationale: String,

    /// The full per-attempt record, for verbose reporting.
    pub history: RunHistory,
}

impl Verdict {
    /// The short status label attached to reports: `PASSED (k/n)` or
    /// `FAILED (k/n)`, where `k` is the number of passing runs and `n` the
    /// requested repetition count.
    pub fn summary(&self) -> String {
        let status = if self.passed { "PASSED" } else { "FAILED" };
        format!(
            "{status} ({}/{})",
            self.history.pass_count(),
            self.history.requested()
        )
    }
}

/// Reduces a completed [`RunHistory`] to a [`Verdict`] under `params`.
///
/// If the history stopped early on a fatal error, the verdict is
/// unconditionally a failure reporting the captured detail; no
/// procedure-specific computation runs. The decision procedures contain no
/// randomness, so evaluating the same inputs twice yields identical
/// verdicts.
///
/// # Panics
///
/// Panics if the history does not belong to `params`: a completed history
/// whose length differs from `params.repetitions` violates the executor's
/// contract and fails loudly rather than producing a wrong verdict.
pub fn evaluate(params: &ParameterSet, history: RunHistory) -> Verdict {
    if history.stopped_early() {
        let detail = history
            .fatal_error()
            .expect("early-stopped histories end with a fatal error");
        let rationale = format!(
            "attempt {} of {} raised a non-assertion error ({}): {}\n{}",
            history.len(),
            history.requested(),
            detail.kind,
            detail.message,
            detail.trace,
        );
        return Verdict {
            passed: false,
            rationale,
            history,
        };
    }

    assert_eq!(
        history.len(),
        params.repetitions,
        "completed run history length must equal the requested repetition count"
    );

    let k = history.pass_count();
    let m = history.expected_failure_count();
    let n = k + m;

    let (passed, rationale) = match params.policy {
        DecisionPolicy::Threshold { pass_threshold } => {
            let passed = k >= pass_threshold;
            let rationale =
                format!("{k} out of {n} runs passed; threshold was {pass_threshold}");
            (passed, rationale)
        }
        DecisionPolicy::Frequentist {
            null_rate,
            confidence,
        } => {
            let lower_bound = wilson_lower_bound(k, n, confidence);
            let passed = lower_bound > null_rate;
            let conclusion = if passed {
                "reject the null: the pass rate is significantly higher"
            } else {
                "fail to reject the null"
            };
            let rationale = format!(
                "{k} out of {n} runs passed; Wilson lower bound {lower_bound:.6} at \
                 confidence {confidence} vs null success rate {null_rate}: {conclusion}"
            );
            (passed, rationale)
        }
        DecisionPolicy::Bayesian {
            success_rate_threshold,
            posterior_threshold_probability,
            prior_successes,
            prior_failures,
        } => {
            let alpha_post = prior_successes + f64::from(k);
            let beta_post = prior_failures + f64::from(m);
            let tail = beta_tail_probability(alpha_post, beta_post, success_rate_threshold);
            let passed = tail >= posterior_threshold_probability;
            let rationale = format!(
                "{k} out of {n} runs passed; posterior Beta({alpha_post}, {beta_post}) \
                 gives P(rate >= {success_rate_threshold}) = {tail:.6}, required \
                 {posterior_threshold_probability}"
            );
            (passed, rationale)
        }
    };

    Verdict {
        passed,
        rationale,
        history,
    }
}
