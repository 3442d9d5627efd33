// Copyright (c) The repeated Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The parameter resolver: alias folding, procedure detection, and range
//! validation for the raw parameter mapping a host attaches to a test.

use crate::errors::ConfigurationError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The raw parameter mapping supplied by the host, in declaration order.
pub type RawParams = IndexMap<String, ParamValue>;

/// A scalar parameter value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// An integer scalar.
    Int(i64),
    /// A floating-point scalar.
    Float(f64),
}

impl ParamValue {
    fn kind_label(self) -> &'static str {
        match self {
            Self::Int(_) => "an integer",
            Self::Float(_) => "a float",
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    fn render(self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
        }
    }
}

/// The decision procedure selected for a test, with its validated
/// parameters. Exactly one procedure applies per test; mixing is rejected
/// during resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "procedure", rename_all = "kebab-case", deny_unknown_fields)]
pub enum DecisionPolicy {
    /// Pass if at least `pass_threshold` of the repetitions passed.
    #[serde(rename_all = "kebab-case")]
    Threshold {
        /// Minimum number of passing runs. In `0..=repetitions`.
        pass_threshold: u32,
    },

    /// One-sided Wilson-score test of the observed pass rate against a
    /// null success rate.
    #[serde(rename_all = "kebab-case")]
    Frequentist {
        /// The null hypothesis success rate, in `[0, 1]`.
        null_rate: f64,

        /// The confidence level for the Wilson interval, in `(0, 1)`.
        confidence: f64,
    },

    /// Beta-Binomial conjugate update; pass if the posterior probability of
    /// the success rate clearing a threshold is high enough.
    #[serde(rename_all = "kebab-case")]
    Bayesian {
        /// The success rate the posterior is tested against, in `[0, 1]`.
        success_rate_threshold: f64,

        /// Minimum posterior probability required to pass, in `(0, 1)`.
        posterior_threshold_probability: f64,

        /// Prior pseudo-count of successes; positive. Defaults to 1.
        prior_successes: f64,

        /// Prior pseudo-count of failures; positive. Defaults to 1.
        prior_failures: f64,
    },
}

impl DecisionPolicy {
    /// A short lowercase name for the procedure.
    pub fn procedure_name(&self) -> &'static str {
        match self {
            Self::Threshold { .. } => PROC_THRESHOLD,
            Self::Frequentist { .. } => PROC_FREQUENTIST,
            Self::Bayesian { .. } => PROC_BAYESIAN,
        }
    }
}

/// A resolved, validated parameter set: the repetition count plus the
/// selected decision procedure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// How many times the test body is executed for one evaluation.
    pub repetitions: u32,

    /// The decision procedure applied to the resulting run history.
    pub policy: DecisionPolicy,
}

const PROC_THRESHOLD: &str = "threshold";
const PROC_FREQUENTIST: &str = "frequentist";
const PROC_BAYESIAN: &str = "bayesian";

const REPETITIONS: &[&str] = &["times", "n"];
const PASS_THRESHOLD: &[&str] = &["threshold"];
const NULL_RATE: &[&str] = &["H0", "null"];
const CONFIDENCE: &[&str] = &["ci"];
const SUCCESS_RATE_THRESHOLD: &[&str] = &["success_rate_threshold"];
const POSTERIOR_THRESHOLD_PROBABILITY: &[&str] = &["posterior_threshold_probability"];
const PRIOR_SUCCESSES: &[&str] = &["prior_alpha", "prior_passes"];
const PRIOR_FAILURES: &[&str] = &["prior_beta", "prior_failures"];

const ALL_NAMES: &[&[&str]] = &[
    REPETITIONS,
    PASS_THRESHOLD,
    NULL_RATE,
    CONFIDENCE,
    SUCCESS_RATE_THRESHOLD,
    POSTERIOR_THRESHOLD_PROBABILITY,
    PRIOR_SUCCESSES,
    PRIOR_FAILURES,
];

/// Resolves a raw parameter mapping into a [`ParameterSet`], or fails with
/// a [`ConfigurationError`] naming the offending field(s).
///
/// Resolution is fail-closed: unknown names, both names of an alias pair,
/// and any mixing of fields from two procedures are hard errors rather
/// than being silently ignored.
pub fn resolve(raw: &RawParams) -> Result<ParameterSet, ConfigurationError> {
    let unknown: Vec<String> = raw
        .keys()
        .filter(|key| {
            !ALL_NAMES
                .iter()
                .any(|names| names.contains(&key.as_str()))
        })
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ConfigurationError::UnknownParameters { names: unknown });
    }

    let repetitions = fold_alias(raw, REPETITIONS)?;
    let pass_threshold = fold_alias(raw, PASS_THRESHOLD)?;
    let null_rate = fold_alias(raw, NULL_RATE)?;
    let confidence = fold_alias(raw, CONFIDENCE)?;
    let success_rate_threshold = fold_alias(raw, SUCCESS_RATE_THRESHOLD)?;
    let posterior_threshold_probability = fold_alias(raw, POSTERIOR_THRESHOLD_PROBABILITY)?;
    let prior_successes = fold_alias(raw, PRIOR_SUCCESSES)?;
    let prior_failures = fold_alias(raw, PRIOR_FAILURES)?;

    let repetitions = match repetitions {
        Some((name, value)) => require_count(name, value, 1, u32::MAX, "at least 1")?,
        None => return Err(ConfigurationError::MissingRepetitions),
    };

    // Procedure detection. A procedure is selected when its required fields
    // are all present; fields of unselected procedures must be entirely
    // absent.
    let threshold_fields = present_names(&[pass_threshold]);
    let frequentist_fields = present_names(&[null_rate, confidence]);
    let bayesian_fields = present_names(&[
        success_rate_threshold,
        posterior_threshold_probability,
        prior_successes,
        prior_failures,
    ]);

    let threshold_complete = pass_threshold.is_some();
    let frequentist_complete = null_rate.is_some() && confidence.is_some();
    let bayesian_complete =
        success_rate_threshold.is_some() && posterior_threshold_probability.is_some();

    let mut complete = Vec::new();
    if threshold_complete {
        complete.push(PROC_THRESHOLD);
    }
    if frequentist_complete {
        complete.push(PROC_FREQUENTIST);
    }
    if bayesian_complete {
        complete.push(PROC_BAYESIAN);
    }

    let procedure = match complete.as_slice() {
        [] => {
            let mut partial = threshold_fields;
            partial.extend(frequentist_fields);
            partial.extend(bayesian_fields);
            return Err(ConfigurationError::MissingProcedure { partial });
        }
        [procedure] => *procedure,
        _ => {
            return Err(ConfigurationError::AmbiguousProcedure {
                procedures: complete,
            });
        }
    };

    let mut extraneous = Vec::new();
    if procedure != PROC_THRESHOLD {
        extraneous.extend(threshold_fields);
    }
    if procedure != PROC_FREQUENTIST {
        extraneous.extend(frequentist_fields);
    }
    if procedure != PROC_BAYESIAN {
        extraneous.extend(bayesian_fields);
    }
    if !extraneous.is_empty() {
        return Err(ConfigurationError::MixedProcedure {
            procedure,
            extraneous,
        });
    }

    let policy = match procedure {
        PROC_THRESHOLD => {
            let (name, value) = pass_threshold.expect("threshold procedure is complete");
            let pass_threshold =
                require_count(name, value, 0, repetitions, "0 through the repetition count")?;
            DecisionPolicy::Threshold { pass_threshold }
        }
        PROC_FREQUENTIST => {
            let (name, value) = null_rate.expect("frequentist procedure is complete");
            let null_rate = require_unit_interval(name, value, Bounds::Inclusive)?;
            let (name, value) = confidence.expect("frequentist procedure is complete");
            let confidence = require_unit_interval(name, value, Bounds::Exclusive)?;
            DecisionPolicy::Frequentist {
                null_rate,
                confidence,
            }
        }
        PROC_BAYESIAN => {
            let (name, value) =
                success_rate_threshold.expect("bayesian procedure is complete");
            let success_rate_threshold =
                require_unit_interval(name, value, Bounds::Inclusive)?;
            let (name, value) =
                posterior_threshold_probability.expect("bayesian procedure is complete");
            let posterior_threshold_probability =
                require_unit_interval(name, value, Bounds::Exclusive)?;
            let prior_successes = match prior_successes {
                Some((name, value)) => require_positive(name, value)?,
                None => 1.0,
            };
            let prior_failures = match prior_failures {
                Some((name, value)) => require_positive(name, value)?,
                None => 1.0,
            };
            DecisionPolicy::Bayesian {
                success_rate_threshold,
                posterior_threshold_probability,
                prior_successes,
                prior_failures,
            }
        }
        _ => unreachable!("procedure is one of the three known names"),
    };

    Ok(ParameterSet {
        repetitions,
        policy,
    })
}

/// Folds an alias group down to at most one supplied (name, value) pair.
fn fold_alias(
    raw: &RawParams,
    names: &'static [&'static str],
) -> Result<Option<(&'static str, ParamValue)>, ConfigurationError> {
    let mut found: Option<(&'static str, ParamValue)> = None;
    for &name in names {
        if let Some(value) = raw.get(name) {
            if let Some((first, _)) = found {
                return Err(ConfigurationError::AliasCollision {
                    first,
                    second: name,
                });
            }
            found = Some((name, *value));
        }
    }
    Ok(found)
}

fn present_names(fields: &[Option<(&'static str, ParamValue)>]) -> Vec<&'static str> {
    fields
        .iter()
        .filter_map(|field| field.map(|(name, _)| name))
        .collect()
}

fn require_count(
    name: &'static str,
    value: ParamValue,
    min: u32,
    max: u32,
    range: &'static str,
) -> Result<u32, ConfigurationError> {
    let ParamValue::Int(value) = value else {
        return Err(ConfigurationError::WrongType {
            name,
            expected: "an integer",
            found: value.kind_label(),
        });
    };
    u32::try_from(value)
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| ConfigurationError::OutOfRange {
            name,
            value: value.to_string(),
            range,
        })
}

enum Bounds {
    Inclusive,
    Exclusive,
}

fn require_unit_interval(
    name: &'static str,
    value: ParamValue,
    bounds: Bounds,
) -> Result<f64, ConfigurationError> {
    let v = value.as_f64();
    let (in_range, range) = match bounds {
        Bounds::Inclusive => ((0.0..=1.0).contains(&v), "the interval [0, 1]"),
        Bounds::Exclusive => (v > 0.0 && v < 1.0, "the open interval (0, 1)"),
    };
    if in_range {
        Ok(v)
    } else {
        Err(ConfigurationError::OutOfRange {
            name,
            value: value.render(),
            range,
        })
    }
}

fn require_positive(
    name: &'static str,
    value: ParamValue,
) -> Result<f64, ConfigurationError> {
    let v = value.as_f64();
    if v > 0.0 && v.is_finite() {
        Ok(v)
    } else {
        Err(ConfigurationError::OutOfRange {
            name,
            value: value.render(),
            range: "positive numbers",
        })
    }
}
