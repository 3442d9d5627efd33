// Copyright (c) The repeated Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while resolving repetition parameters.

use itertools::Itertools;
use thiserror::Error;

/// An error that occurred while resolving a raw parameter mapping into a
/// [`ParameterSet`](crate::params::ParameterSet).
///
/// Every variant is raised before any repetition begins, and names the exact
/// field (or fields) at fault so the configuration can be fixed without
/// re-running the test.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// Both accepted names for one field were supplied at the same time.
    #[error("`{first}` and `{second}` are two names for the same parameter; supply exactly one")]
    AliasCollision {
        /// The first accepted name found for the field.
        first: &'static str,
        /// The other accepted name for the same field.
        second: &'static str,
    },

    /// The mapping contained names that no decision procedure accepts.
    #[error("unknown parameter(s): {}", .names.iter().join(", "))]
    UnknownParameters {
        /// The unrecognized names, in mapping order.
        names: Vec<String>,
    },

    /// The repetition count was not supplied under either accepted name.
    #[error("a repetition count is required; supply `times` or `n`")]
    MissingRepetitions,

    /// No decision procedure had its required fields fully present.
    #[error(
        "no decision procedure selected; supply `threshold`, or `H0` with `ci`, or \
         `success_rate_threshold` with `posterior_threshold_probability`{}",
        if .partial.is_empty() {
            String::new()
        } else {
            format!(" (incomplete: {})", .partial.iter().join(", "))
        }
    )]
    MissingProcedure {
        /// Fields that were supplied but do not complete any procedure.
        partial: Vec<&'static str>,
    },

    /// More than one decision procedure had its required fields fully present.
    #[error(
        "parameters select more than one decision procedure ({}); procedures cannot be mixed",
        .procedures.iter().join(", ")
    )]
    AmbiguousProcedure {
        /// The procedures whose required fields were all present.
        procedures: Vec<&'static str>,
    },

    /// Exactly one procedure was selected, but fields from another procedure
    /// were also present.
    #[error(
        "the {procedure} procedure was selected, but parameters from another procedure \
         were also supplied: {}; procedures cannot be mixed",
        .extraneous.iter().join(", ")
    )]
    MixedProcedure {
        /// The selected procedure.
        procedure: &'static str,
        /// Fields belonging to a different procedure.
        extraneous: Vec<&'static str>,
    },

    /// A field was supplied with a scalar of the wrong type.
    #[error("parameter `{name}` must be {expected}, but {found} was supplied")]
    WrongType {
        /// The canonical field name.
        name: &'static str,
        /// The expected scalar kind.
        expected: &'static str,
        /// The scalar kind that was actually supplied.
        found: &'static str,
    },

    /// A field's value fell outside its valid range.
    #[error("parameter `{name}` is {value}, outside its valid range of {range}")]
    OutOfRange {
        /// The canonical field name.
        name: &'static str,
        /// The supplied value, rendered for the message.
        value: String,
        /// A description of the valid range.
        range: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_fields() {
        let err = ConfigurationError::AliasCollision {
            first: "times",
            second: "n",
        };
        assert_eq!(
            err.to_string(),
            "`times` and `n` are two names for the same parameter; supply exactly one"
        );

        let err = ConfigurationError::UnknownParameters {
            names: vec!["retries".to_owned(), "jitter".to_owned()],
        };
        assert_eq!(err.to_string(), "unknown parameter(s): retries, jitter");

        let err = ConfigurationError::OutOfRange {
            name: "ci",
            value: "1.5".to_owned(),
            range: "the open interval (0, 1)",
        };
        assert_eq!(
            err.to_string(),
            "parameter `ci` is 1.5, outside its valid range of the open interval (0, 1)"
        );
    }

    #[test]
    fn missing_procedure_lists_partial_fields() {
        let err = ConfigurationError::MissingProcedure { partial: vec![] };
        assert!(!err.to_string().contains("incomplete"));

        let err = ConfigurationError::MissingProcedure {
            partial: vec!["ci"],
        };
        assert!(err.to_string().ends_with("(incomplete: ci)"));
    }
}
