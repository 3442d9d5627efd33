// Copyright (c) The repeated Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Statistical repetition and verdict engine for non-deterministic tests.
//!
//! Given a test body with a probabilistic pass/fail outcome, this crate runs
//! it a fixed number of times, tallies the attempts, and reduces the tally
//! to one final verdict under one of three decision procedures: a fixed
//! pass-count threshold, a frequentist Wilson-score hypothesis test, or a
//! Bayesian Beta-Binomial posterior test.
//!
//! The host test runner is responsible for discovery, fixtures, and report
//! rendering. Per test, a host:
//!
//! 1. builds a [`params::RawParams`] mapping from its own metadata mechanism
//!    and resolves it with [`params::resolve`] (fails fast on configuration
//!    errors, before any repetition budget is spent);
//! 2. runs the body with [`executor::run_repeated`], classifying each
//!    attempt as a pass, an assertion-style miss, or a fatal error that
//!    stops repetition;
//! 3. obtains the final [`verdict::Verdict`] from [`verdict::evaluate`],
//!    and renders the rationale and (in verbose mode) the per-attempt
//!    history however it sees fit.

pub mod errors;
pub mod executor;
pub mod history;
pub mod params;
mod stats;
pub mod verdict;
