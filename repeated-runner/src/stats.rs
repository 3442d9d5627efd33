// Copyright (c) The repeated Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared numerics for the decision procedures: Wilson score lower bound
//! and the regularized incomplete beta function.

/// Lanczos approximation of `ln(Gamma(x))` for `x > 0` (g = 7).
#[allow(clippy::excessive_precision)]
fn ln_gamma(x: f64) -> f64 {
    let coefficients = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut acc = coefficients[0];
    let t = x + 7.5; // g + 0.5

    for (i, &coef) in coefficients.iter().enumerate().skip(1) {
        acc += coef / (x + i as f64);
    }

    0.5 * (2.0 * std::f64::consts::PI).ln() + (t.ln() * (x + 0.5)) - t + acc.ln()
}

/// Regularized incomplete beta `I_x(a, b)`, evaluated with the Lentz
/// continued fraction in log space. Accurate to better than 6 significant
/// digits for shape parameters up to at least 10,000, which covers the
/// supported repetition counts and prior strengths.
pub(crate) fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    assert!(
        a > 0.0 && b > 0.0,
        "beta shape parameters must be positive (got a={a}, b={b})"
    );
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let bt = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();

    // The continued fraction converges quickly for x below the split point;
    // above it, evaluate the mirrored fraction instead.
    if x < (a + 1.0) / (a + b + 2.0) {
        (bt * beta_continued_fraction(a, b, x) / a).clamp(0.0, 1.0)
    } else {
        (1.0 - bt * beta_continued_fraction(b, a, 1.0 - x) / b).clamp(0.0, 1.0)
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERS: usize = 200;
    const EPS: f64 = 3.0e-7;
    const FPMIN: f64 = 1.0e-30;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITERS {
        let m_f = m as f64;
        let m2 = 2.0 * m_f;

        let aa = m_f * (b - m_f) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m_f) * (qab + m_f) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }

    h
}

/// Upper tail of the `Beta(alpha, beta)` distribution: `P(theta >= x)`.
pub(crate) fn beta_tail_probability(alpha: f64, beta: f64, x: f64) -> f64 {
    1.0 - regularized_incomplete_beta(alpha, beta, x)
}

/// Inverse normal CDF: returns `z` such that `P(Z < z) = p`.
///
/// Abramowitz & Stegun 26.2.23 rational approximation, symmetric around
/// `p = 0.5`.
fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let (p_adj, sign) = if p < 0.5 { (p, -1.0) } else { (1.0 - p, 1.0) };

    let t = (-2.0 * p_adj.ln()).sqrt();

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;
    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let z = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);

    sign * z
}

/// Wilson score interval lower bound for `successes` out of `trials` at the
/// given two-sided confidence level.
///
/// More accurate than the normal approximation for small samples and for
/// proportions near 0 or 1. The radicand is clamped at zero so the extremes
/// `p = 0` and `p = 1` never produce a negative square root from
/// floating-point error, and the bound is clamped to `[0, 1]`.
pub(crate) fn wilson_lower_bound(successes: u32, trials: u32, confidence: f64) -> f64 {
    assert!(trials > 0, "Wilson lower bound requires at least one trial");

    let n = f64::from(trials);
    let p = f64::from(successes) / n;
    let z = normal_quantile((1.0 + confidence) / 2.0);

    let z2 = z * z;
    let denominator = 1.0 + z2 / n;
    let center = p + z2 / (2.0 * n);
    let radicand = (p * (1.0 - p) / n + z2 / (4.0 * n * n)).max(0.0);

    ((center - z * radicand.sqrt()) / denominator).clamp(0.0, 1.0)
}
