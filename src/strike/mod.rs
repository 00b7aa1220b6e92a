//! Delta-targeted strike selection.
//!
//! The closed form inverts the zero-rate Black-Scholes call delta directly;
//! [`delta_strike_iterative`] reproduces Ribbon v2's `DeltaStrikeSelection`
//! ladder walk and serves as the reference the closed form is validated
//! against.

use crate::math::{MathError, normal_cdf, normal_inv_cdf};

/// Zero-rate Black-Scholes call delta at the given strike.
pub fn black_scholes_delta(strike: f64, spot: f64, sigma: f64, tau: f64) -> f64 {
    let vol = sigma * tau.sqrt();
    let d1 = ((spot / strike).ln() + 0.5 * tau * sigma * sigma) / vol;
    normal_cdf(d1)
}

/// Strike whose call delta equals `delta`, in closed form:
/// `K = S * exp(tau * sigma^2 / 2 - sigma * sqrt(tau) * Phi^-1(delta))`.
///
/// `delta` must lie in the open unit interval; the boundary values map to
/// infinite and zero strikes respectively.
pub fn delta_strike(delta: f64, spot: f64, sigma: f64, tau: f64) -> f64 {
    let logit = 0.5 * tau * sigma * sigma - sigma * tau.sqrt() * normal_inv_cdf(delta);
    spot * logit.exp()
}

/// Result of the iterative strike ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterativeStrike {
    pub strike: f64,
    pub delta: f64,
    /// Ladder steps taken before the target delta was straddled.
    pub steps: usize,
}

/// Ribbon-v2 style strike selection: walk a strike ladder upward in `step`
/// increments until the target delta is straddled, then keep whichever
/// endpoint's delta is closer.
///
/// # Errors
/// `NonConvergence` if the ladder exceeds `max_steps` without straddling the
/// target.
pub fn delta_strike_iterative(
    delta: f64,
    spot: f64,
    sigma: f64,
    tau: f64,
    step: f64,
    max_steps: usize,
) -> Result<IterativeStrike, MathError> {
    if step <= 0.0 {
        return Err(MathError::InvalidInput("step must be positive"));
    }
    if !(0.0..=1.0).contains(&delta) {
        return Err(MathError::InvalidInput("delta must lie in [0, 1]"));
    }

    let mut strike = spot + (step - spot % step) + step;
    let mut prev_delta = 1.0;

    for curr_step in 0..max_steps {
        let curr_delta = black_scholes_delta(strike, spot, sigma, tau);

        if delta <= prev_delta && delta >= curr_delta {
            let lower_gap = delta - curr_delta;
            let upper_gap = prev_delta - delta;
            let (final_strike, final_delta) = if lower_gap <= upper_gap {
                (strike, curr_delta)
            } else {
                (strike - step, prev_delta)
            };
            return Ok(IterativeStrike {
                strike: final_strike,
                delta: final_delta,
                steps: curr_step,
            });
        }

        strike += step;
        prev_delta = curr_delta;
    }

    Err(MathError::NonConvergence)
}
