//! Fee calibration: bounded scalar search for the replication-error-optimal
//! fee, and a linear-regression surrogate fit over parameter sweeps so the
//! optimal fee can be reconstructed without re-running simulations.

use crate::arb::ArbError;
use crate::math::{MathError, golden_section_min};
use crate::pool::CoveredCallPool;
use crate::sim::{GbmParams, generate_gbm, simulate};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Search interval for the optimal fee, in proportional terms.
pub const FEE_LOWER_BOUND: f64 = 1e-4;
pub const FEE_UPPER_BOUND: f64 = 0.10;

/// Fee search tolerance: about five basis points.
const FEE_XTOL: f64 = 5e-4;

/// Risky reserves every calibration pool is seeded with.
const INITIAL_RISKY: f64 = 0.5;

/// Scenario for the optimal-fee search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimalFeeParams {
    pub initial_tau: f64,
    pub horizon: f64,
    pub dt: f64,
    pub sigma: f64,
    pub drift: f64,
    pub strike: f64,
    pub initial_price: f64,
    /// GBM paths averaged per objective evaluation.
    pub n_paths: usize,
    pub seed: u64,
}

/// Find the fee minimizing the mean terminal replication error over a batch
/// of seeded GBM paths.
///
/// Path seeds are fixed across fee candidates (common random numbers), so
/// the objective is deterministic and the golden-section search is
/// well-posed.
pub fn find_optimal_fee(params: &OptimalFeeParams) -> Result<f64, ArbError> {
    if params.n_paths == 0 {
        return Err(MathError::InvalidInput("n_paths must be > 0").into());
    }

    let gbm = GbmParams {
        horizon: params.horizon,
        drift: params.drift,
        sigma: params.sigma,
        initial_price: params.initial_price,
        dt: params.dt,
    };

    let mut failure: Option<ArbError> = None;
    let objective = |fee: f64| -> f64 {
        let mut total = 0.0;
        for i in 0..params.n_paths {
            let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64 * 7_919));
            let (times, prices) = generate_gbm(&gbm, &mut rng);
            let mut pool = CoveredCallPool::new(
                INITIAL_RISKY,
                params.strike,
                params.sigma,
                params.initial_tau,
                fee,
            );
            match simulate(&mut pool, &times, &prices) {
                Ok(outcome) => total += outcome.terminal_error,
                Err(e) => {
                    failure.get_or_insert(e);
                    return f64::INFINITY;
                }
            }
        }
        total / params.n_paths as f64
    };

    let fee = golden_section_min(objective, FEE_LOWER_BOUND, FEE_UPPER_BOUND, FEE_XTOL, 64)
        .map_err(ArbError::Math)?;
    if let Some(e) = failure {
        return Err(e);
    }
    Ok(fee)
}

/// Two-regressor linear model of the optimal fee surface, fit over
/// volatility and initial-price-to-strike ratio sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRegression {
    pub coef: [f64; 2],
    pub intercept: f64,
}

impl FeeRegression {
    /// Least-squares fit of `fee = coef[0] * x1 + coef[1] * x2 + intercept`.
    pub fn fit(inputs: &[[f64; 2]], targets: &[f64]) -> Result<Self, MathError> {
        if inputs.len() != targets.len() {
            return Err(MathError::InvalidInput(
                "inputs and targets must have equal length",
            ));
        }
        if inputs.len() < 3 {
            return Err(MathError::InvalidInput(
                "need at least three observations for a two-regressor fit",
            ));
        }

        let design = DMatrix::from_fn(inputs.len(), 3, |i, j| match j {
            0 => inputs[i][0],
            1 => inputs[i][1],
            _ => 1.0,
        });
        let rhs = DVector::from_column_slice(targets);

        let svd = design.svd(true, true);
        let solution = svd
            .solve(&rhs, 1e-12)
            .map_err(|_| MathError::NonConvergence)?;

        Ok(Self {
            coef: [solution[0], solution[1]],
            intercept: solution[2],
        })
    }

    pub fn predict(&self, input: [f64; 2]) -> f64 {
        self.coef[0] * input[0] + self.coef[1] * input[1] + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn regression_recovers_an_exact_plane() {
        let mut inputs = Vec::new();
        let mut targets = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                let x1 = 0.5 + 0.1 * i as f64;
                let x2 = 0.8 + 0.05 * j as f64;
                inputs.push([x1, x2]);
                targets.push(0.03 * x1 - 0.01 * x2 + 0.002);
            }
        }

        let model = FeeRegression::fit(&inputs, &targets).unwrap();
        assert_relative_eq!(model.coef[0], 0.03, epsilon = 1e-10);
        assert_relative_eq!(model.coef[1], -0.01, epsilon = 1e-10);
        assert_relative_eq!(model.intercept, 0.002, epsilon = 1e-10);

        for (input, target) in inputs.iter().zip(targets.iter()) {
            assert_relative_eq!(model.predict(*input), *target, epsilon = 1e-10);
        }
    }

    #[test]
    fn regression_rejects_degenerate_inputs() {
        let err = FeeRegression::fit(&[[1.0, 2.0]], &[0.01]).unwrap_err();
        assert!(matches!(err, MathError::InvalidInput(_)));

        let err = FeeRegression::fit(&[[1.0, 2.0], [3.0, 4.0]], &[0.01]).unwrap_err();
        assert!(matches!(err, MathError::InvalidInput(_)));
    }

    #[test]
    fn regression_round_trips_through_json() {
        let model = FeeRegression {
            coef: [0.0123, -0.0456],
            intercept: 0.0089,
        };
        let json = serde_json::to_string(&model).unwrap();
        let back: FeeRegression = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }

    #[test]
    fn optimal_fee_search_stays_in_bounds() {
        let params = OptimalFeeParams {
            initial_tau: 30.0 / 365.0,
            horizon: 2.0 / 365.0,
            dt: 1.0 / (365.0 * 24.0),
            sigma: 0.8,
            drift: 1.0,
            strike: 1100.0,
            initial_price: 1000.0,
            n_paths: 2,
            seed: 11,
        };
        let fee = find_optimal_fee(&params).unwrap();
        assert!((FEE_LOWER_BOUND..=FEE_UPPER_BOUND).contains(&fee));
    }

    #[test]
    fn optimal_fee_rejects_empty_batch() {
        let params = OptimalFeeParams {
            initial_tau: 30.0 / 365.0,
            horizon: 2.0 / 365.0,
            dt: 1.0 / (365.0 * 24.0),
            sigma: 0.8,
            drift: 1.0,
            strike: 1100.0,
            initial_price: 1000.0,
            n_paths: 0,
            seed: 11,
        };
        assert!(find_optimal_fee(&params).is_err());
    }
}
