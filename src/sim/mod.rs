//! Simulation of a covered-call pool under optimal arbitrage along a GBM
//! price path, plus the analytic replication targets the effective LP value
//! is measured against.

use crate::arb::{ArbError, arbitrage};
use crate::math::{MathError, normal_cdf, normal_inv_cdf};
use crate::pool::CoveredCallPool;
use rand::Rng;
use rand_distr::StandardNormal;

/// Geometric Brownian motion parameters for a simulated price path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GbmParams {
    /// Time horizon, in the same unit as `dt`.
    pub horizon: f64,
    pub drift: f64,
    pub sigma: f64,
    pub initial_price: f64,
    pub dt: f64,
}

/// Generate a GBM price path, returning `(times, prices)` of equal length.
pub fn generate_gbm<R: Rng + ?Sized>(params: &GbmParams, rng: &mut R) -> (Vec<f64>, Vec<f64>) {
    let n = (params.horizon / params.dt).round().max(2.0) as usize;
    let sqrt_dt = params.dt.sqrt();

    let mut times = Vec::with_capacity(n);
    let mut prices = Vec::with_capacity(n);
    let mut brownian = 0.0;

    for i in 0..n {
        let t = params.horizon * i as f64 / (n - 1) as f64;
        let z: f64 = rng.sample(StandardNormal);
        brownian += z * sqrt_dt;
        let x = (params.drift - 0.5 * params.sigma * params.sigma) * t + params.sigma * brownian;
        times.push(t);
        prices.push(params.initial_price * x.exp());
    }

    (times, prices)
}

/// Riskless reserves that replicate a covered call at risky reserves `risky`
/// for the zero-fee curve.
pub fn riskless_given_risky(risky: f64, strike: f64, sigma: f64, tau: f64) -> f64 {
    if risky <= 0.0 {
        return strike;
    }
    if risky >= 1.0 {
        return 0.0;
    }
    strike * normal_cdf(normal_inv_cdf(1.0 - risky) - sigma * tau.max(0.0).sqrt())
}

/// Risky reserves replicating a covered call at spot price `spot`, via the
/// Black-Scholes delta (`R1 = 1 - delta`), avoiding any iterative solve.
pub fn risky_given_spot_with_delta(spot: f64, strike: f64, sigma: f64, tau: f64) -> f64 {
    if tau <= 0.0 {
        // At expiry the covered call is fully in or out of the money.
        return if spot > strike {
            0.0
        } else if spot < strike {
            1.0
        } else {
            0.5
        };
    }
    let d1 = ((spot / strike).ln() + 0.5 * tau * sigma * sigma) / (sigma * tau.sqrt());
    1.0 - normal_cdf(d1)
}

/// Step-by-step record of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    /// LP value of the analytic zero-fee replicating portfolio at each step.
    pub theoretical_lp_value: Vec<f64>,
    /// LP value of the arbitraged pool at each step.
    pub effective_lp_value: Vec<f64>,
    /// Mean relative deviation between the two series.
    pub mean_error: f64,
    /// Relative deviation at the final step.
    pub terminal_error: f64,
}

/// Run a pool forward along a price path under optimal arbitrage.
///
/// Each step rolls `tau` down from the pool's initial maturity, re-derives
/// the invariant on the new curve, arbitrages against the step's price, and
/// records theoretical vs effective LP value.
pub fn simulate(
    pool: &mut CoveredCallPool,
    times: &[f64],
    prices: &[f64],
) -> Result<SimulationOutcome, ArbError> {
    if times.len() != prices.len() {
        return Err(MathError::InvalidInput("times and prices must have equal length").into());
    }
    if times.is_empty() {
        return Err(MathError::InvalidInput("price path must be non-empty").into());
    }

    let initial_tau = pool.initial_tau;
    let mut theoretical = Vec::with_capacity(times.len());
    let mut effective = Vec::with_capacity(times.len());

    for (&t, &price) in times.iter().zip(prices.iter()) {
        let theoretical_tau = initial_tau - t;
        pool.set_tau(theoretical_tau);
        arbitrage(price, pool)?;

        let risky = risky_given_spot_with_delta(price, pool.strike, pool.sigma, theoretical_tau);
        let riskless = riskless_given_risky(risky, pool.strike, pool.sigma, theoretical_tau);
        theoretical.push(risky * price + riskless);
        effective.push(pool.reserves_risky * price + pool.reserves_riskless);
    }

    let n = theoretical.len() as f64;
    let mean_error = theoretical
        .iter()
        .zip(effective.iter())
        .map(|(th, eff)| ((th - eff) / th).abs())
        .sum::<f64>()
        / n;
    let last = theoretical.len() - 1;
    let terminal_error = ((theoretical[last] - effective[last]) / theoretical[last]).abs();

    Ok(SimulationOutcome {
        theoretical_lp_value: theoretical,
        effective_lp_value: effective,
        mean_error,
        terminal_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn params() -> GbmParams {
        GbmParams {
            horizon: 7.0 / 365.0,
            drift: 0.5,
            sigma: 0.8,
            initial_price: 1000.0,
            dt: 1.0 / (365.0 * 24.0),
        }
    }

    #[test]
    fn gbm_path_has_expected_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let (times, prices) = generate_gbm(&params(), &mut rng);
        assert_eq!(times.len(), prices.len());
        assert_eq!(times[0], 0.0);
        assert_relative_eq!(times[times.len() - 1], 7.0 / 365.0, epsilon = 1e-12);
        assert!(prices.iter().all(|p| *p > 0.0));
    }

    #[test]
    fn gbm_is_deterministic_under_a_fixed_seed() {
        let a = generate_gbm(&params(), &mut StdRng::seed_from_u64(7));
        let b = generate_gbm(&params(), &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn zero_volatility_path_grows_at_the_drift() {
        let p = GbmParams {
            sigma: 0.0,
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let (times, prices) = generate_gbm(&p, &mut rng);
        for (t, s) in times.iter().zip(prices.iter()) {
            assert_relative_eq!(*s, 1000.0 * (0.5 * t).exp(), max_relative = 1e-12);
        }
    }

    #[test]
    fn replication_helpers_agree_at_the_curve_endpoints() {
        assert_eq!(riskless_given_risky(0.0, 1000.0, 0.8, 0.5), 1000.0);
        assert_eq!(riskless_given_risky(1.0, 1000.0, 0.8, 0.5), 0.0);
        assert_eq!(risky_given_spot_with_delta(2000.0, 1000.0, 0.8, 0.0), 0.0);
        assert_eq!(risky_given_spot_with_delta(500.0, 1000.0, 0.8, 0.0), 1.0);
    }

    #[test]
    fn delta_replication_matches_spot_price_inversion() {
        let pool = CoveredCallPool::new(0.5, 1000.0, 0.8, 0.5, 0.0);
        let spot = pool.spot_price();
        let via_delta = risky_given_spot_with_delta(spot, 1000.0, 0.8, 0.5);
        let via_root = pool.risky_reserves_for_spot(spot).unwrap();
        assert_relative_eq!(via_delta, via_root, epsilon = 1e-7);
    }

    #[test]
    fn zero_fee_pool_tracks_the_theoretical_lp_value() {
        let mut rng = StdRng::seed_from_u64(99);
        let (times, prices) = generate_gbm(&params(), &mut rng);
        let mut pool = CoveredCallPool::new(0.5, 1100.0, 0.8, 30.0 / 365.0, 0.0);
        let outcome = simulate(&mut pool, &times, &prices).unwrap();

        assert_eq!(outcome.theoretical_lp_value.len(), times.len());
        assert!(
            outcome.mean_error < 0.01,
            "zero-fee replication error too large: {}",
            outcome.mean_error
        );
    }

    #[test]
    fn simulate_rejects_mismatched_inputs() {
        let mut pool = CoveredCallPool::new(0.5, 1100.0, 0.8, 0.5, 0.0);
        let err = simulate(&mut pool, &[0.0, 1.0], &[1000.0]).unwrap_err();
        assert!(matches!(err, ArbError::Math(MathError::InvalidInput(_))));
    }

    #[test]
    fn simulate_rolls_tau_to_the_horizon() {
        let mut rng = StdRng::seed_from_u64(3);
        let (times, prices) = generate_gbm(&params(), &mut rng);
        let initial_tau = 30.0 / 365.0;
        let mut pool = CoveredCallPool::new(0.5, 1100.0, 0.8, initial_tau, 0.0);
        simulate(&mut pool, &times, &prices).unwrap();
        assert_relative_eq!(pool.tau, initial_tau - 7.0 / 365.0, epsilon = 1e-12);
    }
}
