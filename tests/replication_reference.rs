//! Whole-pipeline replication runs: GBM paths through the arbitrage
//! simulator, comparing tracking quality across fee levels.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rmms::pool::CoveredCallPool;
use rmms::sim::{GbmParams, generate_gbm, simulate};

const STRIKE: f64 = 1100.0;
const SIGMA: f64 = 0.8;
const INITIAL_TAU: f64 = 30.0 / 365.0;

fn mean_error_for_fee(fee: f64, n_paths: usize) -> f64 {
    let gbm = GbmParams {
        horizon: 5.0 / 365.0,
        drift: 1.0,
        sigma: SIGMA,
        initial_price: 1000.0,
        dt: 1.0 / (365.0 * 24.0),
    };

    let mut total = 0.0;
    for i in 0..n_paths {
        let mut rng = StdRng::seed_from_u64(99 + i as u64 * 7_919);
        let (times, prices) = generate_gbm(&gbm, &mut rng);
        let mut pool = CoveredCallPool::new(0.5, STRIKE, SIGMA, INITIAL_TAU, fee);
        let outcome = simulate(&mut pool, &times, &prices).unwrap();
        total += outcome.mean_error;
    }
    total / n_paths as f64
}

#[test]
fn frictionless_pool_tracks_the_theoretical_portfolio() {
    let err = mean_error_for_fee(0.0, 4);
    assert!(err < 0.01, "zero-fee mean tracking error too large: {err}");
}

#[test]
fn fees_widen_the_tracking_error() {
    let frictionless = mean_error_for_fee(0.0, 4);
    let with_fee = mean_error_for_fee(0.05, 4);
    assert!(
        frictionless <= with_fee + 1e-9,
        "fee-laden pool tracked better ({with_fee}) than frictionless ({frictionless})"
    );
}

#[test]
fn simulation_outcome_is_deterministic_for_a_fixed_seed() {
    let a = mean_error_for_fee(0.01, 2);
    let b = mean_error_for_fee(0.01, 2);
    assert_eq!(a, b);
}
