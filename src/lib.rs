//! RMMS is a research library for replicating market makers: it models the
//! RMM-01 covered-call trading function as a two-token CFMM pool, arbitrages
//! that pool exactly against an external reference price, and layers the
//! calibration tooling used in covered-call LP research on top (fee
//! optimization and its linear-regression surrogate, delta-targeted strike
//! selection, and closed-form liquidity rebalancing).
//!
//! References used across modules:
//! - Angeris, Evans, Chitra, "When does the tail wag the dog?"
//!   (arXiv:2012.08040) for the marginal-price formulas and the equilibrium
//!   trade-size condition used by the arbitrage solver.
//! - Ribbon v2's `DeltaStrikeSelection` for the iterative strike ladder the
//!   closed form in [`strike`] is validated against.
//!
//! Numerical considerations:
//! - All quantities are `f64` in normalized pool units; risky reserves live in
//!   `[0, 1]` per unit of liquidity and riskless reserves in `[0, K]`.
//! - The arbitrage solver brackets its root strictly inside the pool's
//!   capacity before handing it to Brent's method; near-boundary states are
//!   refused outright rather than solved in ill-conditioned form.
//!
//! # Quick start
//! Arbitrage a freshly seeded covered-call pool against a market price:
//! ```rust
//! use rmms::arb::arbitrage;
//! use rmms::pool::CoveredCallPool;
//!
//! let mut pool = CoveredCallPool::new(0.5, 1100.0, 0.8, 0.5, 0.0);
//! let trade = arbitrage(1200.0, &mut pool).unwrap();
//! assert!(trade.is_some_and(|t| t.profit > 0.0));
//! ```
//!
//! Pick a strike from a target delta:
//! ```rust
//! use rmms::strike::{black_scholes_delta, delta_strike};
//!
//! let k = delta_strike(0.1, 3000.0, 0.9, 30.0 / 365.0);
//! let d = black_scholes_delta(k, 3000.0, 0.9, 30.0 / 365.0);
//! assert!((d - 0.1).abs() < 1e-6);
//! ```

pub mod arb;
pub mod fee;
pub mod math;
pub mod pool;
pub mod rebalance;
pub mod sim;
pub mod strike;

pub mod prelude {
    //! Convenience re-exports for the common research workflow.
    pub use crate::arb::{ArbError, Decision, ExecutedTrade, arbitrage};
    pub use crate::fee::{FeeRegression, OptimalFeeParams, find_optimal_fee};
    pub use crate::math::MathError;
    pub use crate::pool::{CfmmPool, CoveredCallPool, Swap};
    pub use crate::rebalance::{Rebalance, closed_form_rebalance};
    pub use crate::sim::{GbmParams, SimulationOutcome, generate_gbm, simulate};
    pub use crate::strike::{delta_strike, delta_strike_iterative};
}
