//! Two-token CFMM pool abstraction consumed by the arbitrage solver.
//!
//! The solver only needs the capability set below: reserve/fee/invariant
//! reads, marginal prices at a candidate trade size, non-mutating swap
//! previews, and the two mutating swaps. Alternative trading functions can be
//! dropped in behind [`CfmmPool`] without touching the solver.

pub mod covered_call;

pub use covered_call::{CoveredCallPool, covered_call_spot_price};

/// Outcome of a swap or swap preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swap {
    /// Amount of the counter asset paid out to the trader.
    pub amount_out: f64,
    /// Effective price of the trade denominated in the riskless asset.
    /// Infinite for zero-size denominators.
    pub effective_price: f64,
}

/// Pool-level errors surfaced by swap operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A negative amount-in was supplied.
    NegativeAmount,
    /// The trade would push a reserve outside its admissible range.
    InvalidReserves(&'static str),
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeAmount => write!(f, "amount in must be non-negative"),
            Self::InvalidReserves(msg) => write!(f, "invalid reserves: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Capability set of a two-token CFMM pool holding a risky and a riskless
/// asset.
///
/// Reserves are normalized: risky in `[0, 1]` per unit of liquidity, riskless
/// in `[0, K]` where `K` is the strike-like scale parameter. Marginal-price
/// methods expect a non-negative `amount_in` that keeps the post-trade reserve
/// interior; callers bracket accordingly.
pub trait CfmmPool {
    /// Current `(risky, riskless)` reserves.
    fn reserves(&self) -> (f64, f64);

    /// Proportional fee in `[0, 1)`.
    fn fee(&self) -> f64;

    /// Current invariant of the trading function.
    fn invariant(&self) -> f64;

    /// Strike-like scale parameter `K`.
    fn strike(&self) -> f64;

    /// Marginal price after selling `amount_in` of the risky asset into the
    /// pool, denominated in the riskless asset.
    fn marginal_price_risky_in(&self, amount_in: f64) -> f64;

    /// Marginal price after selling `amount_in` of the riskless asset into
    /// the pool, denominated in the riskless asset.
    fn marginal_price_riskless_in(&self, amount_in: f64) -> f64;

    /// Swap preview: what a risky-in trade would pay out, without mutating
    /// the pool.
    fn virtual_swap_risky_in(&self, amount_in: f64) -> Result<Swap, PoolError>;

    /// Swap preview for a riskless-in trade, without mutating the pool.
    fn virtual_swap_riskless_in(&self, amount_in: f64) -> Result<Swap, PoolError>;

    /// Execute a risky-in swap, updating reserves and the invariant.
    fn swap_risky_in(&mut self, amount_in: f64) -> Result<Swap, PoolError>;

    /// Execute a riskless-in swap, updating reserves and the invariant.
    fn swap_riskless_in(&mut self, amount_in: f64) -> Result<Swap, PoolError>;
}
