//! Exact arbitrage of a CFMM pool against an external reference price.
//!
//! Implements the equilibrium trade of arXiv:2012.08040: find the trade size
//! that moves the pool's marginal price onto the reference price, then
//! execute it only if the round trip (trade against the pool, offsetting
//! trade on the external market) is strictly profitable.
//!
//! Callers must serialize invocations against the same pool; the solver
//! performs at most one mutating swap per call and holds no state of its own.

use crate::math::{self, MathError};
use crate::pool::{CfmmPool, PoolError};

/// Tolerance shared by the boundary guard, the price comparisons, and the
/// root-finding bracket offsets.
pub const EPSILON: f64 = 1e-8;

const ROOT_TOL: f64 = 1e-12;
const MAX_ITER: usize = 200;

/// Per-call trade decision, produced once by [`select_direction`] and then
/// dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Pool is degenerate or already aligned with the market.
    NoOp,
    /// Pool quotes the risky asset above the market: buy risky on the market,
    /// sell it into the pool.
    SellRiskyIn,
    /// Pool quotes the risky asset below the market: buy risky from the pool
    /// with riskless, sell it on the market.
    SellRisklessIn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArbError {
    /// The computed trade size came out negative: the pool state or pricing
    /// collaborator is inconsistent. Never silently clamped.
    NegativeTradeSize,
    Math(MathError),
    Pool(PoolError),
}

impl std::fmt::Display for ArbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeTradeSize => write!(f, "equilibrium trade size is negative"),
            Self::Math(e) => write!(f, "root-finding failed: {e}"),
            Self::Pool(e) => write!(f, "pool rejected the trade: {e}"),
        }
    }
}

impl std::error::Error for ArbError {}

impl From<MathError> for ArbError {
    fn from(e: MathError) -> Self {
        Self::Math(e)
    }
}

impl From<PoolError> for ArbError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

/// A trade the solver executed against the pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutedTrade {
    pub decision: Decision,
    pub amount_in: f64,
    pub amount_out: f64,
    /// Realized round-trip profit in the riskless asset.
    pub profit: f64,
}

/// Decide which trade direction (if any) is profitable at the current state.
///
/// Near-boundary reserve states are refused outright: the root-finding
/// bracket for such states has zero or negative width, so no trade is the
/// safe answer. Otherwise the two zero-size marginal prices are compared
/// against the reference price with an [`EPSILON`] band to avoid oscillating
/// at equality.
pub fn select_direction<P: CfmmPool>(reference_price: f64, pool: &P) -> Decision {
    let (risky, riskless) = pool.reserves();
    let gamma = 1.0 - pool.fee();
    let strike = pool.strike();
    let invariant = pool.invariant();

    if risky < EPSILON
        || riskless < EPSILON
        || (strike + invariant - riskless) / gamma < EPSILON
        || 1.0 - risky < EPSILON
        || strike - riskless < EPSILON
    {
        return Decision::NoOp;
    }

    let sell_risky_price = pool.marginal_price_risky_in(0.0);
    let buy_risky_price = pool.marginal_price_riskless_in(0.0);

    if sell_risky_price > reference_price + EPSILON {
        Decision::SellRiskyIn
    } else if buy_risky_price < reference_price - EPSILON {
        Decision::SellRisklessIn
    } else {
        Decision::NoOp
    }
}

/// Solve for the trade size that aligns the pool's marginal price with the
/// reference price in the given direction.
///
/// The root of `marginal_price(t) - reference_price` (sign flipped for the
/// riskless-in direction) is bracketed in `[EPSILON, capacity - EPSILON]`.
/// When both bracket ends share a sign no interior root exists: the
/// mispricing exceeds what the pool can absorb and the full capacity bound is
/// the optimal trade, not an approximation. That fallback is `1 - R1` risky
/// in, `K - R2` riskless in.
pub fn equilibrium_trade_size<P: CfmmPool>(
    decision: Decision,
    reference_price: f64,
    pool: &P,
) -> Result<f64, ArbError> {
    let (risky, riskless) = pool.reserves();
    let gamma = 1.0 - pool.fee();
    let strike = pool.strike();

    let trade_size = match decision {
        Decision::NoOp => 0.0,
        Decision::SellRiskyIn => {
            let upper = 1.0 - risky;
            let f = |t: f64| pool.marginal_price_risky_in(t) - reference_price;
            solve_or_cap(f, upper, upper)?
        }
        Decision::SellRisklessIn => {
            let upper = (strike + pool.invariant() - riskless) / gamma;
            let f = |t: f64| reference_price - pool.marginal_price_riskless_in(t);
            solve_or_cap(f, upper, strike - riskless)?
        }
    };

    if trade_size < 0.0 {
        return Err(ArbError::NegativeTradeSize);
    }
    Ok(trade_size)
}

fn solve_or_cap<F>(mut f: F, upper: f64, capacity: f64) -> Result<f64, ArbError>
where
    F: FnMut(f64) -> f64,
{
    let f_lo = f(EPSILON);
    let f_hi = f(upper - EPSILON);
    if f_lo.signum() != f_hi.signum() {
        Ok(math::brent(f, EPSILON, upper - EPSILON, ROOT_TOL, MAX_ITER)?)
    } else {
        Ok(capacity)
    }
}

/// Arbitrage the pool against `reference_price` exactly at the time of the
/// call.
///
/// Returns `Ok(None)` when no trade is warranted: degenerate pool state,
/// already-aligned prices, or an equilibrium trade that fails the profit
/// gate. The profit gate uses the non-mutating swap preview and is a second,
/// independent check: the capacity fallback in particular maximizes the trade
/// but does not guarantee a positive round trip.
pub fn arbitrage<P: CfmmPool>(
    reference_price: f64,
    pool: &mut P,
) -> Result<Option<ExecutedTrade>, ArbError> {
    match select_direction(reference_price, pool) {
        Decision::NoOp => Ok(None),
        decision @ Decision::SellRiskyIn => {
            let amount_in = equilibrium_trade_size(decision, reference_price, pool)?;
            let preview = pool.virtual_swap_risky_in(amount_in)?;
            let profit = preview.amount_out - amount_in * reference_price;
            if profit <= 0.0 {
                return Ok(None);
            }
            let swap = pool.swap_risky_in(amount_in)?;
            Ok(Some(ExecutedTrade {
                decision,
                amount_in,
                amount_out: swap.amount_out,
                profit,
            }))
        }
        decision @ Decision::SellRisklessIn => {
            let amount_in = equilibrium_trade_size(decision, reference_price, pool)?;
            let preview = pool.virtual_swap_riskless_in(amount_in)?;
            let profit = preview.amount_out * reference_price - amount_in;
            if profit <= 0.0 {
                return Ok(None);
            }
            let swap = pool.swap_riskless_in(amount_in)?;
            Ok(Some(ExecutedTrade {
                decision,
                amount_in,
                amount_out: swap.amount_out,
                profit,
            }))
        }
    }
}
