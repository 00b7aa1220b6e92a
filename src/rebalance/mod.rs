//! Closed-form liquidity rebalancing.
//!
//! Solves for the asset allocation reachable by trading at an oracle price
//! that also satisfies the LP proportionality constraint
//! `stable_per_lp * risky1 = risky_per_lp * stable1` of an RMM-01 pool. The
//! solution is the intersection of two lines in allocation space, so no
//! optimizer is needed; the constraint checks the original ran against a
//! convex solver are enforced directly on the result.

#[derive(Debug, Clone, PartialEq)]
pub enum RebalanceError {
    InvalidInput(&'static str),
    /// A solution came back violating one of the program's constraints,
    /// indicating inconsistent inputs rather than a numerical slip.
    ConstraintViolated(&'static str),
}

impl std::fmt::Display for RebalanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::ConstraintViolated(msg) => write!(f, "constraint violated: {msg}"),
        }
    }
}

impl std::error::Error for RebalanceError {}

/// Target allocation produced by a rebalance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rebalance {
    /// Post-rebalance risky allocation.
    pub risky: f64,
    /// Post-rebalance stable allocation.
    pub stable: f64,
    /// Value left uncaptured by the swaps, `value1 - value0`. Non-positive
    /// up to rounding.
    pub remainder: f64,
}

/// Closed-form rebalance of `(risky0, stable0)` toward the pool's LP
/// proportions at the oracle price.
pub fn closed_form_rebalance(
    risky0: f64,
    stable0: f64,
    risky_per_lp: f64,
    stable_per_lp: f64,
    price: f64,
) -> Result<Rebalance, RebalanceError> {
    if !(price > 0.0) {
        return Err(RebalanceError::InvalidInput("price must be positive"));
    }
    if risky0 < 0.0 || stable0 < 0.0 {
        return Err(RebalanceError::InvalidInput(
            "starting allocations must be non-negative",
        ));
    }
    if risky_per_lp < 0.0 || stable_per_lp < 0.0 {
        return Err(RebalanceError::InvalidInput(
            "per-LP proportions must be non-negative",
        ));
    }
    if risky_per_lp == 0.0 && stable_per_lp == 0.0 {
        return Err(RebalanceError::InvalidInput(
            "at least one per-LP proportion must be positive",
        ));
    }

    let value0 = price * risky0 + stable0;
    let denominator = risky_per_lp * price + stable_per_lp;

    let risky1 = risky_per_lp * value0 / denominator;
    let stable1 = stable_per_lp * value0 / denominator;
    let value1 = price * risky1 + stable1;

    let tol = 1e-9 * value0.max(1.0);
    if risky1 < 0.0 || stable1 < 0.0 {
        return Err(RebalanceError::ConstraintViolated(
            "allocations must be non-negative",
        ));
    }
    if (stable_per_lp * risky1 - risky_per_lp * stable1).abs() > tol {
        return Err(RebalanceError::ConstraintViolated(
            "LP proportionality not met",
        ));
    }
    if value1 > value0 + tol {
        return Err(RebalanceError::ConstraintViolated(
            "rebalance cannot create value",
        ));
    }

    Ok(Rebalance {
        risky: risky1,
        stable: stable1,
        remainder: value1 - value0,
    })
}
