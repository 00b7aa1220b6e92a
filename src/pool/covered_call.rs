//! RMM-01 covered-call pool.
//!
//! Trading function `R2 = k + K * Phi(Phi^-1(1 - R1) - sigma * sqrt(tau))`
//! with marginal-price formulas from arXiv:2012.08040.

use super::{CfmmPool, PoolError, Swap};
use crate::math::{MathError, newton_raphson, normal_cdf, normal_inv_cdf, normal_pdf, quantile_prime};

const EPSILON: f64 = 1e-8;

/// Reported (spot) price of the risky asset for the zero-fee covered-call
/// trading function at risky reserves `x`.
pub fn covered_call_spot_price(x: f64, strike: f64, sigma: f64, tau: f64) -> f64 {
    strike * normal_pdf(normal_inv_cdf(1.0 - x) - sigma * tau.sqrt()) * quantile_prime(1.0 - x)
}

/// A two-token AMM with the Black-Scholes covered-call trading function.
///
/// Fields are public: research code perturbs reserves, maturity, and the
/// invariant directly between arbitrage calls (the simulation loop rolls
/// `tau` forward every step).
#[derive(Debug, Clone, PartialEq)]
pub struct CoveredCallPool {
    /// Risky reserves per unit of liquidity, in `[0, 1]`.
    pub reserves_risky: f64,
    /// Riskless reserves per unit of liquidity, in `[0, K]`.
    pub reserves_riskless: f64,
    /// Strike price `K`.
    pub strike: f64,
    /// Implied volatility, annualized consistently with `tau`.
    pub sigma: f64,
    /// Time to maturity.
    pub tau: f64,
    /// Time to maturity the pool was seeded with.
    pub initial_tau: f64,
    /// Proportional fee in `[0, 1)`.
    pub fee: f64,
    /// Trading-function invariant `k`.
    pub invariant: f64,
}

impl CoveredCallPool {
    /// Seed a pool from an initial risky reserve; the riskless reserve is
    /// derived from the trading function and the invariant starts at zero.
    pub fn new(initial_risky: f64, strike: f64, sigma: f64, tau: f64, fee: f64) -> Self {
        let reserves_riskless =
            strike * normal_cdf(normal_inv_cdf(1.0 - initial_risky) - sigma * tau.sqrt());
        Self {
            reserves_risky: initial_risky,
            reserves_riskless,
            strike,
            sigma,
            tau,
            initial_tau: tau,
            fee,
            invariant: 0.0,
        }
    }

    /// Riskless reserve implied by the trading function at risky reserve
    /// `risky`, including the current invariant.
    pub fn riskless_given_risky(&self, risky: f64) -> f64 {
        self.invariant + self.riskless_given_risky_no_invariant(risky)
    }

    fn riskless_given_risky_no_invariant(&self, risky: f64) -> f64 {
        self.strike * normal_cdf(normal_inv_cdf(1.0 - risky) - self.sigma * self.tau.sqrt())
    }

    /// Risky reserve implied by the trading function at riskless reserve
    /// `riskless`.
    pub fn risky_given_riskless(&self, riskless: f64) -> f64 {
        1.0 - normal_cdf(
            normal_inv_cdf((riskless - self.invariant) / self.strike)
                + self.sigma * self.tau.sqrt(),
        )
    }

    /// Reported price of the risky asset. Exact in the zero-fee case only.
    pub fn spot_price(&self) -> f64 {
        covered_call_spot_price(self.reserves_risky, self.strike, self.sigma, self.tau)
    }

    /// Roll time to maturity forward, clamping at expiry, and re-derive the
    /// invariant at the new curve.
    pub fn set_tau(&mut self, tau: f64) {
        self.tau = tau.max(0.0);
        self.update_invariant();
    }

    /// Re-derive the invariant from the current reserves.
    pub fn update_invariant(&mut self) {
        self.invariant =
            self.reserves_riskless - self.riskless_given_risky_no_invariant(self.reserves_risky);
    }

    /// Risky reserves at which the zero-fee reported price equals `price`,
    /// by Newton iteration with the closed-form slope of the reported price.
    ///
    /// Prices above the strike live in the low-reserve region, so the
    /// iteration starts near the empty side there and at the midpoint
    /// otherwise. The reported price barely moves near the reserve
    /// boundaries; if the iterate wanders off the curve without converging,
    /// the boundary reserve matching the price's side of the strike is
    /// returned instead.
    pub fn risky_reserves_for_spot(&self, price: f64) -> Result<f64, MathError> {
        let vol = self.sigma * self.tau.sqrt();
        let f = |x: f64| price - covered_call_spot_price(x, self.strike, self.sigma, self.tau);
        // d/dx of the reported price is -vol * price(x) * quantile_prime(1 - x).
        let df = |x: f64| {
            vol * covered_call_spot_price(x, self.strike, self.sigma, self.tau)
                * quantile_prime(1.0 - x)
        };
        let x0 = if price > self.strike { 0.01 } else { 0.5 };

        match newton_raphson(f, df, x0, 1e-10, 100) {
            Ok(x) => Ok(x.clamp(0.0, 1.0)),
            Err(MathError::NonConvergence | MathError::ZeroDerivative) => {
                if price > self.strike {
                    Ok(0.0)
                } else {
                    Ok(1.0)
                }
            }
            Err(e) => Err(e),
        }
    }
}

impl CfmmPool for CoveredCallPool {
    fn reserves(&self) -> (f64, f64) {
        (self.reserves_risky, self.reserves_riskless)
    }

    fn fee(&self) -> f64 {
        self.fee
    }

    fn invariant(&self) -> f64 {
        self.invariant
    }

    fn strike(&self) -> f64 {
        self.strike
    }

    fn marginal_price_risky_in(&self, amount_in: f64) -> f64 {
        let gamma = 1.0 - self.fee;
        let x = 1.0 - self.reserves_risky - gamma * amount_in;
        gamma
            * self.strike
            * normal_pdf(normal_inv_cdf(x) - self.sigma * self.tau.sqrt())
            * quantile_prime(x)
    }

    fn marginal_price_riskless_in(&self, amount_in: f64) -> f64 {
        let gamma = 1.0 - self.fee;
        let u = (self.reserves_riskless + gamma * amount_in - self.invariant) / self.strike;
        let derivative = gamma
            * normal_pdf(normal_inv_cdf(u) + self.sigma * self.tau.sqrt())
            * quantile_prime(u)
            / self.strike;
        // The curve flattens as the riskless side fills; cap the quote
        // rather than dividing by a vanishing derivative.
        if derivative < EPSILON {
            1e8
        } else {
            derivative.recip()
        }
    }

    fn virtual_swap_risky_in(&self, amount_in: f64) -> Result<Swap, PoolError> {
        if amount_in < 0.0 {
            return Err(PoolError::NegativeAmount);
        }
        let gamma = 1.0 - self.fee;
        let new_riskless = self.riskless_given_risky(self.reserves_risky + gamma * amount_in);
        if new_riskless <= 0.0 || new_riskless.is_nan() {
            return Ok(Swap {
                amount_out: 0.0,
                effective_price: 0.0,
            });
        }
        let amount_out = self.reserves_riskless - new_riskless;
        let effective_price = if amount_in == 0.0 {
            f64::INFINITY
        } else {
            amount_out / amount_in
        };
        Ok(Swap {
            amount_out,
            effective_price,
        })
    }

    fn virtual_swap_riskless_in(&self, amount_in: f64) -> Result<Swap, PoolError> {
        if amount_in < 0.0 {
            return Err(PoolError::NegativeAmount);
        }
        let gamma = 1.0 - self.fee;
        let new_risky = self.risky_given_riskless(self.reserves_riskless + gamma * amount_in);
        if new_risky <= 0.0 || new_risky.is_nan() {
            return Ok(Swap {
                amount_out: 0.0,
                effective_price: 0.0,
            });
        }
        let amount_out = self.reserves_risky - new_risky;
        let effective_price = if amount_out == 0.0 {
            f64::INFINITY
        } else {
            amount_in / amount_out
        };
        Ok(Swap {
            amount_out,
            effective_price,
        })
    }

    fn swap_risky_in(&mut self, amount_in: f64) -> Result<Swap, PoolError> {
        if amount_in < 0.0 {
            return Err(PoolError::NegativeAmount);
        }
        let gamma = 1.0 - self.fee;
        let new_riskless = self.riskless_given_risky(self.reserves_risky + gamma * amount_in);
        if !(new_riskless >= 0.0) {
            return Err(PoolError::InvalidReserves(
                "riskless reserve would leave [0, K]",
            ));
        }
        let amount_out = self.reserves_riskless - new_riskless;
        self.reserves_risky += amount_in;
        self.reserves_riskless -= amount_out;
        self.update_invariant();
        let effective_price = if amount_in == 0.0 {
            f64::INFINITY
        } else {
            amount_out / amount_in
        };
        Ok(Swap {
            amount_out,
            effective_price,
        })
    }

    fn swap_riskless_in(&mut self, amount_in: f64) -> Result<Swap, PoolError> {
        if amount_in < 0.0 {
            return Err(PoolError::NegativeAmount);
        }
        let gamma = 1.0 - self.fee;
        let new_risky = self.risky_given_riskless(self.reserves_riskless + gamma * amount_in);
        if !(new_risky >= 0.0) {
            return Err(PoolError::InvalidReserves("risky reserve would leave [0, 1]"));
        }
        let amount_out = self.reserves_risky - new_risky;
        if amount_out < 0.0 {
            return Err(PoolError::InvalidReserves("swap would pay out negative risky"));
        }
        self.reserves_riskless += amount_in;
        self.reserves_risky -= amount_out;
        self.update_invariant();
        let effective_price = if amount_out == 0.0 {
            f64::INFINITY
        } else {
            amount_in / amount_out
        };
        Ok(Swap {
            amount_out,
            effective_price,
        })
    }
}
