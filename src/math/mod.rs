//! Numerical kernels shared across the crate: standard-normal functions,
//! root-finding, and bounded scalar minimization.

use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

#[derive(Debug, Clone, PartialEq)]
pub enum MathError {
    NonConvergence,
    ZeroDerivative,
    NotBracketed,
    InvalidInput(&'static str),
}

impl std::fmt::Display for MathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonConvergence => write!(f, "iteration cap reached before convergence"),
            Self::ZeroDerivative => write!(f, "derivative vanished during iteration"),
            Self::NotBracketed => write!(f, "function has the same sign at both bracket ends"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for MathError {}

#[inline]
pub fn normal_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF via the complementary error function.
#[inline]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Inverse standard normal CDF.
///
/// Acklam's rational approximation refined with one Halley step against
/// [`normal_cdf`], which brings the result to near machine precision across
/// the open unit interval.
pub fn normal_inv_cdf(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;
    const P_HIGH: f64 = 1.0 - P_LOW;

    let x = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        C[0].mul_add(q, C[1])
            .mul_add(q, C[2])
            .mul_add(q, C[3])
            .mul_add(q, C[4])
            .mul_add(q, C[5])
            / D[0].mul_add(q, D[1]).mul_add(q, D[2]).mul_add(q, D[3]).mul_add(q, 1.0)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        A[0].mul_add(r, A[1])
            .mul_add(r, A[2])
            .mul_add(r, A[3])
            .mul_add(r, A[4])
            .mul_add(r, A[5])
            * q
            / B[0].mul_add(r, B[1]).mul_add(r, B[2]).mul_add(r, B[3]).mul_add(r, B[4]).mul_add(r, 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(C[0].mul_add(q, C[1])
            .mul_add(q, C[2])
            .mul_add(q, C[3])
            .mul_add(q, C[4])
            .mul_add(q, C[5]))
            / D[0].mul_add(q, D[1]).mul_add(q, D[2]).mul_add(q, D[3]).mul_add(q, 1.0)
    };

    // Halley refinement; skipped in the far tails where the pdf underflows.
    let u = (normal_cdf(x) - p) / normal_pdf(x);
    if u.is_finite() {
        x - u / (1.0 + 0.5 * x * u)
    } else {
        x
    }
}

/// Derivative of the standard normal quantile function, `1 / phi(Phi^-1(p))`.
///
/// Returns infinity outside the open unit interval, where the quantile
/// function blows up.
pub fn quantile_prime(p: f64) -> f64 {
    const EPSILON: f64 = 1e-16;
    if !(EPSILON..=1.0 - EPSILON).contains(&p) {
        return f64::INFINITY;
    }
    normal_pdf(normal_inv_cdf(p)).recip()
}

/// Newton-Raphson iteration from `x0` with a caller-supplied slope.
///
/// Convergence is declared when either the residual or the step falls below
/// `tol`. A non-finite residual is not an error by itself; the iterate is
/// simply never accepted and the cap reports `NonConvergence`, which lets
/// callers treat wandering off the function's domain as a signal.
///
/// # Errors
/// `ZeroDerivative` when the slope collapses under the iterate,
/// `NonConvergence` at the iteration cap.
pub fn newton_raphson<F, D>(
    f: F,
    df: D,
    x0: f64,
    tol: f64,
    max_iter: usize,
) -> Result<f64, MathError>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    if tol <= 0.0 {
        return Err(MathError::InvalidInput("tol must be positive"));
    }
    if max_iter == 0 {
        return Err(MathError::InvalidInput("max_iter must be > 0"));
    }

    const DERIVATIVE_FLOOR: f64 = 1e-14;

    let mut x = x0;
    for _ in 0..max_iter {
        let residual = f(x);
        if residual.abs() <= tol {
            return Ok(x);
        }
        let slope = df(x);
        if slope.abs() <= DERIVATIVE_FLOOR {
            return Err(MathError::ZeroDerivative);
        }
        let step = residual / slope;
        x -= step;
        if step.abs() <= tol && residual.is_finite() {
            return Ok(x);
        }
    }

    Err(MathError::NonConvergence)
}

/// Brent's method on a bracketing interval `[a, b]`.
///
/// Combines inverse quadratic interpolation, the secant step, and bisection;
/// convergence is guaranteed once the bracket is valid.
///
/// # Errors
/// `NotBracketed` when `f(a)` and `f(b)` share a sign, `NonConvergence` when
/// the iteration cap is hit before the interval collapses to `tol`.
pub fn brent<F>(mut f: F, a: f64, b: f64, tol: f64, max_iter: usize) -> Result<f64, MathError>
where
    F: FnMut(f64) -> f64,
{
    if tol <= 0.0 {
        return Err(MathError::InvalidInput("tol must be positive"));
    }

    let mut a = a;
    let mut b = b;
    let mut fa = f(a);
    let mut fb = f(b);

    if !fa.is_finite() || !fb.is_finite() {
        return Err(MathError::InvalidInput("bracket endpoints must evaluate finite"));
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if (fa > 0.0) == (fb > 0.0) {
        return Err(MathError::NotBracketed);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..max_iter {
        if (fb > 0.0) == (fc > 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tol;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Inverse quadratic interpolation, degrading to secant when a == c.
            let s = fb / fa;
            let (mut p, mut q);
            if a == c {
                p = 2.0 * xm * s;
                q = 1.0 - s;
            } else {
                let r0 = fa / fc;
                let r1 = fb / fc;
                p = s * (2.0 * xm * r0 * (r0 - r1) - (b - a) * (r1 - 1.0));
                q = (r0 - 1.0) * (r1 - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol1 {
            b += d;
        } else {
            b += tol1.copysign(xm);
        }
        fb = f(b);
    }

    Err(MathError::NonConvergence)
}

/// Golden-section minimization of a unimodal function on `[a, b]`.
///
/// The interval shrinks by the golden ratio each step, so the iteration cap
/// only binds for pathological tolerances.
pub fn golden_section_min<F>(
    mut f: F,
    a: f64,
    b: f64,
    xtol: f64,
    max_iter: usize,
) -> Result<f64, MathError>
where
    F: FnMut(f64) -> f64,
{
    if a >= b {
        return Err(MathError::InvalidInput("bounds must satisfy a < b"));
    }
    if xtol <= 0.0 {
        return Err(MathError::InvalidInput("xtol must be positive"));
    }

    const INV_PHI: f64 = 0.618_033_988_749_894_8;

    let mut lo = a;
    let mut hi = b;
    let mut c = hi - INV_PHI * (hi - lo);
    let mut d = lo + INV_PHI * (hi - lo);
    let mut fc = f(c);
    let mut fd = f(d);

    for _ in 0..max_iter {
        if (hi - lo).abs() <= xtol {
            break;
        }
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - INV_PHI * (hi - lo);
            fc = f(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + INV_PHI * (hi - lo);
            fd = f(d);
        }
    }

    Ok(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statrs::distribution::{ContinuousCDF, Normal};

    #[test]
    fn normal_pdf_and_cdf_sanity() {
        assert_relative_eq!(normal_pdf(0.0), 0.398_942_280_401_432_7, epsilon = 1e-12);
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(normal_cdf(-1.0), 1.0 - normal_cdf(1.0), epsilon = 1e-15);
    }

    #[test]
    fn cdf_matches_statrs_reference() {
        let reference = Normal::new(0.0, 1.0).unwrap();
        for i in -40..=40 {
            let x = i as f64 / 5.0;
            assert_relative_eq!(normal_cdf(x), reference.cdf(x), epsilon = 1e-14);
        }
    }

    #[test]
    fn inv_cdf_round_trips_cdf() {
        for i in 1..=999 {
            let p = i as f64 / 1000.0;
            let x = normal_inv_cdf(p);
            assert_relative_eq!(normal_cdf(x), p, epsilon = 1e-12);
        }
    }

    #[test]
    fn inv_cdf_matches_statrs_in_the_tails() {
        let reference = Normal::new(0.0, 1.0).unwrap();
        for &p in &[1e-10, 1e-6, 1e-3, 0.5, 1.0 - 1e-3, 1.0 - 1e-6] {
            assert_relative_eq!(
                normal_inv_cdf(p),
                reference.inverse_cdf(p),
                epsilon = 1e-8,
                max_relative = 1e-8
            );
        }
    }

    #[test]
    fn inv_cdf_limits() {
        assert!(normal_inv_cdf(0.5).abs() < 1e-14);
        assert_eq!(normal_inv_cdf(0.0), f64::NEG_INFINITY);
        assert_eq!(normal_inv_cdf(1.0), f64::INFINITY);
        assert!(normal_inv_cdf(-0.1).is_nan());
        assert!(normal_inv_cdf(1.1).is_nan());
    }

    #[test]
    fn quantile_prime_blows_up_at_the_edges() {
        assert_eq!(quantile_prime(0.0), f64::INFINITY);
        assert_eq!(quantile_prime(1.0), f64::INFINITY);
        // At the median the quantile derivative is sqrt(2 pi).
        assert_relative_eq!(
            quantile_prime(0.5),
            (2.0 * std::f64::consts::PI).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn newton_raphson_inverts_an_exponential() {
        let root = newton_raphson(|x| x.exp() - 3.0, |x| x.exp(), 0.5, 1e-12, 50).unwrap();
        assert_relative_eq!(root, 3.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn newton_raphson_reports_a_flat_slope() {
        let err = newton_raphson(|_| 1.0, |_| 0.0, 0.0, 1e-12, 50).unwrap_err();
        assert_eq!(err, MathError::ZeroDerivative);
    }

    #[test]
    fn newton_raphson_flags_escape_from_the_domain() {
        // The first step overshoots into ln's undefined half-line; the
        // iterate goes non-finite and the cap reports it.
        let err = newton_raphson(|x: f64| x.ln() + 10.0, |x: f64| x.recip(), 1e-3, 1e-12, 50)
            .unwrap_err();
        assert_eq!(err, MathError::NonConvergence);
    }

    #[test]
    fn brent_finds_bracketed_root() {
        let root = brent(|x| x * x * x - 2.0 * x - 5.0, 2.0, 3.0, 1e-12, 100).unwrap();
        assert_relative_eq!(root, 2.094_551_481_542_327, epsilon = 1e-10);
    }

    #[test]
    fn brent_rejects_same_sign_bracket() {
        let err = brent(|x| x * x + 1.0, -1.0, 1.0, 1e-12, 100).unwrap_err();
        assert_eq!(err, MathError::NotBracketed);
    }

    #[test]
    fn brent_returns_exact_endpoint_roots() {
        let root = brent(|x| x, 0.0, 1.0, 1e-12, 100).unwrap();
        assert_eq!(root, 0.0);
    }

    #[test]
    fn golden_section_minimizes_parabola() {
        let x = golden_section_min(|x| (x - 0.3) * (x - 0.3), 0.0, 1.0, 1e-8, 200).unwrap();
        assert_relative_eq!(x, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn golden_section_rejects_bad_bounds() {
        let err = golden_section_min(|x| x, 1.0, 0.0, 1e-8, 100).unwrap_err();
        assert!(matches!(err, MathError::InvalidInput(_)));
    }
}
