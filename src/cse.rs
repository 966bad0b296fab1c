//! Conic State Extrapolator (component C2): propagate a two-body Kepler
//! orbit forward by an arbitrary `dt` using a universal-variable solver,
//! with a warm-started initial guess reused across calls since this sits
//! in UPFG's inner loop (spec section 4.2).
//!
//! No teacher file implements a universal-variable Kepler solver directly
//! — the closest analogue is the bounded Newton iteration in
//! `physics/orbital.rs::mean_to_eccentric_anomaly` (fixed iteration cap,
//! early-exit on convergence). This routine follows that same defensive
//! shape, generalized from the mean/eccentric-anomaly special case to the
//! universal-variable formulation that works for elliptic, parabolic, and
//! hyperbolic conics alike.

use crate::error::CoreError;
use nalgebra as na;

/// Maximum number of safeguarded Newton iterations (spec: imax = 10).
const IMAX: usize = 10;
/// Number of terms kept in the truncated Stumpff power series (spec: USS, k=10).
const USS_TERMS: usize = 10;
/// Convergence tolerance on reduced-unit time-of-flight.
const TOL: f64 = 1e-6;
/// Floor applied to any divisor to avoid singularities (spec section 4.2).
const MIN_DENOM: f64 = 1e-6;

/// The small warm-start record carried between calls, embedded directly in
/// `UPFGState` rather than kept in a process-wide map (per the design
/// notes): `{dtcp, xcp, A, D, E}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CseWarmStart {
    /// Time-of-flight (reduced units) at the last converged solve.
    pub dtcp: f64,
    /// Universal anomaly chi (reduced units) at the last converged solve.
    pub xcp: f64,
    /// alpha = 1/a (reduced units) at the last converged solve.
    pub a: f64,
    /// Stumpff c(z) at the last converged solve (diagnostic / reseed value).
    pub d: f64,
    /// Stumpff s(z) at the last converged solve (diagnostic / reseed value).
    pub e: f64,
}

impl Default for CseWarmStart {
    fn default() -> Self {
        CseWarmStart {
            dtcp: 0.0,
            xcp: 0.0,
            a: 0.0,
            d: 0.5,
            e: 1.0 / 6.0,
        }
    }
}

fn clamp_denom(x: f64) -> f64 {
    if x.abs() < MIN_DENOM {
        if x.is_sign_negative() {
            -MIN_DENOM
        } else {
            MIN_DENOM
        }
    } else {
        x
    }
}

/// Universal Stumpff-series evaluation (USS): returns `(c(z), s(z))`.
/// Uses the closed trig/hyperbolic form away from `z = 0`, and the
/// truncated `USS_TERMS`-term power series near `z = 0` where the closed
/// form loses precision to cancellation.
fn uss(z: f64) -> (f64, f64) {
    if z.abs() < 1e-3 {
        // Truncated series: c = sum (-z)^k / (2k+2)!, s = sum (-z)^k / (2k+3)!
        let mut c = 0.0;
        let mut s = 0.0;
        let mut fact_c = 2.0;
        let mut fact_s = 6.0;
        let mut neg_z_pow = 1.0;
        for k in 0..USS_TERMS {
            c += neg_z_pow / fact_c;
            s += neg_z_pow / fact_s;
            neg_z_pow *= -z;
            let kf = k as f64;
            fact_c *= (2.0 * kf + 3.0) * (2.0 * kf + 4.0);
            fact_s *= (2.0 * kf + 4.0) * (2.0 * kf + 5.0);
        }
        (c, s)
    } else if z > 0.0 {
        let sz = z.sqrt();
        ((1.0 - sz.cos()) / z, (sz - sz.sin()) / sz.powi(3))
    } else {
        let sz = (-z).sqrt();
        ((1.0 - sz.cosh()) / z, (sz.sinh() - sz) / sz.powi(3))
    }
}

/// Time-of-flight (reduced units, mu = 1) as a function of universal
/// anomaly `chi`, plus its derivative w.r.t. `chi` (KTTI).
fn ktti(chi: f64, alpha: f64, r0: f64, vr0: f64) -> (f64, f64, f64, f64) {
    let z = alpha * chi * chi;
    let (c, s) = uss(z);
    let t = chi * chi * chi * s + vr0 * chi * chi * c + r0 * chi * (1.0 - z * s);
    let r_chi = chi * chi * c + vr0 * chi * (1.0 - z * s) + r0 * (1.0 - z * c);
    (t, clamp_denom(r_chi), c, s)
}

/// Propagate `(r0, v0)` forward by `dt` under two-body gravity with
/// parameter `mu`, reusing `warm` as an initial guess and overwriting it
/// with the new converged values. Pure/deterministic in `(r0, v0, dt, mu)`
/// — the warm start only seeds the iteration, it never changes the
/// converged answer.
pub fn propagate(
    r0: &na::Vector3<f64>,
    v0: &na::Vector3<f64>,
    dt: f64,
    mu: f64,
    warm: &mut CseWarmStart,
) -> Result<(na::Vector3<f64>, na::Vector3<f64>), CoreError> {
    let r0_mag = r0.magnitude();
    if r0_mag < 1e-9 || mu <= 0.0 {
        return Err(CoreError::Singularity(
            "CSE called with a zero position vector or mu <= 0".into(),
        ));
    }
    if dt == 0.0 {
        return Ok((*r0, *v0));
    }

    // Step 1: normalize to reduced units.
    let ru = r0_mag;
    let tu = (ru * ru * ru / mu).sqrt();
    let r0n = r0 / ru;
    let v0n = v0 * (tu / ru);
    let dtn = dt / tu;

    let r0n_mag = r0n.magnitude(); // == 1.0 by construction
    let vr0n = r0n.dot(&v0n) / r0n_mag;
    let v0n_mag = v0n.magnitude();
    let alpha = 2.0 / r0n_mag - v0n_mag * v0n_mag; // mu_n = 1

    // Step 2: initial guess, warm-started when the regime still matches.
    let mut x = if warm.a.abs() > 1e-9 && warm.a.signum() == alpha.signum() && warm.xcp != 0.0 {
        warm.xcp * (dtn / clamp_denom(warm.dtcp)).max(0.1).min(10.0)
    } else if alpha > 1e-6 {
        dtn * alpha
    } else if alpha < -1e-6 {
        dtn.signum() * (-1.0 / alpha).sqrt()
    } else {
        dtn / r0n_mag
    };

    // Bracket {xmin, xmax, dtmin, dtmax} so Delta-t is always bracketed.
    let f0 = dtn.signum();
    let mut xmin;
    let mut xmax;
    let mut dtmin;
    let mut dtmax;
    if alpha > 1e-9 {
        // Elliptic: one full revolution bounds the anomaly.
        let period = 2.0 * crate::constants::PI / alpha.powf(1.5);
        xmin = -period.sqrt();
        xmax = period.sqrt();
        dtmin = ktti(xmin, alpha, r0n_mag, vr0n).0;
        dtmax = ktti(xmax, alpha, r0n_mag, vr0n).0;
    } else {
        // Parabolic/hyperbolic: double the bracket until it spans dt.
        xmin = 0.0;
        xmax = f0.max(1e-3) * 1.0;
        dtmin = 0.0;
        dtmax = ktti(xmax, alpha, r0n_mag, vr0n).0;
        let mut guard = 0;
        while (dtmax - dtn) * f0 < 0.0 && guard < 60 {
            xmax *= 2.0;
            dtmax = ktti(xmax, alpha, r0n_mag, vr0n).0;
            guard += 1;
        }
        if f0 < 0.0 {
            std::mem::swap(&mut xmin, &mut xmax);
            std::mem::swap(&mut dtmin, &mut dtmax);
        }
    }
    x = x.clamp(xmin.min(xmax), xmin.max(xmax));

    // Step 3: safeguarded Newton / bisection iteration (KIL/SI), capped at IMAX.
    let mut c = 0.5;
    let mut s = 1.0 / 6.0;
    let mut converged_chi = x;
    let mut converged = false;
    for _ in 0..IMAX {
        let (t_guess, r_chi, cc, ss) = ktti(x, alpha, r0n_mag, vr0n);
        c = cc;
        s = ss;
        let residual = t_guess - dtn;
        if residual.abs() < TOL {
            converged_chi = x;
            converged = true;
            break;
        }
        if (t_guess - dtn) * f0 > 0.0 {
            xmax = x;
        } else {
            xmin = x;
        }

        let newton_step = x - residual / r_chi;
        let lo = xmin.min(xmax);
        let hi = xmin.max(xmax);
        x = if newton_step > lo && newton_step < hi {
            newton_step
        } else {
            0.5 * (xmin + xmax)
        };
        converged_chi = x;
    }

    if !converged {
        return Err(CoreError::Singularity(format!(
            "CSE failed to converge within {IMAX} iterations (dt={dt}, alpha={alpha})"
        )));
    }

    // Step 5: reconstruct (r, v) via f, g, fdot, gdot.
    let chi = converged_chi;
    let z = alpha * chi * chi;
    let f = 1.0 - (chi * chi / r0n_mag) * c;
    let g = dtn - (chi * chi * chi) * s;
    let r_new_n = f * r0n + g * v0n;
    let r_new_mag = clamp_denom(r_new_n.magnitude());
    let gdot = 1.0 - (chi * chi / r_new_mag) * c;
    let fdot = (chi / (r0n_mag * r_new_mag)) * (z * s - 1.0);
    let v_new_n = fdot * r0n + gdot * v0n;

    warm.dtcp = dtn;
    warm.xcp = chi;
    warm.a = alpha;
    warm.d = c;
    warm.e = s;

    Ok((r_new_n * ru, v_new_n * (ru / tu)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MU;
    use approx::assert_abs_diff_eq;

    fn leo_state() -> (na::Vector3<f64>, na::Vector3<f64>) {
        let r = na::Vector3::new(6_700_000.0, 0.0, 0.0);
        let v = na::Vector3::new(0.0, 7_700.0, 150.0);
        (r, v)
    }

    #[test]
    fn zero_dt_is_identity() {
        let (r, v) = leo_state();
        let mut warm = CseWarmStart::default();
        let (r2, v2) = propagate(&r, &v, 0.0, MU, &mut warm).unwrap();
        assert_abs_diff_eq!(r2, r, epsilon = 1e-3);
        assert_abs_diff_eq!(v2, v, epsilon = 1e-3);
    }

    #[test]
    fn propagation_is_deterministic() {
        let (r, v) = leo_state();
        let mut warm_a = CseWarmStart::default();
        let mut warm_b = CseWarmStart::default();
        let (r1, v1) = propagate(&r, &v, 900.0, MU, &mut warm_a).unwrap();
        let (r2, v2) = propagate(&r, &v, 900.0, MU, &mut warm_b).unwrap();
        assert_abs_diff_eq!(r1, r2, epsilon = 1e-9);
        assert_abs_diff_eq!(v1, v2, epsilon = 1e-9);
    }

    #[test]
    fn energy_is_conserved_across_propagation() {
        let (r, v) = leo_state();
        let mut warm = CseWarmStart::default();
        let energy0 = 0.5 * v.dot(&v) - MU / r.magnitude();
        let (r2, v2) = propagate(&r, &v, 1800.0, MU, &mut warm).unwrap();
        let energy1 = 0.5 * v2.dot(&v2) - MU / r2.magnitude();
        let rel_err = (energy1 - energy0).abs() / energy0.abs();
        assert!(rel_err < 1e-4, "specific energy drifted: {rel_err}");
    }

    #[test]
    fn rejects_zero_position() {
        let mut warm = CseWarmStart::default();
        let result = propagate(
            &na::Vector3::zeros(),
            &na::Vector3::new(1.0, 0.0, 0.0),
            10.0,
            MU,
            &mut warm,
        );
        assert!(result.is_err());
    }

    #[test]
    fn warm_start_does_not_change_converged_answer() {
        let (r, v) = leo_state();
        let mut cold = CseWarmStart::default();
        let (r_cold, v_cold) = propagate(&r, &v, 600.0, MU, &mut cold).unwrap();

        let mut seeded = CseWarmStart {
            dtcp: 100.0,
            xcp: 0.2,
            a: cold.a,
            d: 0.5,
            e: 1.0 / 6.0,
        };
        let (r_warm, v_warm) = propagate(&r, &v, 600.0, MU, &mut seeded).unwrap();
        assert_abs_diff_eq!(r_cold, r_warm, epsilon = 1.0);
        assert_abs_diff_eq!(v_cold, v_warm, epsilon = 1e-2);
    }

    #[test]
    fn energy_conservation_holds_across_randomized_states() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let r_mag: f64 = rng.gen_range(6.6e6..4.2e7);
            let speed_frac: f64 = rng.gen_range(0.5..1.3); // fraction of local circular speed
            let r = na::Vector3::new(r_mag, 0.0, 0.0);
            let v_circ = (MU / r_mag).sqrt();
            let v = na::Vector3::new(0.0, v_circ * speed_frac, v_circ * 0.1);

            let mut warm = CseWarmStart::default();
            let energy0 = 0.5 * v.dot(&v) - MU / r.magnitude();
            let dt: f64 = rng.gen_range(10.0..2000.0);
            let (r2, v2) = propagate(&r, &v, dt, MU, &mut warm).unwrap();
            let energy1 = 0.5 * v2.dot(&v2) - MU / r2.magnitude();
            let rel_err = (energy1 - energy0).abs() / energy0.abs();
            assert!(rel_err < 1e-3, "energy drifted {rel_err} for r={r_mag} dt={dt}");
        }
    }
}
