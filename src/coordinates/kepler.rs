//! Cartesian -> Keplerian conversion (part of component C1). Closely
//! follows the derivation in the teacher's `physics/orbital.rs`
//! (`cartesian_to_keplerian`), extended with the mean-anomaly output and
//! the `pe`/`ap` convenience fields spec section 4.1 calls for.

use crate::constants::{MU, PI};
use nalgebra as na;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerElements {
    pub a: f64,
    pub e: f64,
    pub i: f64,
    pub lan: f64,
    pub argp: f64,
    pub true_anomaly: f64,
    pub mean_anomaly: f64,
    pub ap: f64,
    pub pe: f64,
}

/// Derive Keplerian elements from a Cartesian (r, v) state about a body
/// with gravitational parameter `mu`.
///
/// Edge case: when the node vector (`n = k x h`) is ~zero (equatorial
/// orbit), LAN and argp are both defined to be zero, matching the
/// teacher's convention.
pub fn cart_to_kepler(r: &na::Vector3<f64>, v: &na::Vector3<f64>, mu: f64) -> KeplerElements {
    let h = r.cross(v);
    let h_mag = h.magnitude();

    let k = na::Vector3::new(0.0, 0.0, 1.0);
    let n = k.cross(&h);
    let n_mag = n.magnitude();

    let r_mag = r.magnitude();
    let v_mag = v.magnitude();
    let e_vec = ((v_mag * v_mag - mu / r_mag) * r - r.dot(v) * v) / mu;
    let e = e_vec.magnitude();

    let specific_energy = v_mag * v_mag / 2.0 - mu / r_mag;
    let a = -mu / (2.0 * specific_energy);

    let i = (h.z / h_mag).acos();

    let lan = if n_mag < 1e-11 {
        0.0
    } else {
        let mut raan = n.y.atan2(n.x);
        if raan < 0.0 {
            raan += 2.0 * PI;
        }
        raan
    };

    let argp = if e < 1e-11 {
        0.0
    } else if n_mag < 1e-11 {
        let mut argp = e_vec.y.atan2(e_vec.x);
        if argp < 0.0 {
            argp += 2.0 * PI;
        }
        argp
    } else {
        let mut argp = h.dot(&e_vec.cross(&n)).atan2(n.dot(&e_vec));
        if argp < 0.0 {
            argp += 2.0 * PI;
        }
        argp
    };

    let true_anomaly = if e < 1e-11 {
        if n_mag < 1e-11 {
            r.y.atan2(r.x)
        } else {
            n.dot(&r.cross(&n)).atan2(n.dot(r))
        }
    } else {
        let mut nu = h.dot(&e_vec.cross(r)).atan2(e_vec.dot(r));
        if nu < 0.0 {
            nu += 2.0 * PI;
        }
        nu
    };

    let eccentric_anomaly = true_to_eccentric_anomaly(true_anomaly, e);
    let mean_anomaly = eccentric_to_mean_anomaly(eccentric_anomaly, e);

    KeplerElements {
        a,
        e,
        i,
        lan,
        argp,
        true_anomaly,
        mean_anomaly,
        ap: a * (1.0 + e),
        pe: a * (1.0 - e),
    }
}

pub fn true_to_eccentric_anomaly(nu: f64, e: f64) -> f64 {
    if e < 1e-11 {
        return nu;
    }
    let mut ecc = ((1.0 - e * e).sqrt() * nu.sin()).atan2(e + nu.cos());
    if ecc < 0.0 {
        ecc += 2.0 * PI;
    }
    ecc
}

pub fn eccentric_to_mean_anomaly(ecc: f64, e: f64) -> f64 {
    let mut m = ecc - e * ecc.sin();
    if m < 0.0 {
        m += 2.0 * PI;
    }
    m
}

/// Reconstruct the Cartesian position at the same true anomaly from a
/// Keplerian element set (used to round-trip-test `cart_to_kepler`).
pub fn kepler_to_cartesian_at_nu(elements: &KeplerElements, mu: f64) -> (na::Vector3<f64>, na::Vector3<f64>) {
    let (a, e, i, lan, argp, nu) = (
        elements.a,
        elements.e,
        elements.i,
        elements.lan,
        elements.argp,
        elements.true_anomaly,
    );

    let p = a * (1.0 - e * e);
    let r_mag = p / (1.0 + e * nu.cos());

    let r_orbital = na::Vector3::new(r_mag * nu.cos(), r_mag * nu.sin(), 0.0);
    let v_orbital = na::Vector3::new(
        -(mu / p).sqrt() * nu.sin(),
        (mu / p).sqrt() * (e + nu.cos()),
        0.0,
    );

    let rot_argp = na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), argp);
    let rot_i = na::Rotation3::from_axis_angle(&na::Vector3::x_axis(), i);
    let rot_lan = na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), lan);

    let transform = rot_lan * rot_i * rot_argp;
    (transform * r_orbital, transform * v_orbital)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn cart_to_kepler_round_trips_position() {
        let r = na::Vector3::new(7_000_000.0, 1_200_000.0, 500_000.0);
        let v = na::Vector3::new(-1_500.0, 6_900.0, 2_100.0);
        let elements = cart_to_kepler(&r, &v, MU);
        let (r2, _v2) = kepler_to_cartesian_at_nu(&elements, MU);
        let rel_err = (r2 - r).magnitude() / r.magnitude();
        assert!(rel_err < 1e-4, "relative position error too large: {rel_err}");
    }

    #[test]
    fn equatorial_orbit_has_zero_lan_and_argp() {
        let r = na::Vector3::new(7_000_000.0, 0.0, 0.0);
        let v = na::Vector3::new(0.0, 7_500.0, 0.0);
        let elements = cart_to_kepler(&r, &v, MU);
        assert_abs_diff_eq!(elements.lan, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(elements.argp, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn apsis_radii_are_consistent_with_sma_and_eccentricity() {
        let r = na::Vector3::new(6_700_000.0, 0.0, 0.0);
        let v = na::Vector3::new(0.0, 8_200.0, 100.0);
        let elements = cart_to_kepler(&r, &v, MU);
        assert_abs_diff_eq!(
            elements.ap,
            elements.a * (1.0 + elements.e),
            epsilon = 1.0
        );
        assert_abs_diff_eq!(
            elements.pe,
            elements.a * (1.0 - elements.e),
            epsilon = 1.0
        );
    }
}
