//! Vector/orbital primitives (component C1): 3-vector helpers, Rodrigues
//! rotation, spherical<->Cartesian conversion, local tangent frames, and
//! launch-azimuth geometry. These are the small pure functions every other
//! component builds on.

use crate::constants::{MU, OMEGA_E, RE};
use nalgebra as na;

/// Normalize, falling back to `previous` instead of producing NaN for a
/// zero-length vector (spec section 7, numerical-singularity fallback).
pub fn try_normalize(v: &na::Vector3<f64>, previous: &na::Vector3<f64>) -> na::Vector3<f64> {
    let mag = v.magnitude();
    if mag < 1e-9 {
        *previous
    } else {
        v / mag
    }
}

/// Standard spherical-to-Cartesian conversion, Z as the polar axis.
pub fn sph_to_cart(lat: f64, lon: f64, r: f64) -> na::Vector3<f64> {
    na::Vector3::new(
        r * lat.cos() * lon.cos(),
        r * lat.cos() * lon.sin(),
        r * lat.sin(),
    )
}

/// Local east unit vector at position `r` (ECI/ECEF, either works since
/// this only depends on direction).
pub fn east_unit(r: &na::Vector3<f64>) -> na::Vector3<f64> {
    try_normalize(
        &na::Vector3::new(-r.y, r.x, 0.0),
        &na::Vector3::new(0.0, 1.0, 0.0),
    )
}

/// Local north unit vector at position `r`.
pub fn north_unit(r: &na::Vector3<f64>) -> na::Vector3<f64> {
    let r_hat = try_normalize(r, &na::Vector3::new(0.0, 0.0, 1.0));
    let e = east_unit(r);
    try_normalize(&r_hat.cross(&e), &na::Vector3::new(0.0, 0.0, 1.0))
}

/// Build a velocity vector from speed/flight-path-angle/heading at a given
/// position, in the local (east, north, up) frame.
pub fn compute_velocity(
    r: &na::Vector3<f64>,
    speed: f64,
    fpa: f64,
    heading: f64,
) -> na::Vector3<f64> {
    let up = try_normalize(r, &na::Vector3::new(0.0, 0.0, 1.0));
    let north = north_unit(r);
    let east = east_unit(r);

    let horizontal = heading.cos() * north + heading.sin() * east;
    speed * (fpa.cos() * horizontal + fpa.sin() * up)
}

/// Rodrigues' rotation formula: rotate `v` by `angle_rad` about `axis`
/// (assumed unit length).
pub fn rodrigues(v: &na::Vector3<f64>, axis: &na::Vector3<f64>, angle_rad: f64) -> na::Vector3<f64> {
    let (s, c) = angle_rad.sin_cos();
    v * c + axis.cross(v) * s + axis * (axis.dot(v)) * (1.0 - c)
}

/// Orbit-normal unit vector for a given inclination/LAN pair.
pub fn orbit_normal(inc: f64, lan: f64) -> na::Vector3<f64> {
    na::Vector3::new(inc.sin() * lan.sin(), -inc.sin() * lan.cos(), inc.cos())
}

/// Two-body gravitational acceleration at position `r` (ECI), Earth-only.
pub fn grav_accel(r: &na::Vector3<f64>) -> na::Vector3<f64> {
    let r_mag = r.magnitude();
    -MU * r / (r_mag * r_mag * r_mag)
}

/// Launch azimuth (heading, radians from north) needed to reach orbital
/// inclination `inc` from launch latitude `lat`, corrected for Earth's
/// rotation given the desired inertial orbital speed `v_orbit`.
///
/// Returns `None` if `inc` is unreachable from `lat` (|cos(inc)/cos(lat)| > 1).
pub fn launch_azimuth_rotating(lat: f64, inc: f64, v_orbit: f64) -> Option<f64> {
    let ratio = inc.cos() / lat.cos();
    if ratio.abs() > 1.0 {
        return None;
    }
    let a = ratio.asin();
    let corrected = (v_orbit * a.sin() - OMEGA_E * RE * lat.cos()).atan2(v_orbit * a.cos());
    Some(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rodrigues_round_trip() {
        let v = na::Vector3::new(1.0, 2.0, 3.0);
        let axis = na::Vector3::new(0.0, 0.0, 1.0);
        let rotated = rodrigues(&v, &axis, 0.7);
        let back = rodrigues(&rotated, &axis, -0.7);
        assert_abs_diff_eq!(back, v, epsilon = 1e-5);
    }

    #[test]
    fn orbit_normal_is_unit_and_iy_is_negated() {
        let n = orbit_normal(28.5_f64.to_radians(), 45.0_f64.to_radians());
        assert_abs_diff_eq!(n.magnitude(), 1.0, epsilon = 1e-5);
        let iy = -n;
        assert_abs_diff_eq!(iy.magnitude(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn launch_azimuth_equatorial_value() {
        let az = launch_azimuth_rotating(0.0, 0.0, 7800.0).unwrap();
        assert_abs_diff_eq!(az, std::f64::consts::FRAC_PI_2, epsilon = 1e-3);
    }

    #[test]
    fn launch_azimuth_unreachable_inclination() {
        // Launching from 60 deg latitude cannot reach an equatorial orbit.
        assert!(launch_azimuth_rotating(60.0_f64.to_radians(), 0.0, 7800.0).is_none());
    }

    #[test]
    fn try_normalize_falls_back_on_zero_vector() {
        let prev = na::Vector3::new(0.0, 1.0, 0.0);
        let result = try_normalize(&na::Vector3::zeros(), &prev);
        assert_eq!(result, prev);
    }
}
