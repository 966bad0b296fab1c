use crate::constants::*;
use nalgebra as na;

/// Instantaneous position+velocity pair, used for the ECI<->ECEF rotation
/// where velocity needs the omega x r correction on top of the frame
/// rotation applied to position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicState {
    pub r: na::Vector3<f64>,
    pub v: na::Vector3<f64>,
}

/// Rotate an ECI state into ECEF at time `t` (seconds since the ECI/ECEF
/// frames coincided), theta = omega_e * t about Z.
pub fn eci_to_ecef(state: &KinematicState, t: f64) -> KinematicState {
    let theta = OMEGA_E * t;
    let rot = na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), -theta);
    let r_ecef = rot * state.r;
    let omega = na::Vector3::new(0.0, 0.0, OMEGA_E);
    let v_ecef = rot * (state.v - omega.cross(&state.r));
    KinematicState {
        r: r_ecef,
        v: v_ecef,
    }
}

/// Inverse of [`eci_to_ecef`].
pub fn ecef_to_eci(state: &KinematicState, t: f64) -> KinematicState {
    let theta = OMEGA_E * t;
    let rot = na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), theta);
    let r_eci = rot * state.r;
    let omega = na::Vector3::new(0.0, 0.0, OMEGA_E);
    let v_eci = rot * state.v + omega.cross(&r_eci);
    KinematicState {
        r: r_eci,
        v: v_eci,
    }
}

/// Spherical-Earth geodetic decomposition of an ECEF position: returns
/// (longitude, latitude, altitude) in radians/radians/meters.
pub fn ecef_to_geodetic(pos: &na::Vector3<f64>) -> (f64, f64, f64) {
    let longitude = pos.y.atan2(pos.x);
    let r_mag = pos.magnitude();
    let latitude = (pos.z / r_mag).asin();
    let altitude = r_mag - RE;
    (longitude, latitude, altitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn eci_ecef_round_trip_is_identity() {
        let state = KinematicState {
            r: na::Vector3::new(6_800_000.0, 120_000.0, 450_000.0),
            v: na::Vector3::new(10.0, 7_500.0, 120.0),
        };
        let t = 1234.5;
        let ecef = eci_to_ecef(&state, t);
        let back = ecef_to_eci(&ecef, t);
        assert_abs_diff_eq!(back.r, state.r, epsilon = 1e-6);
        assert_abs_diff_eq!(back.v, state.v, epsilon = 1e-6);
    }

    #[test]
    fn ecef_to_geodetic_on_equator_prime_meridian() {
        let pos = na::Vector3::new(RE, 0.0, 0.0);
        let (lon, lat, alt) = ecef_to_geodetic(&pos);
        assert_abs_diff_eq!(lon, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(alt, 0.0, epsilon = 1e-6);
    }
}
