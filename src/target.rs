//! Target geometry (component C7): convert a target-orbit spec (pe, ap,
//! inc, optional LAN) plus the current launch site into radius, speed,
//! flight-path angle, and orbit-normal. Grounded on the teacher's
//! `gnc/guidance/hohmann.rs::ApsisTargeting` for the "derive a target
//! orbit from simple orbital parameters" shape.

use crate::constants::{MU, RE};
use crate::error::CoreError;
use crate::vector::orbit_normal;
use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub pe: f64,
    pub ap: f64,
    pub ecc: f64,
    pub radius: f64,
    pub velocity: f64,
    /// Flight-path angle at cut-off, radians. Derived from specific
    /// angular momentum; always 0 in this crate's scope since cut-off is
    /// always at periapsis, regardless of eccentricity.
    pub fpa: f64,
    pub inc: f64,
    pub lan: f64,
    pub normal: Vector3<f64>,
}

impl Target {
    /// `pe_km`/`ap_km` are altitudes above the surface in kilometers (as
    /// in the mission file record), `inc_deg` in degrees. `lan_deg` is the
    /// auto-solve fallback when omitted: solve the spherical triangle
    /// given the current launch latitude/longitude; if unreachable (NaN)
    /// fall back to LAN = 0.
    pub fn from_spec(
        pe_km: f64,
        ap_km: f64,
        inc_deg: f64,
        lan_deg: Option<f64>,
        launch_lat: f64,
        launch_lon: f64,
    ) -> Result<Self, CoreError> {
        let pe = pe_km * 1000.0 + RE;
        let ap = ap_km * 1000.0 + RE;
        if pe > ap {
            return Err(CoreError::Config(format!(
                "target periapsis {pe} exceeds apoapsis {ap}"
            )));
        }
        let ecc = (ap - pe) / (ap + pe);
        let sma = (pe + ap) / 2.0;
        let velocity = (MU * (2.0 / pe - 1.0 / sma)).sqrt();

        // Cut-off is always at periapsis (radius = pe), circular or not,
        // so derive gamma from specific angular momentum rather than
        // assuming it: h = sqrt(mu * semi-latus-rectum), cos(gamma) =
        // h / (r * v). At periapsis the radial velocity component is
        // zero by definition, so this evaluates to gamma = 0 for every
        // eccentricity, but it is computed, not assumed.
        let semi_latus_rectum = sma * (1.0 - ecc * ecc);
        let h = (MU * semi_latus_rectum).sqrt();
        let cos_fpa = (h / (pe * velocity)).clamp(-1.0, 1.0);
        let fpa = cos_fpa.acos();

        let inc = inc_deg.to_radians();

        let lan = match lan_deg {
            Some(deg) => deg.to_radians(),
            None => {
                let a = launch_lat;
                let alpha = inc;
                let b = (a.tan() / alpha.tan()).asin();
                if b.is_nan() {
                    0.0
                } else {
                    launch_lon - b
                }
            }
        };

        let normal = orbit_normal(inc, lan);

        Ok(Target {
            pe,
            ap,
            ecc,
            radius: pe,
            velocity,
            fpa,
            inc,
            lan,
            normal,
        })
    }
}
