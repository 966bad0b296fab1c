//! `SimState`: the Simulator's live state plus its derived fields
//! (component C4). Grounded on the teacher's `models/state.rs::State` for
//! the "plain state + derived-field recompute" shape, simplified: no
//! attitude/quaternion (out of scope here) and no generic spacecraft
//! parameter (mass is tracked directly on the state, not read from a
//! fixed `SpacecraftProperties` impl, since mass changes every step).

use crate::constants::MU;
use crate::coordinates::{cart_to_kepler, ecef_to_geodetic, eci_to_ecef, KeplerElements, KinematicState};
use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimState {
    pub r: Vector3<f64>,
    pub v: Vector3<f64>,
    pub t: f64,
    pub mass: f64,
    pub elements: KeplerElements,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

impl SimState {
    /// Build a state from a raw (r, v, t, mass) tuple, recomputing the
    /// derived Keplerian and geodetic fields.
    pub fn new(r: Vector3<f64>, v: Vector3<f64>, t: f64, mass: f64) -> Self {
        let elements = cart_to_kepler(&r, &v, MU);
        let ecef = eci_to_ecef(&KinematicState { r, v }, t);
        let (longitude, latitude, altitude) = ecef_to_geodetic(&ecef.r);
        SimState {
            r,
            v,
            t,
            mass,
            elements,
            longitude,
            latitude,
            altitude,
        }
    }
}
