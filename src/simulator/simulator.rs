//! The Simulator (component C4): forward-Euler translational integrator
//! in lockstep with guidance, plus ground/air state initialization and an
//! append-only trajectory history. Grounded on the teacher's top-level
//! `main.rs` integration loop (the per-step CSV-telemetry loop) for the
//! "snapshot before overwrite" history discipline, with the teacher's RK4
//! integrator swapped for the explicit forward-Euler step spec.md section
//! 4.4 mandates.

use crate::constants::{G0, OMEGA_E, RE};
use crate::error::CoreError;
use crate::vector::{compute_velocity, grav_accel, sph_to_cart, try_normalize};
use nalgebra::Vector3;

use super::state::SimState;

#[derive(Debug, Clone)]
pub struct Simulator {
    state: SimState,
    history: Vec<SimState>,
    thrust_vector: Vector3<f64>,
    /// Specific impulse and physics tick spacing of the currently-applied
    /// thrust, cached by `set_thrust` so `step()` can compute mass flow
    /// without reaching back into the vehicle.
    current_isp: f64,
    dt: f64,
}

impl Simulator {
    /// Initialize in the air: position via `sph_to_cart` at `RE + altitude`,
    /// velocity via `compute_velocity(speed, fpa, heading)`.
    pub fn new_air(
        lat: f64,
        lon: f64,
        altitude: f64,
        speed: f64,
        fpa: f64,
        heading: f64,
        mass: f64,
        dt: f64,
    ) -> Result<Self, CoreError> {
        if mass <= 0.0 {
            return Err(CoreError::Config(format!("initial mass must be positive, got {mass}")));
        }
        let r = sph_to_cart(lat, lon, RE + altitude);
        let v = compute_velocity(&r, speed, fpa, heading);
        Ok(Self::from_state(SimState::new(r, v, 0.0, mass), dt))
    }

    /// Initialize on the ground: position on the surface, velocity zero in
    /// ECEF, which is an eastward inertial velocity of `omega_e * RE *
    /// cos(lat)` once expressed in ECI (the surface co-rotates with Earth).
    pub fn new_ground(lat: f64, lon: f64, mass: f64, dt: f64) -> Result<Self, CoreError> {
        if mass <= 0.0 {
            return Err(CoreError::Config(format!("initial mass must be positive, got {mass}")));
        }
        let r = sph_to_cart(lat, lon, RE);
        let eastward_speed = OMEGA_E * RE * lat.cos();
        // heading = pi/2 (east), fpa = 0 (horizontal): co-rotating surface
        // velocity expressed directly in ECI.
        let v = compute_velocity(&r, eastward_speed, 0.0, std::f64::consts::FRAC_PI_2);
        Ok(Self::from_state(SimState::new(r, v, 0.0, mass), dt))
    }

    fn from_state(state: SimState, dt: f64) -> Self {
        Simulator {
            state,
            history: Vec::new(),
            thrust_vector: Vector3::zeros(),
            current_isp: 0.0,
            dt,
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn history(&self) -> &[SimState] {
        &self.history
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Store `thrust_vector = unit_vector * stage_thrust` for the next
    /// `step()`, along with the isp needed for mass-flow accounting.
    pub fn set_thrust(&mut self, unit_vector: &Vector3<f64>, stage_thrust: f64, stage_isp: f64) {
        self.thrust_vector = unit_vector * stage_thrust;
        self.current_isp = stage_isp;
    }

    /// One forward-Euler physics tick:
    ///   a = grav_accel(r) + thrust_vector / mass
    ///   v += a * dt; r += v * dt
    ///   mass -= dt * |thrust_vector| / (g0 * isp)
    ///   t += dt
    ///
    /// A clone of the pre-step state is appended to `history` first, so
    /// history entries are immutable snapshots taken *before* the
    /// overwrite they correspond to.
    pub fn step(&mut self) -> Result<(), CoreError> {
        if self.state.mass <= 0.0 {
            return Err(CoreError::PropellantExhausted { stage_id: 0 });
        }
        self.history.push(self.state);

        let a = grav_accel(&self.state.r) + self.thrust_vector / self.state.mass;
        let v = self.state.v + a * self.dt;
        let r = self.state.r + v * self.dt;

        let mass_flow = if self.current_isp > 0.0 {
            self.thrust_vector.magnitude() / (G0 * self.current_isp)
        } else {
            0.0
        };
        let mass = self.state.mass - self.dt * mass_flow;
        let t = self.state.t + self.dt;

        self.state = SimState::new(r, v, t, mass);
        Ok(())
    }

    /// Unit vector of the currently applied thrust (zero if none set yet).
    pub fn thrust_unit(&self) -> Vector3<f64> {
        try_normalize(&self.thrust_vector, &Vector3::new(1.0, 0.0, 0.0))
    }
}
