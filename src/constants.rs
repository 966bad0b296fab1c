// Physical constants shared by every component. Values must match exactly
// for bit-comparable trajectories against reference runs (spec section 6).

/// Earth mean radius, meters.
pub const RE: f64 = 6_371_000.0;
/// Earth gravitational parameter, m^3/s^2.
pub const MU: f64 = 3.986e14;
/// Standard gravity, m/s^2.
pub const G0: f64 = 9.80665;
/// Earth rotation rate, rad/s.
pub const OMEGA_E: f64 = 7.2921150e-5;

pub const PI: f64 = std::f64::consts::PI;
