//! Guidance program / mode FSM (component C6), spec section 4.6.
//! Represented as a closed tagged union (design notes section 9: "mode
//! polymorphism is a closed set of variants... represent as a tagged
//! union with per-variant payload, not a dynamic dispatch table"),
//! mirroring the teacher's `fsm/state_machine.rs` transition-table shape.

use crate::error::CoreError;
use crate::simulator::Simulator;
use crate::target::Target;
use crate::upfg::{self, UpfgPhase, UpfgState};
use crate::vector::{east_unit, launch_azimuth_rotating, north_unit, rodrigues, try_normalize};
use crate::vehicle::{StageMode, Vehicle};
use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GravityTurnSub {
    Sub0,
    Sub1,
    Sub2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Prelaunch,
    GravityTurn(GravityTurnSub),
    Upfg,
    FinalBurn,
    Idle,
    Abort,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Prelaunch => write!(f, "Prelaunch"),
            Mode::GravityTurn(GravityTurnSub::Sub0) => write!(f, "GravityTurn(Sub0)"),
            Mode::GravityTurn(GravityTurnSub::Sub1) => write!(f, "GravityTurn(Sub1)"),
            Mode::GravityTurn(GravityTurnSub::Sub2) => write!(f, "GravityTurn(Sub2)"),
            Mode::Upfg => write!(f, "Upfg"),
            Mode::FinalBurn => write!(f, "FinalBurn"),
            Mode::Idle => write!(f, "Idle"),
            Mode::Abort => write!(f, "Abort"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GuidanceConfig {
    pub prelaunch_hold: f64,
    pub pitch_time: f64,
    pub pitch_angle: f64,
    pub prograde_dot_threshold: f64,
    pub altitude_threshold: f64,
    pub tgo_threshold: f64,
    pub final_burn_time: f64,
    pub divergence_escalation_limit: u32,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        GuidanceConfig {
            prelaunch_hold: 5.0,
            pitch_time: 17.0,
            pitch_angle: 1.5_f64.to_radians(),
            prograde_dot_threshold: 0.9995,
            altitude_threshold: 30_000.0,
            tgo_threshold: 5.0,
            final_burn_time: 10.0,
            divergence_escalation_limit: 5,
        }
    }
}

pub struct GuidanceProgram {
    pub mode: Mode,
    pub config: GuidanceConfig,
    held_steering: Vector3<f64>,
    upfg_state: Option<UpfgState>,
    mode_elapsed: f64,
    last_mode_entry_t: f64,
    consecutive_failures: u32,
    pub last_diagnostic: Option<CoreError>,
}

impl GuidanceProgram {
    pub fn new(config: GuidanceConfig) -> Self {
        GuidanceProgram {
            mode: Mode::Prelaunch,
            config,
            held_steering: Vector3::new(0.0, 0.0, 1.0),
            upfg_state: None,
            mode_elapsed: 0.0,
            last_mode_entry_t: 0.0,
            consecutive_failures: 0,
            last_diagnostic: None,
        }
    }

    pub fn steering(&self) -> Option<Vector3<f64>> {
        match self.mode {
            Mode::Idle => None,
            _ => Some(self.held_steering),
        }
    }

    pub fn upfg_state(&self) -> Option<&UpfgState> {
        self.upfg_state.as_ref()
    }

    fn transition(&mut self, next: Mode, t: f64) {
        if self.mode != next {
            println!("Mode transition at t={:.2}s: {} -> {}", t, self.mode, next);
        }
        self.mode = next;
        self.mode_elapsed = 0.0;
        self.last_mode_entry_t = t;
    }

    /// Advance the FSM by one guidance cycle. `vehicle` is mutable because
    /// `Mode::Upfg` may opportunistically split the current stage.
    pub fn step(
        &mut self,
        sim: &Simulator,
        target: &Target,
        vehicle: &mut Vehicle,
        staging_flag: bool,
    ) -> Result<(), CoreError> {
        let s = sim.state();
        self.mode_elapsed = s.t - self.last_mode_entry_t;

        match self.mode {
            Mode::Prelaunch => {
                self.held_steering = local_up(&s.r);
                if self.mode_elapsed >= self.config.prelaunch_hold {
                    self.transition(Mode::GravityTurn(GravityTurnSub::Sub0), s.t);
                }
            }
            Mode::GravityTurn(sub) => {
                self.step_gravity_turn(sub, sim, target, s.t);
                if s.altitude > self.config.altitude_threshold {
                    self.transition(Mode::Upfg, s.t);
                }
            }
            Mode::Upfg => {
                self.step_upfg(sim, target, vehicle, staging_flag)?;
                if let Some(upfg_state) = &self.upfg_state {
                    if upfg_state.phase == UpfgPhase::Converged && upfg_state.tgo < self.config.tgo_threshold {
                        self.transition(Mode::FinalBurn, s.t);
                    }
                }
            }
            Mode::FinalBurn => {
                // Holds the last steering direction supplied before entry;
                // intentionally does not recompute.
                if self.mode_elapsed >= self.config.final_burn_time {
                    self.transition(Mode::Idle, s.t);
                }
            }
            Mode::Idle | Mode::Abort => {}
        }
        Ok(())
    }

    fn step_gravity_turn(&mut self, sub: GravityTurnSub, sim: &Simulator, target: &Target, t: f64) {
        let s = sim.state();
        match sub {
            GravityTurnSub::Sub0 => {
                self.held_steering = local_up(&s.r);
                if self.mode_elapsed >= self.config.pitch_time {
                    self.transition(Mode::GravityTurn(GravityTurnSub::Sub1), t);
                }
            }
            GravityTurnSub::Sub1 => {
                let up = local_up(&s.r);
                let east = east_unit(&s.r);
                let pitched = rodrigues(&up, &east, self.config.pitch_angle);
                let heading = launch_azimuth_rotating(s.latitude, target.inc, target.velocity).unwrap_or(std::f64::consts::FRAC_PI_2);
                let steering = rodrigues(&pitched, &up, -heading);
                self.held_steering = steering;

                let v_ecef = ecef_velocity_direction(sim);
                if steering.dot(&v_ecef) > self.config.prograde_dot_threshold {
                    self.transition(Mode::GravityTurn(GravityTurnSub::Sub2), t);
                }
            }
            GravityTurnSub::Sub2 => {
                self.held_steering = ecef_velocity_direction(sim);
            }
        }
    }

    fn step_upfg(&mut self, sim: &Simulator, target: &Target, vehicle: &mut Vehicle, staging_flag: bool) -> Result<(), CoreError> {
        let s = sim.state();

        if self.upfg_state.is_none() {
            let state = upfg::setup(s.r, s.v, s.t, s.mass, vehicle, target)?;
            self.upfg_state = Some(state);
        }

        let prev = self.upfg_state.clone().expect("just initialized above");
        match upfg::cycle(&prev, vehicle, s.r, s.v, s.t, s.mass, target, staging_flag) {
            Ok((new_state, steering)) => {
                self.consecutive_failures = 0;
                self.last_diagnostic = None;
                if let Some(unit) = steering {
                    self.held_steering = unit;
                }
                self.upfg_state = Some(new_state);
                Ok(())
            }
            Err(err) => {
                self.consecutive_failures += 1;
                eprintln!(
                    "UPFG diagnostic at t={:.2}s (failure {}/{}): {}",
                    s.t, self.consecutive_failures, self.config.divergence_escalation_limit, err
                );
                self.last_diagnostic = Some(err.clone());
                if self.consecutive_failures >= self.config.divergence_escalation_limit {
                    self.transition(Mode::Abort, s.t);
                }
                Ok(())
            }
        }
    }

    /// True once a mode-2 current stage should be throttled to its
    /// acceleration ceiling — the orchestration layer substitutes
    /// `accel_limit * g0 * mass` for the stage's nominal thrust in that
    /// case (spec step 8, resolved outside `upfg::cycle`; see its module
    /// doc comment).
    pub fn is_throttled(&self, vehicle: &Vehicle) -> bool {
        matches!(vehicle.current_stage().map(|s| s.mode), Some(StageMode::ConstantAccel))
    }
}

fn local_up(r: &Vector3<f64>) -> Vector3<f64> {
    let east = east_unit(r);
    let north = north_unit(r);
    try_normalize(&east.cross(&north), r)
}

fn ecef_velocity_direction(sim: &Simulator) -> Vector3<f64> {
    use crate::coordinates::{eci_to_ecef, KinematicState};
    let s = sim.state();
    let ecef = eci_to_ecef(&KinematicState { r: s.r, v: s.v }, s.t);
    try_normalize(&ecef.v, &sim.thrust_unit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelaunch_transitions_after_hold_time() {
        let mut program = GuidanceProgram::new(GuidanceConfig {
            prelaunch_hold: 2.0,
            ..Default::default()
        });
        let mut sim = Simulator::new_ground(0.0, 0.0, 500_000.0, 1.0).unwrap();
        let mut vehicle = Vehicle::new(vec![crate::vehicle::StageBuilder::new(1)
            .wet_mass(500_000.0)
            .dry_mass(50_000.0)
            .thrust(6_000_000.0)
            .isp(350.0)
            .build()
            .unwrap()])
        .unwrap();
        let target = Target::from_spec(200.0, 200.0, 28.5, Some(0.0), 0.0, 0.0).unwrap();

        sim.set_thrust(&Vector3::new(0.0, 0.0, 1.0), 0.0, 350.0);
        for _ in 0..3 {
            sim.step().unwrap();
            program.step(&sim, &target, &mut vehicle, false).unwrap();
        }
        assert!(matches!(program.mode, Mode::GravityTurn(GravityTurnSub::Sub0)));
    }
}
