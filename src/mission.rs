//! `GuidanceCore`: owns one Vehicle, Simulator, GuidanceProgram and
//! Target and exposes exactly the read accessors of spec section 6. This
//! is the "shared mutable state" block section 5 describes as guarded by
//! a single mutual-exclusion discipline; `runtime` wraps an instance of
//! this type in `Arc<Mutex<_>>` for the two-task driver.

use crate::error::CoreError;
use crate::guidance::{GuidanceConfig, GuidanceProgram, Mode};
use crate::simulator::{SimState, Simulator};
use crate::target::Target;
use crate::vehicle::Vehicle;
use nalgebra::Vector3;

pub struct GuidanceCore {
    pub vehicle: Vehicle,
    pub simulator: Simulator,
    pub guidance: GuidanceProgram,
    pub target: Target,
    staging_flag: bool,
}

/// `(param, actual, target)` rows for `get_target_display`.
#[derive(Debug, Clone, Copy)]
pub struct TargetRow {
    pub param: &'static str,
    pub actual: f64,
    pub target: f64,
}

/// `{tb, tgo, |vgo|, |rgo|, |rgrav|, |rbias|}` for `get_upfg_display`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpfgRow {
    pub tb: f64,
    pub tgo: f64,
    pub vgo_mag: f64,
    pub rgo_mag: f64,
    pub rgrav_mag: f64,
    pub rbias_mag: f64,
}

impl GuidanceCore {
    pub fn new(vehicle: Vehicle, simulator: Simulator, guidance_config: GuidanceConfig, target: Target) -> Self {
        GuidanceCore {
            vehicle,
            simulator,
            guidance: GuidanceProgram::new(guidance_config),
            target,
            staging_flag: false,
        }
    }

    /// One physics tick (T_phys): apply the currently-held steering at
    /// the stage's effective thrust, integrate, and raise the one-shot
    /// staging flag if mass drops below the current stage's dry mass.
    pub fn advance_physics(&mut self) -> Result<(), CoreError> {
        let stage = self
            .vehicle
            .current_stage()
            .cloned()
            .ok_or(CoreError::PropellantExhausted { stage_id: 0 })?;
        let unit = self.guidance.steering().unwrap_or_else(|| self.simulator.thrust_unit());

        let effective_thrust = if self.guidance.is_throttled(&self.vehicle) {
            stage.accel_limit * crate::constants::G0 * self.simulator.state().mass
        } else {
            stage.thrust
        };
        self.simulator.set_thrust(&unit, effective_thrust, stage.isp);
        self.simulator.step()?;

        if self.simulator.state().mass < stage.dry_mass {
            println!(
                "Staging event at t={:.2}s: stage {} burned out (mass {:.1}kg < dry mass {:.1}kg)",
                self.simulator.state().t,
                stage.id,
                self.simulator.state().mass,
                stage.dry_mass
            );
            self.vehicle.advance_stage()?;
            self.staging_flag = true;
        }
        Ok(())
    }

    /// One guidance cycle (T_guid): read the simulator snapshot, run the
    /// active mode, consume and clear the staging flag.
    pub fn advance_guidance(&mut self) -> Result<(), CoreError> {
        let flag = self.staging_flag;
        self.guidance.step(&self.simulator, &self.target, &mut self.vehicle, flag)?;
        self.staging_flag = false;
        Ok(())
    }

    pub fn active_mode(&self) -> Mode {
        self.guidance.mode
    }

    // --- Read accessors, spec section 6 ---

    pub fn get_state(&self) -> (Vector3<f64>, Vector3<f64>, f64, f64) {
        let s = self.simulator.state();
        (s.r, s.v, s.t, s.mass)
    }

    pub fn get_history(&self) -> Vec<SimState> {
        self.simulator.history().to_vec()
    }

    pub fn get_guidance_info(&self) -> (Option<Vector3<f64>>, Mode) {
        (self.guidance.steering(), self.guidance.mode)
    }

    pub fn get_target_display(&self) -> Vec<TargetRow> {
        let s = self.simulator.state();
        vec![
            TargetRow { param: "ap", actual: s.elements.ap, target: self.target.ap },
            TargetRow { param: "pe", actual: s.elements.pe, target: self.target.pe },
            TargetRow { param: "inc", actual: s.elements.i, target: self.target.inc },
            TargetRow { param: "lan", actual: s.elements.lan, target: self.target.lan },
            TargetRow { param: "ecc", actual: s.elements.e, target: self.target.ecc },
        ]
    }

    pub fn get_upfg_display(&self) -> UpfgRow {
        match self.guidance.upfg_state() {
            Some(u) => UpfgRow {
                tb: u.tb,
                tgo: u.tgo,
                vgo_mag: u.vgo.magnitude(),
                rgo_mag: u.rgo.magnitude(),
                rgrav_mag: u.rgrav.magnitude(),
                rbias_mag: u.rbias.magnitude(),
            },
            None => UpfgRow::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::StageBuilder;

    fn core() -> GuidanceCore {
        let vehicle = Vehicle::new(vec![StageBuilder::new(1)
            .wet_mass(500_000.0)
            .dry_mass(50_000.0)
            .thrust(6_000_000.0)
            .isp(350.0)
            .build()
            .unwrap()])
        .unwrap();
        let simulator = Simulator::new_ground(28.5_f64.to_radians(), 0.0, 500_000.0, 1.0).unwrap();
        let target = Target::from_spec(200.0, 200.0, 28.5, Some(0.0), 28.5_f64.to_radians(), 0.0).unwrap();
        GuidanceCore::new(vehicle, simulator, GuidanceConfig::default(), target)
    }

    #[test]
    fn advance_physics_grows_history_and_decrements_mass() {
        let mut core = core();
        let (_, _, _, m0) = core.get_state();
        core.advance_physics().unwrap();
        let (_, _, _, m1) = core.get_state();
        assert_eq!(core.get_history().len(), 1);
        assert!(m1 <= m0);
    }

    #[test]
    fn constant_accel_stage_is_throttled_to_its_acceleration_limit() {
        use crate::vehicle::StageMode;

        let vehicle = Vehicle::new(vec![StageBuilder::new(1)
            .mode(StageMode::ConstantAccel)
            .accel_limit(3.0)
            .wet_mass(500_000.0)
            .dry_mass(50_000.0)
            .thrust(6_000_000.0)
            .isp(350.0)
            .build()
            .unwrap()])
        .unwrap();
        let simulator = Simulator::new_ground(28.5_f64.to_radians(), 0.0, 500_000.0, 0.1).unwrap();
        let target = Target::from_spec(200.0, 200.0, 28.5, Some(0.0), 28.5_f64.to_radians(), 0.0).unwrap();
        let mut core = GuidanceCore::new(vehicle, simulator, GuidanceConfig::default(), target);

        assert!(core.guidance.is_throttled(&core.vehicle));

        let (_, _, _, m0) = core.get_state();
        core.advance_physics().unwrap();
        let (_, _, _, m1) = core.get_state();

        let expected_thrust = 3.0 * crate::constants::G0 * m0;
        let expected_mdot = expected_thrust / (350.0 * crate::constants::G0);
        let expected_m1 = m0 - expected_mdot * 0.1;
        assert!((m1 - expected_m1).abs() < 1e-6);
    }

    #[test]
    fn guidance_info_starts_in_prelaunch() {
        let core = core();
        let (_, mode) = core.get_guidance_info();
        assert_eq!(mode, Mode::Prelaunch);
    }
}
