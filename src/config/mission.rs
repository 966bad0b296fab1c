//! Mission configuration types (ambient stack, SPEC_FULL.md section 3.3):
//! plain `serde::Deserialize` structs mirroring the mission-file record
//! of spec section 6. Parsing the file itself (JSON or otherwise) is an
//! external collaborator's job — this crate only types the record and
//! validates it once parsed.

use crate::error::CoreError;
use crate::vehicle::{Stage, StageBuilder, StageMode};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OrbitSpec {
    pub pe: f64,
    pub ap: f64,
    pub inc: f64,
    pub lan: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StageSpec {
    pub id: u32,
    pub mode: u8,
    pub g_lim: f64,
    pub mass_total: f64,
    pub mass_dry: f64,
    pub thrust: f64,
    pub isp: f64,
}

impl StageSpec {
    pub fn build(&self) -> Result<Stage, CoreError> {
        let mode = match self.mode {
            1 => StageMode::ConstantThrust,
            2 => StageMode::ConstantAccel,
            other => return Err(CoreError::Config(format!("stage {}: unknown mode {other}", self.id))),
        };
        StageBuilder::new(self.id)
            .mode(mode)
            .accel_limit(self.g_lim)
            .wet_mass(self.mass_total)
            .dry_mass(self.mass_dry)
            .thrust(self.thrust)
            .isp(self.isp)
            .build()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GuidanceSpec {
    pub dt: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimulatorSpec {
    pub start_lat: f64,
    pub start_long: f64,
    pub start_ground: bool,
    pub altitude: Option<f64>,
    pub air_vel: Option<f64>,
    pub air_fpa: Option<f64>,
    pub dt_sim: f64,
    pub dt_guidance: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MissionConfig {
    pub orbit: OrbitSpec,
    pub stages: Vec<StageSpec>,
    pub guidance: GuidanceSpec,
    pub simulator: SimulatorSpec,
}

impl MissionConfig {
    /// Construction-time checks from error design kind 1: missing or
    /// nonsensical stage fields, pe > ap, and (when a simulator altitude
    /// is supplied for an air start) internally consistent air-start
    /// fields. Inclination reachability from the launch latitude is
    /// deferred to `Target::from_spec`, which already performs that
    /// check and reports it the same way.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.stages.is_empty() {
            return Err(CoreError::Config("mission has no stages".into()));
        }
        for stage in &self.stages {
            stage.build()?;
        }
        if self.orbit.pe > self.orbit.ap {
            return Err(CoreError::Config(format!(
                "orbit periapsis {} exceeds apoapsis {}",
                self.orbit.pe, self.orbit.ap
            )));
        }
        if self.guidance.dt <= 0.0 {
            return Err(CoreError::Config("guidance dt must be positive".into()));
        }
        if self.simulator.dt_sim <= 0.0 || self.simulator.dt_guidance <= 0.0 {
            return Err(CoreError::Config("simulator dt_sim/dt_guidance must be positive".into()));
        }
        if !self.simulator.start_ground && self.simulator.altitude.is_none() {
            return Err(CoreError::Config("air start requires an altitude".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MissionConfig {
        MissionConfig {
            orbit: OrbitSpec { pe: 200.0, ap: 200.0, inc: 28.5, lan: None },
            stages: vec![StageSpec {
                id: 1,
                mode: 1,
                g_lim: 0.0,
                mass_total: 500_000.0,
                mass_dry: 50_000.0,
                thrust: 6_000_000.0,
                isp: 350.0,
            }],
            guidance: GuidanceSpec { dt: 1.0 },
            simulator: SimulatorSpec {
                start_lat: 28.5,
                start_long: 0.0,
                start_ground: true,
                altitude: None,
                air_vel: None,
                air_fpa: None,
                dt_sim: 1.0,
                dt_guidance: 1.0,
                speed: 1.0,
            },
        }
    }

    #[test]
    fn valid_mission_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn pe_exceeding_ap_is_rejected() {
        let mut cfg = sample();
        cfg.orbit.pe = 300.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn air_start_without_altitude_is_rejected() {
        let mut cfg = sample();
        cfg.simulator.start_ground = false;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_stage_mode_is_rejected() {
        let mut cfg = sample();
        cfg.stages[0].mode = 9;
        assert!(cfg.validate().is_err());
    }
}
