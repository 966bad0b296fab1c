//! Stage accounting (component C3): a single burn segment of the staged
//! vehicle. Grounded on the teacher's `config/spacecraft.rs`
//! (`SpacecraftProperties`) for the "plain data + validating constructor"
//! shape, and on `dylan42000-rocket-sim`'s `Stage`/`StageBuilder` for the
//! fluent builder (mission-construction convenience, not part of C3's
//! required semantics).

use crate::constants::G0;
use crate::error::CoreError;

/// Mode 1 = constant thrust for the whole burn. Mode 2 = constant
/// acceleration ceiling once thrust/mass reaches `accel_limit * g0`
/// (throttled from that point on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    ConstantThrust,
    ConstantAccel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub id: u32,
    pub mode: StageMode,
    /// g-load ceiling (multiplied by g0 to get an acceleration), only
    /// meaningful for `StageMode::ConstantAccel`.
    pub accel_limit: f64,
    pub wet_mass: f64,
    pub dry_mass: f64,
    pub thrust: f64,
    pub isp: f64,
}

impl Stage {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.dry_mass > self.wet_mass {
            return Err(CoreError::Config(format!(
                "stage {}: dry mass {} exceeds wet mass {}",
                self.id, self.dry_mass, self.wet_mass
            )));
        }
        if self.thrust <= 0.0 {
            return Err(CoreError::Config(format!(
                "stage {}: thrust must be positive, got {}",
                self.id, self.thrust
            )));
        }
        if self.isp <= 0.0 {
            return Err(CoreError::Config(format!(
                "stage {}: isp must be positive, got {}",
                self.id, self.isp
            )));
        }
        Ok(())
    }

    pub fn propellant_mass(&self) -> f64 {
        self.wet_mass - self.dry_mass
    }

    pub fn mass_flow(&self) -> f64 {
        self.thrust / (self.isp * G0)
    }

    pub fn burn_time(&self) -> f64 {
        self.propellant_mass() / self.mass_flow()
    }

    /// Live mass at which this stage's thrust/weight would reach
    /// `accel_limit * g0`, i.e. the constant-thrust/constant-accel split
    /// boundary.
    pub fn accel_limited_mass(&self) -> f64 {
        self.thrust / (self.accel_limit * G0)
    }
}

pub struct StageBuilder {
    id: u32,
    mode: StageMode,
    accel_limit: f64,
    wet_mass: f64,
    dry_mass: f64,
    thrust: f64,
    isp: f64,
}

impl StageBuilder {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            mode: StageMode::ConstantThrust,
            accel_limit: 0.0,
            wet_mass: 0.0,
            dry_mass: 0.0,
            thrust: 0.0,
            isp: 0.0,
        }
    }

    pub fn mode(mut self, mode: StageMode) -> Self {
        self.mode = mode;
        self
    }
    pub fn accel_limit(mut self, g_load: f64) -> Self {
        self.accel_limit = g_load;
        self
    }
    pub fn wet_mass(mut self, v: f64) -> Self {
        self.wet_mass = v;
        self
    }
    pub fn dry_mass(mut self, v: f64) -> Self {
        self.dry_mass = v;
        self
    }
    pub fn thrust(mut self, v: f64) -> Self {
        self.thrust = v;
        self
    }
    pub fn isp(mut self, v: f64) -> Self {
        self.isp = v;
        self
    }

    pub fn build(self) -> Result<Stage, CoreError> {
        let stage = Stage {
            id: self.id,
            mode: self.mode,
            accel_limit: self.accel_limit,
            wet_mass: self.wet_mass,
            dry_mass: self.dry_mass,
            thrust: self.thrust,
            isp: self.isp,
        };
        stage.validate()?;
        Ok(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> Stage {
        StageBuilder::new(1)
            .mode(StageMode::ConstantThrust)
            .wet_mass(1000.0)
            .dry_mass(200.0)
            .thrust(20_000.0)
            .isp(300.0)
            .build()
            .unwrap()
    }

    #[test]
    fn burn_time_matches_propellant_over_massflow() {
        let s = stage();
        let expected = s.propellant_mass() / s.mass_flow();
        assert_eq!(s.burn_time(), expected);
    }

    #[test]
    fn dry_exceeding_wet_is_rejected() {
        let result = StageBuilder::new(2)
            .wet_mass(100.0)
            .dry_mass(200.0)
            .thrust(1000.0)
            .isp(300.0)
            .build();
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn nonpositive_thrust_is_rejected() {
        let result = StageBuilder::new(3)
            .wet_mass(100.0)
            .dry_mass(50.0)
            .thrust(0.0)
            .isp(300.0)
            .build();
        assert!(result.is_err());
    }
}
