//! Vehicle: the ordered stage list, index 0 burning (component C3).

use super::stage::{Stage, StageMode};
use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct Vehicle {
    stages: Vec<Stage>,
    /// Counter for synthetic ids minted by `split_if_accel_limited`, kept
    /// well above any id a mission file would plausibly assign.
    next_split_id: u32,
}

impl Vehicle {
    pub fn new(stages: Vec<Stage>) -> Result<Self, CoreError> {
        if stages.is_empty() {
            return Err(CoreError::Config("vehicle has no stages".into()));
        }
        for stage in &stages {
            stage.validate()?;
        }
        Ok(Vehicle {
            stages,
            next_split_id: 1_000_000,
        })
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages.first()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Remove stage 0. Must be called exactly when live mass drops below
    /// the current stage's dry mass.
    pub fn advance_stage(&mut self) -> Result<(), CoreError> {
        if self.stages.is_empty() {
            return Err(CoreError::PropellantExhausted { stage_id: 0 });
        }
        self.stages.remove(0);
        Ok(())
    }

    /// Clone of the vehicle with the last stage dropped — used by UPFG
    /// when cycle 3 discovers the vehicle has more stages than needed.
    pub fn without_last_stage(&self) -> Vehicle {
        let mut stages = self.stages.clone();
        stages.pop();
        Vehicle {
            stages,
            next_split_id: self.next_split_id,
        }
    }

    /// Opportunistic constant-thrust/constant-accel split for the current
    /// stage, evaluated against the vehicle's live `mass`. Returns `true`
    /// if a split was performed (the caller must restart its cycle with
    /// the updated stage list).
    ///
    /// A mode-2 stage only behaves as acceleration-limited once thrust /
    /// mass reaches `accel_limit * g0`; while `mass` is still above that
    /// threshold mass, the remaining burn down to the threshold is
    /// constant-thrust. This splits stage 0 in place into that
    /// constant-thrust prefix (new mode-1 stage, using the *live* mass as
    /// its wet mass) and a constant-accel remainder, preserving total
    /// remaining propellant (mass - dry_mass) across the split.
    pub fn split_if_accel_limited(&mut self, mass: f64) -> bool {
        let Some(stage0) = self.stages.first().cloned() else {
            return false;
        };
        if stage0.mode != StageMode::ConstantAccel {
            return false;
        }
        let split_mass = stage0.accel_limited_mass();
        if mass <= split_mass || split_mass <= stage0.dry_mass {
            // Already acceleration-limited, or the limit is unreachable
            // within this stage's propellant: nothing to split.
            return false;
        }

        let prefix = Stage {
            id: stage0.id,
            mode: StageMode::ConstantThrust,
            accel_limit: stage0.accel_limit,
            wet_mass: mass,
            dry_mass: split_mass,
            thrust: stage0.thrust,
            isp: stage0.isp,
        };
        let remainder = Stage {
            id: self.next_split_id,
            mode: StageMode::ConstantAccel,
            accel_limit: stage0.accel_limit,
            wet_mass: split_mass,
            dry_mass: stage0.dry_mass,
            thrust: stage0.thrust,
            isp: stage0.isp,
        };
        self.next_split_id += 1;

        self.stages[0] = prefix;
        self.stages.insert(1, remainder);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::G0;
    use crate::vehicle::stage::StageBuilder;

    fn accel_limited_stage() -> Stage {
        StageBuilder::new(1)
            .mode(StageMode::ConstantAccel)
            .accel_limit(4.0) // 4g ceiling
            .wet_mass(10_000.0)
            .dry_mass(2_000.0)
            .thrust(200_000.0) // split mass = 200000/(4*9.80665) ~ 5098 kg
            .isp(320.0)
            .build()
            .unwrap()
    }

    #[test]
    fn advance_stage_removes_stage_zero() {
        let mut v = Vehicle::new(vec![
            StageBuilder::new(1).wet_mass(10.0).dry_mass(1.0).thrust(10.0).isp(300.0).build().unwrap(),
            StageBuilder::new(2).wet_mass(10.0).dry_mass(1.0).thrust(10.0).isp(300.0).build().unwrap(),
        ])
        .unwrap();
        assert_eq!(v.current_stage().unwrap().id, 1);
        v.advance_stage().unwrap();
        assert_eq!(v.current_stage().unwrap().id, 2);
    }

    #[test]
    fn no_split_while_above_accel_limit_threshold_mass() {
        let mut v = Vehicle::new(vec![accel_limited_stage()]).unwrap();
        let split = v.split_if_accel_limited(9_000.0);
        assert!(!split);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn splits_exactly_once_preserving_propellant() {
        let stage = accel_limited_stage();
        let mut v = Vehicle::new(vec![stage.clone()]).unwrap();
        let live_mass = 6_000.0; // above split mass (~5098 kg)
        let split_mass = stage.accel_limited_mass();
        assert!(live_mass > split_mass);

        let split = v.split_if_accel_limited(live_mass);
        assert!(split);
        assert_eq!(v.len(), 2);

        let prefix = &v.stages()[0];
        let remainder = &v.stages()[1];
        assert_eq!(prefix.mode, StageMode::ConstantThrust);
        assert_eq!(remainder.mode, StageMode::ConstantAccel);

        let total_propellant = prefix.propellant_mass() + remainder.propellant_mass();
        let original_remaining_propellant = live_mass - stage.dry_mass;
        assert!((total_propellant - original_remaining_propellant).abs() < 1e-6);

        // Already-limited: no further split on the remainder.
        let mut v2 = v.clone();
        assert!(!v2.split_if_accel_limited(split_mass - 1.0));
    }

    #[test]
    fn without_last_stage_drops_terminal_stage() {
        let v = Vehicle::new(vec![
            StageBuilder::new(1).wet_mass(10.0).dry_mass(1.0).thrust(10.0).isp(300.0).build().unwrap(),
            StageBuilder::new(2).wet_mass(10.0).dry_mass(1.0).thrust(10.0).isp(300.0).build().unwrap(),
        ])
        .unwrap();
        let trimmed = v.without_last_stage();
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed.current_stage().unwrap().id, 1);
    }

    #[test]
    fn g0_constant_matches_spec() {
        assert!((G0 - 9.80665).abs() < 1e-12);
    }
}
