//! The UPFG predictor-corrector cycle (component C5), spec section 4.5.
//!
//! `setup` performs the one-time initialization (`UpfgState.rd` first
//! guess, initial `vgo` estimate) and `cycle` runs the nine numbered
//! steps once per guidance call. Both are pure functions over their
//! inputs plus the previous `UpfgState` (design notes section 9: the
//! "previous-values" struct is a value type, passed by reference,
//! returned by value — never mutated through aliasing).
//!
//! Step 8 (mode-2 throttle scaling) is resolved at the orchestration
//! layer rather than here: a mode-2 stage's *physical* thrust is always
//! `accel_limit * g0 * mass` regardless of steering, so the caller
//! (`mission::GuidanceCore::advance`) substitutes that effective thrust
//! into the Simulator directly. Keeping `cycle`'s returned steering
//! vector strictly unit-length matches the `steering() -> Option<UnitVector>`
//! contract section 4.6 describes for every mode.

use crate::cse;
use crate::error::CoreError;
use crate::target::Target;
use crate::vector::try_normalize;
use crate::vehicle::{StageMode, Vehicle};
use nalgebra::Vector3;

use super::moments::{accumulate, j_of, l_of, stage_moments, stage_params, tb_for_impulse, StageMoments};
use super::state::{UpfgPhase, UpfgState};

const CONVERGENCE_TOL: f64 = 0.01;
const DIVERGENCE_RATIO: f64 = 10.0;

/// One-time initialization ahead of the first `cycle` call. `rd`'s first
/// guess follows the standard UPFG convention of scaling the current
/// position direction out to the target cut-off radius; subsequent
/// cycles refine it in step 7. The initial `vgo` guess is the velocity
/// still needed to reach the target's cut-off speed along the local
/// horizontal, minus the current velocity.
pub fn setup(r: Vector3<f64>, v: Vector3<f64>, t: f64, mass: f64, vehicle: &Vehicle, target: &Target) -> Result<UpfgState, CoreError> {
    if r.magnitude() < 1e-6 {
        return Err(CoreError::Singularity("zero position vector at UPFG setup".into()));
    }
    let rd = target.radius * try_normalize(&r, &Vector3::new(1.0, 0.0, 0.0));

    let iy = -target.normal;
    let ix = try_normalize(&rd, &Vector3::new(1.0, 0.0, 0.0));
    let transverse = iy.cross(&ix);
    let vd_vector = target.velocity * (target.fpa.sin() * ix + target.fpa.cos() * transverse);
    let vgo = vd_vector - v;

    let stage0 = vehicle
        .current_stage()
        .ok_or_else(|| CoreError::Config("vehicle has no stages at UPFG setup".into()))?;
    let params0 = stage_params(stage0, Some(mass));
    let tgo = (vgo.magnitude() / params0.a0).max(1.0);

    Ok(UpfgState {
        phase: UpfgPhase::Initialized,
        cse: Default::default(),
        rbias: Vector3::zeros(),
        rd,
        rgrav: Vector3::zeros(),
        rgo: Vector3::zeros(),
        tb: 0.0,
        t_last: t,
        tgo,
        v_last: v,
        vgo,
        consecutive_failures: 0,
    })
}

/// Run one UPFG cycle. Returns the updated state and, when converged,
/// `Some(unit steering vector)`; while converging the caller should keep
/// using whatever steering direction the physics integrator currently
/// has applied (spec: "the vehicle does not chase noise").
pub fn cycle(
    prev: &UpfgState,
    vehicle: &mut Vehicle,
    r: Vector3<f64>,
    v: Vector3<f64>,
    t: f64,
    mass: f64,
    target: &Target,
    staging_flag: bool,
) -> Result<(UpfgState, Option<Vector3<f64>>), CoreError> {
    let dv_sensed = v - prev.v_last;
    let vgo_sensed = prev.vgo - dv_sensed;
    let tb_elapsed = if staging_flag { 0.0 } else { prev.tb + (t - prev.t_last) };

    // Step 1 + step 3, restarting on opportunistic split or on
    // more-stages-than-needed.
    let mut working_stages = vehicle.stages().to_vec();
    let mut split_tried = false;

    let (params, tgo_new) = loop {
        if working_stages.is_empty() {
            return Err(CoreError::PropellantExhausted { stage_id: 0 });
        }

        if !split_tried {
            split_tried = true;
            if vehicle.split_if_accel_limited(mass) {
                working_stages = vehicle.stages().to_vec();
                continue;
            }
        }

        let mut params: Vec<_> = working_stages
            .iter()
            .enumerate()
            .map(|(i, s)| stage_params(s, if i == 0 { Some(mass) } else { None }))
            .collect();
        // params[0].tb from stage_params is the nominal full burn time;
        // this is the only place it is reduced by elapsed burn time.
        params[0].tb = (params[0].tb - tb_elapsed).max(0.0);

        let n = params.len();
        let l_sum: f64 = params[..n - 1].iter().map(|p| l_of(p, p.tb)).sum();
        let vgo_mag = vgo_sensed.magnitude();

        if l_sum > vgo_mag {
            working_stages.pop();
            continue;
        }

        let l_terminal = vgo_mag - l_sum;
        let last = n - 1;
        params[last].tb = tb_for_impulse(&params[last], l_terminal);

        let tgo: f64 = params.iter().map(|p| p.tb).sum();
        break (params, tgo);
    };

    if tgo_new <= 0.0 || (prev.tgo > 0.0 && tgo_new > DIVERGENCE_RATIO * prev.tgo) {
        return Err(CoreError::GuidanceDivergence {
            cycle: 0,
            tgo_old: prev.tgo,
            tgo_new,
        });
    }

    // Step 4: accumulate global thrust-integral moments.
    let mut global = StageMoments::default();
    let mut t_cum = 0.0;
    for p in &params {
        let local = stage_moments(p);
        let r_start = tgo_new - t_cum;
        t_cum += p.tb;
        let r_end = tgo_new - t_cum;
        accumulate(&mut global, &local, p.tb, r_start, r_end);
    }
    let StageMoments { l, j, s, q, h } = global;

    // Step 5: guidance vectors.
    let lambda = try_normalize(&vgo_sensed, &try_normalize(&prev.vgo, &Vector3::new(1.0, 0.0, 0.0)));
    let rgrav_predicted = if prev.tgo > 1e-6 {
        prev.rgrav * (tgo_new / prev.tgo).powi(2)
    } else {
        Vector3::zeros()
    };
    let rgo_raw = prev.rd - (r + v * tgo_new + rgrav_predicted);

    let iy = -target.normal;
    let iz = try_normalize(&prev.rd.cross(&iy), &Vector3::new(0.0, 0.0, 1.0));
    let rgo_plane = rgo_raw - iz * iz.dot(&rgo_raw);
    let rgo = rgo_plane + prev.rbias;

    let denom = if (q - s * j / l).abs() < 1e-6 {
        1e-6
    } else {
        q - s * j / l
    };
    let lambdadot = (rgo - lambda * s) / denom;

    let i_f = try_normalize(&(lambda - lambdadot * (j / l)), &lambda);
    let cos_phi = i_f.dot(&lambda).clamp(-1.0, 1.0);
    let phi = cos_phi.acos();
    let phidot = if j.abs() > 1e-9 { -phi * l / j } else { 0.0 };

    let vthrust = (l - 0.5 * l * phi * phi - j * phi * phidot - 0.5 * h * phidot * phidot) * lambda;
    let lambdadot_unit = try_normalize(&lambdadot, &lambda);
    let rthrust = (s - 0.5 * q * phi * phi) * lambda - (s * phi + q * phidot) * lambdadot_unit;

    let vbias = vgo_sensed - vthrust;
    let rbias_new = rgo - rthrust;

    // Step 6: free-flight estimation via CSE.
    let rc1 = r - 0.1 * rthrust - (tgo_new / 30.0) * vthrust;
    let vc1 = v + 1.2 * rthrust / tgo_new - 0.1 * vthrust;
    let mut cse_warm = prev.cse;
    let (rend, vend) = cse::propagate(&rc1, &vc1, tgo_new, crate::constants::MU, &mut cse_warm)?;
    let rgrav_new = rend - rc1 - vc1 * tgo_new;
    let vgrav = vend - vc1;

    // Step 7: target update.
    let rp = r + v * tgo_new + rgrav_new + rthrust;
    let rp_plane = rp - target.normal * target.normal.dot(&rp);
    let rd_new = target.radius * try_normalize(&rp_plane, &try_normalize(&rp, &Vector3::new(1.0, 0.0, 0.0)));

    let ix = try_normalize(&rd_new, &Vector3::new(1.0, 0.0, 0.0));
    let transverse = iy.cross(&ix);
    let vd_vector = target.velocity * (target.fpa.sin() * ix + target.fpa.cos() * transverse);
    let vgo_new = vd_vector - v - vgrav + vbias;

    let converged_now = prev.tgo > 0.0 && ((tgo_new - prev.tgo).abs() / prev.tgo) < CONVERGENCE_TOL;
    let phase = match prev.phase {
        UpfgPhase::Uninitialized => UpfgPhase::Initialized,
        UpfgPhase::Converged => UpfgPhase::Converged,
        UpfgPhase::Initialized | UpfgPhase::Converging => {
            if converged_now {
                UpfgPhase::Converged
            } else {
                UpfgPhase::Converging
            }
        }
    };

    let new_state = UpfgState {
        phase,
        cse: cse_warm,
        rbias: rbias_new,
        rd: rd_new,
        rgrav: rgrav_new,
        rgo,
        tb: if staging_flag { 0.0 } else { tb_elapsed },
        t_last: t,
        tgo: tgo_new,
        v_last: v,
        vgo: vgo_new,
        consecutive_failures: 0,
    };

    let steering = match phase {
        UpfgPhase::Converged => Some(i_f),
        _ => None,
    };

    // Step 8 (mode-2 throttle) is handled by the orchestration layer; see
    // module doc comment.
    let _ = StageMode::ConstantAccel;

    Ok((new_state, steering))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::StageBuilder;

    fn saturn_like_vehicle() -> Vehicle {
        Vehicle::new(vec![StageBuilder::new(1)
            .wet_mass(500_000.0)
            .dry_mass(50_000.0)
            .thrust(6_000_000.0)
            .isp(350.0)
            .build()
            .unwrap()])
        .unwrap()
    }

    fn target_200x200_285() -> Target {
        Target::from_spec(200.0, 200.0, 28.5, Some(0.0), 28.5_f64.to_radians(), 0.0).unwrap()
    }

    #[test]
    fn setup_produces_rd_at_target_radius() {
        let r = Vector3::new(5_000_000.0, 1_000_000.0, 3_500_000.0);
        let v = Vector3::new(-1_500.0, 6_900.0, 2_100.0);
        let vehicle = saturn_like_vehicle();
        let target = target_200x200_285();
        let state = setup(r, v, 0.0, 400_000.0, &vehicle, &target).unwrap();
        assert!((state.rd.magnitude() - target.radius).abs() < 1.0);
        assert_eq!(state.phase, UpfgPhase::Initialized);
    }

    #[test]
    fn first_cycle_holds_steering_until_converged() {
        let r = Vector3::new(5_000_000.0, 1_000_000.0, 3_500_000.0);
        let v = Vector3::new(-1_500.0, 6_900.0, 2_100.0);
        let mut vehicle = saturn_like_vehicle();
        let target = target_200x200_285();
        let prev = setup(r, v, 0.0, 400_000.0, &vehicle, &target).unwrap();

        let (new_state, steering) = cycle(&prev, &mut vehicle, r, v, 1.0, 399_000.0, &target, false).unwrap();
        assert!(new_state.tgo > 0.0);
        // First real cycle after setup can't satisfy the convergence
        // check (no two tgo samples yet close together), so steering is
        // held (None) unless the synthetic inputs happen to already
        // satisfy the 1% band.
        if steering.is_some() {
            assert!((new_state.tgo - prev.tgo).abs() / prev.tgo < CONVERGENCE_TOL);
        }
    }

    #[test]
    fn staging_flag_zeroes_tb() {
        let r = Vector3::new(5_000_000.0, 1_000_000.0, 3_500_000.0);
        let v = Vector3::new(-1_500.0, 6_900.0, 2_100.0);
        let mut vehicle = saturn_like_vehicle();
        let target = target_200x200_285();
        let mut prev = setup(r, v, 0.0, 400_000.0, &vehicle, &target).unwrap();
        prev.tb = 42.0;
        let (new_state, _) = cycle(&prev, &mut vehicle, r, v, 1.0, 399_000.0, &target, true).unwrap();
        assert_eq!(new_state.tb, 0.0);
    }
}
