//! Per-stage thrust integrals (the "J, S, Q, P" moments of spec section
//! 4.5 step 4) and the burn-time allocation of step 3.
//!
//! `L(t)` and `J(t)` have closed forms derived directly from the
//! constant-thrust / constant-acceleration mass models (mode 1: thrust
//! acceleration a(s) = a0*tau/(tau-s); mode 2: a(s) = accel_limit,
//! constant). `S` and `Q` (second- and third-order moments) are obtained
//! by integrating those closed forms on a fixed grid with the composite
//! trapezoid rule rather than carrying a five-level algebraic expansion
//! by hand — the quadrature is deterministic, bounded (`MOMENT_GRID`
//! points), and cheap at guidance cadence. `P` (the fourth-order moment)
//! is not accumulated: the steering formulas in step 5 consume only
//! L, J, S, Q, H, and carrying P through an unverifiable extra expansion
//! buys nothing this cycle uses.

use crate::vehicle::{Stage, StageMode};

const MOMENT_GRID: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct StageParams {
    pub mode: StageMode,
    pub massflow: f64,
    pub ve: f64,
    pub a0: f64,
    pub tau: f64,
    /// Nominal full (wet-to-dry) burn time for this stage; the caller
    /// decrements stage 0's `tb` by elapsed burn time, and step 3 may
    /// shorten the *terminal* stage's `tb` further.
    pub tb: f64,
    pub accel_limit: f64,
}

/// Stage parameter block (spec step 1). `live_mass` overrides `wet_mass`
/// for computing `a0`/`tau` of the currently-burning stage (index 0);
/// other stages use their own wet mass. `tb` is always the stage's
/// *nominal* full burn time (wet-to-dry at constant massflow) — the
/// caller (step 2) is the one that decrements it by elapsed burn time,
/// so computing it from live mass here would double-count that elapsed
/// time.
pub fn stage_params(stage: &Stage, live_mass: Option<f64>) -> StageParams {
    let accel_mass = live_mass.unwrap_or(stage.wet_mass);
    let massflow = stage.mass_flow();
    let ve = stage.isp * crate::constants::G0;
    let a0 = stage.thrust / accel_mass;
    let mut tau = ve / a0;
    let tb = (stage.wet_mass - stage.dry_mass) / massflow;
    // Clamp so a live-mass stage never reports a characteristic time
    // shorter than its own burn time (degenerate at mass ~ dry_mass).
    if tau <= tb + 1e-3 {
        tau = tb + 1e-3;
    }
    StageParams {
        mode: stage.mode,
        massflow,
        ve,
        a0,
        tau,
        tb,
        accel_limit: stage.accel_limit * crate::constants::G0,
    }
}

/// L(t) = impulse delivered over [0, t].
pub fn l_of(params: &StageParams, t: f64) -> f64 {
    match params.mode {
        StageMode::ConstantThrust => params.ve * (params.tau / (params.tau - t)).ln(),
        StageMode::ConstantAccel => params.accel_limit * t,
    }
}

/// J(t) = integral of L(s) over [0, t], i.e. the impulse weighted by
/// remaining time to `t`.
pub fn j_of(params: &StageParams, t: f64) -> f64 {
    match params.mode {
        StageMode::ConstantThrust => {
            let l = l_of(params, t);
            params.ve * t - (params.tau - t) * l
        }
        StageMode::ConstantAccel => params.accel_limit * t * t / 2.0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StageMoments {
    pub l: f64,
    pub j: f64,
    pub s: f64,
    pub q: f64,
    /// h = t*l - j, the exact first-moment identity (integration by
    /// parts of the acceleration profile weighted by elapsed time).
    pub h: f64,
}

/// Moments of this stage's acceleration profile over its own burn time
/// `tb`, measured locally (s=0 at stage ignition).
pub fn stage_moments(params: &StageParams) -> StageMoments {
    let tb = params.tb;
    if tb <= 0.0 {
        return StageMoments::default();
    }
    let ds = tb / MOMENT_GRID as f64;

    let mut j_grid = [0.0_f64; MOMENT_GRID + 1];
    for (k, slot) in j_grid.iter_mut().enumerate() {
        let s = k as f64 * ds;
        *slot = j_of(params, s);
    }

    let mut s_grid = [0.0_f64; MOMENT_GRID + 1];
    for k in 1..=MOMENT_GRID {
        s_grid[k] = s_grid[k - 1] + ds * (j_grid[k - 1] + j_grid[k]) / 2.0;
    }

    let mut q_grid = [0.0_f64; MOMENT_GRID + 1];
    for k in 1..=MOMENT_GRID {
        q_grid[k] = q_grid[k - 1] + ds * (s_grid[k - 1] + s_grid[k]) / 2.0;
    }

    let l = l_of(params, tb);
    let j = j_grid[MOMENT_GRID];
    let s = s_grid[MOMENT_GRID];
    let q = q_grid[MOMENT_GRID];
    let h = tb * l - j;

    StageMoments { l, j, s, q, h }
}

/// Back-solve the burn time needed to deliver impulse `l_target` under
/// this stage's mode.
pub fn tb_for_impulse(params: &StageParams, l_target: f64) -> f64 {
    match params.mode {
        StageMode::ConstantThrust => params.tau * (1.0 - (-l_target / params.ve).exp()),
        StageMode::ConstantAccel => l_target / params.accel_limit,
    }
}

/// Fold a stage's local moments into the running global accumulation,
/// where `r_start` is the remaining time from *this stage's ignition* to
/// the final cutoff, and `r_end` is the remaining time from *this
/// stage's burnout* to cutoff (`r_start - tb`). See moments.rs module doc
/// for the derivation of these shift formulas.
pub fn accumulate(global: &mut StageMoments, local: &StageMoments, tb: f64, r_start: f64, r_end: f64) {
    global.l += local.l;

    global.j += local.j + r_end * local.l;

    global.s += local.s + (r_start * r_start - tb * tb) / 2.0 * local.l - r_end * local.h;

    let m2 = local.s - tb * tb / 2.0 * local.l + tb * local.h;
    global.q += local.q + (r_start.powi(3) - tb.powi(3)) / 6.0 * local.l
        - (r_start * r_start - tb * tb) / 2.0 * local.h
        + r_end * m2;

    global.h += local.h + r_end * local.l;
}
