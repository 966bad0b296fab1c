//! `UpfgState`: the predictor-corrector's carried variables (component
//! C5), per spec section 3. A value type threaded through cycles by
//! reference-in, value-out — never mutated via aliasing (design notes
//! section 9).

use crate::cse::CseWarmStart;
use nalgebra::Vector3;

/// Internal convergence state machine. Staging events reset `tb` to zero
/// but never reset convergence — a stage separation mid-burn does not
/// throw guidance back into `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpfgPhase {
    Uninitialized,
    Initialized,
    Converging,
    Converged,
}

#[derive(Debug, Clone)]
pub struct UpfgState {
    pub phase: UpfgPhase,
    pub cse: CseWarmStart,
    /// Position bias correcting for non-linear thrust curvature.
    pub rbias: Vector3<f64>,
    /// Desired cut-off position.
    pub rd: Vector3<f64>,
    /// Gravity displacement accumulated over the remaining burn.
    pub rgrav: Vector3<f64>,
    /// Position still to be gained to reach cut-off.
    pub rgo: Vector3<f64>,
    /// Time elapsed in the current stage since the last staging event.
    pub tb: f64,
    /// Simulation time of the last guidance cycle.
    pub t_last: f64,
    /// Time-to-go to cut-off.
    pub tgo: f64,
    /// Velocity at the last guidance cycle.
    pub v_last: Vector3<f64>,
    /// Velocity still to be gained.
    pub vgo: Vector3<f64>,
    /// Count of consecutive divergence failures since the last good cycle.
    pub consecutive_failures: u32,
}

impl UpfgState {
    pub fn uninitialized() -> Self {
        UpfgState {
            phase: UpfgPhase::Uninitialized,
            cse: CseWarmStart::default(),
            rbias: Vector3::zeros(),
            rd: Vector3::zeros(),
            rgrav: Vector3::zeros(),
            rgo: Vector3::zeros(),
            tb: 0.0,
            t_last: 0.0,
            tgo: 0.0,
            v_last: Vector3::zeros(),
            vgo: Vector3::zeros(),
            consecutive_failures: 0,
        }
    }

    /// Called by the consumer when the simulator advances a stage. UPFG's
    /// only reaction to the staging flag is zeroing `tb` (idempotent:
    /// duplicate delivery within the same cycle is harmless).
    pub fn notify_staging(&mut self) {
        self.tb = 0.0;
    }
}
