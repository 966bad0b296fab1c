use std::fmt;

/// Everything that can go wrong inside the core. Failures are values, not
/// panics: guidance and simulator APIs return `Result` and the caller (the
/// mode FSM, or a consumer at bootstrap) decides what to do.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Detected at mission construction: missing/nonsensical stage fields,
    /// pe > ap, an unreachable inclination, etc.
    Config(String),
    /// UPFG's tgo flipped sign or exploded, or CSE failed to converge
    /// within its iteration cap.
    GuidanceDivergence {
        cycle: u32,
        tgo_old: f64,
        tgo_new: f64,
    },
    /// Mass dropped below the dry mass of the last remaining stage.
    PropellantExhausted { stage_id: u32 },
    /// A zero-length vector reached `normalize()`, or a geometric solve
    /// produced NaN (e.g. LAN unreachable from the launch latitude).
    Singularity(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Config(msg) => write!(f, "configuration error: {msg}"),
            CoreError::GuidanceDivergence {
                cycle,
                tgo_old,
                tgo_new,
            } => write!(
                f,
                "guidance divergence at cycle {cycle}: tgo {tgo_old:.3} -> {tgo_new:.3}"
            ),
            CoreError::PropellantExhausted { stage_id } => {
                write!(f, "propellant exhausted below last stage (id={stage_id})")
            }
            CoreError::Singularity(msg) => write!(f, "numerical singularity: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;
