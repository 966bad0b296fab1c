pub mod moments;
pub mod state;
pub mod upfg;

pub use state::{UpfgPhase, UpfgState};
pub use upfg::{cycle, setup};
