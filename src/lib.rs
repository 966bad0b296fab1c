pub mod config;
pub mod constants;
pub mod coordinates;
pub mod cse;
pub mod error;
pub mod guidance;
pub mod mission;
pub mod runtime;
pub mod simulator;
pub mod target;
pub mod telemetry;
pub mod upfg;
pub mod vector;
pub mod vehicle;

pub use error::{CoreError, CoreResult};
pub use mission::GuidanceCore;
