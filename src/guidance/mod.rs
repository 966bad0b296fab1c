pub mod modes;

pub use modes::{GravityTurnSub, GuidanceConfig, GuidanceProgram, Mode};
