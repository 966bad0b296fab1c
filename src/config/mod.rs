pub mod mission;

pub use mission::{GuidanceSpec, MissionConfig, OrbitSpec, SimulatorSpec, StageSpec};
