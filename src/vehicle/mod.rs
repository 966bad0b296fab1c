pub mod stage;
pub mod vehicle;

pub use stage::{Stage, StageBuilder, StageMode};
pub use vehicle::Vehicle;
