pub mod coordinate_transformation;
pub mod kepler;

pub use coordinate_transformation::{ecef_to_eci, ecef_to_geodetic, eci_to_ecef, KinematicState};
pub use kepler::{cart_to_kepler, KeplerElements};
