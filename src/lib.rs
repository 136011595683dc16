pub mod config;
pub mod fapar;
pub mod prosail;
pub mod prospect;
pub mod sail;
pub mod sampling;
pub mod simulation;
pub mod solar;
pub mod spectral;
pub mod utils;
