//! SAIL canopy bidirectional reflectance model
//!
//! This module contains the leaf inclination distributions and the 4SAIL
//! implementation (Verhoef et al., 2007) of the turbid-medium canopy model.

use thiserror::Error;

pub mod foursail;
pub mod lidf;

pub use foursail::{SailOutput, ViewGeometry, foursail};
pub use lidf::LeafAngleDistribution;

#[derive(Debug, Error)]
pub enum SailError {
    #[error("typelidf should be 1 (Verhoef bimodal) or 2 (Campbell), got {0}")]
    InvalidLidfType(u8),

    #[error("Verhoef bimodal parameters must satisfy |a| + |b| <= 1 (a = {a}, b = {b})")]
    InvalidBimodal { a: f64, b: f64 },

    #[error("Spectral inputs differ in length: {0}")]
    LengthMismatch(String),
}
