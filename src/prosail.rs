//! Coupled PROSPECT + 4SAIL canopy model

use std::fmt::Display;

use serde::Deserialize;

use crate::prospect::{LeafOptics, LeafParameters, ProspectVersion, run_prospect};
use crate::sail::{LeafAngleDistribution, SailError, SailOutput, ViewGeometry, foursail};
use crate::spectral::SpectralLibrary;

/// One PROSAIL input point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProsailParameters {
    pub leaf: LeafParameters,
    pub lai: f64,   // Leaf area index [m2 m-2]
    pub lidfa: f64, // Average leaf angle (Campbell) or `a` (Verhoef bimodal)
    pub hspot: f64, // Hotspot parameter [-]
    pub rsoil: f64, // Soil brightness scale
    pub psoil: f64, // Soil dryness, 1 dry and 0 wet
}

/// Model settings shared by every simulated point.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    #[serde(rename = "leaf_model")]
    pub version: ProspectVersion,
    pub alpha: f64,
    pub typelidf: u8,
    pub lidfb: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            version: ProspectVersion::Pro,
            alpha: 40.0,
            typelidf: 2,
            lidfb: 0.0,
        }
    }
}

/// Which canopy reflectance quantity to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ReflectanceFactor {
    /// Bidirectional reflectance (rsot)
    #[default]
    #[serde(rename(deserialize = "SDR"))]
    Sdr,
    /// Bi-hemispherical reflectance (rddt)
    #[serde(rename(deserialize = "BHR"))]
    Bhr,
    /// Directional-hemispherical reflectance (rsdt)
    #[serde(rename(deserialize = "DHR"))]
    Dhr,
    /// Hemispherical-directional reflectance (rdot)
    #[serde(rename(deserialize = "HDR"))]
    Hdr,
}

impl Display for ReflectanceFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReflectanceFactor::Sdr => write!(f, "SDR"),
            ReflectanceFactor::Bhr => write!(f, "BHR"),
            ReflectanceFactor::Dhr => write!(f, "DHR"),
            ReflectanceFactor::Hdr => write!(f, "HDR"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProsailOutput {
    pub leaf: LeafOptics,
    pub soil: Vec<f64>,
    pub canopy: SailOutput,
}

impl ProsailOutput {
    pub fn reflectance(&self, factor: ReflectanceFactor) -> &[f64] {
        match factor {
            ReflectanceFactor::Sdr => &self.canopy.rsot,
            ReflectanceFactor::Bhr => &self.canopy.rddt,
            ReflectanceFactor::Dhr => &self.canopy.rsdt,
            ReflectanceFactor::Hdr => &self.canopy.rdot,
        }
    }
}

/// Runs PROSPECT for the leaf optics, then 4SAIL for the canopy.
///
/// The soil is the library's dry/wet mixture scaled by `rsoil`, unless an
/// explicit `soil_spectrum` is given.
pub fn run_prosail(
    params: &ProsailParameters,
    geometry: &ViewGeometry,
    options: &ModelOptions,
    library: &SpectralLibrary,
    soil_spectrum: Option<&[f64]>,
) -> Result<ProsailOutput, SailError> {
    let lidf = LeafAngleDistribution::from_type(options.typelidf, params.lidfa, options.lidfb)?;
    let leaf = run_prospect(&params.leaf, options.version, options.alpha, library);

    let soil = match soil_spectrum {
        Some(spectrum) => spectrum.to_vec(),
        None => library.soil_reflectance(params.rsoil, params.psoil),
    };

    let canopy = foursail(
        &leaf.reflectance,
        &leaf.transmittance,
        &lidf,
        params.lai,
        params.hspot,
        geometry,
        &soil,
    )?;

    Ok(ProsailOutput { leaf, soil, canopy })
}
