//! Fraction of absorbed photosynthetically active radiation (fAPAR)
//!
//! fAPAR is the fraction of the incoming solar radiation absorbed by the
//! green canopy, by default between 400 and 700 nm. With a Lambertian soil it
//! is the sum of the direct canopy absorption a1(λ) and of the part reflected
//! by the background and then absorbed by the canopy a2(λ):
//!
//! ```text
//! a(λ) = a1(λ) + a2(λ)
//! ```
//!
//! The absorbed spectrum is weighted by the direct and diffuse irradiance,
//! the diffuse fraction following François et al. (2002) for average
//! mid-latitude atmospheres.
//!
//! ## References
//!
//! - Fan, W., Liu, Y., Xu, X., Chen, G., Zhang, B. (2014). A new FAPAR analytical model
//!   based on the law of energy conservation: a case study in China. IEEE JSTARS 7, 3945-3955.
//! - François, C., Ottlé, C., Prévot, L. (2002). Analytical parameterization of canopy
//!   directional emissivity and directional radiance in the thermal infrared.
//!   Application on the retrieval of soil and foliage temperatures using two directional
//!   measurements. IJRS 18, 2587-2621.

use std::ops::Range;

use thiserror::Error;

use crate::prosail::{ModelOptions, ProsailOutput, ProsailParameters, run_prosail};
use crate::sail::{SailError, ViewGeometry};
use crate::spectral::SpectralLibrary;

/// Default fAPAR integration window, [start, end) in nm.
pub const PAR_WINDOW: (f64, f64) = (400.0, 700.0);

#[derive(Debug, Error)]
pub enum FaparError {
    #[error(transparent)]
    Model(#[from] SailError),

    #[error("No library wavelength in the fAPAR window {start}-{end} nm")]
    EmptyWindow { start: f64, end: f64 },
}

/// Diffuse fraction of the incident irradiance for a solar zenith angle in degrees.
pub fn skylight_fraction(tts: f64) -> f64 {
    let sin_elevation = (90.0 - tts).to_radians().sin();
    0.847 - 1.61 * sin_elevation + 1.04 * sin_elevation * sin_elevation
}

/// fAPAR of an already simulated canopy over the wavelength indices `window`.
pub fn fapar_from_output(
    output: &ProsailOutput,
    library: &SpectralLibrary,
    tts: f64,
    window: Range<usize>,
) -> f64 {
    let skyl = skylight_fraction(tts);
    let canopy = &output.canopy;
    let (tss, soil) = (canopy.tss, &output.soil);

    let mut absorbed = 0.0;
    let mut incident = 0.0;

    for i in window {
        let edir = (1.0 - skyl) * library.es[i];
        let edif = skyl * library.ed[i];

        let dn = (1.0 - soil[i] * canopy.rdd[i]).max(1e-36);

        // Absorption of the direct and diffuse fluxes
        let alfa_s = 1.0 - tss - canopy.tsd[i] - canopy.rsd[i];
        let alfa_d = 1.0 - canopy.tdd[i] - canopy.rdd[i];

        // Adding what the soil sends back up
        let alfa_sx = alfa_s + (soil[i] * (tss + canopy.tsd[i]) / dn) * alfa_d;
        let alfa_dx = alfa_d + ((canopy.tdd[i] * soil[i]) / dn) * alfa_d;

        absorbed += alfa_sx * edir + alfa_dx * edif;
        incident += edir + edif;
    }

    absorbed / incident
}

/// Runs PROSAIL and integrates the canopy absorption over `[window.0, window.1)` nm.
pub fn calculate_fapar(
    params: &ProsailParameters,
    geometry: &ViewGeometry,
    options: &ModelOptions,
    library: &SpectralLibrary,
    window: (f64, f64),
) -> Result<f64, FaparError> {
    let indices = library.window(window.0, window.1);
    if indices.is_empty() {
        return Err(FaparError::EmptyWindow {
            start: window.0,
            end: window.1,
        });
    }

    let output = run_prosail(params, geometry, options, library, None)?;
    Ok(fapar_from_output(&output, library, geometry.tts, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prosail::fixtures::{geometry, wheat};
    use crate::spectral::test_library;

    #[test]
    fn test_skylight_fraction() {
        assert!((skylight_fraction(0.0) - 0.277).abs() < 1e-12);
        // more diffuse light when the sun is low
        assert!(skylight_fraction(70.0) > skylight_fraction(20.0));
    }

    #[test]
    fn test_fapar_in_unit_interval() {
        let library = test_library::synthetic();
        let fapar = calculate_fapar(
            &wheat(),
            &geometry(),
            &ModelOptions::default(),
            &library,
            PAR_WINDOW,
        )
        .unwrap();
        assert!(fapar > 0.0 && fapar < 1.0, "{fapar}");
    }

    #[test]
    fn test_bare_soil_absorbs_nothing() {
        let library = test_library::synthetic();
        let mut params = wheat();
        params.lai = 0.0;
        let fapar = calculate_fapar(
            &params,
            &geometry(),
            &ModelOptions::default(),
            &library,
            PAR_WINDOW,
        )
        .unwrap();
        assert!(fapar.abs() < 1e-12, "{fapar}");
    }

    #[test]
    fn test_fapar_increases_with_lai() {
        let library = test_library::synthetic();
        let mut previous = 0.0;
        for lai in [0.5, 1.0, 2.0, 4.0, 7.0] {
            let mut params = wheat();
            params.lai = lai;
            let fapar = calculate_fapar(
                &params,
                &geometry(),
                &ModelOptions::default(),
                &library,
                PAR_WINDOW,
            )
            .unwrap();
            assert!(fapar > previous, "lai {lai}: {fapar} <= {previous}");
            previous = fapar;
        }
        assert!(previous > 0.8, "{previous}");
    }

    #[test]
    fn test_empty_window() {
        let library = test_library::synthetic();
        let err = calculate_fapar(
            &wheat(),
            &geometry(),
            &ModelOptions::default(),
            &library,
            (3000.0, 3100.0),
        );
        assert!(matches!(err, Err(FaparError::EmptyWindow { .. })));
    }
}
