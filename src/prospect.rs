//! PROSPECT leaf optical properties model
//!
//! Computes the directional-hemispherical reflectance and transmittance of a
//! leaf represented as a pile of `N` elementary absorbing layers
//! (Jacquemoud & Baret, 1990). Three versions are supported:
//!
//! - **PROSPECT-5**: chlorophyll, carotenoids, brown pigments, water, dry matter
//! - **PROSPECT-D**: adds anthocyanins (Féret et al., 2017)
//! - **PROSPECT-PRO**: splits dry matter into proteins and carbon-based
//!   constituents (Féret et al., 2021)
//!
//! ## References
//!
//! - Allen, W. A. et al. (1969). Interaction of isotropic light with a compact plant leaf.
//!   JOSA 59(10), 1376-1379.
//! - Stern, F. (1964). Transmission of isotropic radiation across an interface between
//!   two dielectrics. Applied Optics 3(1), 111-113.
//! - Féret, J.-B. et al. (2021). PROSPECT-PRO for estimating content of nitrogen-containing
//!   leaf proteins and other carbon-based constituents. RSE 252, 112173.

use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;

use crate::spectral::SpectralLibrary;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ProspectVersion {
    Five,
    D,
    #[default]
    Pro,
}

impl FromStr for ProspectVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "5" => Ok(ProspectVersion::Five),
            "D" => Ok(ProspectVersion::D),
            "PRO" => Ok(ProspectVersion::Pro),
            other => Err(format!(
                "Unknown PROSPECT version '{}', expected one of 5, D, PRO",
                other
            )),
        }
    }
}

impl TryFrom<String> for ProspectVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for ProspectVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProspectVersion::Five => write!(f, "PROSPECT-5"),
            ProspectVersion::D => write!(f, "PROSPECT-D"),
            ProspectVersion::Pro => write!(f, "PROSPECT-PRO"),
        }
    }
}

/// Leaf biochemistry and structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafParameters {
    pub n: f64,      // Leaf structure parameter [-]
    pub cab: f64,    // Chlorophyll a+b [ug cm-2]
    pub car: f64,    // Carotenoids [ug cm-2]
    pub ant: f64,    // Anthocyanins [ug cm-2]
    pub cbrown: f64, // Brown pigments [-]
    pub cw: f64,     // Equivalent water thickness [cm]
    pub cm: f64,     // Dry matter [g cm-2]
    pub prot: f64,   // Proteins [g cm-2]
    pub cbc: f64,    // Carbon-based constituents [g cm-2]
}

#[derive(Debug, Clone)]
pub struct LeafOptics {
    pub reflectance: Vec<f64>,
    pub transmittance: Vec<f64>,
}

/// Exponential integral E1(x) for x > 0.
///
/// Power series below 1, modified Lentz continued fraction above
/// (Numerical Recipes, `expint` with n = 1).
pub fn exp1(x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 1e-15;
    const FPMIN: f64 = 1e-300;

    if x <= 0.0 {
        return f64::INFINITY;
    }

    if x <= 1.0 {
        let mut sum = -x.ln() - EULER_GAMMA;
        let mut fact = 1.0;
        for i in 1..MAX_ITER {
            let i = i as f64;
            fact *= -x / i;
            let del = -fact / i;
            sum += del;
            if del.abs() < sum.abs() * EPS {
                break;
            }
        }
        sum
    } else {
        let mut b = x + 1.0;
        let mut c = 1.0 / FPMIN;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..MAX_ITER {
            let an = -((i * i) as f64);
            b += 2.0;
            d = 1.0 / (an * d + b);
            c = b + an / c;
            let del = c * d;
            h *= del;
            if (del - 1.0).abs() < EPS {
                break;
            }
        }
        h * (-x).exp()
    }
}

/// Average transmissivity of a dielectric plane surface for isotropic light
/// within a solid angle of half-aperture `alpha` (degrees).
pub fn tav(alpha: f64, nr: f64) -> f64 {
    let n2 = nr * nr;
    let np = n2 + 1.0;
    let nm = n2 - 1.0;
    let a = (nr + 1.0) * (nr + 1.0) / 2.0;
    let k = -(n2 - 1.0) * (n2 - 1.0) / 4.0;
    let sa = alpha.to_radians().sin();

    let b1 = if alpha != 90.0 {
        ((sa * sa - np / 2.0).powi(2) + k).sqrt()
    } else {
        0.0
    };
    let b2 = sa * sa - np / 2.0;
    let b = b1 - b2;
    let b3 = b.powi(3);
    let a3 = a.powi(3);

    let ts = (k * k / (6.0 * b3) + k / b - b / 2.0) - (k * k / (6.0 * a3) + k / a - a / 2.0);

    let tp1 = -2.0 * n2 * (b - a) / (np * np);
    let tp2 = -2.0 * n2 * np * (b / a).ln() / (nm * nm);
    let tp3 = n2 * (1.0 / b - 1.0 / a) / 2.0;
    let tp4 = 16.0 * n2 * n2 * (n2 * n2 + 1.0) * ((2.0 * np * b - nm * nm) / (2.0 * np * a - nm * nm)).ln()
        / (np.powi(3) * nm * nm);
    let tp5 = 16.0 * n2.powi(3) * (1.0 / (2.0 * np * b - nm * nm) - 1.0 / (2.0 * np * a - nm * nm))
        / np.powi(3);
    let tp = tp1 + tp2 + tp3 + tp4 + tp5;

    (ts + tp) / (2.0 * sa * sa)
}

/// Transmissivity of the elementary layer for a total absorption `k`.
fn layer_transmissivity(k: f64) -> f64 {
    if k <= 0.0 {
        1.0
    } else {
        (1.0 - k) * (-k).exp() + k * k * exp1(k)
    }
}

/// Reflectance and transmittance of one leaf at one wavelength.
fn leaf_layers(n: f64, nr: f64, tau: f64, alpha: f64) -> (f64, f64) {
    // Top layer, light entering within the solid angle alpha
    let talf = tav(alpha, nr);
    let ralf = 1.0 - talf;
    let t12 = tav(90.0, nr);
    let r12 = 1.0 - t12;
    let t21 = t12 / (nr * nr);
    let r21 = 1.0 - t21;

    let denom = 1.0 - r21 * r21 * tau * tau;
    let ta = talf * tau * t21 / denom;
    let ra = ralf + r21 * tau * ta;

    // Elementary layer seen from below
    let t = t12 * tau * t21 / denom;
    let r = r12 + r21 * tau * t;

    // Stokes equations for the remaining N-1 layers; first branch is zero absorption
    let (rsub, tsub) = if r + t >= 1.0 - 1e-12 {
        let tsub = t / (t + (1.0 - t) * (n - 1.0));
        (1.0 - tsub, tsub)
    } else {
        let d = ((1.0 + r + t) * (1.0 + r - t) * (1.0 - r + t) * (1.0 - r - t)).sqrt();
        let rq = r * r;
        let tq = t * t;
        let a = (1.0 + rq - tq + d) / (2.0 * r);
        let b = (1.0 - rq + tq + d) / (2.0 * t);

        let bnm1 = b.powf(n - 1.0);
        let bn2 = bnm1 * bnm1;
        let a2 = a * a;
        let denom = a2 * bn2 - 1.0;
        (a * (bn2 - 1.0) / denom, bnm1 * (a2 - 1.0) / denom)
    };

    let denom = 1.0 - rsub * r;
    let transmittance = ta * tsub / denom;
    let reflectance = ra + ta * rsub * t / denom;

    (reflectance, transmittance)
}

/// Runs PROSPECT over every wavelength of the library.
///
/// `alpha` is the maximum incidence angle (degrees) of the light on the leaf
/// surface, 40 degrees in the standard model.
pub fn run_prospect(
    leaf: &LeafParameters,
    version: ProspectVersion,
    alpha: f64,
    library: &SpectralLibrary,
) -> LeafOptics {
    let (ant, cm, prot, cbc) = match version {
        ProspectVersion::Five => (0.0, leaf.cm, 0.0, 0.0),
        ProspectVersion::D => (leaf.ant, leaf.cm, 0.0, 0.0),
        ProspectVersion::Pro => (leaf.ant, 0.0, leaf.prot, leaf.cbc),
    };

    let nwl = library.len();
    let mut reflectance = Vec::with_capacity(nwl);
    let mut transmittance = Vec::with_capacity(nwl);

    for i in 0..nwl {
        let k = (leaf.cab * library.kab[i]
            + leaf.car * library.kcar[i]
            + ant * library.kant[i]
            + leaf.cbrown * library.kbrown[i]
            + leaf.cw * library.kw[i]
            + cm * library.km[i]
            + prot * library.kprot[i]
            + cbc * library.kcbc[i])
            / leaf.n;

        let tau = layer_transmissivity(k);
        let (r, t) = leaf_layers(leaf.n, library.nr[i], tau, alpha);
        reflectance.push(r);
        transmittance.push(t);
    }

    LeafOptics {
        reflectance,
        transmittance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::test_library;

    fn green_leaf() -> LeafParameters {
        LeafParameters {
            n: 1.5,
            cab: 40.0,
            car: 8.0,
            ant: 0.5,
            cbrown: 0.0,
            cw: 0.01,
            cm: 0.009,
            prot: 0.001,
            cbc: 0.009,
        }
    }

    #[test]
    fn test_exp1_reference_values() {
        // Abramowitz & Stegun, table 5.1
        assert!((exp1(0.1) - 1.822_923_958).abs() < 1e-8);
        assert!((exp1(1.0) - 0.219_383_934).abs() < 1e-8);
        assert!((exp1(2.0) - 0.048_900_511).abs() < 1e-8);
        assert!((exp1(5.0) - 0.001_148_296).abs() < 1e-8);
        assert!(exp1(0.0).is_infinite());
    }

    #[test]
    fn test_tav_bounds() {
        let t90 = tav(90.0, 1.5);
        let t40 = tav(40.0, 1.5);
        assert!(t90 > 0.8 && t90 < 1.0, "{t90}");
        // Fresnel losses grow with incidence angle, so a narrower cone transmits more
        assert!(t40 > t90, "{t40} vs {t90}");
    }

    #[test]
    fn test_transparent_layer() {
        assert_eq!(layer_transmissivity(0.0), 1.0);
        assert_eq!(layer_transmissivity(-1.0), 1.0);
        let tau = layer_transmissivity(0.5);
        assert!(tau > 0.0 && tau < 1.0);
    }

    #[test]
    fn test_leaf_energy_balance() {
        let library = test_library::synthetic();
        for version in [ProspectVersion::Five, ProspectVersion::D, ProspectVersion::Pro] {
            let optics = run_prospect(&green_leaf(), version, 40.0, &library);
            for (r, t) in optics.reflectance.iter().zip(&optics.transmittance) {
                assert!(*r > 0.0 && *t >= 0.0, "{version}: r={r} t={t}");
                assert!(r + t <= 1.0 + 1e-9, "{version}: r+t={}", r + t);
            }
        }
    }

    #[test]
    fn test_non_absorbing_leaf_conserves_energy() {
        let library = test_library::synthetic();
        let leaf = LeafParameters {
            n: 1.8,
            cab: 0.0,
            car: 0.0,
            ant: 0.0,
            cbrown: 0.0,
            cw: 0.0,
            cm: 0.0,
            prot: 0.0,
            cbc: 0.0,
        };
        let optics = run_prospect(&leaf, ProspectVersion::Pro, 40.0, &library);
        for (r, t) in optics.reflectance.iter().zip(&optics.transmittance) {
            assert!((r + t - 1.0).abs() < 1e-6, "r+t={}", r + t);
        }
    }

    #[test]
    fn test_chlorophyll_darkens_visible() {
        let library = test_library::synthetic();
        let mut pale = green_leaf();
        pale.cab = 10.0;
        let mut dark = green_leaf();
        dark.cab = 80.0;

        let pale = run_prospect(&pale, ProspectVersion::Pro, 40.0, &library);
        let dark = run_prospect(&dark, ProspectVersion::Pro, 40.0, &library);

        // 550 nm is index 6 in the synthetic grid
        assert!(dark.reflectance[6] < pale.reflectance[6]);
        assert!(dark.transmittance[6] < pale.transmittance[6]);
    }

    #[test]
    fn test_pro_ignores_dry_matter() {
        let library = test_library::synthetic();
        let mut heavy = green_leaf();
        heavy.cm = 0.05;

        let a = run_prospect(&green_leaf(), ProspectVersion::Pro, 40.0, &library);
        let b = run_prospect(&heavy, ProspectVersion::Pro, 40.0, &library);
        assert_eq!(a.reflectance, b.reflectance);

        let a = run_prospect(&green_leaf(), ProspectVersion::D, 40.0, &library);
        let b = run_prospect(&heavy, ProspectVersion::D, 40.0, &library);
        assert_ne!(a.reflectance, b.reflectance);
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!("pro".parse::<ProspectVersion>().unwrap(), ProspectVersion::Pro);
        assert_eq!("5".parse::<ProspectVersion>().unwrap(), ProspectVersion::Five);
        assert_eq!("D".parse::<ProspectVersion>().unwrap(), ProspectVersion::D);
        assert!("6".parse::<ProspectVersion>().is_err());
    }
}
