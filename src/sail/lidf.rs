//! Leaf inclination distribution functions
//!
//! Both distributions return the fraction of leaf area in 18 inclination
//! classes of 5 degrees, from 0-5 up to 85-90 degrees.

use std::f64::consts::PI;

use super::SailError;

pub const N_ANGLES: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeafAngleDistribution {
    /// Verhoef (1998) two-parameter distribution, `|a| + |b| <= 1`.
    /// `a` controls the average leaf slope, `b` the bimodality.
    VerhoefBimodal { a: f64, b: f64 },
    /// Campbell (1990) ellipsoidal distribution from the average leaf angle (degrees).
    Campbell { mean_angle: f64 },
}

impl LeafAngleDistribution {
    /// Builds the distribution from the PROSAIL `typelidf` convention:
    /// 1 for Verhoef bimodal, 2 for Campbell.
    pub fn from_type(typelidf: u8, lidfa: f64, lidfb: f64) -> Result<Self, SailError> {
        match typelidf {
            1 => {
                if lidfa.abs() + lidfb.abs() > 1.0 {
                    return Err(SailError::InvalidBimodal { a: lidfa, b: lidfb });
                }
                Ok(LeafAngleDistribution::VerhoefBimodal { a: lidfa, b: lidfb })
            }
            2 => Ok(LeafAngleDistribution::Campbell { mean_angle: lidfa }),
            other => Err(SailError::InvalidLidfType(other)),
        }
    }

    pub fn frequencies(&self) -> [f64; N_ANGLES] {
        match *self {
            LeafAngleDistribution::VerhoefBimodal { a, b } => verhoef_bimodal(a, b),
            LeafAngleDistribution::Campbell { mean_angle } => campbell(mean_angle),
        }
    }
}

/// Centre of each inclination class (degrees).
pub fn class_centres() -> [f64; N_ANGLES] {
    let step = 90.0 / N_ANGLES as f64;
    std::array::from_fn(|i| i as f64 * step + 0.5 * step)
}

/// Cumulative distribution of the bimodal LIDF at angle `theta` (degrees).
fn verhoef_cumulative(a: f64, b: f64, theta: f64) -> f64 {
    let tl = theta.to_radians();
    if a > 1.0 {
        return 1.0 - tl.cos();
    }

    let eps = 1e-8;
    let p = 2.0 * tl;
    let mut x = p;
    let mut y = 0.0;
    let mut delx = 1.0;
    while delx >= eps {
        y = a * x.sin() + 0.5 * b * (2.0 * x).sin();
        let dx = 0.5 * (y - x + p);
        x += dx;
        delx = dx.abs();
    }

    (2.0 * y + p) / PI
}

fn verhoef_bimodal(a: f64, b: f64) -> [f64; N_ANGLES] {
    let step = 90.0 / N_ANGLES as f64;
    let mut lidf = [0.0; N_ANGLES];

    // Classes are filled from the vertical down, as differences of the cumulative
    let mut upper = 1.0;
    for i in (0..N_ANGLES).rev() {
        let lower = verhoef_cumulative(a, b, i as f64 * step);
        lidf[i] = upper - lower;
        upper = lower;
    }

    lidf
}

fn campbell(mean_angle: f64) -> [f64; N_ANGLES] {
    let alpha = mean_angle;
    let excent = (-1.6184e-5 * alpha.powi(3) + 2.1145e-3 * alpha.powi(2) - 1.2390e-1 * alpha
        + 3.2491)
        .exp();

    let step = 90.0 / N_ANGLES as f64;
    let mut freq = [0.0; N_ANGLES];

    for (i, f) in freq.iter_mut().enumerate() {
        let tl1 = (i as f64 * step).to_radians();
        let tl2 = ((i as f64 + 1.0) * step).to_radians();
        let x1 = excent / (1.0 + excent * excent * tl1.tan().powi(2)).sqrt();
        let x2 = excent / (1.0 + excent * excent * tl2.tan().powi(2)).sqrt();

        *f = if excent == 1.0 {
            (tl1.cos() - tl2.cos()).abs()
        } else {
            let alph = excent / (1.0 - excent * excent).abs().sqrt();
            let alph2 = alph * alph;
            let x12 = x1 * x1;
            let x22 = x2 * x2;
            if excent > 1.0 {
                let alpx1 = (alph2 + x12).sqrt();
                let alpx2 = (alph2 + x22).sqrt();
                let dum = x1 * alpx1 + alph2 * (x1 + alpx1).ln();
                (dum - (x2 * alpx2 + alph2 * (x2 + alpx2).ln())).abs()
            } else {
                let almx1 = (alph2 - x12).sqrt();
                let almx2 = (alph2 - x22).sqrt();
                let dum = x1 * almx1 + alph2 * (x1 / alph).asin();
                (dum - (x2 * almx2 + alph2 * (x2 / alph).asin())).abs()
            }
        };
    }

    let total: f64 = freq.iter().sum();
    freq.iter_mut().for_each(|f| *f /= total);
    freq
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_angle(lidf: &[f64; N_ANGLES]) -> f64 {
        class_centres()
            .iter()
            .zip(lidf)
            .map(|(angle, f)| angle * f)
            .sum()
    }

    #[test]
    fn test_campbell_sums_to_one() {
        for angle in [20.0, 45.0, 57.3, 70.0] {
            let lidf = campbell(angle);
            let total: f64 = lidf.iter().sum();
            assert!((total - 1.0).abs() < 1e-12, "{angle}: {total}");
            assert!(lidf.iter().all(|f| *f >= 0.0));
        }
    }

    #[test]
    fn test_campbell_tracks_mean_angle() {
        let planophile = mean_angle(&campbell(25.0));
        let erectophile = mean_angle(&campbell(70.0));
        assert!(planophile < erectophile);
        assert!(erectophile > 55.0, "{erectophile}");
    }

    #[test]
    fn test_verhoef_spherical() {
        // a = -0.35, b = -0.15 is the usual spherical approximation
        let lidf = verhoef_bimodal(-0.35, -0.15);
        let total: f64 = lidf.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(lidf.iter().all(|f| *f >= 0.0));
        // spherical canopies have more leaf area near the vertical than the horizontal
        assert!(lidf[N_ANGLES - 1] > lidf[0]);
    }

    #[test]
    fn test_verhoef_uniform() {
        let lidf = verhoef_bimodal(0.0, 0.0);
        for f in lidf {
            assert!((f - 1.0 / N_ANGLES as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn test_from_type() {
        assert!(matches!(
            LeafAngleDistribution::from_type(2, 57.0, 0.0),
            Ok(LeafAngleDistribution::Campbell { .. })
        ));
        assert!(matches!(
            LeafAngleDistribution::from_type(1, 0.8, 0.5),
            Err(SailError::InvalidBimodal { .. })
        ));
        assert!(matches!(
            LeafAngleDistribution::from_type(3, 57.0, 0.0),
            Err(SailError::InvalidLidfType(3))
        ));
    }
}
