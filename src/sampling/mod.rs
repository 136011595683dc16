//! Random PROSAIL input points with LAI-conditioned co-distributions
//!
//! Every parameter is drawn from its own distribution law. The range of most
//! parameters is then narrowed as LAI grows: at LAI = 0 a variable spans
//! `[Vmin(0), Vmax(0)]`, and the bounds move linearly to
//! `[Vmin(LAImax), Vmax(LAImax)]` at `LAImax`. These co-distributions are
//! empirical and assume that dense canopies show less variability in the
//! other variables (Weiss & Baret, 2016, S2 ToolBox Level 2 products ATBD).

use std::fmt::Display;

use indexmap::IndexMap;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, LogNormal, Normal, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod table;

pub use table::{SampleTable, TableError};

use crate::utils::round_to;

/// Parameters whose range is linked to LAI, in processing order.
pub const LAI_LINKED: [&str; 13] = [
    "n", "cab", "car", "cbrown", "cw", "cm", "lidfa", "hspot", "ant", "prot", "cbc", "rsoil",
    "psoil",
];

const ROUND_3_DECIMALS: [&str; 7] = ["n", "cab", "car", "cbrown", "lai", "lidfa", "ant"];
const ROUND_5_DECIMALS: [&str; 7] = ["cw", "cm", "hspot", "prot", "cbc", "rsoil", "psoil"];

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Invalid distribution for parameter: {parameter} ('{name}')")]
    InvalidDistribution { parameter: String, name: String },

    #[error("No distribution law given for parameter: {0}")]
    MissingDistribution(String),

    #[error("Parameter '{0}' is required but has no range")]
    MissingParameter(String),

    #[error("Invalid range for parameter '{parameter}': {reason}")]
    InvalidRange { parameter: String, reason: String },

    #[error("LAImax must be positive, got {0}")]
    InvalidLaiMax(f64),

    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionLaw {
    LogNormal,
    Gaussian,
    Uniform,
}

impl DistributionLaw {
    pub fn parse(parameter: &str, name: &str) -> Result<Self, SamplingError> {
        match name {
            "log-normal" => Ok(DistributionLaw::LogNormal),
            "gaussian" => Ok(DistributionLaw::Gaussian),
            "uniform" => Ok(DistributionLaw::Uniform),
            _ => Err(SamplingError::InvalidDistribution {
                parameter: parameter.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

impl Display for DistributionLaw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionLaw::LogNormal => write!(f, "log-normal"),
            DistributionLaw::Gaussian => write!(f, "gaussian"),
            DistributionLaw::Uniform => write!(f, "uniform"),
        }
    }
}

/// Range, mode and LAI co-distribution bounds of one parameter.
/// Missing co-distribution bounds default to `min`/`max`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub mode: f64,
    pub std: f64,
    #[serde(rename = "Vmin(0)", default, skip_serializing_if = "Option::is_none")]
    pub vmin_0: Option<f64>,
    #[serde(rename = "Vmax(0)", default, skip_serializing_if = "Option::is_none")]
    pub vmax_0: Option<f64>,
    #[serde(rename = "Vmin(LAImax)", default, skip_serializing_if = "Option::is_none")]
    pub vmin_lai_max: Option<f64>,
    #[serde(rename = "Vmax(LAImax)", default, skip_serializing_if = "Option::is_none")]
    pub vmax_lai_max: Option<f64>,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64, mode: f64, std: f64) -> Self {
        Self {
            min,
            max,
            mode,
            std,
            vmin_0: None,
            vmax_0: None,
            vmin_lai_max: None,
            vmax_lai_max: None,
        }
    }

    pub fn with_lai_bounds(
        mut self,
        vmin_0: f64,
        vmax_0: f64,
        vmin_lai_max: f64,
        vmax_lai_max: f64,
    ) -> Self {
        self.vmin_0 = Some(vmin_0);
        self.vmax_0 = Some(vmax_0);
        self.vmin_lai_max = Some(vmin_lai_max);
        self.vmax_lai_max = Some(vmax_lai_max);
        self
    }

    pub fn lai_bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.vmin_0.unwrap_or(self.min),
            self.vmax_0.unwrap_or(self.max),
            self.vmin_lai_max.unwrap_or(self.min),
            self.vmax_lai_max.unwrap_or(self.max),
        )
    }

    pub fn validate(&self, parameter: &str) -> Result<(), SamplingError> {
        let invalid = |reason: &str| SamplingError::InvalidRange {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        };

        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(invalid("min and max must be finite"));
        }
        if self.min > self.max {
            return Err(invalid("min is greater than max"));
        }
        if !(self.std >= 0.0) {
            return Err(invalid("std must be non-negative"));
        }
        Ok(())
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Moves `value` from the `[vmin_0, vmax_0]` range to the range allowed at `lai`.
pub fn link_distribution_to_lai(
    value: f64,
    vmin_0: f64,
    vmax_0: f64,
    vmin_lai_max: f64,
    vmax_lai_max: f64,
    lai: f64,
    lai_max: f64,
) -> f64 {
    let vmin_lai = vmin_0 + lai * (vmin_lai_max - vmin_0) / lai_max;
    let vmax_lai = vmax_0 + lai * (vmax_lai_max - vmax_0) / lai_max;

    // A fixed parameter has no relative position to carry over
    if vmax_0 == vmin_0 {
        return vmin_lai;
    }

    vmin_lai + (vmax_lai - vmin_lai) * (value - vmin_0) / (vmax_0 - vmin_0)
}

fn draw<R: Rng>(
    parameter: &str,
    range: &ParameterRange,
    law: DistributionLaw,
    num_samples: usize,
    rng: &mut R,
) -> Result<Vec<f64>, SamplingError> {
    let invalid = |reason: String| SamplingError::InvalidRange {
        parameter: parameter.to_string(),
        reason,
    };

    let samples = match law {
        DistributionLaw::LogNormal => {
            if range.mode <= 0.0 {
                return Err(invalid("log-normal needs a positive mode".to_string()));
            }
            let dist = LogNormal::new(range.mode.ln(), 1.0).map_err(|e| invalid(e.to_string()))?;
            dist.sample_iter(rng).take(num_samples).collect()
        }
        DistributionLaw::Gaussian => {
            let dist = Normal::new(range.mode, range.std).map_err(|e| invalid(e.to_string()))?;
            dist.sample_iter(rng)
                .take(num_samples)
                .map(|v| range.clip(v))
                .collect()
        }
        DistributionLaw::Uniform => {
            if range.min == range.max {
                vec![range.min; num_samples]
            } else {
                Uniform::new(range.min, range.max)
                    .sample_iter(rng)
                    .take(num_samples)
                    .collect()
            }
        }
    };

    Ok(samples)
}

/// Draws `num_samples` input points.
///
/// Parameters are sampled in the order of `ranges`, then the LAI-linked ones
/// are moved to their LAI-dependent range and clipped to `[min, max]`.
/// Finally pigment/structure values are rounded to 3 decimals and water, dry
/// matter, hotspot and soil values to 5.
pub fn generate_input_samples<R: Rng>(
    ranges: &IndexMap<String, ParameterRange>,
    laws: &IndexMap<String, String>,
    num_samples: usize,
    lai_max: f64,
    rng: &mut R,
) -> Result<SampleTable, SamplingError> {
    if !(lai_max > 0.0) {
        return Err(SamplingError::InvalidLaiMax(lai_max));
    }

    let mut inputs: IndexMap<String, Vec<f64>> = IndexMap::with_capacity(ranges.len());
    for (parameter, range) in ranges {
        range.validate(parameter)?;
        let name = laws
            .get(parameter)
            .ok_or_else(|| SamplingError::MissingDistribution(parameter.clone()))?;
        let law = DistributionLaw::parse(parameter, name)?;

        log::debug!("Sampling {} {} values for {}", num_samples, law, parameter);
        inputs.insert(parameter.clone(), draw(parameter, range, law, num_samples, rng)?);
    }

    let lai = inputs
        .get("lai")
        .cloned()
        .ok_or_else(|| SamplingError::MissingParameter("lai".to_string()))?;

    for parameter in LAI_LINKED {
        let range = ranges
            .get(parameter)
            .ok_or_else(|| SamplingError::MissingParameter(parameter.to_string()))?;
        let (vmin_0, vmax_0, vmin_lai_max, vmax_lai_max) = range.lai_bounds();
        if vmin_0 == vmax_0 {
            log::warn!(
                "{}: Vmin(0) equals Vmax(0), values follow the lower LAI bound",
                parameter
            );
        }

        if let Some(values) = inputs.get_mut(parameter) {
            for (value, lai) in values.iter_mut().zip(&lai) {
                let linked = link_distribution_to_lai(
                    *value,
                    vmin_0,
                    vmax_0,
                    vmin_lai_max,
                    vmax_lai_max,
                    *lai,
                    lai_max,
                );
                *value = range.clip(linked);
            }
        }
    }

    for (decimals, parameters) in [(3, ROUND_3_DECIMALS), (5, ROUND_5_DECIMALS)] {
        for parameter in parameters {
            if let Some(values) = inputs.get_mut(parameter) {
                values.iter_mut().for_each(|v| *v = round_to(*v, decimals));
            }
        }
    }

    let mut table = SampleTable::new();
    for (parameter, values) in inputs {
        table.insert_column(&parameter, values)?;
    }

    log::info!(
        "Generated {} input points for {} parameters",
        table.len(),
        table.width()
    );

    Ok(table)
}

/// Seeded generator when `seed` is set, entropy-seeded otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
