use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Locates a data file: the path itself if it exists, otherwise a file with the
/// same name anywhere below `data_directory`.
pub fn resolve_data_file(path: &str, data_directory: Option<&str>) -> Option<PathBuf> {
    let direct = Path::new(path);
    if direct.is_file() {
        return Some(direct.to_path_buf());
    }

    let base_dir = data_directory?;
    let joined = Path::new(base_dir).join(path);
    if joined.is_file() {
        return Some(joined);
    }

    let file_name = direct.file_name()?;
    for entry in WalkDir::new(base_dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && entry.file_name() == file_name {
            return Some(entry.into_path());
        }
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Min, max and mean over the finite values; `None` when there are none.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    let valid: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        return None;
    }

    Some(Summary {
        count: valid.len(),
        min: valid.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
        max: valid.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        mean: valid.iter().sum::<f64>() / valid.len() as f64,
    })
}

pub fn print_summary(label: &str, values: &[f64]) {
    match summarize(values) {
        Some(summary) => {
            println!("{} - {} values", label, summary.count);
            println!("  Min: {:.4}", summary.min);
            println!("  Max: {:.4}", summary.max);
            println!("  Mean: {:.4}", summary.mean);
            println!(
                "  First 10 values: {:?}",
                values.iter().take(10).collect::<Vec<&f64>>()
            );
        }
        None => println!("{} - no valid values", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(0.000014, 5), 0.00001);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }

    #[test]
    fn test_resolve_data_file_recursive() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("srf").join("s2a");
        fs::create_dir_all(&nested).unwrap();
        File::create(nested.join("S2A-SRF.csv")).unwrap();

        let found = resolve_data_file("S2A-SRF.csv", dir.path().to_str()).unwrap();
        assert_eq!(found, nested.join("S2A-SRF.csv"));

        assert!(resolve_data_file("missing.csv", dir.path().to_str()).is_none());
        assert!(resolve_data_file("missing.csv", None).is_none());
    }

    #[test]
    fn test_summarize_skips_nan() {
        let summary = summarize(&[0.2, f64::NAN, 0.4, 0.6]).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 0.2);
        assert_eq!(summary.max, 0.6);
        assert!((summary.mean - 0.4).abs() < 1e-12);

        assert!(summarize(&[f64::NAN]).is_none());
    }
}
