//! Read/write fitted-curve JSON files.
//!
//! A curve file is what an external plotter needs: the fit result (model,
//! `V0`, `E0`, `B`, raw parameters and advisories) plus a precomputed
//! `(volume, energy)` grid spanning the sampled volumes.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{EosModel, FitResult};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    /// Input the curve was fitted from.
    pub source: String,
    pub model: EosModel,
    pub result: FitResult,
    pub samples: CurveGrid,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub volumes: Vec<f64>,
    pub energies: Vec<f64>,
}

pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))?;
    Ok(())
}

/// Where the curve for input `name` goes.
///
/// With several inputs (or an existing directory) `target` is a directory and
/// each curve is written to `<target>/<stem>.json`; otherwise `target` is the
/// file itself.
pub fn curve_json_path(target: &Path, name: &str, several: bool) -> PathBuf {
    if !(several || target.is_dir()) {
        return target.to_path_buf();
    }
    let stem = if name == crate::io::STDIN_NAME {
        "stdin".to_string()
    } else {
        Path::new(name)
            .file_stem()
            .map_or_else(|| "curve".to_string(), |s| s.to_string_lossy().into_owned())
    };
    target.join(format!("{stem}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_curve() -> CurveFile {
        CurveFile {
            tool: "eos".into(),
            source: "al.dat".into(),
            model: EosModel::Vinet,
            result: FitResult {
                model: EosModel::Vinet,
                v0: 16.5,
                e0: -3.7,
                bulk_modulus: 0.47,
                params: vec![-3.7, 0.47, 4.5, 16.5],
                covariance: None,
                rss: 1e-9,
                iterations: Some(6),
                warnings: Vec::new(),
            },
            samples: CurveGrid {
                volumes: vec![15.0, 16.0, 17.0, 18.0],
                energies: vec![-3.6, -3.69, -3.69, -3.62],
            },
            grid: CurveGrid {
                volumes: vec![15.0, 18.0],
                energies: vec![-3.6, -3.62],
            },
        }
    }

    #[test]
    fn written_curve_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("al.json");
        let curve = sample_curve();
        write_curve_json(&path, &curve).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"model\": \"vinet\""));
        let parsed: CurveFile = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, curve);
    }

    #[test]
    fn path_resolution() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(curve_json_path(dir.path(), "runs/al.dat", false), dir.path().join("al.json"));
        assert_eq!(curve_json_path(dir.path(), "-", true), dir.path().join("stdin.json"));

        let file = dir.path().join("out.json");
        assert_eq!(curve_json_path(&file, "al.dat", false), file);
    }

    #[test]
    fn unwritable_target_exits_with_2() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("al.json");
        assert_eq!(write_curve_json(&path, &sample_curve()).unwrap_err().exit_code(), 2);
    }
}
