//! The fit pipeline behind the `eos` binary.
//!
//! load tables -> fit each (in parallel) -> optional curve export
//!
//! Printing stays in [`crate::app`]; everything here returns data so it can be
//! tested without capturing stdout.

use std::fs;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::app::RunConfig;
use crate::domain::{EosModel, FitResult, SolverOptions};
use crate::engine::EquationOfState;
use crate::error::{AppError, EosError};
use crate::io::{CurveFile, CurveGrid, InputTable, curve_json_path, read_table, write_curve_json};

/// Result for one input table.
#[derive(Debug, Clone)]
pub struct InputOutcome {
    pub name: String,
    pub n: usize,
    pub outcome: Result<FitResult, EosError>,
    /// Present when a curve export was requested and the fit succeeded.
    pub curve: Option<CurveFile>,
}

/// All outcomes of one run, in input order.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub outcomes: Vec<InputOutcome>,
}

impl RunOutput {
    pub fn all_fitted(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_ok())
    }

    /// Rows for [`crate::report::format_report`].
    pub fn rows(&self) -> impl Iterator<Item = (&str, usize, &Result<FitResult, EosError>)> {
        self.outcomes.iter().map(|o| (o.name.as_str(), o.n, &o.outcome))
    }
}

/// Execute the pipeline for every input in `config`.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let tables = load_tables(&config.inputs)?;
    let curve_points = config.json.as_ref().map(|_| config.points);
    let outcomes = fit_tables(tables, config.model, &config.options, curve_points);

    if let Some(target) = &config.json {
        let several = outcomes.len() > 1;
        if several {
            fs::create_dir_all(target).map_err(|e| {
                AppError::new(2, format!("Failed to create output directory '{}': {e}", target.display()))
            })?;
        }
        for o in &outcomes {
            if let Some(curve) = &o.curve {
                let path = curve_json_path(target, &o.name, several);
                write_curve_json(&path, curve)?;
                info!(path = %path.display(), "Curve written.");
            }
        }
    }

    Ok(RunOutput { outcomes })
}

/// Read every input. Any IO or parse failure aborts the run.
pub fn load_tables(inputs: &[String]) -> Result<Vec<InputTable>, AppError> {
    if inputs.iter().filter(|name| name.as_str() == crate::io::STDIN_NAME).count() > 1 {
        return Err(AppError::new(2, "stdin ('-') can only be given once."));
    }
    inputs.iter().map(|name| read_table(name)).collect()
}

/// Fit every table with the same model and options.
///
/// Tables are independent, so they are fitted in parallel; output order
/// follows input order. `curve_points` requests a curve grid per success.
pub fn fit_tables(
    tables: Vec<InputTable>,
    model: EosModel,
    options: &SolverOptions,
    curve_points: Option<usize>,
) -> Vec<InputOutcome> {
    tables
        .into_par_iter()
        .map(|table| fit_table(table, model, options, curve_points))
        .collect()
}

fn fit_table(
    table: InputTable,
    model: EosModel,
    options: &SolverOptions,
    curve_points: Option<usize>,
) -> InputOutcome {
    let n = table.len();
    let eos = match crate::domain::SampleSet::new(table.volumes, table.energies) {
        Ok(samples) => EquationOfState::with_options(samples, model, options.clone()),
        Err(err) => {
            debug!(input = %table.name, %err, "Rejected input.");
            return InputOutcome {
                name: table.name,
                n,
                outcome: Err(err),
                curve: None,
            };
        }
    };

    let outcome = eos.fit().cloned();
    if let Err(err) = &outcome {
        debug!(input = %table.name, kind = err.kind(), "Fit failed.");
    }

    let curve = match (&outcome, curve_points) {
        (Ok(result), Some(points)) => eos.curve(points).ok().map(|(volumes, energies)| CurveFile {
            tool: "eos".to_string(),
            source: table.name.clone(),
            model,
            result: result.clone(),
            samples: CurveGrid {
                volumes: eos.samples().volumes().to_vec(),
                energies: eos.samples().energies().to_vec(),
            },
            grid: CurveGrid { volumes, energies },
        }),
        _ => None,
    };

    InputOutcome {
        name: table.name,
        n,
        outcome,
        curve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::energy;
    use std::io::Write;

    fn murnaghan_table(name: &str) -> InputTable {
        let volumes: Vec<f64> = (0..9).map(|i| 10.0 + 0.5 * i as f64).collect();
        let energies = volumes
            .iter()
            .map(|&v| energy(EosModel::Murnaghan, v, &[-1.0, 0.5, 4.0, 12.0]).unwrap())
            .collect();
        InputTable {
            name: name.to_string(),
            volumes,
            energies,
        }
    }

    fn falling_table(name: &str) -> InputTable {
        InputTable {
            name: name.to_string(),
            volumes: vec![8.0, 9.0, 10.0, 11.0, 12.0],
            energies: vec![-8.0, -9.0, -10.0, -11.0, -12.0],
        }
    }

    #[test]
    fn outcomes_keep_input_order() {
        let tables = vec![murnaghan_table("a"), falling_table("b"), murnaghan_table("c")];
        let outcomes = fit_tables(tables, EosModel::Sj, &SolverOptions::default(), None);
        let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(outcomes[0].outcome.is_ok());
        assert!(matches!(outcomes[1].outcome, Err(EosError::NoMinimum(_))));
        assert!(outcomes.iter().all(|o| o.curve.is_none()));

        let run = RunOutput { outcomes };
        assert!(!run.all_fitted());
        assert_eq!(run.rows().count(), 3);
    }

    #[test]
    fn invalid_samples_become_row_errors() {
        let table = InputTable {
            name: "short".into(),
            volumes: vec![10.0, 11.0, 12.0],
            energies: vec![-1.0, -1.1, -1.0],
        };
        let outcomes = fit_tables(vec![table], EosModel::Vinet, &SolverOptions::default(), Some(10));
        assert_eq!(outcomes[0].n, 3);
        assert!(matches!(outcomes[0].outcome, Err(EosError::InvalidInput(_))));
        assert!(outcomes[0].curve.is_none());
    }

    #[test]
    fn curve_requested_on_success() {
        let outcomes = fit_tables(
            vec![murnaghan_table("m")],
            EosModel::Murnaghan,
            &SolverOptions::default(),
            Some(25),
        );
        let curve = outcomes[0].curve.as_ref().expect("curve");
        assert_eq!(curve.grid.volumes.len(), 25);
        assert_eq!(curve.samples.volumes.len(), 9);
        assert_eq!(curve.model, EosModel::Murnaghan);
    }

    #[test]
    fn run_fit_writes_curves_for_each_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = Vec::new();
        for stem in ["al", "cu"] {
            let path = dir.path().join(format!("{stem}.dat"));
            let table = murnaghan_table(stem);
            let mut file = fs::File::create(&path).unwrap();
            for (v, e) in table.volumes.iter().zip(&table.energies) {
                writeln!(file, "{v} {e}").unwrap();
            }
            inputs.push(path.to_str().unwrap().to_string());
        }
        let out_dir = dir.path().join("curves");
        let config = RunConfig {
            inputs,
            model: EosModel::BirchMurnaghan,
            options: SolverOptions::default(),
            json: Some(out_dir.clone()),
            points: 50,
        };

        let run = run_fit(&config).unwrap();
        assert!(run.all_fitted());
        assert!(out_dir.join("al.json").is_file());
        assert!(out_dir.join("cu.json").is_file());
    }

    #[test]
    fn stdin_only_once() {
        let err = load_tables(&["-".to_string(), "-".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
