//! Table ingest.
//!
//! Turns a two-column `(volume, energy)` text table into raw vectors ready for
//! [`SampleSet::new`](crate::domain::SampleSet::new). Accepted layouts:
//!
//! - comma separated (parsed with `csv`), or whitespace separated
//! - `#` starts a comment, blank lines are skipped
//! - the first data line may be a header (anything whose first two fields do
//!   not parse as numbers)
//! - columns beyond the second are ignored
//!
//! Errors map to exit code 2. Value checks (positivity, finiteness, count)
//! are left to `SampleSet` so they surface as fit failures on the row.

use std::fs;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::AppError;

/// Display name used for standard input.
pub const STDIN_NAME: &str = "-";

/// Parsed input table.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTable {
    /// The path as given on the command line (`-` for stdin).
    pub name: String,
    pub volumes: Vec<f64>,
    pub energies: Vec<f64>,
}

impl InputTable {
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Read a table from a file path, or from stdin when `path` is `-`.
pub fn read_table(path: &str) -> Result<InputTable, AppError> {
    let text = if path == STDIN_NAME {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::new(2, format!("Failed to read stdin: {e}")))?;
        buf
    } else {
        fs::read_to_string(Path::new(path))
            .map_err(|e| AppError::new(2, format!("Failed to open '{path}': {e}")))?
    };
    parse_table(path, &text)
}

/// Parse table text. `name` is only used for messages and the result.
pub fn parse_table(name: &str, text: &str) -> Result<InputTable, AppError> {
    let rows = if is_comma_separated(text) {
        csv_rows(text).map_err(|e| AppError::new(2, format!("{name}: {e}")))?
    } else {
        whitespace_rows(text)
    };

    let mut volumes = Vec::with_capacity(rows.len());
    let mut energies = Vec::with_capacity(rows.len());
    for (i, (line, fields)) in rows.iter().enumerate() {
        match parse_row(fields) {
            Ok((v, e)) => {
                volumes.push(v);
                energies.push(e);
            }
            Err(_) if i == 0 => debug!(input = name, line, "Skipping header line."),
            Err(msg) => return Err(AppError::new(2, format!("{name}:{line}: {msg}"))),
        }
    }

    if volumes.is_empty() {
        return Err(AppError::new(2, format!("{name}: no (volume, energy) rows found.")));
    }
    debug!(input = name, rows = volumes.len(), "Table loaded.");

    Ok(InputTable {
        name: name.to_string(),
        volumes,
        energies,
    })
}

fn is_comma_separated(text: &str) -> bool {
    text.lines()
        .map(strip_comment)
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.contains(','))
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(head, _)| head)
}

/// `(1-based line number, fields)` for every non-empty data line.
fn whitespace_rows(text: &str) -> Vec<(usize, Vec<String>)> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let fields: Vec<String> = strip_comment(line).split_whitespace().map(str::to_string).collect();
            (!fields.is_empty()).then_some((i + 1, fields))
        })
        .collect()
}

fn csv_rows(text: &str) -> Result<Vec<(usize, Vec<String>)>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        rows.push((line, record.iter().map(str::to_string).collect()));
    }
    Ok(rows)
}

fn parse_row(fields: &[String]) -> Result<(f64, f64), String> {
    let [v, e, ..] = fields else {
        return Err(format!("expected 2 columns, found {}", fields.len()));
    };
    let v: f64 = v.parse().map_err(|_| format!("invalid volume '{v}'"))?;
    let e: f64 = e.parse().map_err(|_| format!("invalid energy '{e}'"))?;
    Ok((v, e))
}
