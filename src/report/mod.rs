//! Text report for the `eos` binary.
//!
//! Formatting lives here so the fitting code never deals with units or
//! column widths. Bulk moduli are carried in eV/Å^3 everywhere else and only
//! converted to GPa on the way out.

use crate::domain::FitResult;
use crate::error::EosError;

/// 1 eV/Å^3 in GPa.
pub const EV_PER_ANG3_IN_GPA: f64 = 160.217_662_08;

pub fn bulk_modulus_gpa(bulk_modulus: f64) -> f64 {
    bulk_modulus * EV_PER_ANG3_IN_GPA
}

/// The two comment lines printed above the result rows.
pub fn format_header() -> String {
    let mut out = String::new();
    out.push_str("# filename                points     volume    energy  bulk modulus\n");
    out.push_str("#                                   [Ang^3]      [eV]         [GPa]");
    out
}

/// One result row: name, sample count, then `V0 E0 B[GPa]` or the error message.
pub fn format_row(name: &str, n: usize, outcome: &Result<FitResult, EosError>) -> String {
    match outcome {
        Ok(fit) => format!(
            "{name:<30}{n:2} {:10.3}{:10.3}{:14.3}",
            fit.v0,
            fit.e0,
            bulk_modulus_gpa(fit.bulk_modulus)
        ),
        Err(err) => format!("{name:<30}{n:2}    {err}"),
    }
}

/// Header followed by one row per input.
pub fn format_report<'a, I>(rows: I) -> String
where
    I: IntoIterator<Item = (&'a str, usize, &'a Result<FitResult, EosError>)>,
{
    let mut out = format_header();
    for (name, n, outcome) in rows {
        out.push('\n');
        out.push_str(&format_row(name, n, outcome));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EosModel;

    fn result(v0: f64, e0: f64, b: f64) -> FitResult {
        FitResult {
            model: EosModel::Sj,
            v0,
            e0,
            bulk_modulus: b,
            params: Vec::new(),
            covariance: None,
            rss: 0.0,
            iterations: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn gpa_conversion() {
        assert!((bulk_modulus_gpa(1.0) - 160.21766208).abs() < 1e-12);
        assert!((bulk_modulus_gpa(0.5) - 80.10883104).abs() < 1e-12);
    }

    #[test]
    fn success_row_layout() {
        let row = format_row("al.csv", 9, &Ok(result(16.5, -3.745, 0.47)));
        assert_eq!(row, format!("{:<30} 9     16.500    -3.745{:>14}", "al.csv", "75.302"));
        assert_eq!(row.len(), 30 + 2 + 1 + 10 + 10 + 14);
    }

    #[test]
    fn failure_row_carries_message() {
        let row = format_row("cu.csv", 5, &Err(EosError::NoMinimum("monotonic".into())));
        assert!(row.starts_with("cu.csv"));
        assert_eq!(&row[30..32], " 5");
        assert!(row.ends_with("    No minimum: monotonic"));
    }

    #[test]
    fn report_has_header_then_rows() {
        let ok = Ok(result(12.0, -1.0, 0.5));
        let err = Err(EosError::NotFitted);
        let text = format_report([("a", 5, &ok), ("b", 6, &err)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("# filename"));
        assert!(lines[2].starts_with('a'));
        assert!(lines[3].starts_with('b'));
    }
}
