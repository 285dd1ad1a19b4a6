//! Millimetre/step conversion through a calibrated lookup table.
//!
//! The table is a CSV file with a `millimeters,steps` header. Conversions are
//! exact lookups: positions are only reachable if they appear in the table.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StepTableError {
    #[error("failed to read step table: {0}")]
    Csv(#[from] csv::Error),

    #[error("step table is empty")]
    Empty,

    #[error("value {0} mm not found in conversion table")]
    UnknownPosition(f64),

    #[error("negative step count {steps} at {millimeters} mm")]
    NegativeSteps { millimeters: f64, steps: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
struct StepRow {
    millimeters: f64,
    steps: i64,
}

/// Calibrated stage positions.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTable {
    rows: Vec<(f64, u32)>,
}

/// Round to two decimals, the precision of the table.
pub fn round_to_table_precision(mm: f64) -> f64 {
    (mm * 100.0).round_ties_even() / 100.0
}

impl StepTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StepTableError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StepTableError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, StepTableError> {
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: StepRow = record?;
            let steps = u32::try_from(row.steps).map_err(|_| StepTableError::NegativeSteps {
                millimeters: row.millimeters,
                steps: row.steps,
            })?;
            rows.push((row.millimeters, steps));
        }

        if rows.is_empty() {
            return Err(StepTableError::Empty);
        }
        Ok(Self { rows })
    }

    /// Build from `(millimeters, steps)` pairs.
    pub fn from_pairs(pairs: Vec<(f64, u32)>) -> Result<Self, StepTableError> {
        if pairs.is_empty() {
            return Err(StepTableError::Empty);
        }
        Ok(Self { rows: pairs })
    }

    /// Steps for a position; the sign of `mm` is ignored.
    pub fn mm_to_steps(&self, mm: f64) -> Result<u32, StepTableError> {
        let target = round_to_table_precision(mm.abs());
        self.rows
            .iter()
            .find(|(millimeters, _)| *millimeters == target)
            .map(|&(_, steps)| steps)
            .ok_or(StepTableError::UnknownPosition(target))
    }

    /// Position for an exact step count, `None` if the table has no such entry.
    pub fn steps_to_mm(&self, steps: u32) -> Option<f64> {
        self.rows
            .iter()
            .find(|(_, s)| *s == steps)
            .map(|&(millimeters, _)| millimeters)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const TABLE: &str = "millimeters,steps\n0.0,0\n0.07,14\n10.0,2000\n12.5,2500\n20.0,4000\n";

    fn table() -> StepTable {
        StepTable::from_reader(TABLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_lookup_both_ways() {
        let table = table();
        assert_eq!(table.len(), 5);
        assert_eq!(table.mm_to_steps(12.5).unwrap(), 2500);
        assert_abs_diff_eq!(table.steps_to_mm(4000).unwrap(), 20.0);
        assert_abs_diff_eq!(table.steps_to_mm(14).unwrap(), 0.07);
        assert_eq!(table.steps_to_mm(4001), None);
    }

    #[test]
    fn test_sign_ignored_and_rounded() {
        let table = table();
        assert_eq!(table.mm_to_steps(-10.0).unwrap(), 2000);
        assert_eq!(table.mm_to_steps(0.0701).unwrap(), 14);
        assert_eq!(table.mm_to_steps(9.999).unwrap(), 2000);
    }

    #[test]
    fn test_unknown_position() {
        assert!(matches!(
            table().mm_to_steps(3.3),
            Err(StepTableError::UnknownPosition(v)) if v == 3.3
        ));
    }

    #[test]
    fn test_empty_and_malformed_tables() {
        assert!(matches!(
            StepTable::from_reader("millimeters,steps\n".as_bytes()),
            Err(StepTableError::Empty)
        ));
        assert!(matches!(
            StepTable::from_reader("millimeters,steps\nten,5\n".as_bytes()),
            Err(StepTableError::Csv(_))
        ));
        assert!(matches!(
            StepTable::from_reader("millimeters,steps\n1.0,-5\n".as_bytes()),
            Err(StepTableError::NegativeSteps { .. })
        ));
    }
}
