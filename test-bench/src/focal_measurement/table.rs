//! Fixed-schema result tables and their CSV sections.

use super::focal::{round_to, FocalComputation, SubsetFocal, TABLE_DECIMALS};
use std::io::Write;

/// Column headers of a focal table
pub const COLUMNS: [&str; 6] = [
    "Spot Number",
    "y0 (pixels)",
    "y1 (pixels)",
    "y2 (pixels)",
    "f (mm)",
    "f ± δf (mm)",
];

/// Single column of a table recording a failed filter
pub const ERROR_COLUMN: &str = "Error";

/// Label of the effective focal length row
pub const EFFECTIVE_LABEL: &str = "effective";
/// Label of the subset difference row
pub const DELTA_LABEL: &str = "delta_f";

#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    /// One spot of a subset, numbered 1-4 within the subset
    Spot {
        number: usize,
        y0: f64,
        y1: f64,
        y2: f64,
        focal: f64,
    },
    /// Named value with its uncertainty text
    Summary {
        label: &'static str,
        focal: f64,
        text: String,
    },
}

/// Per-filter table: spot rows and summaries, or the reason the filter failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultTable {
    Focal(Vec<TableRow>),
    Error(String),
}

impl ResultTable {
    pub fn from_computation(computation: &FocalComputation) -> Self {
        let round = |v: f64| round_to(v, TABLE_DECIMALS);
        let with_error = |value: f64, error: f64| {
            format!("{} ± {}", format_value(round(value)), format_value(round(error)))
        };

        let mut rows = Vec::with_capacity(12);
        rows.extend(spot_rows(&computation.p));
        rows.extend(spot_rows(&computation.l));

        for subset in [&computation.p, &computation.l] {
            rows.push(TableRow::Summary {
                label: subset.subset.label(),
                focal: round(subset.mean),
                text: with_error(subset.mean, subset.std),
            });
        }
        rows.push(TableRow::Summary {
            label: EFFECTIVE_LABEL,
            focal: round(computation.focal_effective),
            text: with_error(computation.focal_effective, computation.err_focal_effective),
        });
        rows.push(TableRow::Summary {
            label: DELTA_LABEL,
            focal: round(computation.delta_f),
            text: with_error(computation.delta_f, computation.err_delta_f),
        });

        ResultTable::Focal(rows)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        ResultTable::Error(reason.into())
    }

    pub fn rows(&self) -> &[TableRow] {
        match self {
            ResultTable::Focal(rows) => rows,
            ResultTable::Error(_) => &[],
        }
    }

    pub fn header(&self) -> Vec<&'static str> {
        match self {
            ResultTable::Focal(_) => COLUMNS.to_vec(),
            ResultTable::Error(_) => vec![ERROR_COLUMN],
        }
    }

    /// Table body as text cells, one record per row.
    pub fn records(&self) -> Vec<Vec<String>> {
        match self {
            ResultTable::Error(reason) => vec![vec![reason.clone()]],
            ResultTable::Focal(rows) => rows
                .iter()
                .map(|row| match row {
                    TableRow::Spot {
                        number,
                        y0,
                        y1,
                        y2,
                        focal,
                    } => vec![
                        number.to_string(),
                        format_value(*y0),
                        format_value(*y1),
                        format_value(*y2),
                        format_value(*focal),
                        String::new(),
                    ],
                    TableRow::Summary { label, focal, text } => vec![
                        (*label).to_string(),
                        String::new(),
                        String::new(),
                        String::new(),
                        format_value(*focal),
                        text.clone(),
                    ],
                })
                .collect(),
        }
    }
}

fn spot_rows(subset: &SubsetFocal) -> impl Iterator<Item = TableRow> + '_ {
    (0..subset.focal.len()).map(move |i| TableRow::Spot {
        number: i + 1,
        y0: subset.y0[i],
        y1: subset.y1[i],
        y2: subset.y2[i],
        focal: round_to(subset.focal[i], TABLE_DECIMALS),
    })
}

/// Shortest round-trip text of a float, always with a fractional part (`25.0`).
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{value:?}")
    }
}

/// Write named tables one after another into a single CSV stream.
///
/// Each section is a line holding its name, the header, then the records.
pub fn write_sections<W: Write>(
    writer: W,
    sections: &[(String, &ResultTable)],
) -> Result<(), csv::Error> {
    let mut csv = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);

    for (name, table) in sections {
        csv.write_record([name.as_str()])?;
        csv.write_record(table.header())?;
        for record in table.records() {
            csv.write_record(&record)?;
        }
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focal_measurement::focal::{compute_focal, Mode};
    use shared::focal_reference::DistanceVector;

    fn uniform_table() -> ResultTable {
        let computation = compute_focal(
            &DistanceVector([10.0; 8]),
            &DistanceVector([12.0; 8]),
            &DistanceVector([8.0; 8]),
            10.0,
            Mode::One,
        )
        .unwrap();
        ResultTable::from_computation(&computation)
    }

    #[test]
    fn test_layout() {
        let table = uniform_table();
        let records = table.records();

        assert_eq!(records.len(), 12);
        assert_eq!(
            records[0],
            vec!["1", "10.0", "12.0", "8.0", "25.0", ""]
        );
        assert_eq!(records[4][0], "1");
        assert_eq!(records[7][0], "4");

        let labels: Vec<&str> = records[8..].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(labels, ["p", "l", "effective", "delta_f"]);
        assert_eq!(records[10][4], "25.0");
        assert_eq!(records[10][5], "25.0 ± 0.0");
        assert_eq!(records[11][5], "0.0 ± 0.0");
    }

    #[test]
    fn test_spot_rows_read_subset_indices() {
        let y0 = DistanceVector([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0].map(|v| v + 10.0));
        let computation = compute_focal(
            &y0,
            &DistanceVector([12.0; 8]),
            &DistanceVector([8.0; 8]),
            10.0,
            Mode::Three,
        )
        .unwrap();
        let table = ResultTable::from_computation(&computation);

        // Mode 3 reads p from spots 3, 6, 4, 1 and negates both planes
        assert_eq!(
            table.rows()[0],
            TableRow::Spot {
                number: 1,
                y0: 13.0,
                y1: -12.0,
                y2: -8.0,
                focal: round_to(13.0 / -4.0 * 10.0, 2),
            }
        );
    }

    #[test]
    fn test_error_table() {
        let table = ResultTable::failed("no frame captured at z1");
        assert_eq!(table.header(), vec!["Error"]);
        assert_eq!(table.records(), vec![vec!["no frame captured at z1".to_string()]]);
        assert!(table.rows().is_empty());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(25.0), "25.0");
        assert_eq!(format_value(3.536), "3.536");
        assert_eq!(format_value(-0.5), "-0.5");
        assert_eq!(format_value(f64::NAN), "nan");
    }

    #[test]
    fn test_write_sections() {
        let focal = uniform_table();
        let failed = ResultTable::failed("detection invalid");
        let mut out = Vec::new();
        write_sections(
            &mut out,
            &[
                ("Filter_W".to_string(), &focal),
                ("Filter_R".to_string(), &failed),
            ],
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Filter_W");
        assert_eq!(lines[1], "Spot Number,y0 (pixels),y1 (pixels),y2 (pixels),f (mm),f ± δf (mm)");
        assert_eq!(lines[2], "1,10.0,12.0,8.0,25.0,");
        assert_eq!(lines[14], "Filter_R");
        assert_eq!(lines[15], "Error");
        assert_eq!(lines[16], "detection invalid");
        assert_eq!(lines.len(), 17);
    }
}
