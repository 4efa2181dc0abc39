//! Diagram collections stored as CSV
//!
//! Each data row holds one point: `diagram,dimension,birth,death`.
//! - Rows sharing a `diagram` id form one diagram; diagrams keep the order in
//!   which their id first appears
//! - A first row with non-numeric point columns is treated as a header
//! - Blank lines and lines starting with `#` are skipped
//! - `NA` or an empty cell counts as a missing value

use crate::core::{PdkError, PersistenceDiagram, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A collection of diagrams loaded from CSV, with their ids
#[derive(Debug, Clone)]
pub struct DiagramCsv {
    ids: Vec<String>,
    diagrams: Vec<PersistenceDiagram>,
}

impl DiagramCsv {
    /// Load diagrams from a CSV file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(PdkError::IoError)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load diagrams from a reader, detecting a header row
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, true)
    }

    /// Load diagrams from a reader with explicit header detection
    pub fn from_reader_with_options<R: BufRead>(
        reader: R,
        auto_detect_header: bool,
    ) -> Result<Self> {
        let mut ids: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<[f64; 3]>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut seen_data = false;

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line.map_err(PdkError::IoError)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if !seen_data {
                seen_data = true;
                if auto_detect_header && Self::is_header_line(line) {
                    continue;
                }
            }

            let (id, row) = Self::parse_data_line(line, line_idx + 1)?;
            let position = *positions.entry(id.clone()).or_insert_with(|| {
                ids.push(id);
                rows.push(Vec::new());
                rows.len() - 1
            });
            rows[position].push(row);
        }

        if rows.is_empty() {
            return Err(PdkError::EmptyCollection);
        }

        let diagrams = rows
            .iter()
            .enumerate()
            .map(|(i, r)| PersistenceDiagram::from_rows(r).map_err(|e| e.at_index(i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { ids, diagrams })
    }

    /// Diagram ids in collection order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn diagrams(&self) -> &[PersistenceDiagram] {
        &self.diagrams
    }

    pub fn into_diagrams(self) -> Vec<PersistenceDiagram> {
        self.diagrams
    }

    pub fn len(&self) -> usize {
        self.diagrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagrams.is_empty()
    }

    /// A header has non-numeric dimension, birth and death columns
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        if fields.len() != 4 {
            return false;
        }
        fields[1..]
            .iter()
            .all(|field| field.parse::<f64>().is_err() && !is_missing(field))
    }

    fn parse_data_line(line: &str, line_no: usize) -> Result<(String, [f64; 3])> {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        if fields.len() != 4 {
            return Err(PdkError::ParseError(format!(
                "line {line_no}: expected 4 columns (diagram,dimension,birth,death), found {}",
                fields.len()
            )));
        }

        let mut row = [0.0; 3];
        for (value, (field, column)) in row
            .iter_mut()
            .zip(fields[1..].iter().zip(["dimension", "birth", "death"]))
        {
            *value = if is_missing(field) {
                f64::NAN
            } else {
                field.parse::<f64>().map_err(|_| {
                    PdkError::ParseError(format!(
                        "line {line_no}: non-numeric {column} value '{field}'"
                    ))
                })?
            };
        }
        Ok((fields[0].to_string(), row))
    }
}

fn is_missing(field: &str) -> bool {
    field.is_empty() || field.eq_ignore_ascii_case("na")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_csv_basic() {
        let data = "a,0,0.0,1.0\na,1,0.5,2.0\nb,0,0.1,0.9\n";
        let csv = DiagramCsv::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(csv.len(), 2);
        assert_eq!(csv.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(csv.diagrams()[0].len(), 2);
        assert_eq!(csv.diagrams()[0].dimension_points(1), vec![(0.5, 2.0)]);
    }

    #[test]
    fn test_csv_with_header_and_comments() {
        let data = "# generated\ndiagram,dimension,birth,death\n\n1,0,0,1\n2,0,0,2\n";
        let csv = DiagramCsv::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(csv.len(), 2);
    }

    #[test]
    fn test_csv_keeps_first_appearance_order() {
        let data = "z,0,0,1\ny,0,0,2\nz,0,0,3\n";
        let csv = DiagramCsv::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(csv.ids(), &["z".to_string(), "y".to_string()]);
        assert_eq!(csv.diagrams()[0].len(), 2);
    }

    #[test]
    fn test_csv_invalid_format() {
        let err = DiagramCsv::from_reader(Cursor::new("a,0,1\n")).unwrap_err();
        assert!(matches!(err, PdkError::ParseError(_)));

        let err = DiagramCsv::from_reader(Cursor::new("a,0,x,1\n")).unwrap_err();
        assert!(err.to_string().contains("birth"));

        let err = DiagramCsv::from_reader(Cursor::new("")).unwrap_err();
        assert!(err.to_string().contains("at least one diagram"));
    }

    #[test]
    fn test_csv_diagram_errors_carry_position() {
        let err = DiagramCsv::from_reader(Cursor::new("a,0,0,1\nb,0.5,0,1\n")).unwrap_err();
        assert!(err.to_string().contains("at index 1"));
        assert!(err.to_string().contains("dimension"));

        let err = DiagramCsv::from_reader(Cursor::new("a,0,NA,1\n")).unwrap_err();
        assert!(err.to_string().contains("missing"));

        let err = DiagramCsv::from_reader(Cursor::new("a,0,-1,1\n")).unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_csv_manual_header_control() {
        let data = "diagram,dimension,birth,death\n";
        assert!(DiagramCsv::from_reader_with_options(Cursor::new(data), false).is_err());
    }

    #[test]
    fn test_is_header_line() {
        assert!(DiagramCsv::is_header_line("diagram,dimension,birth,death"));
        assert!(DiagramCsv::is_header_line("id,dim,b,d"));
        assert!(!DiagramCsv::is_header_line("d1,0,0.0,1.0"));
        assert!(!DiagramCsv::is_header_line("id,dim"));
    }
}
