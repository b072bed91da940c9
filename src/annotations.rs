//! Per-cell categorical metadata.
//!
//! Experimental condition labels are carried alongside the expression matrix as
//! named columns of per-barcode values. Columns are validated against the
//! barcode count when added, so grouping operations can assume a rectangular
//! schema and only need to check that the requested columns exist.

use std::collections::HashMap;

use crate::error::{Result, StatsError};

/// Categorical annotations for the rows (cells/barcodes) of an expression matrix.
#[derive(Debug, Clone)]
pub struct CellAnnotations {
    barcodes: Vec<String>,
    columns: HashMap<String, Vec<String>>,
}

impl CellAnnotations {
    /// Create an empty annotation table for the given barcodes.
    pub fn new(barcodes: Vec<String>) -> Self {
        Self {
            barcodes,
            columns: HashMap::new(),
        }
    }

    /// Add a categorical column, one value per barcode.
    ///
    /// Returns [`StatsError::ShapeMismatch`] if the column length does not match
    /// the number of barcodes. Adding a column under an existing name replaces it.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.barcodes.len() {
            return Err(StatsError::ShapeMismatch {
                expected: self.barcodes.len(),
                got: values.len(),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Whether a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// All values of a column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// The value of a column for a single row.
    pub fn value(&self, name: &str, row: usize) -> Option<&str> {
        self.columns
            .get(name)
            .and_then(|v| v.get(row))
            .map(|s| s.as_str())
    }

    /// Number of annotated rows.
    pub fn n_cells(&self) -> usize {
        self.barcodes.len()
    }

    /// Row identifiers, in matrix row order.
    pub fn barcodes(&self) -> &[String] {
        &self.barcodes
    }

    /// Names of all annotation columns, sorted.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barcodes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("AAACCTG-{i}")).collect()
    }

    #[test]
    fn add_and_read_columns() {
        let mut ann = CellAnnotations::new(barcodes(3));
        ann.add_column("treatment", vec!["lps".into(), "lps".into(), "unst".into()])
            .unwrap();

        assert!(ann.has_column("treatment"));
        assert!(!ann.has_column("replicate"));
        assert_eq!(ann.n_cells(), 3);
        assert_eq!(ann.value("treatment", 2), Some("unst"));
        assert_eq!(ann.column("treatment").unwrap().len(), 3);
    }

    #[test]
    fn rejects_wrong_length_column() {
        let mut ann = CellAnnotations::new(barcodes(3));
        let err = ann
            .add_column("treatment", vec!["lps".into()])
            .unwrap_err();
        assert_eq!(err, StatsError::ShapeMismatch { expected: 3, got: 1 });
    }
}
