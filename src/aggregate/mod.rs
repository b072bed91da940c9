//! Condition-wise statistics aggregation over a sparse expression matrix.
//!
//! The aggregator partitions the matrix rows (cells) into condition groups by
//! equality on a configurable set of annotation columns, computes descriptive
//! statistics for every gene within every group, and returns a flat table with
//! one record per (gene, group) pair, stably sorted by a configurable column
//! order.

use std::cmp::Ordering;

use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;
use single_utilities::traits::FloatOpsTS;

use crate::annotations::CellAnnotations;
use crate::error::{Result, StatsError};

pub mod describe;
pub mod groups;

pub use describe::{describe, skewness, DescriptiveStats};
pub use groups::{partition_rows, ConditionGroup};

/// Column name the per-gene records are keyed by in sort specifications.
pub const GENE_COLUMN: &str = "gene";

/// Default grouping columns: replicate × treatment × time point.
pub const DEFAULT_CONDITION_COLUMNS: [&str; 3] = ["replicate", "treatment", "time_point"];

/// Default output sort order.
pub const DEFAULT_SORT_COLUMNS: [&str; 4] = ["gene", "replicate", "time_point", "treatment"];

/// Grouping and output-ordering configuration for [`condition_statistics`].
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Annotation columns whose value tuples define the condition groups.
    pub group_columns: Vec<String>,
    /// Columns the output records are sorted by; each must be `gene` or one of
    /// the grouping columns.
    pub sort_columns: Vec<String>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            group_columns: DEFAULT_CONDITION_COLUMNS.iter().map(|s| s.to_string()).collect(),
            sort_columns: DEFAULT_SORT_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Statistics of one gene within one condition group.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneConditionStats {
    /// Gene identifier (matrix column).
    pub gene: String,
    /// Grouping-column values of the condition group, in grouping-column order.
    pub condition: Vec<String>,
    /// Number of cells in the group.
    pub n_barcodes: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample variance (n−1 divisor), NaN below two cells.
    pub variance: f64,
    /// Sample standard deviation (n−1 divisor), NaN below two cells.
    pub std_dev: f64,
    /// Population skewness, NaN below two cells or for zero variance.
    pub skew: f64,
}

/// Flat table of per-gene-per-group statistics, sorted by the configured columns.
#[derive(Debug, Clone)]
pub struct ConditionStatsTable {
    group_columns: Vec<String>,
    records: Vec<GeneConditionStats>,
}

impl ConditionStatsTable {
    /// The records, in sorted order.
    pub fn records(&self) -> &[GeneConditionStats] {
        &self.records
    }

    /// The grouping columns the records' `condition` values are aligned with.
    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    /// Column headers for tabular export: `gene` first, then the grouping
    /// columns, then the statistics fields.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![GENE_COLUMN.to_string()];
        headers.extend(self.group_columns.iter().cloned());
        for field in ["n_barcodes", "min", "max", "mean", "variance", "std_dev", "skew"] {
            headers.push(field.to_string());
        }
        headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable sort of the records by the given column tuple. Ties keep their
    /// existing relative order.
    fn sort_by_columns(&mut self, sort_columns: &[String]) -> Result<()> {
        let keys = self.resolve_sort_keys(sort_columns)?;
        self.records.sort_by(|a, b| {
            for key in &keys {
                let ord = match *key {
                    SortKey::Gene => a.gene.cmp(&b.gene),
                    SortKey::Condition(idx) => a.condition[idx].cmp(&b.condition[idx]),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(())
    }

    fn resolve_sort_keys(&self, sort_columns: &[String]) -> Result<Vec<SortKey>> {
        sort_columns
            .iter()
            .map(|name| {
                if name == GENE_COLUMN {
                    Ok(SortKey::Gene)
                } else {
                    self.group_columns
                        .iter()
                        .position(|c| c == name)
                        .map(SortKey::Condition)
                        .ok_or_else(|| StatsError::InvalidGrouping {
                            column: name.clone(),
                        })
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum SortKey {
    Gene,
    Condition(usize),
}

/// Aggregate an expression matrix into per-gene-per-condition-group statistics.
///
/// # Arguments
///
/// * `matrix` - Sparse expression matrix (cells × genes), non-negative counts or
///   normalized counts
/// * `annotations` - Per-cell categorical metadata; must cover every matrix row
/// * `gene_ids` - Gene identifiers, one per matrix column
/// * `options` - Grouping columns and output sort order
///
/// # Returns
///
/// A [`ConditionStatsTable`] with one record per (gene, condition group) pair.
/// Fails with [`StatsError::ShapeMismatch`] when annotation rows or gene ids do
/// not match the matrix shape, and with [`StatsError::InvalidGrouping`] when a
/// grouping or sort column is unknown. All validation happens before any
/// statistics are computed.
pub fn condition_statistics<T>(
    matrix: &CsrMatrix<T>,
    annotations: &CellAnnotations,
    gene_ids: &[String],
    options: &AggregateOptions,
) -> Result<ConditionStatsTable>
where
    T: FloatOpsTS,
{
    if annotations.n_cells() != matrix.nrows() {
        return Err(StatsError::ShapeMismatch {
            expected: matrix.nrows(),
            got: annotations.n_cells(),
        });
    }
    if gene_ids.len() != matrix.ncols() {
        return Err(StatsError::ShapeMismatch {
            expected: matrix.ncols(),
            got: gene_ids.len(),
        });
    }

    let groups = partition_rows(annotations, &options.group_columns)?;

    let mut table = ConditionStatsTable {
        group_columns: options.group_columns.clone(),
        records: Vec::with_capacity(groups.len() * gene_ids.len()),
    };
    // Resolve the sort specification up front so a bad sort column fails before
    // any statistics work.
    table.resolve_sort_keys(&options.sort_columns)?;

    log::debug!(
        "aggregating {} genes over {} condition groups ({} cells)",
        gene_ids.len(),
        groups.len(),
        matrix.nrows()
    );

    for group in &groups {
        let columns = densify_group_columns(matrix, &group.rows);
        let mut records: Vec<GeneConditionStats> = columns
            .par_iter()
            .enumerate()
            .map(|(gene_idx, values)| {
                let stats = describe(values);
                GeneConditionStats {
                    gene: gene_ids[gene_idx].clone(),
                    condition: group.key.clone(),
                    n_barcodes: stats.n,
                    min: stats.min,
                    max: stats.max,
                    mean: stats.mean,
                    variance: stats.variance,
                    std_dev: stats.std_dev,
                    skew: stats.skew,
                }
            })
            .collect();
        table.records.append(&mut records);
    }

    table.sort_by_columns(&options.sort_columns)?;
    Ok(table)
}

/// Extract the dense per-gene value vectors for one group of matrix rows,
/// materializing the implicit zeros of the sparse representation.
fn densify_group_columns<T>(matrix: &CsrMatrix<T>, rows: &[usize]) -> Vec<Vec<f64>>
where
    T: FloatOpsTS,
{
    let mut columns = vec![vec![0.0f64; rows.len()]; matrix.ncols()];
    for (local, &row) in rows.iter().enumerate() {
        let lane = matrix.row(row);
        for (&gene_idx, value) in lane.col_indices().iter().zip(lane.values()) {
            columns[gene_idx][local] = num_traits::ToPrimitive::to_f64(value).unwrap();
        }
    }
    columns
}

/// Condition aggregation as a method on the sparse matrix itself.
pub trait MatrixConditionStats<T>
where
    T: FloatOpsTS,
{
    fn condition_statistics(
        &self,
        annotations: &CellAnnotations,
        gene_ids: &[String],
        options: &AggregateOptions,
    ) -> anyhow::Result<ConditionStatsTable>;
}

impl<T> MatrixConditionStats<T> for CsrMatrix<T>
where
    T: FloatOpsTS,
{
    fn condition_statistics(
        &self,
        annotations: &CellAnnotations,
        gene_ids: &[String],
        options: &AggregateOptions,
    ) -> anyhow::Result<ConditionStatsTable> {
        Ok(condition_statistics(self, annotations, gene_ids, options)?)
    }
}
