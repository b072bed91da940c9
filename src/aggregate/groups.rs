//! Condition-group partitioning.

use std::collections::HashMap;

use crate::annotations::CellAnnotations;
use crate::error::{Result, StatsError};

/// One condition group: the tuple of grouping-column values and the matrix rows
/// carrying exactly those values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionGroup {
    /// Values of the grouping columns, in grouping-column order.
    pub key: Vec<String>,
    /// Matrix row indices belonging to this group, in ascending order.
    pub rows: Vec<usize>,
}

/// Partition every annotated row into disjoint groups by equality on `columns`.
///
/// The partition is total: each row lands in exactly one group, none are dropped
/// or duplicated. Groups are returned sorted by key so downstream output does not
/// depend on hash iteration order.
///
/// # Arguments
/// * `annotations` - Per-row categorical metadata
/// * `columns` - Grouping column names; all must exist in the annotation schema
///
/// # Returns
/// * `Result<Vec<ConditionGroup>>` - Sorted groups, or [`StatsError::InvalidGrouping`]
///   for an unknown column, [`StatsError::EmptyGrouping`] for an empty column list.
pub fn partition_rows(
    annotations: &CellAnnotations,
    columns: &[String],
) -> Result<Vec<ConditionGroup>> {
    if columns.is_empty() {
        return Err(StatsError::EmptyGrouping);
    }

    let mut column_values = Vec::with_capacity(columns.len());
    for name in columns {
        let values = annotations
            .column(name)
            .ok_or_else(|| StatsError::InvalidGrouping {
                column: name.clone(),
            })?;
        column_values.push(values);
    }

    let mut by_key: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for row in 0..annotations.n_cells() {
        let key: Vec<String> = column_values.iter().map(|v| v[row].clone()).collect();
        by_key.entry(key).or_default().push(row);
    }

    let mut groups: Vec<ConditionGroup> = by_key
        .into_iter()
        .map(|(key, rows)| ConditionGroup { key, rows })
        .collect();
    groups.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations() -> CellAnnotations {
        let mut ann =
            CellAnnotations::new((0..6).map(|i| format!("BC{i}")).collect());
        ann.add_column(
            "replicate",
            vec!["r1", "r1", "r2", "r2", "r1", "r2"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
        .unwrap();
        ann.add_column(
            "treatment",
            vec!["lps", "unst", "lps", "unst", "lps", "lps"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
        .unwrap();
        ann
    }

    #[test]
    fn partitions_all_rows_exactly_once() {
        let ann = annotations();
        let groups =
            partition_rows(&ann, &["replicate".into(), "treatment".into()]).unwrap();

        let mut seen: Vec<usize> = groups.iter().flat_map(|g| g.rows.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(groups.len(), 4);
    }

    #[test]
    fn groups_are_sorted_by_key() {
        let ann = annotations();
        let groups =
            partition_rows(&ann, &["replicate".into(), "treatment".into()]).unwrap();
        let keys: Vec<&Vec<String>> = groups.iter().map(|g| &g.key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let ann = annotations();
        let err = partition_rows(&ann, &["time_point".into()]).unwrap_err();
        assert_eq!(
            err,
            StatsError::InvalidGrouping {
                column: "time_point".into()
            }
        );
    }

    #[test]
    fn empty_column_list_is_rejected() {
        let ann = annotations();
        assert_eq!(partition_rows(&ann, &[]).unwrap_err(), StatsError::EmptyGrouping);
    }
}
