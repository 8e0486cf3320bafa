use std::collections::{BTreeSet, HashMap};

use polars::prelude::DataFrame;

use crate::error::AnalysisError;
use crate::models::{AnalysisOptions, AssociationResult, ContingencyTable};
use crate::services::normalize::{column_text, has_column};

/// Cross-tabulates two columns and measures their association.
///
/// Fails with:
/// - `ColumnNotFound` if either column is absent (checked first),
/// - `InvalidColumnPair` if both names are the same,
/// - `EmptyTable` if no row has a value in both columns,
/// - `DegenerateTable` if either column has a single distinct value or an
///   expected frequency is zero.
pub fn analyze_association(
    frame: &DataFrame,
    column_a: &str,
    column_b: &str,
    options: &AnalysisOptions,
) -> Result<AssociationResult, AnalysisError> {
    for column in [column_a, column_b] {
        if !has_column(frame, column) {
            return Err(AnalysisError::ColumnNotFound(column.to_string()));
        }
    }
    if column_a == column_b {
        return Err(AnalysisError::InvalidColumnPair(column_a.to_string()));
    }

    let contingency = contingency_table(frame, column_a, column_b, options)?;
    let grand_total = contingency.grand_total();
    if grand_total == 0 {
        return Err(AnalysisError::EmptyTable {
            column_a: column_a.to_string(),
            column_b: column_b.to_string(),
        });
    }

    let (rows, cols) = contingency.shape();
    let k = rows.min(cols);
    if k < 2 {
        return Err(AnalysisError::DegenerateTable {
            rows,
            cols,
            reason: "both columns need at least two distinct values".to_string(),
        });
    }

    let chi_square = chi_square(&contingency)?;
    let n = grand_total as f64;
    let cramers_v = (chi_square / (n * (k - 1) as f64)).sqrt().min(1.0);

    Ok(AssociationResult {
        contingency,
        chi_square,
        cramers_v,
        degrees_of_freedom: (rows - 1) * (cols - 1),
        sample_size: grand_total,
    })
}

/// Builds the co-occurrence matrix of two columns.
///
/// Rows missing a value in either column are left out. Labels are sorted
/// so identical input always yields identical ordering.
pub fn contingency_table(
    frame: &DataFrame,
    column_a: &str,
    column_b: &str,
    options: &AnalysisOptions,
) -> Result<ContingencyTable, AnalysisError> {
    let values_a = column_text(frame, column_a, &options.missing)?;
    let values_b = column_text(frame, column_b, &options.missing)?;

    let pairs: Vec<(&str, &str)> = values_a
        .iter()
        .zip(values_b.iter())
        .filter_map(|(a, b)| Some((a.as_deref()?, b.as_deref()?)))
        .collect();

    let row_labels: Vec<String> = pairs
        .iter()
        .map(|(a, _)| *a)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let col_labels: Vec<String> = pairs
        .iter()
        .map(|(_, b)| *b)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let row_index: HashMap<&str, usize> = row_labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();
    let col_index: HashMap<&str, usize> = col_labels
        .iter()
        .enumerate()
        .map(|(j, label)| (label.as_str(), j))
        .collect();

    let mut counts = vec![vec![0u64; col_labels.len()]; row_labels.len()];
    for (a, b) in &pairs {
        counts[row_index[a]][col_index[b]] += 1;
    }

    Ok(ContingencyTable {
        row_column: column_a.to_string(),
        col_column: column_b.to_string(),
        row_labels,
        col_labels,
        counts,
    })
}

/// Pearson's chi-square statistic against the independence expectation.
pub fn chi_square(table: &ContingencyTable) -> Result<f64, AnalysisError> {
    let (rows, cols) = table.shape();
    let grand_total = table.grand_total();
    if grand_total == 0 {
        return Err(AnalysisError::EmptyTable {
            column_a: table.row_column.clone(),
            column_b: table.col_column.clone(),
        });
    }

    let row_totals = table.row_totals();
    let col_totals = table.col_totals();
    let n = grand_total as f64;

    let mut statistic = 0.0;
    for (i, row) in table.counts.iter().enumerate() {
        for (j, &observed) in row.iter().enumerate() {
            let expected = row_totals[i] as f64 * col_totals[j] as f64 / n;
            if expected == 0.0 {
                return Err(AnalysisError::DegenerateTable {
                    rows,
                    cols,
                    reason: format!(
                        "expected frequency is zero for ({}, {})",
                        table.row_labels[i], table.col_labels[j]
                    ),
                });
            }
            statistic += (observed as f64 - expected).powi(2) / expected;
        }
    }

    Ok(statistic)
}

/// Every ordered pair of distinct columns, in column order.
pub fn column_pairs(frame: &DataFrame) -> Vec<(String, String)> {
    let names = frame.get_column_names();
    names
        .iter()
        .flat_map(|a| {
            names
                .iter()
                .filter(move |b| a != *b)
                .map(move |b| (a.to_string(), b.to_string()))
        })
        .collect()
}
