use std::collections::HashMap;

use polars::prelude::DataFrame;

use crate::error::AnalysisError;
use crate::models::{AnalysisOptions, FrequencyEntry, FrequencyTable};
use crate::services::normalize::column_text;

/// Counts the distinct text values of `column`, most frequent first.
///
/// Ties keep the order in which values first appear in the column.
pub fn analyze_frequency(
    frame: &DataFrame,
    column: &str,
    options: &AnalysisOptions,
) -> Result<FrequencyTable, AnalysisError> {
    let values = column_text(frame, column, &options.missing)?;

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u64)> = Vec::new();
    let mut missing = 0u64;

    for value in &values {
        let Some(value) = value.as_deref() else {
            missing += 1;
            continue;
        };
        match index.get(value) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|(_, left), (_, right)| right.cmp(left));

    let total = counts.iter().map(|(_, count)| count).sum();
    let entries = counts
        .into_iter()
        .map(|(value, count)| FrequencyEntry {
            value: value.to_string(),
            count,
        })
        .collect();

    Ok(FrequencyTable {
        column: column.to_string(),
        entries,
        total,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MissingPolicy;
    use crate::services::loader::{load_csv, LoadOptions};
    use polars::prelude::*;

    fn frame(values: &[Option<&str>]) -> DataFrame {
        DataFrame::new(vec![Series::new("answer", values)]).unwrap()
    }

    #[test]
    fn counts_sorted_by_frequency() {
        let df = frame(&[Some("a"), Some("b"), Some("a"), Some("c"), Some("a")]);
        let table = analyze_frequency(&df, "answer", &AnalysisOptions::default()).unwrap();

        let pairs: Vec<(&str, u64)> = table
            .entries
            .iter()
            .map(|entry| (entry.value.as_str(), entry.count))
            .collect();
        assert_eq!(pairs, vec![("a", 3), ("b", 1), ("c", 1)]);
        assert_eq!(table.column, "answer");
        assert_eq!(table.total, 5);
        assert_eq!(table.missing, 0);
    }

    #[test]
    fn none_and_na_answers_are_counted_as_values() {
        let loaded = load_csv(b"q\nnone\nnone\nna\nyes\n", &LoadOptions::default()).unwrap();
        let table = analyze_frequency(&loaded.frame, "q", &AnalysisOptions::default()).unwrap();
        assert_eq!(table.count_of("none"), Some(2));
        assert_eq!(table.count_of("na"), Some(1));
        assert_eq!(table.count_of("yes"), Some(1));
        assert_eq!(table.missing, 0);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let df = frame(&[Some("z"), Some("y"), Some("x"), Some("y"), Some("z"), Some("x")]);
        let table = analyze_frequency(&df, "answer", &AnalysisOptions::default()).unwrap();
        let order: Vec<&str> = table.entries.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(order, vec!["z", "y", "x"]);
    }

    #[test]
    fn drop_policy_reports_missing_separately() {
        let df = frame(&[Some("a"), None, Some("a"), None]);
        let table = analyze_frequency(&df, "answer", &AnalysisOptions::default()).unwrap();
        assert_eq!(table.total, 2);
        assert_eq!(table.missing, 2);
        assert_eq!(table.count_of("a"), Some(2));
    }

    #[test]
    fn category_policy_counts_missing_as_a_value() {
        let df = frame(&[Some("a"), None, None]);
        let options = AnalysisOptions {
            missing: MissingPolicy::Category("missing".into()),
        };
        let table = analyze_frequency(&df, "answer", &options).unwrap();
        assert_eq!(table.entries[0].value, "missing");
        assert_eq!(table.entries[0].count, 2);
        assert_eq!(table.total, 3);
        assert_eq!(table.missing, 0);
    }

    #[test]
    fn mixed_numeric_text_column_is_counted_as_text() {
        let csv = b"q\n1\nyes\n1\n2.0\n";
        let loaded = crate::services::loader::load_csv(csv, &Default::default()).unwrap();
        let table = analyze_frequency(&loaded.frame, "q", &AnalysisOptions::default()).unwrap();
        assert_eq!(table.count_of("1"), Some(2));
        assert_eq!(table.count_of("yes"), Some(1));
        assert_eq!(table.count_of("2.0"), Some(1));
    }

    #[test]
    fn missing_column_fails() {
        let df = frame(&[Some("a")]);
        assert_eq!(
            analyze_frequency(&df, "nope", &AnalysisOptions::default()).unwrap_err(),
            AnalysisError::ColumnNotFound("nope".into())
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let df = frame(&[Some("b"), Some("a"), Some("b")]);
        let first = analyze_frequency(&df, "answer", &AnalysisOptions::default()).unwrap();
        let second = analyze_frequency(&df, "answer", &AnalysisOptions::default()).unwrap();
        assert_eq!(first, second);
    }
}
