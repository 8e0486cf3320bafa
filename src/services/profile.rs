use std::collections::HashSet;

use polars::prelude::*;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::models::{ColumnInfo, DatasetProfile, MissingPolicy, SAMPLE_SIZE};
use crate::services::normalize::column_text;

/// Summarizes a loaded table: shape, first rows and per-column statistics.
pub fn profile_dataset(frame: &DataFrame, preview_rows: usize) -> DatasetProfile {
    let columns: Vec<ColumnInfo> = frame
        .get_columns()
        .par_iter()
        .map(|series| {
            let values = column_text(frame, series.name(), &MissingPolicy::Drop)
                .unwrap_or_default();
            analyze_column(&values, series.name(), series.dtype())
        })
        .collect();

    DatasetProfile {
        row_count: frame.height(),
        column_count: frame.width(),
        preview: preview(frame, preview_rows),
        columns,
    }
}

fn preview(frame: &DataFrame, rows: usize) -> Vec<Vec<Option<String>>> {
    let head = frame.head(Some(rows));
    let columns: Vec<Vec<Option<String>>> = head
        .get_column_names()
        .iter()
        .map(|name| column_text(&head, name, &MissingPolicy::Drop).unwrap_or_default())
        .collect();

    (0..head.height())
        .map(|row| {
            columns
                .iter()
                .map(|column| column.get(row).cloned().flatten())
                .collect()
        })
        .collect()
}

fn analyze_column(values: &[Option<String>], name: &str, dtype: &DataType) -> ColumnInfo {
    let (null_count, seen_values) = values
        .par_iter()
        .fold(
            || (0usize, HashSet::new()),
            |(mut nulls, mut seen), value| {
                match value {
                    Some(text) => {
                        seen.insert(text.as_str());
                    }
                    None => nulls += 1,
                }
                (nulls, seen)
            },
        )
        .reduce(
            || (0, HashSet::new()),
            |a, b| {
                let mut combined_set = a.1;
                combined_set.extend(b.1);
                (a.0 + b.0, combined_set)
            },
        );

    let sample_values: SmallVec<[String; SAMPLE_SIZE]> = values
        .iter()
        .flatten()
        .take(SAMPLE_SIZE)
        .cloned()
        .collect();

    ColumnInfo {
        name: name.to_string(),
        data_type: data_type_name(dtype).to_string(),
        sample_values,
        null_count,
        unique_count: seen_values.len(),
        has_duplicates: seen_values.len() < values.len() - null_count,
    }
}

fn data_type_name(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Int64 | DataType::Int32 => "integer",
        DataType::Float64 | DataType::Float32 => "float",
        DataType::Boolean => "boolean",
        DataType::String => "string",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::loader::{load_csv, LoadOptions};

    #[test]
    fn profiles_columns_and_preview() {
        let csv = b"gender,age,answer\nF,31,yes\nM,,no\nF,45,yes\nF,22,\nM,31,no\nM,50,yes\n";
        let loaded = load_csv(csv, &LoadOptions::default()).unwrap();
        let profile = profile_dataset(&loaded.frame, 5);

        assert_eq!(profile.row_count, 6);
        assert_eq!(profile.column_count, 3);
        assert_eq!(profile.preview.len(), 5);
        assert_eq!(
            profile.preview[0],
            vec![Some("F".to_string()), Some("31".to_string()), Some("yes".to_string())]
        );
        assert_eq!(profile.preview[1][1], None);

        let age = &profile.columns[1];
        assert_eq!(age.name, "age");
        assert_eq!(age.data_type, "integer");
        assert_eq!(age.null_count, 1);
        assert_eq!(age.unique_count, 4);
        assert!(age.has_duplicates);
        assert_eq!(age.sample_values.as_slice(), &["31", "45", "22"]);

        let answer = &profile.columns[2];
        assert_eq!(answer.data_type, "string");
        assert_eq!(answer.null_count, 1);
        assert_eq!(answer.unique_count, 2);
    }

    #[test]
    fn preview_is_bounded_by_row_count() {
        let loaded = load_csv(b"a\nx\n", &LoadOptions::default()).unwrap();
        let profile = profile_dataset(&loaded.frame, 5);
        assert_eq!(profile.preview, vec![vec![Some("x".to_string())]]);
        assert!(!profile.columns[0].has_duplicates);
    }
}
