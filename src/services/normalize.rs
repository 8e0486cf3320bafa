use polars::prelude::*;

use crate::error::AnalysisError;
use crate::models::MissingPolicy;

/// Renders every cell of `column` as text.
///
/// Numbers, booleans and strings all go through the same cast so a column
/// mixing types compares cleanly. Null cells become `None` under
/// [`MissingPolicy::Drop`] and the policy label under
/// [`MissingPolicy::Category`].
pub fn column_text(
    frame: &DataFrame,
    column: &str,
    policy: &MissingPolicy,
) -> Result<Vec<Option<String>>, AnalysisError> {
    let series = frame
        .column(column)
        .map_err(|_| AnalysisError::ColumnNotFound(column.to_string()))?;

    let fill = match policy {
        MissingPolicy::Drop => None,
        MissingPolicy::Category(label) => Some(label.as_str()),
    };

    if let Ok(text) = series.cast(&DataType::String) {
        if let Ok(values) = text.str() {
            return Ok(values
                .into_iter()
                .map(|cell| cell.or(fill).map(str::to_string))
                .collect());
        }
    }

    // Nested dtypes have no string cast; fall back to per-cell rendering.
    Ok((0..series.len())
        .map(|idx| match series.get(idx) {
            Ok(AnyValue::Null) | Err(_) => fill.map(str::to_string),
            Ok(value) => Some(value.to_string()),
        })
        .collect())
}

pub fn has_column(frame: &DataFrame, column: &str) -> bool {
    frame.get_column_names().iter().any(|name| *name == column)
}
