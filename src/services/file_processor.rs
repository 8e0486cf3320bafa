use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::loader::{load_csv, LoadOptions};
use crate::services::sessions::Dataset;

/// Reads an uploaded CSV body into a new, unsaved dataset.
pub fn process_upload(
    file_data: &Bytes,
    file_name: Option<String>,
    options: &LoadOptions,
) -> Result<Dataset, AppError> {
    let start = std::time::Instant::now();
    tracing::info!(
        "Processing upload {:?}, size: {}KB",
        file_name,
        file_data.len() / 1024
    );

    let loaded = load_csv(file_data, options).map_err(|e| {
        tracing::error!("Failed to load {:?}: {}", file_name, e);
        AppError::from(e)
    })?;

    if loaded.skipped_rows > 0 {
        tracing::warn!("Skipped {} malformed rows in {:?}", loaded.skipped_rows, file_name);
    }
    tracing::info!(
        "Loaded {} rows x {} columns (delimiter {:?}) in {:?}",
        loaded.frame.height(),
        loaded.frame.width(),
        loaded.delimiter as char,
        start.elapsed()
    );

    Ok(Dataset {
        id: Uuid::new_v4(),
        file_name,
        loaded_at: Utc::now(),
        delimiter: loaded.delimiter,
        skipped_rows: loaded.skipped_rows,
        frame: loaded.frame,
    })
}
