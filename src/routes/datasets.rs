use axum::{
    extract::{rejection::BytesRejection, Path, Query, State},
    http::{header::CONTENT_LENGTH, HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    error::{AppError, LoadError},
    models::{AnalysisOptions, DatasetProfile},
    services::{
        analyze_association, analyze_frequency, column_pairs,
        file_processor,
        loader::LoadOptions,
        presentation::{AssociationView, FrequencyView},
        profile::profile_dataset,
        sessions::Dataset,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/datasets", post(upload_dataset))
        .route("/datasets/:id", get(get_dataset).delete(delete_dataset))
        .route("/datasets/:id/pairs", get(list_pairs))
        .route("/datasets/:id/frequency", get(frequency))
        .route("/datasets/:id/association", get(association))
        .layer(cors)
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub name: Option<String>,
    pub delimiter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FrequencyParams {
    pub column: String,
    pub missing: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssociationParams {
    pub column_a: String,
    pub column_b: String,
    pub missing: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    pub id: Uuid,
    pub file_name: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub delimiter: String,
    pub skipped_rows: usize,
    pub profile: DatasetProfile,
}

#[derive(Debug, Serialize)]
pub struct PairsResponse {
    pub pairs: Vec<(String, String)>,
}

pub async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<DatasetResponse>), AppError> {
    let body = body.map_err(|rejection| {
        upload_rejection(&rejection, &headers, state.config.max_file_size)
    })?;
    let options = LoadOptions {
        delimiter: params.delimiter.as_deref().map(parse_delimiter).transpose()?,
        max_size: Some(state.config.max_file_size),
    };

    let dataset = file_processor::process_upload(&body, params.name, &options)?;
    let dataset = state.sessions.insert(dataset);

    Ok((StatusCode::CREATED, Json(describe(&dataset, state.config.preview_rows))))
}

pub async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DatasetResponse>, AppError> {
    let dataset = find_dataset(&state, &id)?;
    Ok(Json(describe(&dataset, state.config.preview_rows)))
}

pub async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .remove(&id)
        .map(|_| {
            tracing::info!("Dataset {} removed", id);
            StatusCode::NO_CONTENT
        })
        .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
}

pub async fn list_pairs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PairsResponse>, AppError> {
    let dataset = find_dataset(&state, &id)?;
    Ok(Json(PairsResponse {
        pairs: column_pairs(&dataset.frame),
    }))
}

pub async fn frequency(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<FrequencyParams>,
) -> Result<Json<FrequencyView>, AppError> {
    let start = std::time::Instant::now();
    let dataset = find_dataset(&state, &id)?;
    let options = analysis_options(&state, params.missing.as_deref())?;

    let table = analyze_frequency(&dataset.frame, &params.column, &options).map_err(|e| {
        tracing::warn!("Frequency analysis of '{}' on {} failed: {}", params.column, id, e);
        AppError::from(e)
    })?;

    tracing::info!(
        "Frequency of '{}' on {}: {} distinct values in {:?}",
        params.column,
        id,
        table.entries.len(),
        start.elapsed()
    );
    Ok(Json(FrequencyView::from(&table)))
}

pub async fn association(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<AssociationParams>,
) -> Result<Json<AssociationView>, AppError> {
    let start = std::time::Instant::now();
    let dataset = find_dataset(&state, &id)?;
    let options = analysis_options(&state, params.missing.as_deref())?;

    let result =
        analyze_association(&dataset.frame, &params.column_a, &params.column_b, &options)
            .map_err(|e| {
                tracing::warn!(
                    "Association of '{}' x '{}' on {} failed: {}",
                    params.column_a,
                    params.column_b,
                    id,
                    e
                );
                AppError::from(e)
            })?;

    tracing::info!(
        "Association of '{}' x '{}' on {}: chi2={}, V={} in {:?}",
        params.column_a,
        params.column_b,
        id,
        result.chi_square,
        result.cramers_v,
        start.elapsed()
    );
    Ok(Json(AssociationView::new(&result, state.config.decimal_places)))
}

fn find_dataset(state: &AppState, id: &Uuid) -> Result<Arc<Dataset>, AppError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
}

fn analysis_options(state: &AppState, missing: Option<&str>) -> Result<AnalysisOptions, AppError> {
    state.config.analysis_options(missing).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "missing must be 'drop' or 'category', got '{}'",
            missing.unwrap_or_default()
        ))
    })
}

/// The body limit layer stops oversized uploads before the loader sees them.
fn upload_rejection(rejection: &BytesRejection, headers: &HeaderMap, limit: usize) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        tracing::warn!("Upload rejected: over the {} byte limit", limit);
        AppError::Load(LoadError::TooLarge { size, limit })
    } else {
        AppError::InvalidInput(rejection.body_text())
    }
}

fn parse_delimiter(raw: &str) -> Result<u8, AppError> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() && *byte != b'"' && *byte != b'\n' => Ok(*byte),
            _ => Err(AppError::InvalidInput(format!(
                "delimiter must be a single ASCII character, got '{}'",
                raw
            ))),
        },
    }
}

fn describe(dataset: &Dataset, preview_rows: usize) -> DatasetResponse {
    DatasetResponse {
        id: dataset.id,
        file_name: dataset.file_name.clone(),
        loaded_at: dataset.loaded_at,
        delimiter: (dataset.delimiter as char).to_string(),
        skipped_rows: dataset.skipped_rows,
        profile: profile_dataset(&dataset.frame, preview_rows),
    }
}
