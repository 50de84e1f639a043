//! Catalog maintenance API handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use moviebox_core::{CatalogStats, ScanReport};
use tracing::info;

use super::{blocking, ApiError, SuccessResponse};
use crate::state::AppState;

/// GET /api/v1/catalog/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogStats>, ApiError> {
    let catalog = Arc::clone(state.catalog());
    let stats = blocking(move || Ok(catalog.stats())).await?;
    Ok(Json(stats))
}

/// POST /api/v1/catalog/refresh
///
/// Reconcile the catalog with the filesystem. On failure the previous
/// catalog stays in place.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<ScanReport>, ApiError> {
    let catalog = Arc::clone(state.catalog());
    let report = blocking(move || catalog.refresh()).await?;
    info!(
        "Manual refresh: {} added, {} removed",
        report.added, report.removed
    );
    Ok(Json(report))
}

/// POST /api/v1/catalog/save
pub async fn save(State(state): State<Arc<AppState>>) -> Result<Json<SuccessResponse>, ApiError> {
    let catalog = Arc::clone(state.catalog());
    blocking(move || catalog.save()).await?;
    Ok(Json(SuccessResponse {
        message: "Catalog saved".to_string(),
    }))
}
