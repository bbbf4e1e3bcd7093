//! Exercise resolution endpoint

use axum::{extract::State, http::HeaderMap, response::Json};

use super::router::AppState;
use super::types::{ResolveRequest, ResolveResponse};
use crate::errors::{AppError, Result};
use crate::service::ResolveOptions;

/// User identity comes from a header so anonymous voice clients still work
pub fn user_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

/// POST /api/exercises/resolve
pub async fn resolve_exercise(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>> {
    let user_id = user_id_from_headers(&headers);
    if let Some(threshold) = request.fuzzy_threshold {
        crate::validation::validate_threshold(threshold)
            .map_err(|_| AppError::InvalidThreshold(threshold))?;
    }

    let outcome = state
        .resolve_or_create(
            &request.name,
            &user_id,
            &ResolveOptions {
                auto_create: request.auto_create,
                fuzzy_threshold: request.fuzzy_threshold,
                use_generative_synonyms: request.use_generative_synonyms,
            },
        )
        .await?;

    tracing::info!(
        name = %request.name,
        stage = outcome.stage.as_label(),
        success = outcome.success(),
        "resolved exercise"
    );

    Ok(Json(ResolveResponse::from(outcome)))
}
