//! Substitute recommendation endpoint

use axum::{extract::State, http::HeaderMap, response::Json};

use super::resolve::user_id_from_headers;
use super::router::AppState;
use super::types::{SubstituteRequest, SubstituteResponse};
use crate::errors::{Result, ValidationErrorExt};
use crate::validation::validate_reason;

/// POST /api/exercises/substitutes
pub async fn recommend_substitutes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubstituteRequest>,
) -> Result<Json<SubstituteResponse>> {
    let user_id = user_id_from_headers(&headers);
    if let Some(reason) = &request.reason {
        validate_reason(reason).map_validation_err("reason")?;
    }

    let outcome = state
        .recommend_substitutes(
            &request.exercise_name,
            &user_id,
            request.injured_body_part.as_deref(),
            request.show_more,
        )
        .await?;

    tracing::info!(
        source = %outcome.source.display_name,
        reason = request.reason.as_deref().unwrap_or(""),
        count = outcome.recommendations.len(),
        context_aware = outcome.context_aware,
        reranked = outcome.reranked,
        "recommended substitutes"
    );

    Ok(Json(SubstituteResponse::from(outcome)))
}
