//! Feature flag inspection endpoint

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};

use super::resolve::user_id_from_headers;
use super::router::AppState;
use super::types::FlagResponse;
use crate::errors::Result;

/// GET /api/flags/{name}
pub async fn get_flag(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<FlagResponse>> {
    let user_id = user_id_from_headers(&headers);
    let flag = state.gate.describe(&name)?;
    let enabled_for_user = state.gate.is_enabled(&name, &user_id);

    Ok(Json(FlagResponse {
        name: flag.name,
        enabled_for_user,
        rollout_percentage: flag.rollout_percentage,
    }))
}
