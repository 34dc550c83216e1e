use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};

use super::{resolve, GapReport};
use crate::{auth::services::AuthUser, error::StoreError, state::AppState};

pub fn gap_routes() -> Router<AppState> {
    Router::new()
        .route("/me/gaps", get(my_gaps))
        .route("/users/:id/gaps", get(user_gaps))
}

#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn my_gaps(State(state): State<AppState>, auth: AuthUser) -> Json<GapReport> {
    Json(resolve(state.store.as_ref(), &auth.user))
}

#[instrument(skip(state, _auth))]
pub async fn user_gaps(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<GapReport>, (StatusCode, String)> {
    let user = state
        .store
        .user(&id)
        .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
    let report = resolve(state.store.as_ref(), &user);
    debug!(user_id = %id, "gap report computed");
    Ok(Json(report))
}
