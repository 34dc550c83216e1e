use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        services::{AuthUser, JwtKeys},
    },
    model::{User, UserStatus},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(
    state: &AppState,
    user: User,
    session: Option<uuid::Uuid>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    let (access_token, refresh_token) = keys.sign_pair(&user.id, session).map_err(|e| {
        error!(error = %e, user_id = %user.id, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user,
    }))
}

/// Self-registration. The account stays PENDING until an administrator
/// approves it, so no tokens are issued here.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    let user = state
        .store
        .sign_up(&payload.email, &payload.password, &payload.name)
        .await
        .map_err(|e| {
            warn!(email = %payload.email, error = %e, "registration refused");
            e
        })?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let login = state
        .store
        .login_with_password(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            warn!(email = %payload.email, error = %e, "login refused");
            e
        })?;
    issue_tokens(&state, login.user, login.session)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    let user = state
        .store
        .user(&claims.sub)
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;
    if user.status != UserStatus::Active {
        return Err((StatusCode::FORBIDDEN, "Account is not active".to_string()));
    }
    issue_tokens(&state, user, claims.sid)
}

#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> StatusCode {
    state.store.sign_out(auth.session).await;
    info!("user logged out");
    StatusCode::NO_CONTENT
}

#[instrument(skip(auth), fields(user_id = %auth.user.id))]
pub async fn get_me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}
