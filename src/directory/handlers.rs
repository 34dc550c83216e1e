use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    auth::services::AuthUser,
    error::StoreError,
    model::{ActivityLog, User},
    state::AppState,
};

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/peers", get(list_peers))
        .route("/users/:id/subordinates", get(list_subordinates))
        .route("/users/:id/skills/:skill_id/score", get(skill_score))
}

pub fn log_routes() -> Router<AppState> {
    Router::new().route("/logs", get(list_logs))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub user_id: String,
    pub skill_id: String,
    /// 0 when the user was never assessed on the skill.
    pub score: u8,
}

fn known_user(state: &AppState, id: &str) -> Result<User, StoreError> {
    state
        .store
        .user(id)
        .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
}

#[instrument(skip(state, _auth))]
pub async fn list_users(State(state): State<AppState>, _auth: AuthUser) -> Json<Vec<User>> {
    Json(state.store.all_users())
}

#[instrument(skip(state, _auth))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(known_user(&state, &id)?))
}

#[instrument(skip(state, auth, payload), fields(admin_id = %auth.user.id))]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<User>,
) -> ApiResult<(StatusCode, Json<User>)> {
    auth.require_admin()?;
    let user = state.store.add_user(payload)?;
    info!(user_id = %user.id, "user onboarded");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, auth, payload), fields(admin_id = %auth.user.id))]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(mut payload): Json<User>,
) -> ApiResult<Json<User>> {
    auth.require_admin()?;
    payload.id = id;
    Ok(Json(state.store.update_user(payload)?))
}

#[instrument(skip(state, auth), fields(admin_id = %auth.user.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.store.remove_user(&id)?;
    info!(user_id = %id, "user removed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, _auth))]
pub async fn list_peers(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<User>>> {
    known_user(&state, &id)?;
    Ok(Json(state.store.peers(&id)))
}

#[instrument(skip(state, _auth))]
pub async fn list_subordinates(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<User>>> {
    known_user(&state, &id)?;
    Ok(Json(state.store.subordinates(&id)))
}

#[instrument(skip(state, _auth))]
pub async fn skill_score(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((user_id, skill_id)): Path<(String, String)>,
) -> Json<ScoreResponse> {
    let score = state.store.user_skill_score(&user_id, &skill_id);
    Json(ScoreResponse {
        user_id,
        skill_id,
        score,
    })
}

#[instrument(skip(state, auth), fields(admin_id = %auth.user.id))]
pub async fn list_logs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    auth.require_admin()?;
    Ok(Json(state.store.system_logs()))
}


#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;
    use tower::ServiceExt;

    use super::test_support::{bearer, body_json, request};
    use super::*;
    use crate::app::build_app;

    #[tokio::test]
    async fn employees_can_read_but_not_write() {
        let state = AppState::fake();
        let auth = bearer(&state, "u3");
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/users", &auth, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await.as_array().unwrap().len(), 5);

        let res = app
            .oneshot(request(Method::DELETE, "/api/v1/users/u4", &auth, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_creates_and_updates_users() {
        let state = AppState::fake();
        let auth = bearer(&state, "u1");
        let app = build_app(state.clone());

        let new_user = json!({
            "name": "Hana Planner", "email": "hana@erpom.com",
            "role": "EMPLOYEE", "status": "ACTIVE",
            "departmentId": "d1", "orgLevel": "FR", "managerId": "u2"
        });
        let res = app
            .clone()
            .oneshot(request(Method::POST, "/api/v1/users", &auth, Some(new_user)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let mut changed = created.clone();
        changed["name"] = json!("Hana Lead");
        let res = app
            .clone()
            .oneshot(request(Method::PUT, &format!("/api/v1/users/{id}"), &auth, Some(changed)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(state.store.user(&id).unwrap().name, "Hana Lead");

        let res = app
            .oneshot(request(Method::GET, "/api/v1/logs", &auth, None))
            .await
            .unwrap();
        let logs = body_json(res).await;
        assert_eq!(logs[0]["action"], "Updated Profile");
        assert_eq!(logs[1]["action"], "Onboarded Employee");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let state = AppState::fake();
        let auth = bearer(&state, "u1");
        let body = json!({
            "name": "Copy", "email": "sara@erpom.com",
            "role": "EMPLOYEE", "status": "ACTIVE"
        });
        let res = build_app(state)
            .oneshot(request(Method::POST, "/api/v1/users", &auth, Some(body)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn relationships_and_scores() {
        let state = AppState::fake();
        let auth = bearer(&state, "u2");
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/users/u2/subordinates", &auth, None))
            .await
            .unwrap();
        assert_eq!(body_json(res).await.as_array().unwrap().len(), 2);

        let res = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/users/u3/peers", &auth, None))
            .await
            .unwrap();
        assert_eq!(body_json(res).await[0]["id"], "u4");

        let res = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/users/u3/skills/s1/score", &auth, None))
            .await
            .unwrap();
        assert_eq!(body_json(res).await["score"], 3);

        let res = app
            .oneshot(request(Method::GET, "/api/v1/users/nobody/peers", &auth, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logs_are_admin_only() {
        let state = AppState::fake();
        let auth = bearer(&state, "u2");
        let res = build_app(state)
            .oneshot(request(Method::GET, "/api/v1/logs", &auth, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
