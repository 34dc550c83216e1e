use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::services::AuthUser,
    error::StoreError,
    model::{Department, JobProfile, Skill},
    state::AppState,
};

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn department_routes() -> Router<AppState> {
    Router::new()
        .route("/departments", get(list_departments).post(create_department))
        .route(
            "/departments/:id",
            get(get_department).put(update_department).delete(delete_department),
        )
}

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job).put(update_job).delete(delete_job))
}

pub fn skill_routes() -> Router<AppState> {
    Router::new()
        .route("/skills", get(list_skills).post(create_skill))
        .route(
            "/skills/:id",
            get(get_skill).put(update_skill).delete(delete_skill),
        )
}

// --- departments ---

#[instrument(skip(state, _auth))]
pub async fn list_departments(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<Vec<Department>> {
    Json(state.store.all_departments())
}

#[instrument(skip(state, _auth))]
pub async fn get_department(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Department>> {
    let dept = state
        .store
        .department(&id)
        .ok_or_else(|| StoreError::NotFound(format!("department {id}")))?;
    Ok(Json(dept))
}

#[instrument(skip(state, auth, payload), fields(admin_id = %auth.user.id))]
pub async fn create_department(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<Department>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    auth.require_admin()?;
    let dept = state.store.add_department(payload)?;
    info!(department_id = %dept.id, "department created");
    Ok((StatusCode::CREATED, Json(dept)))
}

#[instrument(skip(state, auth, payload), fields(admin_id = %auth.user.id))]
pub async fn update_department(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(mut payload): Json<Department>,
) -> ApiResult<Json<Department>> {
    auth.require_admin()?;
    payload.id = id;
    Ok(Json(state.store.update_department(payload)?))
}

#[instrument(skip(state, auth), fields(admin_id = %auth.user.id))]
pub async fn delete_department(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.store.remove_department(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- job profiles ---

#[instrument(skip(state, _auth))]
pub async fn list_jobs(State(state): State<AppState>, _auth: AuthUser) -> Json<Vec<JobProfile>> {
    Json(state.store.all_job_profiles())
}

#[instrument(skip(state, _auth))]
pub async fn get_job(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<JobProfile>> {
    let job = state
        .store
        .job_profile(&id)
        .ok_or_else(|| StoreError::NotFound(format!("job profile {id}")))?;
    Ok(Json(job))
}

#[instrument(skip(state, auth, payload), fields(admin_id = %auth.user.id))]
pub async fn create_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<JobProfile>,
) -> ApiResult<(StatusCode, Json<JobProfile>)> {
    auth.require_admin()?;
    let job = state.store.add_job_profile(payload)?;
    info!(job_id = %job.id, "job profile created");
    Ok((StatusCode::CREATED, Json(job)))
}

#[instrument(skip(state, auth, payload), fields(admin_id = %auth.user.id))]
pub async fn update_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(mut payload): Json<JobProfile>,
) -> ApiResult<Json<JobProfile>> {
    auth.require_admin()?;
    payload.id = id;
    Ok(Json(state.store.update_job_profile(payload)?))
}

#[instrument(skip(state, auth), fields(admin_id = %auth.user.id))]
pub async fn delete_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.store.remove_job_profile(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- skills ---

#[instrument(skip(state, _auth))]
pub async fn list_skills(State(state): State<AppState>, _auth: AuthUser) -> Json<Vec<Skill>> {
    Json(state.store.all_skills())
}

#[instrument(skip(state, _auth))]
pub async fn get_skill(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Skill>> {
    let skill = state
        .store
        .skill(&id)
        .ok_or_else(|| StoreError::NotFound(format!("skill {id}")))?;
    Ok(Json(skill))
}

#[instrument(skip(state, auth, payload), fields(admin_id = %auth.user.id))]
pub async fn create_skill(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<Skill>,
) -> ApiResult<(StatusCode, Json<Skill>)> {
    auth.require_admin()?;
    let skill = state.store.add_skill(payload)?;
    info!(skill_id = %skill.id, "skill defined");
    Ok((StatusCode::CREATED, Json(skill)))
}

#[instrument(skip(state, auth, payload), fields(admin_id = %auth.user.id))]
pub async fn update_skill(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(mut payload): Json<Skill>,
) -> ApiResult<Json<Skill>> {
    auth.require_admin()?;
    payload.id = id;
    Ok(Json(state.store.update_skill(payload)?))
}

#[instrument(skip(state, auth), fields(admin_id = %auth.user.id))]
pub async fn delete_skill(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.store.remove_skill(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::app::build_app;
    use crate::directory::handlers::test_support::{bearer, body_json, request};

    #[tokio::test]
    async fn skill_levels_round_trip_through_the_api() {
        let state = AppState::fake();
        let auth = bearer(&state, "u1");
        let app = build_app(state.clone());

        let body = json!({
            "name": "Welding Inspection",
            "category": "Technical",
            "levels": {
                "1": {"level": 1, "description": "Observes", "requiredCertificates": []},
                "3": {"level": 3, "description": "Inspects", "requiredCertificates": ["CSWIP 3.1"]}
            }
        });
        let res = app
            .clone()
            .oneshot(request(Method::POST, "/api/v1/skills", &auth, Some(body)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let id = body_json(res).await["id"].as_str().unwrap().to_string();

        let res = app
            .oneshot(request(Method::GET, &format!("/api/v1/skills/{id}"), &auth, None))
            .await
            .unwrap();
        let skill = body_json(res).await;
        assert_eq!(skill["levels"]["3"]["requiredCertificates"][0], "CSWIP 3.1");
        assert!(skill["levels"].get("2").is_none());
    }

    #[tokio::test]
    async fn unknown_department_is_not_found() {
        let state = AppState::fake();
        let auth = bearer(&state, "u1");
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/departments/d9", &auth, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .oneshot(request(
                Method::PUT,
                "/api/v1/departments/d9",
                &auth,
                Some(json!({"name": "Ghost"})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_removes_job_profile() {
        let state = AppState::fake();
        let auth = bearer(&state, "u1");
        let res = build_app(state.clone())
            .oneshot(request(Method::DELETE, "/api/v1/jobs/j2", &auth, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(state.store.job_profile("j2").is_none());
        assert_eq!(state.store.system_logs()[0].action, "Removed Job Profile");
    }
}
