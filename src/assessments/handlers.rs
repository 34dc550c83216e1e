use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    auth::services::AuthUser,
    model::{Assessment, AssessmentType, NewAssessment, Proficiency},
    state::AppState,
    store::AssessmentFilter,
};

pub fn assessment_routes() -> Router<AppState> {
    Router::new().route("/assessments", get(list_assessments).post(submit_assessment))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentQuery {
    pub rater_id: Option<String>,
    pub subject_id: Option<String>,
}

/// Rating as submitted by the caller, who is always the rater.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssessment {
    pub subject_id: String,
    pub skill_id: String,
    pub score: Proficiency,
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "type")]
    pub kind: AssessmentType,
}

#[instrument(skip(state, _auth))]
pub async fn list_assessments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<AssessmentQuery>,
) -> Json<Vec<Assessment>> {
    let filter = AssessmentFilter {
        rater_id: q.rater_id,
        subject_id: q.subject_id,
    };
    Json(state.store.assessments(&filter))
}

#[instrument(skip(state, auth, payload), fields(rater_id = %auth.user.id))]
pub async fn submit_assessment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SubmitAssessment>,
) -> (StatusCode, Json<Assessment>) {
    let assessment = state.store.add_assessment(NewAssessment {
        rater_id: auth.user.id,
        subject_id: payload.subject_id,
        skill_id: payload.skill_id,
        score: payload.score,
        comment: payload.comment,
        kind: payload.kind,
    });
    info!(assessment_id = %assessment.id, subject_id = %assessment.subject_id, "assessment submitted");
    (StatusCode::CREATED, Json(assessment))
}
