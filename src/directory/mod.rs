//! People and organisation catalogue: users, departments, job profiles,
//! skills and the activity log.

mod catalog;
pub mod handlers;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::log_routes())
        .merge(catalog::department_routes())
        .merge(catalog::job_routes())
        .merge(catalog::skill_routes())
}
