//! Competency gap analysis: required vs. current proficiency per skill.

pub mod handlers;
mod resolver;

use axum::Router;

use crate::state::AppState;

pub use resolver::{resolve, CompetencyCatalog, GapReport};

pub fn router() -> Router<AppState> {
    handlers::gap_routes()
}
