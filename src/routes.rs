use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Course, NewCompletionRequest, StageCompletion, completion::is_valid_stage_id};
use crate::services::{
    CertificateIssuer, CertificateOutcome, CourseProgress, ProgressResolver, SyncService, SyncStats,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync", post(sync_now))
        .route("/courses", get(list_courses))
        .route("/courses/{course_id}/progress", get(get_progress))
        .route("/courses/{course_id}/certificate", post(get_or_issue_certificate))
        .route("/completions", post(record_completion))
        .with_state(state)
}

/// The authenticated student is resolved by the out-of-scope session layer
/// and handed to these endpoints as query parameters.
#[derive(Deserialize)]
struct StudentQuery {
    student: String,
    #[serde(default)]
    name: Option<String>,
}

async fn health(State(state): State<AppState>) -> Result<axum::http::StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(axum::http::StatusCode::OK)
}

async fn sync_now(State(state): State<AppState>) -> Result<Json<SyncStats>, AppError> {
    let service = SyncService::new(state.db.clone(), state.classroom.clone());
    let stats = service.sync_all().await?;
    Ok(Json(stats))
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

async fn get_progress(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<CourseProgress>, AppError> {
    repository::find_course(&state.db, &course_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let resolver = ProgressResolver::new(state.db.clone(), state.classroom.clone());
    let progress = resolver.resolve(&course_id, &query.student).await?;
    Ok(Json(progress))
}

async fn get_or_issue_certificate(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<CertificateOutcome>, AppError> {
    repository::find_course(&state.db, &course_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let issuer = CertificateIssuer::new(state.db.clone(), state.classroom.clone());
    let outcome = issuer
        .get_or_issue(&course_id, &query.student, query.name.as_deref())
        .await?;
    Ok(Json(outcome))
}

async fn record_completion(
    State(state): State<AppState>,
    Json(req): Json<NewCompletionRequest>,
) -> Result<Json<StageCompletion>, AppError> {
    if !is_valid_stage_id(&req.stage_id) {
        return Err(AppError::BadRequest(format!(
            "invalid stage id: {}",
            req.stage_id
        )));
    }

    let completion = repository::upsert_stage_completion(
        &state.db,
        &req.course_id,
        &req.student_email,
        &req.stage_id,
    )
    .await?;
    Ok(Json(completion))
}
