use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const STAGE_PRE_SURVEY: &str = "pre-survey";
pub const STAGE_IDEAS: &str = "ideas";
pub const STAGE_POST_SURVEY: &str = "post-survey";
pub const STAGE_COURSE: &str = "course";
pub const STAGE_MATERIAL_PREFIX: &str = "material-";

/// Authoritative local record that a student finished a stage. Row
/// existence is the completion signal; created only by explicit student
/// action, never by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StageCompletion {
    pub course_id: String,
    pub student_email: String,
    pub stage_id: String,
    pub completed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompletionRequest {
    pub course_id: String,
    pub student_email: String,
    pub stage_id: String,
}

pub fn is_valid_stage_id(stage_id: &str) -> bool {
    matches!(
        stage_id,
        STAGE_PRE_SURVEY | STAGE_IDEAS | STAGE_POST_SURVEY | STAGE_COURSE
    ) || (stage_id.len() > STAGE_MATERIAL_PREFIX.len()
        && stage_id.starts_with(STAGE_MATERIAL_PREFIX))
}

/// Stage id for one learning-module coursework item.
pub fn material_stage_id(course_work_id: &str) -> String {
    format!("{STAGE_MATERIAL_PREFIX}{course_work_id}")
}
