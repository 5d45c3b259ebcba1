use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Mirror of a remote student submission. Written only by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub submission_id: String,
    pub course_id: String,
    pub course_work_id: String,
    pub user_email: String,
    pub state: String,
    pub assigned_grade: Option<f64>,
    pub late: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub last_synced_at: String,
}

impl Submission {
    /// TURNED_IN and RETURNED both count as done for stage resolution.
    pub fn is_turned_in(&self) -> bool {
        matches!(self.state.as_str(), "TURNED_IN" | "RETURNED")
    }
}
