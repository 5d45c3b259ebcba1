use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ROLE_TEACHER: &str = "TEACHER";
pub const ROLE_STUDENT: &str = "STUDENT";

/// One row per (course, user, role). Written only by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RosterMembership {
    pub course_id: String,
    pub user_email: String,
    pub role: String,
    pub user_id: Option<String>,
    pub full_name: Option<String>,
    pub last_synced_at: String,
}
