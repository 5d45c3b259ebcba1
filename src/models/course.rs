use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Mirror of a remote course. Written only by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub course_id: String,
    pub name: String,
    pub section: Option<String>,
    pub room: Option<String>,
    pub state: String,
    pub owner_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub last_synced_at: String,
}
