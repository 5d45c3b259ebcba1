use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const SYNC_STATUS_IN_PROGRESS: &str = "in_progress";
pub const SYNC_STATUS_COMPLETED: &str = "completed";
pub const SYNC_STATUS_FAILED: &str = "failed";

/// One row per sync run. Inserted as in_progress, finalized exactly once
/// to a terminal status and never touched again.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncLog {
    pub sync_id: String,
    pub sync_type: String,
    pub status: String,
    pub records_processed: i64,
    pub records_synced: i64,
    pub records_failed: i64,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
}
