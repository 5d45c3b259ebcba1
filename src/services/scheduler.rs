use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::classroom::ClassroomClient;
use crate::services::sync_service::SyncService;

/// Periodic background sync. Runs forever; a failed run is logged and the
/// loop continues with the next tick.
pub struct SyncScheduler {
    db: SqlitePool,
    classroom: Arc<dyn ClassroomClient>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(db: SqlitePool, classroom: Arc<dyn ClassroomClient>, interval_secs: u64) -> Self {
        Self {
            db,
            classroom,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub async fn start(self) {
        info!("Starting sync scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            let service = SyncService::new(self.db.clone(), self.classroom.clone());
            match service.sync_all().await {
                Ok(stats) => {
                    info!(
                        "Scheduled sync done: {} courses, {} roster, {} coursework, {} submissions, {} failed",
                        stats.courses_synced,
                        stats.roster_synced,
                        stats.coursework_synced,
                        stats.submissions_synced,
                        stats.records_failed
                    );
                }
                Err(e) => {
                    warn!("Scheduled sync failed: {:?}", e);
                }
            }
        }
    }
}
