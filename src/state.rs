use std::sync::Arc;

use sqlx::SqlitePool;

use crate::classroom::ClassroomClient;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub classroom: Arc<dyn ClassroomClient>,
}
