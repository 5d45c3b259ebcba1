pub mod certificate;
pub mod progress;
pub mod scheduler;
pub mod sync_service;

pub use certificate::{CertificateIssuer, CertificateOutcome};
pub use progress::{CourseProgress, ProgressResolver};
pub use scheduler::SyncScheduler;
pub use sync_service::{SyncService, SyncStats};
