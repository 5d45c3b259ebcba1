use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Point-in-time attestation of full completion. Immutable after insert:
/// no update or delete path exists, and certificate numbers are never
/// regenerated for an existing row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub certificate_number: String,
    pub student_email: String,
    pub course_id: String,
    pub student_name: String,
    /// JSON-serialized [`CompletionSnapshot`] taken at issuance.
    pub completion_data: String,
    pub issued_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSnapshot {
    pub pre_survey: bool,
    pub course: bool,
    pub ideas: bool,
    pub post_survey: bool,
    pub modules_completed: usize,
    pub modules_total: usize,
}
