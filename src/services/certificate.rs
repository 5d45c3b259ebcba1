use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::classroom::ClassroomClient;
use crate::db::repository;
use crate::error::AppError;
use crate::models::Certificate;
use crate::services::progress::{CourseProgress, ProgressResolver};

pub struct CertificateIssuer {
    db: SqlitePool,
    classroom: Arc<dyn ClassroomClient>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CertificateOutcome {
    Issued { certificate: Certificate },
    NotEligible {
        percent_complete: u8,
        progress: CourseProgress,
    },
}

impl CertificateIssuer {
    pub fn new(db: SqlitePool, classroom: Arc<dyn ClassroomClient>) -> Self {
        Self { db, classroom }
    }

    /// Idempotent get-or-issue. An existing certificate is always returned
    /// untouched; otherwise eligibility is computed fresh and a certificate
    /// is issued only when all four stages are complete.
    pub async fn get_or_issue(
        &self,
        course_id: &str,
        student_email: &str,
        name_hint: Option<&str>,
    ) -> Result<CertificateOutcome, AppError> {
        if let Some(existing) =
            repository::find_certificate(&self.db, student_email, course_id).await?
        {
            return Ok(CertificateOutcome::Issued {
                certificate: existing,
            });
        }

        let resolver = ProgressResolver::new(self.db.clone(), self.classroom.clone());
        let progress = resolver.resolve(course_id, student_email).await?;

        if !progress.all_complete() {
            return Ok(CertificateOutcome::NotEligible {
                percent_complete: progress.percent_complete(),
                progress,
            });
        }

        let certificate = Certificate {
            certificate_number: generate_certificate_number(),
            student_email: student_email.to_string(),
            course_id: course_id.to_string(),
            student_name: self.display_name(student_email, name_hint).await,
            completion_data: serde_json::to_string(&progress.snapshot())
                .map_err(|_| AppError::InternalServerError)?,
            issued_at: Utc::now().to_rfc3339(),
        };

        match repository::insert_certificate(&self.db, &certificate).await {
            Ok(()) => {
                info!(
                    "Issued certificate {} for {} in course {}",
                    certificate.certificate_number, student_email, course_id
                );
                Ok(CertificateOutcome::Issued { certificate })
            }
            // Lost a concurrent issuance race: the unique constraint on
            // (student_email, course_id) held, hand back the winner's row.
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let existing = repository::find_certificate(&self.db, student_email, course_id)
                    .await?
                    .ok_or(AppError::InternalServerError)?;
                Ok(CertificateOutcome::Issued {
                    certificate: existing,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verified remote profile name, then the session-supplied hint, then
    /// the raw email. Profile lookup failures never block issuance.
    async fn display_name(&self, student_email: &str, name_hint: Option<&str>) -> String {
        match self.classroom.user_profile(student_email).await {
            Ok(Some(profile)) => {
                if let Some(name) = profile
                    .name
                    .and_then(|n| n.full_name)
                    .filter(|n| !n.is_empty())
                {
                    return name;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Profile lookup failed for {}: {}", student_email, e);
            }
        }

        name_hint
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| student_email.to_string())
    }
}

/// `CERT-<millis base36>-<random>`. Not cryptographic; the timestamp prefix
/// plus 8 hex chars of a v4 uuid make collisions negligible.
pub fn generate_certificate_number() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random = Uuid::new_v4().simple().to_string();
    format!("CERT-{}-{}", to_base36(millis), &random[..8])
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}
