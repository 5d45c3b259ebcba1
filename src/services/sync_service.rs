use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::classroom::{ClassroomClient, dto};
use crate::db::repository;
use crate::error::AppError;
use crate::models::{
    Course, Coursework, RosterMembership, Submission, SyncLog,
    roster::{ROLE_STUDENT, ROLE_TEACHER},
    sync_log::{SYNC_STATUS_COMPLETED, SYNC_STATUS_FAILED, SYNC_STATUS_IN_PROGRESS},
};

pub struct SyncService {
    db: SqlitePool,
    classroom: Arc<dyn ClassroomClient>,
}

#[derive(Debug, Serialize)]
pub struct SyncStats {
    pub sync_id: String,
    pub courses_synced: usize,
    pub roster_synced: usize,
    pub coursework_synced: usize,
    pub submissions_synced: usize,
    pub records_failed: usize,
}

impl SyncStats {
    fn new(sync_id: String) -> Self {
        Self {
            sync_id,
            courses_synced: 0,
            roster_synced: 0,
            coursework_synced: 0,
            submissions_synced: 0,
            records_failed: 0,
        }
    }

    pub fn records_processed(&self) -> usize {
        self.courses_synced
            + self.roster_synced
            + self.coursework_synced
            + self.submissions_synced
            + self.records_failed
    }

    fn records_synced(&self) -> usize {
        self.records_processed() - self.records_failed
    }
}

impl SyncService {
    pub fn new(db: SqlitePool, classroom: Arc<dyn ClassroomClient>) -> Self {
        Self { db, classroom }
    }

    /// Mirror the remote course graph into the local store. Remote failures
    /// are isolated per item and counted; local store failures abort the run
    /// and mark its sync log failed.
    pub async fn sync_all(&self) -> Result<SyncStats, AppError> {
        let sync_id = Uuid::new_v4().to_string();
        let mut stats = SyncStats::new(sync_id.clone());

        repository::insert_sync_log(
            &self.db,
            &SyncLog {
                sync_id: sync_id.clone(),
                sync_type: "full".to_string(),
                status: SYNC_STATUS_IN_PROGRESS.to_string(),
                records_processed: 0,
                records_synced: 0,
                records_failed: 0,
                started_at: Utc::now().to_rfc3339(),
                ended_at: None,
                duration_ms: None,
                error_message: None,
            },
        )
        .await?;

        info!("Starting sync {}", sync_id);

        match self.run(&mut stats).await {
            Ok(()) => {
                repository::finalize_sync_log(
                    &self.db,
                    &sync_id,
                    SYNC_STATUS_COMPLETED,
                    stats.records_processed() as i64,
                    stats.records_synced() as i64,
                    stats.records_failed as i64,
                    None,
                )
                .await?;
                info!("Sync {} completed: {:?}", sync_id, stats);
                Ok(stats)
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(log_err) = repository::finalize_sync_log(
                    &self.db,
                    &sync_id,
                    SYNC_STATUS_FAILED,
                    stats.records_processed() as i64,
                    stats.records_synced() as i64,
                    stats.records_failed as i64,
                    Some(&message),
                )
                .await
                {
                    warn!("Failed to finalize sync log {}: {}", sync_id, log_err);
                }
                Err(e)
            }
        }
    }

    async fn run(&self, stats: &mut SyncStats) -> Result<(), AppError> {
        // Nothing to isolate if course enumeration itself fails.
        let courses = self.classroom.list_courses().await?;
        info!("Syncing {} remote courses", courses.len());

        for remote in &courses {
            let now = Utc::now().to_rfc3339();
            repository::upsert_course(&self.db, &mirror_course(remote, &now)).await?;
            stats.courses_synced += 1;

            let student_emails = self.sync_roster(&remote.id, stats).await?;
            self.sync_coursework(&remote.id, &student_emails, stats).await?;
        }

        Ok(())
    }

    /// Upsert teacher and student memberships for one course. Returns the
    /// remote-user-id to email map needed to key submissions.
    async fn sync_roster(
        &self,
        course_id: &str,
        stats: &mut SyncStats,
    ) -> Result<HashMap<String, String>, AppError> {
        let mut student_emails = HashMap::new();

        match self.classroom.list_teachers(course_id).await {
            Ok(members) => {
                for member in &members {
                    match mirror_membership(course_id, member, ROLE_TEACHER) {
                        Some(row) => {
                            repository::upsert_roster_membership(&self.db, &row).await?;
                            stats.roster_synced += 1;
                        }
                        None => {
                            warn!("Teacher in course {} has no email, skipping", course_id);
                            stats.records_failed += 1;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Failed to fetch teachers for course {}: {}", course_id, e);
                stats.records_failed += 1;
            }
        }

        match self.classroom.list_students(course_id).await {
            Ok(members) => {
                for member in &members {
                    match mirror_membership(course_id, member, ROLE_STUDENT) {
                        Some(row) => {
                            if let Some(user_id) = &row.user_id {
                                student_emails.insert(user_id.clone(), row.user_email.clone());
                            }
                            repository::upsert_roster_membership(&self.db, &row).await?;
                            stats.roster_synced += 1;
                        }
                        None => {
                            warn!("Student in course {} has no email, skipping", course_id);
                            stats.records_failed += 1;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Failed to fetch students for course {}: {}", course_id, e);
                stats.records_failed += 1;
            }
        }

        Ok(student_emails)
    }

    async fn sync_coursework(
        &self,
        course_id: &str,
        student_emails: &HashMap<String, String>,
        stats: &mut SyncStats,
    ) -> Result<(), AppError> {
        let work_items = match self.classroom.list_coursework(course_id).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to fetch coursework for course {}: {}", course_id, e);
                stats.records_failed += 1;
                return Ok(());
            }
        };

        for item in &work_items {
            let now = Utc::now().to_rfc3339();
            repository::upsert_coursework(&self.db, &mirror_coursework(course_id, item, &now))
                .await?;
            stats.coursework_synced += 1;

            match self.classroom.list_submissions(course_id, &item.id).await {
                Ok(submissions) => {
                    for sub in &submissions {
                        match mirror_submission(course_id, &item.id, sub, student_emails) {
                            Some(row) => {
                                repository::upsert_submission(&self.db, &row).await?;
                                stats.submissions_synced += 1;
                            }
                            None => {
                                warn!(
                                    "Submission {} has no resolvable student email, skipping",
                                    sub.id
                                );
                                stats.records_failed += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to fetch submissions for coursework {}: {}",
                        item.id, e
                    );
                    stats.records_failed += 1;
                }
            }
        }

        Ok(())
    }
}

fn mirror_course(remote: &dto::RemoteCourse, now: &str) -> Course {
    Course {
        course_id: remote.id.clone(),
        name: remote.name.clone(),
        section: remote.section.clone(),
        room: remote.room.clone(),
        state: remote
            .course_state
            .clone()
            .unwrap_or_else(|| "PROVISIONED".to_string()),
        owner_id: remote.owner_id.clone(),
        created_at: remote.creation_time.clone(),
        updated_at: remote.update_time.clone(),
        last_synced_at: now.to_string(),
    }
}

fn mirror_membership(
    course_id: &str,
    member: &dto::RemoteMember,
    role: &str,
) -> Option<RosterMembership> {
    let profile = member.profile.as_ref()?;
    let email = profile.email_address.clone().filter(|e| !e.is_empty())?;

    Some(RosterMembership {
        course_id: course_id.to_string(),
        user_email: email,
        role: role.to_string(),
        user_id: member.user_id.clone().or_else(|| profile.id.clone()),
        full_name: profile.name.as_ref().and_then(|n| n.full_name.clone()),
        last_synced_at: Utc::now().to_rfc3339(),
    })
}

fn mirror_coursework(course_id: &str, remote: &dto::RemoteCoursework, now: &str) -> Coursework {
    Coursework {
        course_work_id: remote.id.clone(),
        course_id: course_id.to_string(),
        title: remote.title.clone(),
        max_points: remote.max_points,
        state: remote.state.clone(),
        due_date: remote.due_date.as_ref().map(|d| d.to_iso_date()),
        materials: serde_json::to_string(&remote.materials)
            .unwrap_or_else(|_| "[]".to_string()),
        last_synced_at: now.to_string(),
    }
}

fn mirror_submission(
    course_id: &str,
    course_work_id: &str,
    remote: &dto::RemoteSubmission,
    student_emails: &HashMap<String, String>,
) -> Option<Submission> {
    let user_email = remote
        .user_id
        .as_ref()
        .and_then(|id| student_emails.get(id))?
        .clone();

    Some(Submission {
        submission_id: remote.id.clone(),
        course_id: course_id.to_string(),
        course_work_id: course_work_id.to_string(),
        user_email,
        state: remote.state.clone().unwrap_or_else(|| "CREATED".to_string()),
        assigned_grade: remote.assigned_grade,
        late: remote.late,
        created_at: remote.creation_time.clone(),
        updated_at: remote.update_time.clone(),
        last_synced_at: Utc::now().to_rfc3339(),
    })
}
