mod common;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use classtrack::classroom::{ClassroomClient, dto};
use classtrack::db::repository;
use classtrack::error::AppError;
use classtrack::models::{Certificate, CompletionSnapshot, Coursework};
use classtrack::services::{CertificateIssuer, CertificateOutcome};

use common::{FakeClassroom, count_rows, remote_profile, test_pool};

const COURSE: &str = "course-1";
const STUDENT: &str = "alice@school.edu";

async fn insert_coursework(pool: &SqlitePool, id: &str, title: &str) {
    repository::upsert_coursework(
        pool,
        &Coursework {
            course_work_id: id.to_string(),
            course_id: COURSE.to_string(),
            title: title.to_string(),
            max_points: Some(100.0),
            state: Some("PUBLISHED".to_string()),
            due_date: None,
            materials: "[]".to_string(),
            last_synced_at: "2026-01-01T00:00:00Z".to_string(),
        },
    )
    .await
    .expect("Failed to insert coursework");
}

/// Seeds a course where every stage is completed via local events.
async fn seed_fully_complete(pool: &SqlitePool) {
    insert_coursework(pool, "cw-pre", "Pre-Survey Form").await;
    insert_coursework(pool, "cw-m1", "Module 1").await;
    insert_coursework(pool, "cw-idea", "Idea Submission").await;
    insert_coursework(pool, "cw-post", "Post-Survey Form").await;

    for stage in ["pre-survey", "ideas", "post-survey", "material-cw-m1"] {
        repository::upsert_stage_completion(pool, COURSE, STUDENT, stage)
            .await
            .unwrap();
    }
}

fn issuer(pool: &SqlitePool, classroom: FakeClassroom) -> CertificateIssuer {
    CertificateIssuer::new(pool.clone(), Arc::new(classroom))
}

fn expect_issued(outcome: CertificateOutcome) -> classtrack::models::Certificate {
    match outcome {
        CertificateOutcome::Issued { certificate } => certificate,
        CertificateOutcome::NotEligible {
            percent_complete, ..
        } => panic!("expected issued certificate, got {percent_complete}% complete"),
    }
}

#[tokio::test]
async fn issues_once_and_returns_same_certificate_after() {
    let pool = test_pool().await;
    seed_fully_complete(&pool).await;
    let issuer = issuer(&pool, FakeClassroom::default());

    let first = expect_issued(issuer.get_or_issue(COURSE, STUDENT, None).await.unwrap());
    let second = expect_issued(issuer.get_or_issue(COURSE, STUDENT, None).await.unwrap());

    assert_eq!(first.certificate_number, second.certificate_number);
    assert_eq!(first.issued_at, second.issued_at);
    assert_eq!(count_rows(&pool, "certificates").await, 1);
    assert!(first.certificate_number.starts_with("CERT-"));
}

#[tokio::test]
async fn not_eligible_returns_breakdown_not_error() {
    let pool = test_pool().await;
    insert_coursework(&pool, "cw-pre", "Pre-Survey Form").await;
    insert_coursework(&pool, "cw-m1", "Module 1").await;
    insert_coursework(&pool, "cw-idea", "Idea Submission").await;
    insert_coursework(&pool, "cw-post", "Post-Survey Form").await;
    repository::upsert_stage_completion(&pool, COURSE, STUDENT, "pre-survey")
        .await
        .unwrap();

    let issuer = issuer(&pool, FakeClassroom::default());
    match issuer.get_or_issue(COURSE, STUDENT, None).await.unwrap() {
        CertificateOutcome::NotEligible {
            percent_complete,
            progress,
        } => {
            assert_eq!(percent_complete, 25);
            assert!(progress.pre_survey.completed);
            assert!(!progress.course.completed);
        }
        CertificateOutcome::Issued { .. } => panic!("must not issue below 100%"),
    }
    assert_eq!(count_rows(&pool, "certificates").await, 0);
}

#[tokio::test]
async fn course_without_modules_never_certifies() {
    let pool = test_pool().await;
    insert_coursework(&pool, "cw-pre", "Pre-Survey Form").await;
    insert_coursework(&pool, "cw-idea", "Idea Submission").await;
    insert_coursework(&pool, "cw-post", "Post-Survey Form").await;
    for stage in ["pre-survey", "ideas", "post-survey"] {
        repository::upsert_stage_completion(&pool, COURSE, STUDENT, stage)
            .await
            .unwrap();
    }

    let issuer = issuer(&pool, FakeClassroom::default());
    match issuer.get_or_issue(COURSE, STUDENT, None).await.unwrap() {
        CertificateOutcome::NotEligible {
            percent_complete, ..
        } => assert_eq!(percent_complete, 75),
        CertificateOutcome::Issued { .. } => {
            panic!("empty module set must not be treated as complete")
        }
    }
}

#[tokio::test]
async fn certificate_snapshot_is_immutable() {
    let pool = test_pool().await;
    seed_fully_complete(&pool).await;
    let issuer = issuer(&pool, FakeClassroom::default());

    let original = expect_issued(issuer.get_or_issue(COURSE, STUDENT, None).await.unwrap());
    let snapshot: CompletionSnapshot = serde_json::from_str(&original.completion_data).unwrap();
    assert!(snapshot.pre_survey && snapshot.course && snapshot.ideas && snapshot.post_survey);
    assert_eq!(snapshot.modules_completed, 1);
    assert_eq!(snapshot.modules_total, 1);

    // Completion data changes after issuance must not touch the snapshot.
    sqlx::query("DELETE FROM stage_completions WHERE stage_id = 'ideas'")
        .execute(&pool)
        .await
        .unwrap();
    insert_coursework(&pool, "cw-m2", "Module 2").await;

    let after = expect_issued(issuer.get_or_issue(COURSE, STUDENT, None).await.unwrap());
    assert_eq!(after.certificate_number, original.certificate_number);
    assert_eq!(after.completion_data, original.completion_data);
    assert_eq!(after.issued_at, original.issued_at);
    assert_eq!(after.student_name, original.student_name);
}

#[tokio::test]
async fn display_name_prefers_remote_profile() {
    let pool = test_pool().await;
    seed_fully_complete(&pool).await;

    let mut profiles = HashMap::new();
    profiles.insert(STUDENT.to_string(), remote_profile("s1", STUDENT, "Alice Adams"));
    let issuer = issuer(
        &pool,
        FakeClassroom {
            profiles,
            ..Default::default()
        },
    );

    let cert = expect_issued(
        issuer
            .get_or_issue(COURSE, STUDENT, Some("Session Alice"))
            .await
            .unwrap(),
    );
    assert_eq!(cert.student_name, "Alice Adams");
}

#[tokio::test]
async fn display_name_falls_back_to_hint_then_email() {
    let pool = test_pool().await;
    seed_fully_complete(&pool).await;
    let issuer = issuer(&pool, FakeClassroom::default());

    let cert = expect_issued(
        issuer
            .get_or_issue(COURSE, STUDENT, Some("Session Alice"))
            .await
            .unwrap(),
    );
    assert_eq!(cert.student_name, "Session Alice");

    let pool = test_pool().await;
    seed_fully_complete(&pool).await;
    let issuer = CertificateIssuer::new(pool.clone(), Arc::new(FakeClassroom::default()));
    let cert = expect_issued(issuer.get_or_issue(COURSE, STUDENT, None).await.unwrap());
    assert_eq!(cert.student_name, STUDENT);
}

/// Classroom whose profile lookup persists a rival certificate, landing
/// between the issuer's existence check and its insert — the same window a
/// concurrent issuance would hit.
struct RacingClassroom {
    pool: SqlitePool,
    rival: Certificate,
}

#[async_trait]
impl ClassroomClient for RacingClassroom {
    async fn list_courses(&self) -> Result<Vec<dto::RemoteCourse>, AppError> {
        Ok(Vec::new())
    }

    async fn list_teachers(&self, _course_id: &str) -> Result<Vec<dto::RemoteMember>, AppError> {
        Ok(Vec::new())
    }

    async fn list_students(&self, _course_id: &str) -> Result<Vec<dto::RemoteMember>, AppError> {
        Ok(Vec::new())
    }

    async fn list_coursework(
        &self,
        _course_id: &str,
    ) -> Result<Vec<dto::RemoteCoursework>, AppError> {
        Ok(Vec::new())
    }

    async fn list_submissions(
        &self,
        _course_id: &str,
        _course_work_id: &str,
    ) -> Result<Vec<dto::RemoteSubmission>, AppError> {
        Ok(Vec::new())
    }

    async fn student_submission(
        &self,
        _course_id: &str,
        _course_work_id: &str,
        _user_email: &str,
    ) -> Result<Option<dto::RemoteSubmission>, AppError> {
        Ok(None)
    }

    async fn user_profile(&self, _user_id: &str) -> Result<Option<dto::RemoteProfile>, AppError> {
        repository::insert_certificate(&self.pool, &self.rival)
            .await
            .expect("rival certificate insert failed");
        Ok(None)
    }
}

#[tokio::test]
async fn concurrent_issuance_loser_receives_winner_row() {
    let pool = test_pool().await;
    seed_fully_complete(&pool).await;

    let rival = Certificate {
        certificate_number: "CERT-winner-abcd1234".to_string(),
        student_email: STUDENT.to_string(),
        course_id: COURSE.to_string(),
        student_name: "Alice Adams".to_string(),
        completion_data: "{}".to_string(),
        issued_at: "2026-01-01T00:00:00Z".to_string(),
    };
    let issuer = CertificateIssuer::new(
        pool.clone(),
        Arc::new(RacingClassroom {
            pool: pool.clone(),
            rival,
        }),
    );

    // The rival row appears only after the issuer's existence check, so the
    // insert trips the (student_email, course_id) constraint and the loser
    // must come back with the winner's certificate, not an error.
    let cert = expect_issued(issuer.get_or_issue(COURSE, STUDENT, None).await.unwrap());
    assert_eq!(cert.certificate_number, "CERT-winner-abcd1234");
    assert_eq!(cert.issued_at, "2026-01-01T00:00:00Z");
    assert_eq!(count_rows(&pool, "certificates").await, 1);
}
