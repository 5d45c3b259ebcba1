#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use classtrack::classroom::{ClassroomClient, dto};
use classtrack::error::AppError;

pub async fn test_pool() -> SqlitePool {
    // A single pinned connection: every pooled connection to
    // "sqlite::memory:" would otherwise get its own empty database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Fixture-driven classroom. Submission fetches can be told to fail per
/// coursework item to exercise the isolate-and-continue sync policy.
#[derive(Default)]
pub struct FakeClassroom {
    pub courses: Vec<dto::RemoteCourse>,
    pub teachers: HashMap<String, Vec<dto::RemoteMember>>,
    pub students: HashMap<String, Vec<dto::RemoteMember>>,
    pub coursework: HashMap<String, Vec<dto::RemoteCoursework>>,
    pub submissions: HashMap<String, Vec<dto::RemoteSubmission>>,
    pub profiles: HashMap<String, dto::RemoteProfile>,
    pub fail_submissions_for: Mutex<HashSet<String>>,
}

impl FakeClassroom {
    pub fn fail_submissions(&self, course_work_id: &str) {
        self.fail_submissions_for
            .lock()
            .unwrap()
            .insert(course_work_id.to_string());
    }
}

#[async_trait]
impl ClassroomClient for FakeClassroom {
    async fn list_courses(&self) -> Result<Vec<dto::RemoteCourse>, AppError> {
        Ok(self.courses.clone())
    }

    async fn list_teachers(&self, course_id: &str) -> Result<Vec<dto::RemoteMember>, AppError> {
        Ok(self.teachers.get(course_id).cloned().unwrap_or_default())
    }

    async fn list_students(&self, course_id: &str) -> Result<Vec<dto::RemoteMember>, AppError> {
        Ok(self.students.get(course_id).cloned().unwrap_or_default())
    }

    async fn list_coursework(
        &self,
        course_id: &str,
    ) -> Result<Vec<dto::RemoteCoursework>, AppError> {
        Ok(self.coursework.get(course_id).cloned().unwrap_or_default())
    }

    async fn list_submissions(
        &self,
        _course_id: &str,
        course_work_id: &str,
    ) -> Result<Vec<dto::RemoteSubmission>, AppError> {
        if self
            .fail_submissions_for
            .lock()
            .unwrap()
            .contains(course_work_id)
        {
            return Err(AppError::upstream(Some(429), "rate limited"));
        }
        Ok(self
            .submissions
            .get(course_work_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn student_submission(
        &self,
        _course_id: &str,
        _course_work_id: &str,
        _user_email: &str,
    ) -> Result<Option<dto::RemoteSubmission>, AppError> {
        Ok(None)
    }

    async fn user_profile(&self, user_id: &str) -> Result<Option<dto::RemoteProfile>, AppError> {
        Ok(self.profiles.get(user_id).cloned())
    }
}

// Fixture builders.

pub fn remote_course(id: &str, name: &str) -> dto::RemoteCourse {
    dto::RemoteCourse {
        id: id.to_string(),
        name: name.to_string(),
        section: None,
        room: None,
        course_state: Some("ACTIVE".to_string()),
        owner_id: Some("owner-1".to_string()),
        creation_time: Some("2026-01-01T00:00:00Z".to_string()),
        update_time: Some("2026-01-02T00:00:00Z".to_string()),
    }
}

pub fn remote_member(user_id: &str, email: &str, full_name: &str) -> dto::RemoteMember {
    dto::RemoteMember {
        user_id: Some(user_id.to_string()),
        profile: Some(remote_profile(user_id, email, full_name)),
    }
}

pub fn remote_profile(user_id: &str, email: &str, full_name: &str) -> dto::RemoteProfile {
    dto::RemoteProfile {
        id: Some(user_id.to_string()),
        email_address: Some(email.to_string()),
        name: Some(dto::RemoteName {
            full_name: Some(full_name.to_string()),
        }),
    }
}

pub fn remote_coursework(id: &str, title: &str) -> dto::RemoteCoursework {
    dto::RemoteCoursework {
        id: id.to_string(),
        title: title.to_string(),
        max_points: Some(100.0),
        state: Some("PUBLISHED".to_string()),
        due_date: None,
        materials: Vec::new(),
    }
}

pub fn remote_submission(id: &str, user_id: &str, state: &str) -> dto::RemoteSubmission {
    dto::RemoteSubmission {
        id: id.to_string(),
        user_id: Some(user_id.to_string()),
        state: Some(state.to_string()),
        assigned_grade: None,
        late: false,
        creation_time: None,
        update_time: None,
    }
}
