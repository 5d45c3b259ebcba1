pub mod dto;

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct ClassroomConfig {
    pub base_url: String,
    pub api_token: String,
}

impl ClassroomConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("CLASSROOM_API_BASE")
            .unwrap_or_else(|_| "https://classroom.googleapis.com".to_string());
        let api_token = env::var("CLASSROOM_API_TOKEN")
            .map_err(|_| AppError::Config("CLASSROOM_API_TOKEN is not set".to_string()))?;

        Ok(Self {
            base_url,
            api_token,
        })
    }
}

/// Read-only view of the remote classroom platform. All methods are
/// fallible per call; callers decide whether a failure aborts or isolates.
#[async_trait]
pub trait ClassroomClient: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<dto::RemoteCourse>, AppError>;
    async fn list_teachers(&self, course_id: &str) -> Result<Vec<dto::RemoteMember>, AppError>;
    async fn list_students(&self, course_id: &str) -> Result<Vec<dto::RemoteMember>, AppError>;
    async fn list_coursework(&self, course_id: &str)
    -> Result<Vec<dto::RemoteCoursework>, AppError>;
    async fn list_submissions(
        &self,
        course_id: &str,
        course_work_id: &str,
    ) -> Result<Vec<dto::RemoteSubmission>, AppError>;
    /// One student's submission for a coursework item; `Ok(None)` when the
    /// remote has none.
    async fn student_submission(
        &self,
        course_id: &str,
        course_work_id: &str,
        user_email: &str,
    ) -> Result<Option<dto::RemoteSubmission>, AppError>;
    /// Verified profile for a user; `Ok(None)` when not visible (404/403).
    async fn user_profile(&self, user_id: &str) -> Result<Option<dto::RemoteProfile>, AppError>;
}

pub struct ClassroomHttpClient {
    client: Client,
    config: ClassroomConfig,
}

impl ClassroomHttpClient {
    pub fn new(config: ClassroomConfig) -> Result<Self, AppError> {
        // Explicit per-call timeout; a hung remote call must degrade to an
        // isolated per-item failure, not stall a whole sync run.
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::upstream(None, format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                Some(status.as_u16()),
                format!("{path}: {body}"),
            ));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::upstream(None, format!("failed to parse response from {path}: {e}"))
        })
    }
}

fn is_status(err: &AppError, codes: &[u16]) -> bool {
    matches!(err, AppError::Upstream { status: Some(s), .. } if codes.contains(s))
}

#[async_trait]
impl ClassroomClient for ClassroomHttpClient {
    async fn list_courses(&self) -> Result<Vec<dto::RemoteCourse>, AppError> {
        let mut courses = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", "100")];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: dto::CourseListResponse = self.get_json("/v1/courses", &query).await?;
            courses.extend(page.courses);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(courses)
    }

    async fn list_teachers(&self, course_id: &str) -> Result<Vec<dto::RemoteMember>, AppError> {
        let path = format!("/v1/courses/{course_id}/teachers");
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", "100")];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: dto::TeacherListResponse = self.get_json(&path, &query).await?;
            members.extend(page.teachers);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(members)
    }

    async fn list_students(&self, course_id: &str) -> Result<Vec<dto::RemoteMember>, AppError> {
        let path = format!("/v1/courses/{course_id}/students");
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", "100")];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: dto::StudentListResponse = self.get_json(&path, &query).await?;
            members.extend(page.students);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(members)
    }

    async fn list_coursework(
        &self,
        course_id: &str,
    ) -> Result<Vec<dto::RemoteCoursework>, AppError> {
        let path = format!("/v1/courses/{course_id}/courseWork");
        let mut coursework = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", "100")];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: dto::CourseworkListResponse = self.get_json(&path, &query).await?;
            coursework.extend(page.course_work);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(coursework)
    }

    async fn list_submissions(
        &self,
        course_id: &str,
        course_work_id: &str,
    ) -> Result<Vec<dto::RemoteSubmission>, AppError> {
        let path = format!("/v1/courses/{course_id}/courseWork/{course_work_id}/studentSubmissions");
        let mut submissions = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", "100")];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: dto::SubmissionListResponse = self.get_json(&path, &query).await?;
            submissions.extend(page.student_submissions);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(submissions)
    }

    async fn student_submission(
        &self,
        course_id: &str,
        course_work_id: &str,
        user_email: &str,
    ) -> Result<Option<dto::RemoteSubmission>, AppError> {
        let path = format!("/v1/courses/{course_id}/courseWork/{course_work_id}/studentSubmissions");
        let query = [("userId", user_email), ("pageSize", "1")];

        match self
            .get_json::<dto::SubmissionListResponse>(&path, &query)
            .await
        {
            Ok(page) => Ok(page.student_submissions.into_iter().next()),
            Err(e) if is_status(&e, &[404]) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn user_profile(&self, user_id: &str) -> Result<Option<dto::RemoteProfile>, AppError> {
        let path = format!("/v1/userProfiles/{user_id}");

        match self.get_json::<dto::RemoteProfile>(&path, &[]).await {
            Ok(profile) => Ok(Some(profile)),
            Err(e) if is_status(&e, &[403, 404]) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Inert client for wiring tests and local development without a remote.
pub struct NoopClassroomClient;

#[async_trait]
impl ClassroomClient for NoopClassroomClient {
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
        Ok(None)
    }
}
