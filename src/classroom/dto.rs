use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCourse {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub course_state: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMember {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub profile: Option<RemoteProfile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub name: Option<RemoteName>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteName {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCoursework {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub max_points: Option<f64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub due_date: Option<RemoteDueDate>,
    #[serde(default)]
    pub materials: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDueDate {
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub month: u32,
    #[serde(default)]
    pub day: u32,
}

impl RemoteDueDate {
    pub fn to_iso_date(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSubmission {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub assigned_grade: Option<f64>,
    #[serde(default)]
    pub late: bool,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

// Paginated list envelopes. All collections default to empty because the
// remote omits the field entirely when a page has no results.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListResponse {
    #[serde(default)]
    pub courses: Vec<RemoteCourse>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherListResponse {
    #[serde(default)]
    pub teachers: Vec<RemoteMember>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListResponse {
    #[serde(default)]
    pub students: Vec<RemoteMember>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseworkListResponse {
    #[serde(default, rename = "courseWork")]
    pub course_work: Vec<RemoteCoursework>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListResponse {
    #[serde(default)]
    pub student_submissions: Vec<RemoteSubmission>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
