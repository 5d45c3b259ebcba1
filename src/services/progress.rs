use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::classroom::ClassroomClient;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{
    CompletionSnapshot, Coursework,
    completion::{STAGE_IDEAS, STAGE_PRE_SURVEY, STAGE_POST_SURVEY, material_stage_id},
};

/// The four-stage journey classifies coursework by title substrings. The
/// matching rules are fixed business logic; this is the only place in the
/// codebase allowed to look at titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseworkKind {
    PreSurvey,
    PostSurvey,
    Idea,
    /// Mentions "survey" without being the pre or post survey. Not a stage
    /// match, and excluded from the regular learning-module set.
    OtherSurvey,
    Regular,
}

pub fn classify_title(title: &str) -> CourseworkKind {
    let t = title.to_lowercase();
    if t.contains("pre-survey") || t.contains("pre survey") {
        CourseworkKind::PreSurvey
    } else if t.contains("post-survey") || t.contains("post survey") {
        CourseworkKind::PostSurvey
    } else if t.contains("idea") {
        CourseworkKind::Idea
    } else if t.contains("survey") {
        CourseworkKind::OtherSurvey
    } else {
        CourseworkKind::Regular
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageStatus {
    pub completed: bool,
    /// Form or link URL from the matched coursework's materials; empty when
    /// the stage has no matching coursework or no linked form.
    pub form_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleStageStatus {
    pub completed: bool,
    pub items_completed: usize,
    pub items_total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseProgress {
    pub course_id: String,
    pub student_email: String,
    pub pre_survey: StageStatus,
    pub course: ModuleStageStatus,
    pub ideas: StageStatus,
    pub post_survey: StageStatus,
}

impl CourseProgress {
    pub fn all_complete(&self) -> bool {
        self.pre_survey.completed
            && self.course.completed
            && self.ideas.completed
            && self.post_survey.completed
    }

    pub fn percent_complete(&self) -> u8 {
        let done = [
            self.pre_survey.completed,
            self.course.completed,
            self.ideas.completed,
            self.post_survey.completed,
        ]
        .iter()
        .filter(|c| **c)
        .count() as u8;
        done * 25
    }

    pub fn snapshot(&self) -> CompletionSnapshot {
        CompletionSnapshot {
            pre_survey: self.pre_survey.completed,
            course: self.course.completed,
            ideas: self.ideas.completed,
            post_survey: self.post_survey.completed,
            modules_completed: self.course.items_completed,
            modules_total: self.course.items_total,
        }
    }
}

/// Merges the two sources of truth per stage: an authoritative local
/// StageCompletion row OR a turned-in/returned submission. Recomputed on
/// every call; nothing is cached.
pub struct ProgressResolver {
    db: SqlitePool,
    classroom: Arc<dyn ClassroomClient>,
}

impl ProgressResolver {
    pub fn new(db: SqlitePool, classroom: Arc<dyn ClassroomClient>) -> Self {
        Self { db, classroom }
    }

    pub async fn resolve(
        &self,
        course_id: &str,
        student_email: &str,
    ) -> Result<CourseProgress, AppError> {
        let coursework = repository::fetch_coursework_for_course(&self.db, course_id).await?;
        let completions: HashSet<String> =
            repository::fetch_stage_completions(&self.db, course_id, student_email)
                .await?
                .into_iter()
                .map(|c| c.stage_id)
                .collect();

        let mut pre_survey: Option<&Coursework> = None;
        let mut ideas: Option<&Coursework> = None;
        let mut post_survey: Option<&Coursework> = None;
        let mut regular: Vec<&Coursework> = Vec::new();

        // First match wins for the single-assignment stages.
        for work in &coursework {
            match classify_title(&work.title) {
                CourseworkKind::PreSurvey => {
                    pre_survey.get_or_insert(work);
                }
                CourseworkKind::PostSurvey => {
                    post_survey.get_or_insert(work);
                }
                CourseworkKind::Idea => {
                    ideas.get_or_insert(work);
                }
                CourseworkKind::OtherSurvey => {}
                CourseworkKind::Regular => regular.push(work),
            }
        }

        let pre_survey = self
            .single_stage(course_id, student_email, STAGE_PRE_SURVEY, pre_survey, &completions)
            .await?;
        let ideas = self
            .single_stage(course_id, student_email, STAGE_IDEAS, ideas, &completions)
            .await?;
        let post_survey = self
            .single_stage(course_id, student_email, STAGE_POST_SURVEY, post_survey, &completions)
            .await?;

        let mut items_completed = 0;
        for work in &regular {
            let done = completions.contains(&material_stage_id(&work.course_work_id))
                || self
                    .submission_satisfied(course_id, &work.course_work_id, student_email)
                    .await?;
            if done {
                items_completed += 1;
            }
        }
        // An empty module set never counts as complete; a course with no
        // content must not become certifiable.
        let course = ModuleStageStatus {
            completed: !regular.is_empty() && items_completed == regular.len(),
            items_completed,
            items_total: regular.len(),
        };

        Ok(CourseProgress {
            course_id: course_id.to_string(),
            student_email: student_email.to_string(),
            pre_survey,
            course,
            ideas,
            post_survey,
        })
    }

    async fn single_stage(
        &self,
        course_id: &str,
        student_email: &str,
        stage_id: &str,
        work: Option<&Coursework>,
        completions: &HashSet<String>,
    ) -> Result<StageStatus, AppError> {
        let Some(work) = work else {
            // No matching coursework: the stage is not applicable and never
            // completed.
            return Ok(StageStatus {
                completed: false,
                form_url: String::new(),
            });
        };

        let completed = completions.contains(stage_id)
            || self
                .submission_satisfied(course_id, &work.course_work_id, student_email)
                .await?;

        Ok(StageStatus {
            completed,
            form_url: work.form_url(),
        })
    }

    /// Checks the mirrored submission first, then attempts a live lookup so
    /// turn-ins newer than the last sync still count. A live failure is
    /// treated as "no submission": lookups fail toward incomplete.
    async fn submission_satisfied(
        &self,
        course_id: &str,
        course_work_id: &str,
        student_email: &str,
    ) -> Result<bool, AppError> {
        if let Some(mirrored) =
            repository::find_submission(&self.db, course_work_id, student_email).await?
        {
            if mirrored.is_turned_in() {
                return Ok(true);
            }
        }

        match self
            .classroom
            .student_submission(course_id, course_work_id, student_email)
            .await
        {
            Ok(Some(live)) => Ok(matches!(
                live.state.as_deref(),
                Some("TURNED_IN") | Some("RETURNED")
            )),
            Ok(None) => Ok(false),
            Err(e) => {
                warn!(
                    "Live submission lookup failed for coursework {} student {}: {}",
                    course_work_id, student_email, e
                );
                Ok(false)
            }
        }
    }
}
