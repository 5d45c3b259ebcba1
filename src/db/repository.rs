use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{
    Certificate, Course, Coursework, RosterMembership, StageCompletion, Submission, SyncLog,
};

// Mirrored collections. Every write is a keyed upsert so that repeated sync
// runs converge instead of duplicating rows.

pub async fn upsert_course(db: &SqlitePool, course: &Course) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO courses
            (course_id, name, section, room, state, owner_id,
             created_at, updated_at, last_synced_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (course_id) DO UPDATE SET
            name = excluded.name,
            section = excluded.section,
            room = excluded.room,
            state = excluded.state,
            owner_id = excluded.owner_id,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_synced_at = excluded.last_synced_at
        "#,
    )
    .bind(&course.course_id)
    .bind(&course.name)
    .bind(&course.section)
    .bind(&course.room)
    .bind(&course.state)
    .bind(&course.owner_id)
    .bind(&course.created_at)
    .bind(&course.updated_at)
    .bind(&course.last_synced_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY name")
        .fetch_all(db)
        .await
}

pub async fn find_course(db: &SqlitePool, course_id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE course_id = ?")
        .bind(course_id)
        .fetch_optional(db)
        .await
}

pub async fn upsert_roster_membership(
    db: &SqlitePool,
    membership: &RosterMembership,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO roster_memberships
            (course_id, user_email, role, user_id, full_name, last_synced_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (course_id, user_email, role) DO UPDATE SET
            user_id = excluded.user_id,
            full_name = excluded.full_name,
            last_synced_at = excluded.last_synced_at
        "#,
    )
    .bind(&membership.course_id)
    .bind(&membership.user_email)
    .bind(&membership.role)
    .bind(&membership.user_id)
    .bind(&membership.full_name)
    .bind(&membership.last_synced_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn upsert_coursework(db: &SqlitePool, work: &Coursework) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO coursework
            (course_work_id, course_id, title, max_points, state,
             due_date, materials, last_synced_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (course_work_id) DO UPDATE SET
            course_id = excluded.course_id,
            title = excluded.title,
            max_points = excluded.max_points,
            state = excluded.state,
            due_date = excluded.due_date,
            materials = excluded.materials,
            last_synced_at = excluded.last_synced_at
        "#,
    )
    .bind(&work.course_work_id)
    .bind(&work.course_id)
    .bind(&work.title)
    .bind(work.max_points)
    .bind(&work.state)
    .bind(&work.due_date)
    .bind(&work.materials)
    .bind(&work.last_synced_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn fetch_coursework_for_course(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<Coursework>, sqlx::Error> {
    // rowid order keeps "first match wins" stable across reads
    sqlx::query_as::<_, Coursework>(
        "SELECT * FROM coursework WHERE course_id = ? ORDER BY rowid",
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

/// The remote can reissue a submission under a new id for the same
/// coursework and student; the second conflict clause adopts the new id
/// instead of tripping the secondary unique index.
pub async fn upsert_submission(db: &SqlitePool, sub: &Submission) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO submissions
            (submission_id, course_id, course_work_id, user_email, state,
             assigned_grade, late, created_at, updated_at, last_synced_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (submission_id) DO UPDATE SET
            course_id = excluded.course_id,
            course_work_id = excluded.course_work_id,
            user_email = excluded.user_email,
            state = excluded.state,
            assigned_grade = excluded.assigned_grade,
            late = excluded.late,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_synced_at = excluded.last_synced_at
        ON CONFLICT (course_work_id, user_email) DO UPDATE SET
            submission_id = excluded.submission_id,
            course_id = excluded.course_id,
            state = excluded.state,
            assigned_grade = excluded.assigned_grade,
            late = excluded.late,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_synced_at = excluded.last_synced_at
        "#,
    )
    .bind(&sub.submission_id)
    .bind(&sub.course_id)
    .bind(&sub.course_work_id)
    .bind(&sub.user_email)
    .bind(&sub.state)
    .bind(sub.assigned_grade)
    .bind(sub.late)
    .bind(&sub.created_at)
    .bind(&sub.updated_at)
    .bind(&sub.last_synced_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_submission(
    db: &SqlitePool,
    course_work_id: &str,
    user_email: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT * FROM submissions WHERE course_work_id = ? AND user_email = ?",
    )
    .bind(course_work_id)
    .bind(user_email)
    .fetch_optional(db)
    .await
}

// Authoritative local collections.

pub async fn upsert_stage_completion(
    db: &SqlitePool,
    course_id: &str,
    student_email: &str,
    stage_id: &str,
) -> Result<StageCompletion, sqlx::Error> {
    let completed_at = Utc::now().to_rfc3339();

    // Re-recording a completion keeps the original timestamp.
    sqlx::query(
        r#"
        INSERT INTO stage_completions (course_id, student_email, stage_id, completed_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (course_id, student_email, stage_id) DO NOTHING
        "#,
    )
    .bind(course_id)
    .bind(student_email)
    .bind(stage_id)
    .bind(&completed_at)
    .execute(db)
    .await?;

    sqlx::query_as::<_, StageCompletion>(
        r#"
        SELECT * FROM stage_completions
        WHERE course_id = ? AND student_email = ? AND stage_id = ?
        "#,
    )
    .bind(course_id)
    .bind(student_email)
    .bind(stage_id)
    .fetch_one(db)
    .await
}

pub async fn fetch_stage_completions(
    db: &SqlitePool,
    course_id: &str,
    student_email: &str,
) -> Result<Vec<StageCompletion>, sqlx::Error> {
    sqlx::query_as::<_, StageCompletion>(
        "SELECT * FROM stage_completions WHERE course_id = ? AND student_email = ?",
    )
    .bind(course_id)
    .bind(student_email)
    .fetch_all(db)
    .await
}

pub async fn insert_certificate(db: &SqlitePool, cert: &Certificate) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO certificates
            (certificate_number, student_email, course_id, student_name,
             completion_data, issued_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&cert.certificate_number)
    .bind(&cert.student_email)
    .bind(&cert.course_id)
    .bind(&cert.student_name)
    .bind(&cert.completion_data)
    .bind(&cert.issued_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_certificate(
    db: &SqlitePool,
    student_email: &str,
    course_id: &str,
) -> Result<Option<Certificate>, sqlx::Error> {
    sqlx::query_as::<_, Certificate>(
        "SELECT * FROM certificates WHERE student_email = ? AND course_id = ?",
    )
    .bind(student_email)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_sync_log(db: &SqlitePool, log: &SyncLog) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sync_logs
            (sync_id, sync_type, status, records_processed, records_synced,
             records_failed, started_at, ended_at, duration_ms, error_message)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&log.sync_id)
    .bind(&log.sync_type)
    .bind(&log.status)
    .bind(log.records_processed)
    .bind(log.records_synced)
    .bind(log.records_failed)
    .bind(&log.started_at)
    .bind(&log.ended_at)
    .bind(log.duration_ms)
    .bind(&log.error_message)
    .execute(db)
    .await?;

    Ok(())
}

/// Single transition from in_progress to a terminal status; terminal rows
/// are never touched again.
pub async fn finalize_sync_log(
    db: &SqlitePool,
    sync_id: &str,
    status: &str,
    records_processed: i64,
    records_synced: i64,
    records_failed: i64,
    error_message: Option<&str>,
) -> Result<(), sqlx::Error> {
    let ended_at = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE sync_logs
        SET status = ?,
            records_processed = ?,
            records_synced = ?,
            records_failed = ?,
            ended_at = ?,
            duration_ms = CAST(
                (julianday(?) - julianday(started_at)) * 86400000 AS INTEGER
            ),
            error_message = ?
        WHERE sync_id = ? AND status = 'in_progress'
        "#,
    )
    .bind(status)
    .bind(records_processed)
    .bind(records_synced)
    .bind(records_failed)
    .bind(&ended_at)
    .bind(&ended_at)
    .bind(error_message)
    .bind(sync_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_sync_log(db: &SqlitePool, sync_id: &str) -> Result<Option<SyncLog>, sqlx::Error> {
    sqlx::query_as::<_, SyncLog>("SELECT * FROM sync_logs WHERE sync_id = ?")
        .bind(sync_id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_sync_logs(db: &SqlitePool) -> Result<Vec<SyncLog>, sqlx::Error> {
    sqlx::query_as::<_, SyncLog>("SELECT * FROM sync_logs ORDER BY started_at DESC")
        .fetch_all(db)
        .await
}
