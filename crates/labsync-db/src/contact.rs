use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::DbError;

#[derive(Debug, Clone, Copy)]
pub struct NewContactSubmission<'a> {
    pub first_name: &'a str,
    pub last_name: Option<&'a str>,
    pub email: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
}

/// Store a contact-form submission. Returns the new row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_contact_submission(
    pool: &SqlitePool,
    submission: NewContactSubmission<'_>,
    submitted_at: DateTime<Utc>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO contact_submissions \
             (first_name, last_name, email, subject, message, submitted_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(submission.first_name)
    .bind(submission.last_name)
    .bind(submission.email)
    .bind(submission.subject)
    .bind(submission.message)
    .bind(submitted_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
