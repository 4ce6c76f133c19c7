#![allow(dead_code)]

//! Resume document lookup. Storage and versioning live elsewhere in the
//! product; the ranking core only ever reads the raw text.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeDocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolves the resume text for a caller. With an explicit id the document
/// must belong to the caller; without one the most recently updated document
/// is used.
pub async fn fetch_resume_text(
    pool: &PgPool,
    user_id: Uuid,
    resume_id: Option<Uuid>,
) -> Result<Option<String>> {
    let row: Option<ResumeDocumentRow> = match resume_id {
        Some(id) => {
            sqlx::query_as("SELECT * FROM resume_documents WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM resume_documents WHERE user_id = $1 ORDER BY updated_at DESC LIMIT 1",
            )
            .bind(user_id)
            .fetch_optional(pool)
            .await?
        }
    };

    Ok(row.map(|r| r.content))
}
