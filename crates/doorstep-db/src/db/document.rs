use chrono::{DateTime, Utc};
use doorstep_core::models::Document;
use doorstep_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for document metadata rows.
///
/// Rows are immutable once written; they leave the table through the TTL
/// sweep or an explicit uploader delete. Both paths use the idempotent
/// delete below.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    check_in_request_id: Uuid,
    uploader_id: Uuid,
    file_key: String,
    file_name: String,
    content_type: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self) -> Document {
        Document {
            id: self.id,
            check_in_request_id: self.check_in_request_id,
            uploader_id: self.uploader_id,
            file_key: self.file_key,
            file_name: self.file_name,
            content_type: self.content_type,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

const DOCUMENT_COLUMNS: &str = r#"
    id, check_in_request_id, uploader_id, file_key, file_name,
    content_type, expires_at, created_at
"#;

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist metadata for a new document. Written before the upload handle
    /// is handed out, so the sweep can always reclaim the blob.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        id: Uuid,
        check_in_request_id: Uuid,
        uploader_id: Uuid,
        file_key: &str,
        file_name: &str,
        content_type: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Document, AppError> {
        let sql = format!(
            r#"
            INSERT INTO documents (
                id, check_in_request_id, uploader_id,
                file_key, file_name, content_type, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(check_in_request_id)
            .bind(uploader_id)
            .bind(file_key)
            .bind(file_name)
            .bind(content_type)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into_document())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(DocumentRow::into_document))
    }

    pub async fn list_by_request(
        &self,
        check_in_request_id: Uuid,
    ) -> Result<Vec<Document>, AppError> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE check_in_request_id = $1 ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(check_in_request_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(DocumentRow::into_document).collect())
    }

    /// Documents past their TTL, oldest first. The limit bounds one sweep
    /// pass; the next pass picks up the remainder.
    pub async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Document>, AppError> {
        let sql = format!(
            r#"
            SELECT {DOCUMENT_COLUMNS}
            FROM documents
            WHERE expires_at < $1
            ORDER BY expires_at ASC
            LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(DocumentRow::into_document).collect())
    }

    /// Idempotent row delete; returns whether a row was actually removed.
    /// Safe to re-run over a row another sweep already reclaimed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
