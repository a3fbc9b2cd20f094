use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata row for one uploaded evidence file. Immutable once stored;
/// removed by the TTL sweep or an explicit uploader delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub check_in_request_id: Uuid,
    pub uploader_id: Uuid,
    /// Opaque blob-store key. Never exposed to clients; access goes through
    /// short-lived grants.
    pub file_key: String,
    pub file_name: String,
    pub content_type: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Payload for requesting an upload grant.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UploadGrantRequest {
    pub check_in_request_id: Uuid,
    pub file_name: String,
    pub content_type: String,
}

/// An issued upload grant: the persisted metadata plus a short-lived
/// presigned PUT URL. Metadata is written before the handle is returned, so
/// the sweep can always reclaim the blob even if the client vanishes.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadGrant {
    pub document: DocumentResponse,
    pub upload_url: String,
    pub upload_url_expires_at: DateTime<Utc>,
}

/// An issued download grant.
#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadGrant {
    pub document_id: Uuid,
    pub download_url: String,
    pub download_url_expires_at: DateTime<Utc>,
}

/// API representation of a document (blob key withheld).
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub check_in_request_id: Uuid,
    pub uploader_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        DocumentResponse {
            id: doc.id,
            check_in_request_id: doc.check_in_request_id,
            uploader_id: doc.uploader_id,
            file_name: doc.file_name,
            content_type: doc.content_type,
            expires_at: doc.expires_at,
            created_at: doc.created_at,
        }
    }
}
