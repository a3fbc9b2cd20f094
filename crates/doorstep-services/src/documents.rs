//! Document lifecycle: access grants and the TTL sweep.
//!
//! Uploaded evidence is time-bounded. Metadata is persisted before any write
//! handle is returned, so the sweep can always find the blob; expiry is a
//! logical boundary enforced on every download grant, independent of whether
//! the blob still physically exists.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::time::interval;
use uuid::Uuid;

use doorstep_core::models::{
    Actor, ActorRole, Document, DocumentResponse, DownloadGrant, UploadGrant, UploadGrantRequest,
};
use doorstep_core::{transitions, validation, AppError};
use doorstep_db::{DocumentRepository, RequestRepository};
use doorstep_storage::{document_key, Storage};

use crate::lifecycle::LifecycleController;

/// Rows reclaimed per sweep pass; the next pass picks up the remainder.
const SWEEP_BATCH_SIZE: i64 = 500;

pub struct DocumentLifecycleManager {
    documents: DocumentRepository,
    requests: RequestRepository,
    storage: Arc<dyn Storage>,
    lifecycle: Arc<LifecycleController>,
    document_ttl: Duration,
    upload_grant_ttl: StdDuration,
    download_grant_ttl: StdDuration,
    allowed_content_types: Vec<String>,
    cleanup_interval: StdDuration,
}

impl DocumentLifecycleManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        documents: DocumentRepository,
        requests: RequestRepository,
        storage: Arc<dyn Storage>,
        lifecycle: Arc<LifecycleController>,
        document_ttl_hours: i64,
        upload_grant_ttl_secs: u64,
        download_grant_ttl_secs: u64,
        allowed_content_types: Vec<String>,
        cleanup_interval_secs: u64,
    ) -> Self {
        Self {
            documents,
            requests,
            storage,
            lifecycle,
            document_ttl: Duration::hours(document_ttl_hours),
            upload_grant_ttl: StdDuration::from_secs(upload_grant_ttl_secs),
            download_grant_ttl: StdDuration::from_secs(download_grant_ttl_secs),
            allowed_content_types,
            cleanup_interval: StdDuration::from_secs(cleanup_interval_secs),
        }
    }

    /// Issue an upload grant: persist the metadata row, then hand back a
    /// short-lived presigned PUT URL. An agent's first upload implicitly
    /// starts the job.
    #[tracing::instrument(skip(self, grant_request), fields(request_id = %grant_request.check_in_request_id))]
    pub async fn issue_upload_grant(
        &self,
        actor: Actor,
        grant_request: UploadGrantRequest,
    ) -> Result<UploadGrant, AppError> {
        validation::validate_file_name(&grant_request.file_name)?;
        validation::validate_content_type(
            &grant_request.content_type,
            &self.allowed_content_types,
        )?;

        let request = self
            .requests
            .get(grant_request.check_in_request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Request {} not found",
                    grant_request.check_in_request_id
                ))
            })?;

        if !request.is_party(actor.id) {
            return Err(AppError::AccessDenied(
                "Only parties to the request may upload documents".to_string(),
            ));
        }

        if transitions::is_terminal(request.status) {
            return Err(AppError::Validation(format!(
                "Cannot upload documents to a {} request",
                request.status
            )));
        }

        let document_id = Uuid::new_v4();
        let file_key = document_key(request.id, document_id, grant_request.file_name.trim());
        let now = Utc::now();

        // Metadata first: if the client never uploads, the sweep still
        // reclaims the orphaned row and (missing) blob without special cases.
        let document = self
            .documents
            .create(
                document_id,
                request.id,
                actor.id,
                &file_key,
                grant_request.file_name.trim(),
                &grant_request.content_type,
                now + self.document_ttl,
            )
            .await?;

        let upload_url = self
            .storage
            .presigned_put_url(&file_key, &grant_request.content_type, self.upload_grant_ttl)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if actor.role == ActorRole::Agent {
            self.lifecycle
                .start_on_first_upload(request.id, actor.id)
                .await?;
        }

        tracing::info!(
            document_id = %document.id,
            request_id = %request.id,
            uploader_id = %actor.id,
            expires_at = %document.expires_at,
            "Upload grant issued"
        );

        Ok(UploadGrant {
            document: DocumentResponse::from(document),
            upload_url,
            upload_url_expires_at: now + Duration::from_std(self.upload_grant_ttl).unwrap_or_default(),
        })
    }

    /// Issue a download grant. Expiry is checked logically: a document past
    /// its TTL is gone even if the sweep has not physically reclaimed it yet.
    pub async fn issue_download_grant(
        &self,
        document_id: Uuid,
        actor: Actor,
    ) -> Result<DownloadGrant, AppError> {
        let document = self
            .documents
            .get(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", document_id)))?;

        let request = self
            .requests
            .get(document.check_in_request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Request {} not found",
                    document.check_in_request_id
                ))
            })?;

        if !request.is_party(actor.id) {
            return Err(AppError::AccessDenied(
                "Only parties to the request may download documents".to_string(),
            ));
        }

        let now = Utc::now();
        if document.is_expired(now) {
            return Err(AppError::Expired(format!(
                "Document {} is past its retention window",
                document_id
            )));
        }

        let download_url = self
            .storage
            .presigned_get_url(&document.file_key, self.download_grant_ttl)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(DownloadGrant {
            document_id,
            download_url,
            download_url_expires_at: now
                + Duration::from_std(self.download_grant_ttl).unwrap_or_default(),
        })
    }

    /// Owner-initiated delete: blob first, then the metadata row.
    pub async fn delete_document(&self, document_id: Uuid, actor: Actor) -> Result<(), AppError> {
        let document = self
            .documents
            .get(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", document_id)))?;

        if document.uploader_id != actor.id {
            return Err(AppError::AccessDenied(
                "Only the uploader may delete a document".to_string(),
            ));
        }

        self.storage
            .delete(&document.file_key)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        self.documents.delete(document_id).await?;

        tracing::info!(document_id = %document_id, "Document deleted by uploader");
        Ok(())
    }

    pub async fn list_for_request(
        &self,
        check_in_request_id: Uuid,
        actor: Actor,
    ) -> Result<Vec<Document>, AppError> {
        let request = self
            .requests
            .get(check_in_request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Request {} not found", check_in_request_id))
            })?;

        if !request.is_party(actor.id) {
            return Err(AppError::AccessDenied(
                "Only parties to the request may list documents".to_string(),
            ));
        }

        self.documents.list_by_request(check_in_request_id).await
    }

    /// Reclaim every expired document: blob first, then the metadata row.
    /// Per-document failures are logged and skipped so one bad row cannot
    /// stall the sweep; a failed blob delete leaves the row in place for the
    /// next pass. Safe to run concurrently with itself.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        let expired = self.documents.find_expired(Utc::now(), SWEEP_BATCH_SIZE).await?;
        let mut deleted = 0u64;

        for document in expired {
            tracing::info!(
                document_id = %document.id,
                file_key = %document.file_key,
                expires_at = %document.expires_at,
                "Deleting expired document"
            );

            if let Err(e) = self.storage.delete(&document.file_key).await {
                tracing::error!(
                    error = %e,
                    document_id = %document.id,
                    file_key = %document.file_key,
                    "Failed to delete blob, leaving row for the next sweep"
                );
                continue;
            }

            match self.documents.delete(document.id).await {
                Ok(true) => deleted += 1,
                // A concurrent sweep already removed the row.
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        document_id = %document.id,
                        "Failed to delete metadata row"
                    );
                }
            }
        }

        Ok(deleted)
    }

    /// Start the background sweep loop. Returns a JoinHandle for shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.cleanup_interval);
            sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                sweep_interval.tick().await;

                match self.sweep_expired().await {
                    Ok(deleted) => {
                        tracing::info!(deleted, "Document sweep completed");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Document sweep failed");
                    }
                }
            }
        })
    }
}
