use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use doorstep_core::models::{DocumentResponse, DownloadGrant, UploadGrant, UploadGrantRequest};

use crate::auth::ActorContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/documents/upload-grant",
    tag = "documents",
    request_body = UploadGrantRequest,
    responses(
        (status = 201, description = "Grant issued; metadata persisted", body = UploadGrant),
        (status = 400, description = "Disallowed content type or file name", body = ErrorResponse),
        (status = 403, description = "Caller is not a party to the request", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse)
    )
)]
pub async fn issue_upload_grant(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    ValidatedJson(body): ValidatedJson<UploadGrantRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let grant = state.documents.issue_upload_grant(actor, body).await?;

    Ok((StatusCode::CREATED, Json(grant)))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/download-grant",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Grant issued", body = DownloadGrant),
        (status = 403, description = "Caller is not a party", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 410, description = "Document past its retention window", body = ErrorResponse)
    )
)]
pub async fn issue_download_grant(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let grant = state.documents.issue_download_grant(id, actor).await?;

    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 403, description = "Caller is not the uploader", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.documents.delete_document(id, actor).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Manual sweep trigger. The sweep also runs on its own schedule; this
/// endpoint exists for operational use and is safe to call at any time,
/// concurrently with the scheduled runs.
#[utoipa::path(
    post,
    path = "/api/v1/documents/sweep",
    tag = "documents",
    responses(
        (status = 200, description = "Sweep completed; count of documents reclaimed")
    )
)]
pub async fn sweep_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let deleted = state.documents.sweep_expired().await?;

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}/documents",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Documents for the request", body = Vec<DocumentResponse>),
        (status = 403, description = "Caller is not a party", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse)
    )
)]
pub async fn list_request_documents(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let documents = state.documents.list_for_request(id, actor).await?;

    let responses: Vec<DocumentResponse> =
        documents.into_iter().map(DocumentResponse::from).collect();

    Ok(Json(responses))
}
