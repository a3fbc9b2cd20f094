//! OpenAPI document assembly.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use doorstep_core::models::{
    CheckInRequestResponse, CheckInStatus, CreateCheckInRequest, DocumentResponse, DownloadGrant,
    GeoPoint, NearbyRequest, PaymentOutcome, PaymentStatus, UploadGrant, UploadGrantRequest,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Doorstep API",
        description = "Two-sided marketplace core for on-demand check-in services"
    ),
    paths(
        handlers::requests::create_request,
        handlers::requests::list_requests,
        handlers::requests::find_nearby,
        handlers::requests::get_request,
        handlers::requests::claim_request,
        handlers::requests::transition_request,
        handlers::requests::regeocode_request,
        handlers::documents::issue_upload_grant,
        handlers::documents::issue_download_grant,
        handlers::documents::delete_document,
        handlers::documents::sweep_documents,
        handlers::documents::list_request_documents,
        handlers::payments::payment_event,
        handlers::agents::update_location,
        handlers::agents::find_nearby_agents,
        handlers::health::health,
    ),
    components(schemas(
        CheckInRequestResponse,
        CheckInStatus,
        CreateCheckInRequest,
        DocumentResponse,
        DownloadGrant,
        GeoPoint,
        NearbyRequest,
        PaymentOutcome,
        PaymentStatus,
        UploadGrant,
        UploadGrantRequest,
        ErrorResponse,
        handlers::requests::TransitionRequest,
        handlers::payments::PaymentEvent,
        handlers::agents::LocationUpdate,
    ))
)]
pub struct ApiDoc;
