use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    middleware::{auth::Claims, error_handling::Result},
    models::{
        CreateInquiryRequest, InquiryDetails, InquiryListQuery, InquiryMessageResponse,
        SendMessageRequest, UpdateInquiryStatusRequest,
    },
    services::InquiryService,
    AppState,
};

fn service(state: &AppState) -> InquiryService {
    InquiryService::new(state.inquiries.clone())
}

/// Create a new inquiry from the caller's organization
pub async fn create_inquiry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateInquiryRequest>,
) -> Result<(StatusCode, Json<InquiryDetails>)> {
    let organization_id = claims.require_organization()?;

    let inquiry = service(&state)
        .create_inquiry(organization_id, claims.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(inquiry)))
}

/// All inquiries where the caller's organization is buyer or supplier
pub async fn list_inquiries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<InquiryListQuery>,
) -> Result<Json<Vec<InquiryDetails>>> {
    let organization_id = claims.require_organization()?;
    let inquiries = service(&state)
        .get_all_inquiries(organization_id, query.status)
        .await?;
    Ok(Json(inquiries))
}

pub async fn list_sent_inquiries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<InquiryListQuery>,
) -> Result<Json<Vec<InquiryDetails>>> {
    let organization_id = claims.require_organization()?;
    let inquiries = service(&state)
        .get_sent_inquiries(organization_id, query.status)
        .await?;
    Ok(Json(inquiries))
}

pub async fn list_received_inquiries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<InquiryListQuery>,
) -> Result<Json<Vec<InquiryDetails>>> {
    let organization_id = claims.require_organization()?;
    let inquiries = service(&state)
        .get_received_inquiries(organization_id, query.status)
        .await?;
    Ok(Json(inquiries))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>> {
    let organization_id = claims.require_organization()?;
    let count = service(&state).get_unread_count(organization_id).await?;
    Ok(Json(json!({ "unreadCount": count })))
}

/// Fetch one inquiry; counterpart messages are marked read for the caller
pub async fn get_inquiry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<InquiryDetails>> {
    let organization_id = claims.require_organization()?;
    let inquiry = service(&state).view_inquiry(id, organization_id).await?;
    Ok(Json(inquiry))
}

pub async fn update_inquiry_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateInquiryStatusRequest>,
) -> Result<Json<InquiryDetails>> {
    let organization_id = claims.require_organization()?;
    let inquiry = service(&state)
        .update_status(id, organization_id, request)
        .await?;
    Ok(Json(inquiry))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InquiryMessageResponse>>> {
    let organization_id = claims.require_organization()?;
    let messages = service(&state).get_messages(id, organization_id).await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<InquiryMessageResponse>)> {
    let organization_id = claims.require_organization()?;
    let message = service(&state)
        .send_message(id, claims.user_id, organization_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_messages_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let organization_id = claims.require_organization()?;
    let updated = service(&state)
        .mark_messages_as_read(id, organization_id)
        .await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}
