use crate::error::{HttpApiError, bad_request, conflict, forbidden, not_found};
use crate::extractors::{AuthUser, require_donor};
use crate::responses;
use crate::schemas::{CreateRequestInput, RequestStatusInput, UpdateRequestInput};
use crate::state::AppState;
use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use chrono::Utc;
use common::{NotificationType, RequestStatus};
use db::notifications::insert_notification;
use db::requests::{
    BloodRequestRow, NewRequest, delete_request, get_request, has_completed_donation,
    insert_acceptance, insert_request, list_accepted_by, list_completed_for, list_mine,
    list_open, set_status as db_set_status, update_request,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

fn ensure_open_and_unexpired(row: &BloodRequestRow) -> Result<(), HttpApiError> {
    if row.status != RequestStatus::Active {
        return Err(bad_request("request is not active"));
    }
    if row.required_by <= Utc::now() {
        return Err(bad_request("request has expired"));
    }
    Ok(())
}

#[post("/requests")]
pub async fn create(
    user: AuthUser,
    data: web::Data<AppState>,
    payload: web::Json<CreateRequestInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    if payload.required_by <= Utc::now() {
        return Err(bad_request("required_by must be in the future"));
    }
    let status = payload.status.unwrap_or(RequestStatus::Active);
    if !status.is_open() {
        return Err(bad_request("initial status must be draft or active"));
    }

    let row = insert_request(
        &data.db,
        user.user_id,
        &NewRequest {
            patient_name: payload.patient_name,
            blood_group: payload.blood_group,
            units_needed: payload.units_needed,
            urgency: payload.urgency,
            hospital_name: payload.hospital_name,
            hospital_address: payload.hospital_address,
            contact_number: payload.contact_number,
            description: payload.description,
            status,
            required_by: payload.required_by,
        },
    )
    .await?;

    tracing::info!(request_id = %row.id, urgency = ?row.urgency, "blood request created");
    Ok(responses::created("blood request created", row))
}

#[get("/requests")]
pub async fn list(data: web::Data<AppState>) -> Result<HttpResponse, HttpApiError> {
    let rows = list_open(&data.db, false, None).await?;
    Ok(responses::ok("open requests", rows))
}

#[get("/requests/nearby")]
pub async fn nearby(
    user: Option<AuthUser>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    let exclude = user.map(|u| u.user_id);
    let rows = list_open(&data.db, false, exclude).await?;
    Ok(responses::ok("open requests", rows))
}

#[get("/requests/urgent")]
pub async fn urgent(data: web::Data<AppState>) -> Result<HttpResponse, HttpApiError> {
    let rows = list_open(&data.db, true, None).await?;
    Ok(responses::ok("urgent requests", rows))
}

#[get("/requests/accepted")]
pub async fn accepted(
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    require_donor(&user)?;
    let rows = list_accepted_by(&data.db, user.user_id).await?;
    Ok(responses::ok("accepted requests", rows))
}

#[get("/requests/completed")]
pub async fn completed(
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    let rows = list_completed_for(&data.db, user.user_id).await?;
    Ok(responses::ok("completed requests", rows))
}

#[get("/requests/user/mine")]
pub async fn mine(
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    let rows = list_mine(&data.db, user.user_id).await?;
    Ok(responses::ok("my requests", rows))
}

#[get("/requests/{id}")]
pub async fn get(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, HttpApiError> {
    let row = get_request(&data.db, path.into_inner())
        .await?
        .ok_or_else(not_found)?;
    Ok(responses::ok("blood request", row))
}

#[put("/requests/{id}")]
pub async fn update(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateRequestInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let id = path.into_inner();
    let row = get_request(&data.db, id).await?.ok_or_else(not_found)?;
    if row.requester_id != user.user_id {
        return Err(forbidden());
    }
    if !row.status.is_open() {
        return Err(conflict());
    }
    if let Some(required_by) = payload.required_by {
        if required_by <= Utc::now() {
            return Err(bad_request("required_by must be in the future"));
        }
    }

    let updated = update_request(
        &data.db,
        id,
        &db::requests::RequestUpdate {
            patient_name: payload.patient_name,
            blood_group: payload.blood_group,
            units_needed: payload.units_needed,
            urgency: payload.urgency,
            hospital_name: payload.hospital_name,
            hospital_address: payload.hospital_address,
            contact_number: payload.contact_number,
            description: payload.description,
            required_by: payload.required_by,
        },
    )
    .await?
    .ok_or_else(not_found)?;
    Ok(responses::ok("blood request updated", updated))
}

/// Status transitions. The owner drives the lifecycle; `fulfilled` may also
/// be set by a donor holding a completed donation against the request.
/// Terminal states are frozen.
#[patch("/requests/{id}")]
pub async fn set_status(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<RequestStatusInput>,
) -> Result<HttpResponse, HttpApiError> {
    let id = path.into_inner();
    let target = payload.into_inner().status;

    let row = get_request(&data.db, id).await?.ok_or_else(not_found)?;

    let is_owner = row.requester_id == user.user_id;
    let allowed = if is_owner {
        true
    } else if target == RequestStatus::Fulfilled && user.is_donor() {
        has_completed_donation(&data.db, id, user.user_id).await?
    } else {
        false
    };
    if !allowed {
        return Err(forbidden());
    }

    if row.status == target {
        return Ok(responses::ok("blood request status unchanged", row));
    }

    if !row.status.is_open() {
        return Err(conflict());
    }

    let updated = db_set_status(&data.db, id, target)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(request_id = %id, status = %target.as_str(), "request status changed");
    Ok(responses::ok("blood request status updated", updated))
}

#[delete("/requests/{id}")]
pub async fn remove(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, HttpApiError> {
    let id = path.into_inner();
    let row = get_request(&data.db, id).await?.ok_or_else(not_found)?;
    if row.requester_id != user.user_id {
        return Err(forbidden());
    }
    let deleted = delete_request(&data.db, id).await?;
    Ok(responses::ok("blood request deleted", json!({ "deleted": deleted })))
}

/// A donor registers intent to fulfil a request; the actual donation is
/// scheduled separately.
#[post("/requests/{id}/accept")]
pub async fn accept(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, HttpApiError> {
    require_donor(&user)?;
    let id = path.into_inner();

    let row = get_request(&data.db, id).await?.ok_or_else(not_found)?;
    if row.requester_id == user.user_id {
        return Err(bad_request("cannot accept your own request"));
    }
    ensure_open_and_unexpired(&row)?;

    let acceptance = insert_acceptance(&data.db, id, user.user_id)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                conflict()
            } else {
                HttpApiError::Db(e)
            }
        })?;

    insert_notification(
        &data.db,
        row.requester_id,
        NotificationType::DonationRequest,
        "Donor found",
        &format!(
            "A donor has accepted your {} blood request for {}.",
            row.blood_group.as_str(),
            row.patient_name
        ),
        Some(id),
    )
    .await?;

    tracing::info!(request_id = %id, donor_id = %user.user_id, "request accepted");
    Ok(responses::created("request accepted", acceptance))
}
