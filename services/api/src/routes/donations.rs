use crate::error::{HttpApiError, bad_request, conflict, forbidden, not_found};
use crate::extractors::{AuthUser, require_donor};
use crate::responses;
use crate::schemas::{CreateDonationInput, DonationStatusInput, UpdateDonationInput};
use crate::state::AppState;
use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use chrono::Utc;
use common::{DonationStatus, RequestStatus};
use db::donations::{
    DonationUpdate, NewDonation, cancel_donation, complete_donation, delete_donation,
    donor_stats as db_donor_stats, get_donation, insert_donation, list_by_donor,
    list_by_hospital, update_donation,
};
use db::requests::get_request;
use db::users::find_by_id;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

#[post("/donations")]
pub async fn create(
    user: AuthUser,
    data: web::Data<AppState>,
    payload: web::Json<CreateDonationInput>,
) -> Result<HttpResponse, HttpApiError> {
    require_donor(&user)?;
    let payload = payload.into_inner();
    payload.validate()?;

    if let Some(request_id) = payload.request_id {
        let request = get_request(&data.db, request_id)
            .await?
            .ok_or_else(not_found)?;
        if request.status != RequestStatus::Active {
            return Err(bad_request("request is not active"));
        }
        if request.required_by <= Utc::now() {
            return Err(bad_request("request has expired"));
        }
        // Exact-group match only; no compatibility matrix.
        let donor = find_by_id(&data.db, user.user_id)
            .await?
            .ok_or_else(forbidden)?;
        if donor.blood_group != Some(request.blood_group) {
            return Err(bad_request("blood group does not match the request"));
        }
    }

    let row = insert_donation(
        &data.db,
        user.user_id,
        &NewDonation {
            request_id: payload.request_id,
            hospital_name: payload.hospital_name,
            donation_date: payload.donation_date,
            units: payload.units.unwrap_or(1),
            notes: payload.notes,
        },
    )
    .await?;

    tracing::info!(donation_id = %row.id, donor_id = %user.user_id, "donation scheduled");
    Ok(responses::created("donation scheduled", row))
}

/// Donors see their own donations; hospitals see donations booked at their
/// hospital.
#[get("/donations")]
pub async fn list(
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    let rows = if user.is_hospital() {
        let hospital = find_by_id(&data.db, user.user_id)
            .await?
            .ok_or_else(forbidden)?;
        let name = hospital.hospital_name.unwrap_or(hospital.name);
        list_by_hospital(&data.db, &name).await?
    } else {
        list_by_donor(&data.db, user.user_id).await?
    };
    Ok(responses::ok("donations", rows))
}

#[get("/donations/user/mine")]
pub async fn mine(
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    require_donor(&user)?;
    let rows = list_by_donor(&data.db, user.user_id).await?;
    Ok(responses::ok("my donations", rows))
}

#[get("/donations/stats/donor")]
pub async fn donor_stats(
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    require_donor(&user)?;
    let stats = db_donor_stats(&data.db, user.user_id).await?;
    Ok(responses::ok("donor statistics", stats))
}

/// Visible to the donor and to the requester of the linked request; anyone
/// else sees a 404 rather than a hint the row exists.
#[get("/donations/{id}")]
pub async fn get(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, HttpApiError> {
    let row = get_donation(&data.db, path.into_inner())
        .await?
        .ok_or_else(not_found)?;

    let mut visible = row.donor_id == user.user_id;
    if !visible {
        if let Some(request_id) = row.request_id {
            if let Some(request) = get_request(&data.db, request_id).await? {
                visible = request.requester_id == user.user_id;
            }
        }
    }
    if !visible {
        return Err(not_found());
    }
    Ok(responses::ok("donation", row))
}

#[put("/donations/{id}")]
pub async fn update(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateDonationInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let id = path.into_inner();
    let row = get_donation(&data.db, id).await?.ok_or_else(not_found)?;
    if row.donor_id != user.user_id {
        return Err(forbidden());
    }
    if row.status != DonationStatus::Scheduled {
        return Err(conflict());
    }

    let updated = update_donation(
        &data.db,
        id,
        &DonationUpdate {
            hospital_name: payload.hospital_name,
            donation_date: payload.donation_date,
            units: payload.units,
            notes: payload.notes,
        },
    )
    .await?
    .ok_or_else(conflict)?;
    Ok(responses::ok("donation updated", updated))
}

/// `scheduled -> completed | cancelled`. Completion cascades the linked
/// request to fulfilled inside one transaction; repeating a completion is a
/// no-op success so retries never double-count units.
#[patch("/donations/{id}")]
pub async fn set_status(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<DonationStatusInput>,
) -> Result<HttpResponse, HttpApiError> {
    let id = path.into_inner();
    let target = payload.into_inner().status;

    let row = get_donation(&data.db, id).await?.ok_or_else(not_found)?;
    if row.donor_id != user.user_id {
        return Err(forbidden());
    }

    if row.status == target {
        return Ok(responses::ok("donation status unchanged", row));
    }

    match target {
        DonationStatus::Scheduled => Err(conflict()),
        DonationStatus::Cancelled => {
            let updated = cancel_donation(&data.db, id).await?.ok_or_else(conflict)?;
            Ok(responses::ok("donation cancelled", updated))
        }
        DonationStatus::Completed => {
            if row.status == DonationStatus::Cancelled {
                return Err(conflict());
            }
            let (updated, fulfilled) = complete_donation(&data.db, id)
                .await?
                .ok_or_else(conflict)?;

            if let Some(request_id) = fulfilled {
                tracing::info!(donation_id = %id, request_id = %request_id, "request fulfilled");
            }
            Ok(responses::ok("donation completed", updated))
        }
    }
}

#[delete("/donations/{id}")]
pub async fn remove(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, HttpApiError> {
    let id = path.into_inner();
    let row = get_donation(&data.db, id).await?.ok_or_else(not_found)?;
    if row.donor_id != user.user_id {
        return Err(forbidden());
    }
    if row.status != DonationStatus::Scheduled {
        return Err(conflict());
    }
    let deleted = delete_donation(&data.db, id).await?;
    Ok(responses::ok("donation deleted", json!({ "deleted": deleted })))
}
