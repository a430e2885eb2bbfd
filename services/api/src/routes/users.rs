use crate::error::{HttpApiError, not_found};
use crate::extractors::AuthUser;
use crate::responses;
use crate::schemas::{DonorFilter, DonorSearch, UpdateProfileInput};
use crate::state::AppState;
use actix_web::{HttpResponse, get, put, web};
use db::users::{
    ProfileUpdate, find_by_id, list_donors, list_hospitals, overview_stats,
    search_donors as db_search_donors, update_profile as db_update_profile,
};
use uuid::Uuid;
use validator::Validate;

#[get("/users/donors")]
pub async fn donors(
    data: web::Data<AppState>,
    filter: web::Query<DonorFilter>,
) -> Result<HttpResponse, HttpApiError> {
    let filter = filter.into_inner();
    let rows = list_donors(&data.db, filter.blood_group, filter.available).await?;
    Ok(responses::ok("donors", rows))
}

#[get("/users/hospitals")]
pub async fn hospitals(data: web::Data<AppState>) -> Result<HttpResponse, HttpApiError> {
    let rows = list_hospitals(&data.db).await?;
    Ok(responses::ok("hospitals", rows))
}

#[get("/users/search/donors")]
pub async fn search_donors(
    data: web::Data<AppState>,
    query: web::Query<DonorSearch>,
) -> Result<HttpResponse, HttpApiError> {
    let query = query.into_inner();
    let rows = db_search_donors(&data.db, query.blood_group, query.q.as_deref()).await?;
    Ok(responses::ok("donors", rows))
}

#[get("/users/stats/overview")]
pub async fn overview(data: web::Data<AppState>) -> Result<HttpResponse, HttpApiError> {
    let stats = overview_stats(&data.db).await?;
    Ok(responses::ok("overview", stats))
}

#[put("/users/profile")]
pub async fn update_profile(
    user: AuthUser,
    data: web::Data<AppState>,
    payload: web::Json<UpdateProfileInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let row = db_update_profile(
        &data.db,
        user.user_id,
        &ProfileUpdate {
            name: payload.name,
            blood_group: payload.blood_group,
            hospital_name: payload.hospital_name,
            email: payload.email,
            address: payload.address,
            date_of_birth: payload.date_of_birth,
            gender: payload.gender,
            weight_kg: payload.weight_kg,
            medications: payload.medications,
            last_donation_date: payload.last_donation_date,
            available: payload.available,
            max_travel_km: payload.max_travel_km,
            is_smoker: payload.is_smoker,
            has_chronic_disease: payload.has_chronic_disease,
        },
    )
    .await?
    .ok_or_else(not_found)?;
    Ok(responses::ok("profile updated", row))
}

#[get("/users/{id}")]
pub async fn get(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, HttpApiError> {
    let row = find_by_id(&data.db, path.into_inner())
        .await?
        .ok_or_else(not_found)?;
    Ok(responses::ok("user", row))
}
