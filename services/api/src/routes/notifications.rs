use crate::error::{HttpApiError, not_found};
use crate::extractors::AuthUser;
use crate::responses;
use crate::schemas::UnreadFilter;
use crate::state::AppState;
use actix_web::{HttpResponse, get, patch, post, web};
use db::notifications::{list_for, mark_all_read as db_mark_all_read, mark_read as db_mark_read};
use serde_json::json;
use uuid::Uuid;

#[get("/notifications")]
pub async fn list(
    user: AuthUser,
    data: web::Data<AppState>,
    filter: web::Query<UnreadFilter>,
) -> Result<HttpResponse, HttpApiError> {
    let unread_only = filter.into_inner().unread.unwrap_or(false);
    let rows = list_for(&data.db, user.user_id, unread_only).await?;
    Ok(responses::ok("notifications", rows))
}

#[patch("/notifications/{id}/read")]
pub async fn mark_read(
    user: AuthUser,
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, HttpApiError> {
    let row = db_mark_read(&data.db, path.into_inner(), user.user_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(responses::ok("notification read", row))
}

#[post("/notifications/read-all")]
pub async fn mark_all_read(
    user: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, HttpApiError> {
    let updated = db_mark_all_read(&data.db, user.user_id).await?;
    Ok(responses::ok("notifications read", json!({ "updated": updated })))
}
