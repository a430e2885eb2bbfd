use chrono::{DateTime, Utc};
use common::{BloodGroup, RequestStatus, Urgency};
use serde::Serialize;
use uuid::Uuid;

use crate::{Db, DbError};

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct BloodRequestRow {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub patient_name: String,
    pub blood_group: BloodGroup,
    pub units_needed: i32,
    pub urgency: Urgency,
    pub hospital_name: String,
    pub hospital_address: Option<String>,
    pub contact_number: String,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub required_by: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct AcceptanceRow {
    pub id: Uuid,
    pub request_id: Uuid,
    pub donor_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub patient_name: String,
    pub blood_group: BloodGroup,
    pub units_needed: i32,
    pub urgency: Urgency,
    pub hospital_name: String,
    pub hospital_address: Option<String>,
    pub contact_number: String,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub required_by: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestUpdate {
    pub patient_name: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub units_needed: Option<i32>,
    pub urgency: Option<Urgency>,
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub contact_number: Option<String>,
    pub description: Option<String>,
    pub required_by: Option<DateTime<Utc>>,
}

pub async fn insert_request(
    db: &Db,
    requester_id: Uuid,
    new: &NewRequest,
) -> Result<BloodRequestRow, DbError> {
    let row = sqlx::query_as::<_, BloodRequestRow>(
        r#"INSERT INTO blood_requests
               (requester_id, patient_name, blood_group, units_needed, urgency,
                hospital_name, hospital_address, contact_number, description,
                status, required_by)
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
           RETURNING *"#,
    )
    .bind(requester_id)
    .bind(&new.patient_name)
    .bind(new.blood_group)
    .bind(new.units_needed)
    .bind(new.urgency)
    .bind(&new.hospital_name)
    .bind(&new.hospital_address)
    .bind(&new.contact_number)
    .bind(&new.description)
    .bind(new.status)
    .bind(new.required_by)
    .fetch_one(&db.0)
    .await?;
    Ok(row)
}

pub async fn get_request(db: &Db, id: Uuid) -> Result<Option<BloodRequestRow>, DbError> {
    let row = sqlx::query_as::<_, BloodRequestRow>("SELECT * FROM blood_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

/// Open requests: active and not yet past their deadline. Expiry is a
/// query-time filter, there is no background job flipping rows to expired.
/// Ordered most urgent first, then soonest deadline.
pub async fn list_open(
    db: &Db,
    urgent_only: bool,
    exclude_requester: Option<Uuid>,
) -> Result<Vec<BloodRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, BloodRequestRow>(
        r#"SELECT * FROM blood_requests
           WHERE status = 'active' AND required_by > NOW()
             AND (NOT $1 OR urgency IN ('high', 'critical'))
             AND ($2::uuid IS NULL OR requester_id <> $2)
           ORDER BY urgency DESC, required_by ASC"#,
    )
    .bind(urgent_only)
    .bind(exclude_requester)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn list_mine(db: &Db, requester_id: Uuid) -> Result<Vec<BloodRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, BloodRequestRow>(
        "SELECT * FROM blood_requests WHERE requester_id = $1 ORDER BY created_at DESC",
    )
    .bind(requester_id)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn list_accepted_by(db: &Db, donor_id: Uuid) -> Result<Vec<BloodRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, BloodRequestRow>(
        r#"SELECT r.* FROM blood_requests r
           JOIN request_acceptances a ON a.request_id = r.id
           WHERE a.donor_id = $1 AND a.status = 'accepted'
           ORDER BY r.required_by ASC"#,
    )
    .bind(donor_id)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

/// Fulfilled requests the user posted or donated to.
pub async fn list_completed_for(db: &Db, user_id: Uuid) -> Result<Vec<BloodRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, BloodRequestRow>(
        r#"SELECT * FROM blood_requests r
           WHERE r.status = 'fulfilled'
             AND (r.requester_id = $1
                  OR EXISTS (SELECT 1 FROM donations d
                             WHERE d.request_id = r.id
                               AND d.donor_id = $1
                               AND d.status = 'completed'))
           ORDER BY r.updated_at DESC"#,
    )
    .bind(user_id)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn update_request(
    db: &Db,
    id: Uuid,
    patch: &RequestUpdate,
) -> Result<Option<BloodRequestRow>, DbError> {
    let row = sqlx::query_as::<_, BloodRequestRow>(
        r#"UPDATE blood_requests SET
               patient_name     = COALESCE($2, patient_name),
               blood_group      = COALESCE($3, blood_group),
               units_needed     = COALESCE($4, units_needed),
               urgency          = COALESCE($5, urgency),
               hospital_name    = COALESCE($6, hospital_name),
               hospital_address = COALESCE($7, hospital_address),
               contact_number   = COALESCE($8, contact_number),
               description      = COALESCE($9, description),
               required_by      = COALESCE($10, required_by),
               updated_at       = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(&patch.patient_name)
    .bind(patch.blood_group)
    .bind(patch.units_needed)
    .bind(patch.urgency)
    .bind(&patch.hospital_name)
    .bind(&patch.hospital_address)
    .bind(&patch.contact_number)
    .bind(&patch.description)
    .bind(patch.required_by)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

pub async fn set_status(
    db: &Db,
    id: Uuid,
    status: RequestStatus,
) -> Result<Option<BloodRequestRow>, DbError> {
    let row = sqlx::query_as::<_, BloodRequestRow>(
        "UPDATE blood_requests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

pub async fn delete_request(db: &Db, id: Uuid) -> Result<u64, DbError> {
    let res = sqlx::query("DELETE FROM blood_requests WHERE id = $1")
        .bind(id)
        .execute(&db.0)
        .await?;
    Ok(res.rows_affected())
}

/// UNIQUE(request_id, donor_id) turns a repeat accept into a unique-violation
/// error; callers map that to a conflict.
pub async fn insert_acceptance(
    db: &Db,
    request_id: Uuid,
    donor_id: Uuid,
) -> Result<AcceptanceRow, DbError> {
    let row = sqlx::query_as::<_, AcceptanceRow>(
        r#"INSERT INTO request_acceptances (request_id, donor_id)
           VALUES ($1, $2)
           RETURNING *"#,
    )
    .bind(request_id)
    .bind(donor_id)
    .fetch_one(&db.0)
    .await?;
    Ok(row)
}

pub async fn has_completed_donation(
    db: &Db,
    request_id: Uuid,
    donor_id: Uuid,
) -> Result<bool, DbError> {
    let found: Option<(i32,)> = sqlx::query_as(
        r#"SELECT 1 FROM donations
           WHERE request_id = $1 AND donor_id = $2 AND status = 'completed'
           LIMIT 1"#,
    )
    .bind(request_id)
    .bind(donor_id)
    .fetch_optional(&db.0)
    .await?;
    Ok(found.is_some())
}
