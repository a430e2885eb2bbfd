use chrono::{DateTime, NaiveDate, Utc};
use common::{BloodGroup, UserRole, UserType};
use serde::Serialize;
use uuid::Uuid;

use crate::{Db, DbError};

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub phone: String,
    pub name: String,
    pub user_type: UserType,
    pub role: Option<UserRole>,
    pub blood_group: Option<BloodGroup>,
    pub hospital_name: Option<String>,
    pub hospital_id: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub weight_kg: Option<f64>,
    pub medications: Option<String>,
    pub last_donation_date: Option<NaiveDate>,
    pub available: bool,
    pub max_travel_km: Option<i32>,
    pub is_smoker: Option<bool>,
    pub has_chronic_disease: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub name: String,
    pub user_type: UserType,
    pub role: Option<UserRole>,
    pub blood_group: Option<BloodGroup>,
    pub hospital_name: Option<String>,
    pub hospital_id: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub password_hash: Option<String>,
}

/// Allow-listed profile fields; identity fields (phone, user_type, role) are
/// not updatable through this path.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub hospital_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub weight_kg: Option<f64>,
    pub medications: Option<String>,
    pub last_donation_date: Option<NaiveDate>,
    pub available: Option<bool>,
    pub max_travel_km: Option<i32>,
    pub is_smoker: Option<bool>,
    pub has_chronic_disease: Option<bool>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct OverviewStats {
    pub total_users: i64,
    pub total_donors: i64,
    pub total_hospitals: i64,
    pub active_requests: i64,
    pub completed_donations: i64,
    pub total_units_donated: i64,
}

pub async fn insert_user(db: &Db, new: &NewUser) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"INSERT INTO users
               (phone, name, user_type, role, blood_group, hospital_name,
                hospital_id, email, address, password_hash)
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
           RETURNING *"#,
    )
    .bind(&new.phone)
    .bind(&new.name)
    .bind(new.user_type)
    .bind(new.role)
    .bind(new.blood_group)
    .bind(&new.hospital_name)
    .bind(&new.hospital_id)
    .bind(&new.email)
    .bind(&new.address)
    .bind(&new.password_hash)
    .fetch_one(&db.0)
    .await?;
    Ok(row)
}

pub async fn find_by_phone(db: &Db, phone: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE phone = $1")
        .bind(phone)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn find_by_id(db: &Db, id: Uuid) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn set_password(db: &Db, id: Uuid, password_hash: &str) -> Result<u64, DbError> {
    let res = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(&db.0)
        .await?;
    Ok(res.rows_affected())
}

pub async fn mark_verified(db: &Db, id: Uuid) -> Result<u64, DbError> {
    let res = sqlx::query("UPDATE users SET verified = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&db.0)
        .await?;
    Ok(res.rows_affected())
}

pub async fn update_profile(
    db: &Db,
    id: Uuid,
    patch: &ProfileUpdate,
) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"UPDATE users SET
               name                = COALESCE($2, name),
               blood_group         = COALESCE($3, blood_group),
               hospital_name       = COALESCE($4, hospital_name),
               email               = COALESCE($5, email),
               address             = COALESCE($6, address),
               date_of_birth       = COALESCE($7, date_of_birth),
               gender              = COALESCE($8, gender),
               weight_kg           = COALESCE($9, weight_kg),
               medications         = COALESCE($10, medications),
               last_donation_date  = COALESCE($11, last_donation_date),
               available           = COALESCE($12, available),
               max_travel_km       = COALESCE($13, max_travel_km),
               is_smoker           = COALESCE($14, is_smoker),
               has_chronic_disease = COALESCE($15, has_chronic_disease),
               updated_at          = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(&patch.name)
    .bind(patch.blood_group)
    .bind(&patch.hospital_name)
    .bind(&patch.email)
    .bind(&patch.address)
    .bind(patch.date_of_birth)
    .bind(&patch.gender)
    .bind(patch.weight_kg)
    .bind(&patch.medications)
    .bind(patch.last_donation_date)
    .bind(patch.available)
    .bind(patch.max_travel_km)
    .bind(patch.is_smoker)
    .bind(patch.has_chronic_disease)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

pub async fn list_donors(
    db: &Db,
    blood_group: Option<BloodGroup>,
    available: Option<bool>,
) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        r#"SELECT * FROM users
           WHERE user_type = 'individual' AND role = 'donor'
             AND ($1::blood_group IS NULL OR blood_group = $1)
             AND ($2::boolean IS NULL OR available = $2)
           ORDER BY created_at DESC"#,
    )
    .bind(blood_group)
    .bind(available)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn list_hospitals(db: &Db) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE user_type = 'hospital' ORDER BY hospital_name, created_at",
    )
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn search_donors(
    db: &Db,
    blood_group: Option<BloodGroup>,
    query: Option<&str>,
) -> Result<Vec<UserRow>, DbError> {
    let pattern = query.map(|q| format!("%{q}%"));
    let rows = sqlx::query_as::<_, UserRow>(
        r#"SELECT * FROM users
           WHERE user_type = 'individual' AND role = 'donor'
             AND ($1::blood_group IS NULL OR blood_group = $1)
             AND ($2::text IS NULL OR name ILIKE $2 OR address ILIKE $2)
           ORDER BY last_donation_date DESC NULLS LAST, created_at DESC"#,
    )
    .bind(blood_group)
    .bind(pattern)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn overview_stats(db: &Db) -> Result<OverviewStats, DbError> {
    let row = sqlx::query_as::<_, OverviewStats>(
        r#"SELECT
               (SELECT COUNT(*) FROM users)                                  AS total_users,
               (SELECT COUNT(*) FROM users
                 WHERE user_type = 'individual' AND role = 'donor')          AS total_donors,
               (SELECT COUNT(*) FROM users WHERE user_type = 'hospital')     AS total_hospitals,
               (SELECT COUNT(*) FROM blood_requests
                 WHERE status = 'active' AND required_by > NOW())            AS active_requests,
               (SELECT COUNT(*) FROM donations WHERE status = 'completed')   AS completed_donations,
               (SELECT COALESCE(SUM(units), 0) FROM donations
                 WHERE status = 'completed')::BIGINT                         AS total_units_donated"#,
    )
    .fetch_one(&db.0)
    .await?;
    Ok(row)
}
