use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{Db, DbError};

// ==== Refresh tokens (rotation) ====

#[derive(sqlx::FromRow, Debug, Serialize, Clone)]
pub struct RefreshRow {
    pub id: i64,
    pub user_id: Uuid,
    pub jti: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_refresh(
    db: &Db,
    user_id: Uuid,
    jti: &str,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        r#"INSERT INTO refresh_tokens (user_id, jti, token_hash, expires_at)
           VALUES ($1, $2, $3, $4)"#,
    )
    .bind(user_id)
    .bind(jti)
    .bind(token_hash)
    .bind(expires_at)
    .execute(&db.0)
    .await?;
    Ok(())
}

pub async fn get_refresh_by_jti(db: &Db, jti: &str) -> Result<Option<RefreshRow>, DbError> {
    let row = sqlx::query_as::<_, RefreshRow>("SELECT * FROM refresh_tokens WHERE jti = $1")
        .bind(jti)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn revoke_refresh(db: &Db, jti: &str) -> Result<u64, DbError> {
    let res = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1")
        .bind(jti)
        .execute(&db.0)
        .await?;
    Ok(res.rows_affected())
}

// ==== One-time codes ====

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct OtpRow {
    pub phone: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One outstanding code per phone; re-issuing replaces the previous one.
pub async fn upsert_otp(
    db: &Db,
    phone: &str,
    code_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        r#"INSERT INTO otp_codes (phone, code_hash, expires_at)
           VALUES ($1, $2, $3)
           ON CONFLICT (phone) DO UPDATE
               SET code_hash = EXCLUDED.code_hash,
                   expires_at = EXCLUDED.expires_at,
                   created_at = NOW()"#,
    )
    .bind(phone)
    .bind(code_hash)
    .bind(expires_at)
    .execute(&db.0)
    .await?;
    Ok(())
}

/// Consumes the outstanding code for a phone, whether or not it has expired;
/// the caller checks `expires_at`. A code can be used at most once.
pub async fn take_otp(db: &Db, phone: &str) -> Result<Option<OtpRow>, DbError> {
    let row = sqlx::query_as::<_, OtpRow>("DELETE FROM otp_codes WHERE phone = $1 RETURNING *")
        .bind(phone)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}
