use chrono::{DateTime, Utc};
use common::DonationStatus;
use serde::Serialize;
use uuid::Uuid;

use crate::{Db, DbError};

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct DonationRow {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub request_id: Option<Uuid>,
    pub hospital_name: String,
    pub donation_date: DateTime<Utc>,
    pub units: i32,
    pub status: DonationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub request_id: Option<Uuid>,
    pub hospital_name: String,
    pub donation_date: DateTime<Utc>,
    pub units: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DonationUpdate {
    pub hospital_name: Option<String>,
    pub donation_date: Option<DateTime<Utc>>,
    pub units: Option<i32>,
    pub notes: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct DonorStats {
    pub total_donations: i64,
    pub completed_donations: i64,
    pub total_units: i64,
    pub last_donation_date: Option<DateTime<Utc>>,
}

pub async fn insert_donation(
    db: &Db,
    donor_id: Uuid,
    new: &NewDonation,
) -> Result<DonationRow, DbError> {
    let row = sqlx::query_as::<_, DonationRow>(
        r#"INSERT INTO donations
               (donor_id, request_id, hospital_name, donation_date, units, notes)
           VALUES ($1,$2,$3,$4,$5,$6)
           RETURNING *"#,
    )
    .bind(donor_id)
    .bind(new.request_id)
    .bind(&new.hospital_name)
    .bind(new.donation_date)
    .bind(new.units)
    .bind(&new.notes)
    .fetch_one(&db.0)
    .await?;
    Ok(row)
}

pub async fn get_donation(db: &Db, id: Uuid) -> Result<Option<DonationRow>, DbError> {
    let row = sqlx::query_as::<_, DonationRow>("SELECT * FROM donations WHERE id = $1")
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn list_by_donor(db: &Db, donor_id: Uuid) -> Result<Vec<DonationRow>, DbError> {
    let rows = sqlx::query_as::<_, DonationRow>(
        "SELECT * FROM donations WHERE donor_id = $1 ORDER BY donation_date DESC",
    )
    .bind(donor_id)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn list_by_hospital(db: &Db, hospital_name: &str) -> Result<Vec<DonationRow>, DbError> {
    let rows = sqlx::query_as::<_, DonationRow>(
        "SELECT * FROM donations WHERE hospital_name = $1 ORDER BY donation_date DESC",
    )
    .bind(hospital_name)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

/// Field edits are only valid while the donation is still scheduled; the
/// WHERE clause enforces that so a racing completion cannot be overwritten.
pub async fn update_donation(
    db: &Db,
    id: Uuid,
    patch: &DonationUpdate,
) -> Result<Option<DonationRow>, DbError> {
    let row = sqlx::query_as::<_, DonationRow>(
        r#"UPDATE donations SET
               hospital_name = COALESCE($2, hospital_name),
               donation_date = COALESCE($3, donation_date),
               units         = COALESCE($4, units),
               notes         = COALESCE($5, notes),
               updated_at    = NOW()
           WHERE id = $1 AND status = 'scheduled'
           RETURNING *"#,
    )
    .bind(id)
    .bind(&patch.hospital_name)
    .bind(patch.donation_date)
    .bind(patch.units)
    .bind(&patch.notes)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

pub async fn cancel_donation(db: &Db, id: Uuid) -> Result<Option<DonationRow>, DbError> {
    let row = sqlx::query_as::<_, DonationRow>(
        r#"UPDATE donations SET status = 'cancelled', updated_at = NOW()
           WHERE id = $1 AND status = 'scheduled'
           RETURNING *"#,
    )
    .bind(id)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

/// Completes a scheduled donation, confirms it to the donor and, when it is
/// bound to a request, marks that request fulfilled and notifies the
/// requester, all in one transaction. The donation flips only from
/// `scheduled` and the request only from `active`, so a concurrent caller
/// cannot fulfil the same request twice.
///
/// Returns `None` when the donation was not in `scheduled` state (already
/// completed, cancelled, or missing); the second tuple element is the id of
/// the request that was fulfilled, if any.
pub async fn complete_donation(
    db: &Db,
    id: Uuid,
) -> Result<Option<(DonationRow, Option<Uuid>)>, DbError> {
    let mut tx = db.0.begin().await?;

    let donation = sqlx::query_as::<_, DonationRow>(
        r#"UPDATE donations SET status = 'completed', updated_at = NOW()
           WHERE id = $1 AND status = 'scheduled'
           RETURNING *"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(donation) = donation else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query(
        r#"INSERT INTO notifications
               (user_id, notification_type, title, body, reference_id)
           VALUES ($1, 'donation_confirmed', $2, $3, $4)"#,
    )
    .bind(donation.donor_id)
    .bind("Donation completed")
    .bind(format!(
        "Thank you! Your donation at {} is recorded.",
        donation.hospital_name
    ))
    .bind(donation.id)
    .execute(&mut *tx)
    .await?;

    let mut fulfilled = None;
    if let Some(request_id) = donation.request_id {
        let requester: Option<(Uuid,)> = sqlx::query_as(
            r#"UPDATE blood_requests SET status = 'fulfilled', updated_at = NOW()
               WHERE id = $1 AND status = 'active'
               RETURNING requester_id"#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((requester_id,)) = requester {
            sqlx::query(
                r#"INSERT INTO notifications
                       (user_id, notification_type, title, body, reference_id)
                   VALUES ($1, 'request_fulfilled', $2, $3, $4)"#,
            )
            .bind(requester_id)
            .bind("Blood request fulfilled")
            .bind(format!(
                "A donation at {} has fulfilled your blood request.",
                donation.hospital_name
            ))
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
            fulfilled = Some(request_id);
        }
    }

    tx.commit().await?;
    Ok(Some((donation, fulfilled)))
}

pub async fn delete_donation(db: &Db, id: Uuid) -> Result<u64, DbError> {
    let res = sqlx::query("DELETE FROM donations WHERE id = $1 AND status = 'scheduled'")
        .bind(id)
        .execute(&db.0)
        .await?;
    Ok(res.rows_affected())
}

pub async fn donor_stats(db: &Db, donor_id: Uuid) -> Result<DonorStats, DbError> {
    let row = sqlx::query_as::<_, DonorStats>(
        r#"SELECT
               COUNT(*)                                                      AS total_donations,
               COUNT(*) FILTER (WHERE status = 'completed')                  AS completed_donations,
               COALESCE(SUM(units) FILTER (WHERE status = 'completed'), 0)::BIGINT AS total_units,
               MAX(donation_date) FILTER (WHERE status = 'completed')        AS last_donation_date
           FROM donations
           WHERE donor_id = $1"#,
    )
    .bind(donor_id)
    .fetch_one(&db.0)
    .await?;
    Ok(row)
}
