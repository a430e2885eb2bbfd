use chrono::{DateTime, Utc};
use common::NotificationType;
use serde::Serialize;
use uuid::Uuid;

use crate::{Db, DbError};

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub reference_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_notification(
    db: &Db,
    user_id: Uuid,
    kind: NotificationType,
    title: &str,
    body: &str,
    reference_id: Option<Uuid>,
) -> Result<NotificationRow, DbError> {
    let row = sqlx::query_as::<_, NotificationRow>(
        r#"INSERT INTO notifications (user_id, notification_type, title, body, reference_id)
           VALUES ($1,$2,$3,$4,$5)
           RETURNING *"#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(reference_id)
    .fetch_one(&db.0)
    .await?;
    Ok(row)
}

pub async fn list_for(
    db: &Db,
    user_id: Uuid,
    unread_only: bool,
) -> Result<Vec<NotificationRow>, DbError> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"SELECT * FROM notifications
           WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
           ORDER BY created_at DESC"#,
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(&db.0)
    .await?;
    Ok(rows)
}

pub async fn mark_read(
    db: &Db,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<NotificationRow>, DbError> {
    let row = sqlx::query_as::<_, NotificationRow>(
        r#"UPDATE notifications SET is_read = TRUE
           WHERE id = $1 AND user_id = $2
           RETURNING *"#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

pub async fn mark_all_read(db: &Db, user_id: Uuid) -> Result<u64, DbError> {
    let res = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
        .bind(user_id)
        .execute(&db.0)
        .await?;
    Ok(res.rows_affected())
}
