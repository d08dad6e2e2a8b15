//! The authorization rules the hosted original expressed as row-level
//! security, as plain functions checked before every read or mutation.

use sqlx::SqlitePool;

use crate::{error::QueueError, models::ROLE_BARBER};

pub fn ensure_owner(owner_id: &str, actor_id: &str) -> Result<(), QueueError> {
    if owner_id == actor_id {
        Ok(())
    } else {
        Err(QueueError::NotOwner)
    }
}

pub fn ensure_barber_role(role: &str) -> Result<(), QueueError> {
    if role == ROLE_BARBER {
        Ok(())
    } else {
        Err(QueueError::NotBarberRole)
    }
}

pub async fn is_shop_barber(
    pool: &SqlitePool,
    shop_id: &str,
    barber_id: &str,
) -> Result<bool, QueueError> {
    let row = sqlx::query_as::<_, (i64,)>(
        "SELECT 1 FROM shop_barbers WHERE shop_id = ? AND barber_id = ? LIMIT 1",
    )
    .bind(shop_id)
    .bind(barber_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn ensure_shop_barber(
    pool: &SqlitePool,
    shop_id: &str,
    barber_id: &str,
) -> Result<(), QueueError> {
    if is_shop_barber(pool, shop_id, barber_id).await? {
        Ok(())
    } else {
        Err(QueueError::NotAuthorized)
    }
}
