//! Shop directory: shop records and barber-shop associations. Supplies the
//! membership facts the policy checks run against.

use chrono::{NaiveTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::{new_id, AuthUser},
    error::QueueError,
    models::{ShopBarberRow, ShopRow},
    policy,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub address: String,
    pub opens_at: String,
    pub closes_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub opens_at: Option<String>,
    pub closes_at: Option<String>,
}

const SHOP_COLUMNS: &str =
    "id, name, address, opens_at, closes_at, created_by, created_at";

pub async fn list_shops(pool: &SqlitePool) -> Result<Vec<ShopRow>, QueueError> {
    let rows = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn fetch_shop(pool: &SqlitePool, shop_id: &str) -> Result<Option<ShopRow>, QueueError> {
    let row = sqlx::query_as::<_, ShopRow>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE id = ? LIMIT 1"
    ))
    .bind(shop_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create_shop(
    pool: &SqlitePool,
    user: &AuthUser,
    input: NewShop,
) -> Result<ShopRow, QueueError> {
    policy::ensure_barber_role(&user.role)?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(QueueError::InvalidInput("name is required".into()));
    }
    let address = input.address.trim();
    if address.is_empty() {
        return Err(QueueError::InvalidInput("address is required".into()));
    }
    let opens = parse_hours(&input.opens_at, "opens_at")?;
    let closes = parse_hours(&input.closes_at, "closes_at")?;
    if opens >= closes {
        return Err(QueueError::InvalidInput(
            "opens_at must be before closes_at".into(),
        ));
    }

    let shop_id = new_id();
    let now = Utc::now().to_rfc3339();

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"INSERT INTO shops (id, name, address, opens_at, closes_at, queue_seq, created_by, created_at)
           VALUES (?, ?, ?, ?, ?, 0, ?, ?)"#,
    )
    .bind(&shop_id)
    .bind(name)
    .bind(address)
    .bind(input.opens_at.trim())
    .bind(input.closes_at.trim())
    .bind(&user.id)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    // the creator manages the shop from the start
    sqlx::query("INSERT INTO shop_barbers (shop_id, barber_id, created_at) VALUES (?, ?, ?)")
        .bind(&shop_id)
        .bind(&user.id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    fetch_shop(pool, &shop_id)
        .await?
        .ok_or(QueueError::ShopNotFound)
}

pub async fn update_shop(
    pool: &SqlitePool,
    user: &AuthUser,
    shop_id: &str,
    changes: ShopUpdate,
) -> Result<ShopRow, QueueError> {
    let shop = fetch_shop(pool, shop_id)
        .await?
        .ok_or(QueueError::ShopNotFound)?;
    policy::ensure_shop_barber(pool, shop_id, &user.id).await?;

    let name = changes.name.unwrap_or(shop.name);
    let name = name.trim();
    if name.is_empty() {
        return Err(QueueError::InvalidInput("name is required".into()));
    }
    let address = changes.address.unwrap_or(shop.address);
    let address = address.trim();
    if address.is_empty() {
        return Err(QueueError::InvalidInput("address is required".into()));
    }
    let opens_at = changes.opens_at.unwrap_or(shop.opens_at);
    let closes_at = changes.closes_at.unwrap_or(shop.closes_at);
    let opens = parse_hours(&opens_at, "opens_at")?;
    let closes = parse_hours(&closes_at, "closes_at")?;
    if opens >= closes {
        return Err(QueueError::InvalidInput(
            "opens_at must be before closes_at".into(),
        ));
    }

    sqlx::query("UPDATE shops SET name = ?, address = ?, opens_at = ?, closes_at = ? WHERE id = ?")
        .bind(name)
        .bind(address)
        .bind(opens_at.trim())
        .bind(closes_at.trim())
        .bind(shop_id)
        .execute(pool)
        .await?;

    fetch_shop(pool, shop_id)
        .await?
        .ok_or(QueueError::ShopNotFound)
}

pub async fn register_barber(
    pool: &SqlitePool,
    user: &AuthUser,
    shop_id: &str,
) -> Result<ShopBarberRow, QueueError> {
    policy::ensure_barber_role(&user.role)?;
    if fetch_shop(pool, shop_id).await?.is_none() {
        return Err(QueueError::ShopNotFound);
    }

    sqlx::query(
        r#"INSERT INTO shop_barbers (shop_id, barber_id, created_at)
           VALUES (?, ?, ?)
           ON CONFLICT (shop_id, barber_id) DO NOTHING"#,
    )
    .bind(shop_id)
    .bind(&user.id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let row = sqlx::query_as::<_, ShopBarberRow>(
        "SELECT shop_id, barber_id, created_at FROM shop_barbers WHERE shop_id = ? AND barber_id = ? LIMIT 1",
    )
    .bind(shop_id)
    .bind(&user.id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn deregister_barber(
    pool: &SqlitePool,
    user: &AuthUser,
    shop_id: &str,
) -> Result<(), QueueError> {
    sqlx::query("DELETE FROM shop_barbers WHERE shop_id = ? AND barber_id = ?")
        .bind(shop_id)
        .bind(&user.id)
        .execute(pool)
        .await?;
    Ok(())
}

fn parse_hours(value: &str, field: &str) -> Result<NaiveTime, QueueError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| QueueError::InvalidInput(format!("{field} must be HH:MM")))
}
