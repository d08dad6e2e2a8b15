use std::{env, fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    models::{AppointmentRow, ROLE_BARBER},
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn log_activity(
    pool: &SqlitePool,
    kind: &str,
    message: &str,
    user_id: Option<&str>,
    appointment_id: Option<&str>,
) {
    let _ = sqlx::query(
        r#"INSERT INTO activities (id, kind, message, created_at, user_id, appointment_id)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(kind)
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .bind(user_id)
    .bind(appointment_id)
    .execute(pool)
    .await;
}

pub async fn fetch_appointment(
    pool: &SqlitePool,
    appointment_id: &str,
) -> Result<Option<AppointmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT a.id, a.shop_id, a.customer_id, a.barber_id, a.service, a.notes,
                  a.status, a.queue_position, a.created_at, a.started_at, a.completed_at,
                  c.display_name as customer_name,
                  b.display_name as barber_name
           FROM appointments a
           JOIN users c ON a.customer_id = c.id
           LEFT JOIN users b ON a.barber_id = b.id
           WHERE a.id = ?
           LIMIT 1"#,
    )
    .bind(appointment_id)
    .fetch_optional(pool)
    .await
}

/// Seeds one barber and one shop when SEED_DEMO=true, so a fresh install has
/// something to point a client at.
pub async fn seed_demo(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let demo = env::var("SEED_DEMO").unwrap_or_else(|_| "false".to_string());
    if demo != "true" {
        return Ok(());
    }

    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_BARBER)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let username = env::var("BARBER_USER").unwrap_or_else(|_| "barber1".to_string());
    let password = env::var("BARBER_PASSWORD").unwrap_or_else(|_| "change-me".to_string());
    let display_name = env::var("BARBER_DISPLAY_NAME").unwrap_or_else(|_| "Barber One".to_string());
    if password == "change-me" {
        log::warn!("BARBER_PASSWORD not set. Using default password 'change-me'. Set BARBER_PASSWORD in production.");
    }

    let password_hash =
        hash_password(&password).map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let barber_id = new_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, username, display_name, role, password_hash, active, created_at)
           VALUES (?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(&barber_id)
    .bind(username)
    .bind(display_name)
    .bind(ROLE_BARBER)
    .bind(password_hash)
    .bind(&now)
    .execute(pool)
    .await?;

    let shop_id = new_id();
    sqlx::query(
        r#"INSERT INTO shops (id, name, address, opens_at, closes_at, queue_seq, created_by, created_at)
           VALUES (?, ?, ?, ?, ?, 0, ?, ?)"#,
    )
    .bind(&shop_id)
    .bind("Chairline Demo Shop")
    .bind("1 Main Street")
    .bind("09:00")
    .bind("18:00")
    .bind(&barber_id)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO shop_barbers (shop_id, barber_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(&shop_id)
    .bind(&barber_id)
    .bind(&now)
    .execute(pool)
    .await?;

    log::info!("Seeded demo barber and shop {shop_id}");
    Ok(())
}
