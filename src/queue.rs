//! Appointment lifecycle for a shop's walk-in queue: admission, ordering,
//! transitions, removal. Positions come from the shop's `queue_seq` counter,
//! claimed and inserted inside one transaction, so concurrent admissions
//! serialize on SQLite's write lock and a position is never handed out twice
//! or reused after cancellation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    db,
    error::QueueError,
    models::{
        is_known_service, AppointmentRow, STATUS_CANCELLED, STATUS_COMPLETED, STATUS_IN_PROGRESS,
        STATUS_WAITING,
    },
    policy,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub shop_id: String,
    pub service: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShopQueue {
    pub waiting: Vec<AppointmentRow>,
    pub in_progress: Vec<AppointmentRow>,
}

#[derive(sqlx::FromRow)]
struct AppointmentHead {
    shop_id: String,
    customer_id: String,
    status: String,
}

async fn fetch_head(pool: &SqlitePool, appointment_id: &str) -> Result<AppointmentHead, QueueError> {
    sqlx::query_as::<_, AppointmentHead>(
        "SELECT shop_id, customer_id, status FROM appointments WHERE id = ? LIMIT 1",
    )
    .bind(appointment_id)
    .fetch_optional(pool)
    .await?
    .ok_or(QueueError::NotFound)
}

async fn fetch_required(pool: &SqlitePool, appointment_id: &str) -> Result<AppointmentRow, QueueError> {
    db::fetch_appointment(pool, appointment_id)
        .await?
        .ok_or(QueueError::NotFound)
}

pub async fn create_appointment(
    pool: &SqlitePool,
    customer_id: &str,
    input: NewAppointment,
) -> Result<AppointmentRow, QueueError> {
    let service = input.service.trim();
    if service.is_empty() {
        return Err(QueueError::InvalidInput("service is required".into()));
    }
    if !is_known_service(service) {
        return Err(QueueError::InvalidInput(format!(
            "unknown service '{service}'"
        )));
    }
    let notes = input.notes.filter(|value| !value.trim().is_empty());

    let mut tx = pool.begin().await?;

    // Claims the next position and takes the write lock in one statement;
    // a missing shop falls out of the same query.
    let position: Option<i64> = sqlx::query_scalar(
        "UPDATE shops SET queue_seq = queue_seq + 1 WHERE id = ? RETURNING queue_seq",
    )
    .bind(&input.shop_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(position) = position else {
        return Err(QueueError::ShopNotFound);
    };

    let appointment_id = new_id();
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO appointments
           (id, shop_id, customer_id, service, notes, status, queue_position, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&appointment_id)
    .bind(&input.shop_id)
    .bind(customer_id)
    .bind(service)
    .bind(notes.as_deref())
    .bind(STATUS_WAITING)
    .bind(position)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    fetch_required(pool, &appointment_id).await
}

pub async fn start_service(
    pool: &SqlitePool,
    appointment_id: &str,
    barber_id: &str,
) -> Result<AppointmentRow, QueueError> {
    let head = fetch_head(pool, appointment_id).await?;
    policy::ensure_shop_barber(pool, &head.shop_id, barber_id).await?;
    if head.status != STATUS_WAITING {
        return Err(QueueError::InvalidState {
            expected: STATUS_WAITING,
            actual: head.status,
        });
    }

    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE appointments SET status = ?, started_at = ?, barber_id = ? WHERE id = ? AND status = ?",
    )
    .bind(STATUS_IN_PROGRESS)
    .bind(&now)
    .bind(barber_id)
    .bind(appointment_id)
    .bind(STATUS_WAITING)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // lost the race against another transition
        let head = fetch_head(pool, appointment_id).await?;
        return Err(QueueError::InvalidState {
            expected: STATUS_WAITING,
            actual: head.status,
        });
    }

    fetch_required(pool, appointment_id).await
}

pub async fn complete_service(
    pool: &SqlitePool,
    appointment_id: &str,
    barber_id: &str,
) -> Result<AppointmentRow, QueueError> {
    let head = fetch_head(pool, appointment_id).await?;
    policy::ensure_shop_barber(pool, &head.shop_id, barber_id).await?;
    if head.status != STATUS_IN_PROGRESS {
        return Err(QueueError::InvalidState {
            expected: STATUS_IN_PROGRESS,
            actual: head.status,
        });
    }

    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE appointments SET status = ?, completed_at = ? WHERE id = ? AND status = ?",
    )
    .bind(STATUS_COMPLETED)
    .bind(&now)
    .bind(appointment_id)
    .bind(STATUS_IN_PROGRESS)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let head = fetch_head(pool, appointment_id).await?;
        return Err(QueueError::InvalidState {
            expected: STATUS_IN_PROGRESS,
            actual: head.status,
        });
    }

    fetch_required(pool, appointment_id).await
}

pub async fn cancel_appointment(
    pool: &SqlitePool,
    appointment_id: &str,
    customer_id: &str,
) -> Result<AppointmentRow, QueueError> {
    let head = fetch_head(pool, appointment_id).await?;
    policy::ensure_owner(&head.customer_id, customer_id)?;
    if head.status != STATUS_WAITING {
        return Err(QueueError::InvalidState {
            expected: STATUS_WAITING,
            actual: head.status,
        });
    }

    let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ? AND status = ?")
        .bind(STATUS_CANCELLED)
        .bind(appointment_id)
        .bind(STATUS_WAITING)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        let head = fetch_head(pool, appointment_id).await?;
        return Err(QueueError::InvalidState {
            expected: STATUS_WAITING,
            actual: head.status,
        });
    }

    fetch_required(pool, appointment_id).await
}

/// Destructive removal by a shop's barber. Allowed from any state; the
/// position is spent either way.
pub async fn delete_appointment(
    pool: &SqlitePool,
    appointment_id: &str,
    barber_id: &str,
) -> Result<String, QueueError> {
    let head = fetch_head(pool, appointment_id).await?;
    policy::ensure_shop_barber(pool, &head.shop_id, barber_id).await?;

    sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(appointment_id)
        .execute(pool)
        .await?;

    Ok(head.shop_id)
}

pub async fn shop_queue(
    pool: &SqlitePool,
    shop_id: &str,
    barber_id: &str,
) -> Result<ShopQueue, QueueError> {
    let shop = sqlx::query_as::<_, (String,)>("SELECT id FROM shops WHERE id = ? LIMIT 1")
        .bind(shop_id)
        .fetch_optional(pool)
        .await?;
    if shop.is_none() {
        return Err(QueueError::ShopNotFound);
    }
    policy::ensure_shop_barber(pool, shop_id, barber_id).await?;

    let waiting = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT a.id, a.shop_id, a.customer_id, a.barber_id, a.service, a.notes,
                  a.status, a.queue_position, a.created_at, a.started_at, a.completed_at,
                  c.display_name as customer_name,
                  b.display_name as barber_name
           FROM appointments a
           JOIN users c ON a.customer_id = c.id
           LEFT JOIN users b ON a.barber_id = b.id
           WHERE a.shop_id = ? AND a.status = ?
           ORDER BY a.queue_position ASC"#,
    )
    .bind(shop_id)
    .bind(STATUS_WAITING)
    .fetch_all(pool)
    .await?;

    let in_progress = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT a.id, a.shop_id, a.customer_id, a.barber_id, a.service, a.notes,
                  a.status, a.queue_position, a.created_at, a.started_at, a.completed_at,
                  c.display_name as customer_name,
                  b.display_name as barber_name
           FROM appointments a
           JOIN users c ON a.customer_id = c.id
           LEFT JOIN users b ON a.barber_id = b.id
           WHERE a.shop_id = ? AND a.status = ?
           ORDER BY a.started_at ASC"#,
    )
    .bind(shop_id)
    .bind(STATUS_IN_PROGRESS)
    .fetch_all(pool)
    .await?;

    Ok(ShopQueue {
        waiting,
        in_progress,
    })
}

pub async fn customer_active(
    pool: &SqlitePool,
    customer_id: &str,
) -> Result<Vec<AppointmentRow>, QueueError> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT a.id, a.shop_id, a.customer_id, a.barber_id, a.service, a.notes,
                  a.status, a.queue_position, a.created_at, a.started_at, a.completed_at,
                  c.display_name as customer_name,
                  b.display_name as barber_name
           FROM appointments a
           JOIN users c ON a.customer_id = c.id
           LEFT JOIN users b ON a.barber_id = b.id
           WHERE a.customer_id = ? AND a.status IN (?, ?)
           ORDER BY a.created_at ASC"#,
    )
    .bind(customer_id)
    .bind(STATUS_WAITING)
    .bind(STATUS_IN_PROGRESS)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use crate::models::{ROLE_BARBER, ROLE_CUSTOMER};

    fn request(shop_id: &str, service: &str) -> NewAppointment {
        NewAppointment {
            shop_id: shop_id.to_string(),
            service: service.to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn admission_assigns_sequential_positions() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let customer = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;

        let first = create_appointment(&pool, &customer, request(&shop, "haircut"))
            .await
            .unwrap();
        let second = create_appointment(&pool, &customer, request(&shop, "shave"))
            .await
            .unwrap();

        assert_eq!(first.queue_position, 1);
        assert_eq!(second.queue_position, 2);
        assert_eq!(first.status, STATUS_WAITING);
    }

    #[tokio::test]
    async fn positions_are_never_reused_after_cancellation() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let customer = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;

        let first = create_appointment(&pool, &customer, request(&shop, "haircut"))
            .await
            .unwrap();
        cancel_appointment(&pool, &first.id, &customer).await.unwrap();

        let second = create_appointment(&pool, &customer, request(&shop, "haircut"))
            .await
            .unwrap();
        assert_eq!(second.queue_position, 2);
    }

    #[tokio::test]
    async fn concurrent_admissions_get_distinct_positions() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let customer = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let customer = customer.clone();
            let shop = shop.clone();
            handles.push(tokio::spawn(async move {
                create_appointment(&pool, &customer, request(&shop, "haircut"))
                    .await
                    .unwrap()
                    .queue_position
            }));
        }

        let mut positions = Vec::new();
        for handle in handles {
            positions.push(handle.await.unwrap());
        }
        positions.sort_unstable();
        assert_eq!(positions, (1..=8).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn admission_validates_service_and_shop() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let customer = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;

        let err = create_appointment(&pool, &customer, request(&shop, "perm"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidInput(_)));

        let err = create_appointment(&pool, &customer, request("no-such-shop", "haircut"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::ShopNotFound));
    }

    #[tokio::test]
    async fn start_requires_waiting_and_complete_requires_in_progress() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let customer = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;
        testing::associate(&pool, &shop, &barber).await;

        let appt = create_appointment(&pool, &customer, request(&shop, "haircut"))
            .await
            .unwrap();

        let err = complete_service(&pool, &appt.id, &barber).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidState { .. }));

        let started = start_service(&pool, &appt.id, &barber).await.unwrap();
        assert_eq!(started.status, STATUS_IN_PROGRESS);
        assert!(started.started_at.is_some());
        assert_eq!(started.barber_id.as_deref(), Some(barber.as_str()));

        let err = start_service(&pool, &appt.id, &barber).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidState { .. }));

        let done = complete_service(&pool, &appt.id, &barber).await.unwrap();
        assert_eq!(done.status, STATUS_COMPLETED);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn terminal_states_reject_every_transition() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let customer = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;
        testing::associate(&pool, &shop, &barber).await;

        let appt = create_appointment(&pool, &customer, request(&shop, "haircut"))
            .await
            .unwrap();
        start_service(&pool, &appt.id, &barber).await.unwrap();
        complete_service(&pool, &appt.id, &barber).await.unwrap();

        let err = cancel_appointment(&pool, &appt.id, &customer).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidState { .. }));
        let err = start_service(&pool, &appt.id, &barber).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidState { .. }));
        let err = complete_service(&pool, &appt.id, &barber).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidState { .. }));

        // stored state untouched by the failed attempts
        let row = fetch_required(&pool, &appt.id).await.unwrap();
        assert_eq!(row.status, STATUS_COMPLETED);
    }

    #[tokio::test]
    async fn cancel_is_owner_only() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let ana = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let ben = testing::seed_user(&pool, "ben", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;

        let appt = create_appointment(&pool, &ana, request(&shop, "haircut"))
            .await
            .unwrap();

        let err = cancel_appointment(&pool, &appt.id, &ben).await.unwrap_err();
        assert!(matches!(err, QueueError::NotOwner));

        let cancelled = cancel_appointment(&pool, &appt.id, &ana).await.unwrap();
        assert_eq!(cancelled.status, STATUS_CANCELLED);
    }

    #[tokio::test]
    async fn transitions_require_shop_membership() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let outsider = testing::seed_user(&pool, "vito", ROLE_BARBER).await;
        let customer = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;
        testing::associate(&pool, &shop, &barber).await;

        let appt = create_appointment(&pool, &customer, request(&shop, "haircut"))
            .await
            .unwrap();

        let err = start_service(&pool, &appt.id, &outsider).await.unwrap_err();
        assert!(matches!(err, QueueError::NotAuthorized));
        let err = delete_appointment(&pool, &appt.id, &outsider).await.unwrap_err();
        assert!(matches!(err, QueueError::NotAuthorized));

        let shop_id = delete_appointment(&pool, &appt.id, &barber).await.unwrap();
        assert_eq!(shop_id, shop);
        let err = fetch_required(&pool, &appt.id).await.unwrap_err();
        assert!(matches!(err, QueueError::NotFound));
    }

    #[tokio::test]
    async fn queue_views_track_the_walk_in_flow() {
        let (pool, _dir) = testing::pool().await;
        let barber = testing::seed_user(&pool, "tony", ROLE_BARBER).await;
        let ana = testing::seed_user(&pool, "ana", ROLE_CUSTOMER).await;
        let ben = testing::seed_user(&pool, "ben", ROLE_CUSTOMER).await;
        let shop = testing::seed_shop(&pool, &barber, "Corner Cuts").await;
        testing::associate(&pool, &shop, &barber).await;

        let first = create_appointment(&pool, &ana, request(&shop, "haircut"))
            .await
            .unwrap();
        create_appointment(&pool, &ben, request(&shop, "beard_trim"))
            .await
            .unwrap();

        let queue = shop_queue(&pool, &shop, &barber).await.unwrap();
        assert_eq!(queue.waiting.len(), 2);
        assert!(queue.in_progress.is_empty());
        assert_eq!(queue.waiting[0].queue_position, 1);
        assert_eq!(queue.waiting[1].queue_position, 2);

        start_service(&pool, &first.id, &barber).await.unwrap();
        let queue = shop_queue(&pool, &shop, &barber).await.unwrap();
        assert_eq!(queue.waiting.len(), 1);
        assert_eq!(queue.in_progress.len(), 1);
        assert_eq!(queue.in_progress[0].id, first.id);

        complete_service(&pool, &first.id, &barber).await.unwrap();
        let queue = shop_queue(&pool, &shop, &barber).await.unwrap();
        assert_eq!(queue.waiting.len(), 1);
        assert!(queue.in_progress.is_empty());

        let active = customer_active(&pool, &ana).await.unwrap();
        assert!(active.is_empty());
        let active = customer_active(&pool, &ben).await.unwrap();
        assert_eq!(active.len(), 1);
    }
}
