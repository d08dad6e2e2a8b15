use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::models::AppointmentRow;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub events: broadcast::Sender<QueueEvent>,
}

/// Change signal, not a delta. Consumers re-fetch the queue they care about;
/// delivery is at-least-once and may arrive out of order.
#[derive(Clone, Debug, Serialize)]
pub struct QueueEvent {
    pub kind: String,
    pub shop_id: String,
    pub appointment_id: Option<String>,
    pub status: Option<String>,
}

impl QueueEvent {
    pub fn appointment(kind: &str, row: &AppointmentRow) -> Self {
        Self {
            kind: kind.to_string(),
            shop_id: row.shop_id.clone(),
            appointment_id: Some(row.id.clone()),
            status: Some(row.status.clone()),
        }
    }

    pub fn removed(kind: &str, shop_id: &str, appointment_id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            shop_id: shop_id.to_string(),
            appointment_id: Some(appointment_id.to_string()),
            status: None,
        }
    }
}
