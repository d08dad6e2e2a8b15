use serde::Serialize;

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_BARBER: &str = "barber";

pub const STATUS_WAITING: &str = "waiting";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
    pub active: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShopRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub opens_at: String,
    pub closes_at: String,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShopBarberRow {
    pub shop_id: String,
    pub barber_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AppointmentRow {
    pub id: String,
    pub shop_id: String,
    pub customer_id: String,
    pub barber_id: Option<String>,
    pub service: String,
    pub notes: Option<String>,
    pub status: String,
    pub queue_position: i64,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub customer_name: String,
    pub barber_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceOption {
    pub name: &'static str,
    pub duration: &'static str,
    pub description: &'static str,
}

pub fn service_catalog() -> Vec<ServiceOption> {
    vec![
        ServiceOption {
            name: "haircut",
            duration: "30 min",
            description: "Full haircut with styling.",
        },
        ServiceOption {
            name: "beard_trim",
            duration: "15 min",
            description: "Beard shaping and trim.",
        },
        ServiceOption {
            name: "haircut_beard",
            duration: "45 min",
            description: "Haircut plus beard trim.",
        },
        ServiceOption {
            name: "shave",
            duration: "20 min",
            description: "Classic hot-towel shave.",
        },
    ]
}

pub fn is_known_service(name: &str) -> bool {
    service_catalog().iter().any(|option| option.name == name)
}
