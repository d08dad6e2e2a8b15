use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{hash_password, new_id},
    directory,
    error::QueueError,
    models::{service_catalog, ROLE_BARBER, ROLE_CUSTOMER},
    state::AppState,
};

#[derive(Deserialize)]
struct RegisterForm {
    username: String,
    password: String,
    display_name: String,
    role: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/register").route(web::post().to(register)))
        .service(web::resource("/shops").route(web::get().to(list_shops)))
        .service(web::resource("/shops/{id}").route(web::get().to(shop_detail)))
        .service(web::resource("/services").route(web::get().to(list_services)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterForm>,
) -> Result<HttpResponse, QueueError> {
    let form = body.into_inner();
    let username = form.username.trim().to_string();
    if username.is_empty() {
        return Err(QueueError::InvalidInput("username is required".into()));
    }
    if form.password.is_empty() {
        return Err(QueueError::InvalidInput("password is required".into()));
    }
    let display_name = form.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(QueueError::InvalidInput("display_name is required".into()));
    }
    if form.role != ROLE_CUSTOMER && form.role != ROLE_BARBER {
        return Err(QueueError::InvalidInput(
            "role must be customer or barber".into(),
        ));
    }

    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE username = ? LIMIT 1")
        .bind(&username)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(QueueError::InvalidInput("username is already taken".into()));
    }

    let password_hash = hash_password(&form.password)
        .map_err(|_| QueueError::InvalidInput("password could not be hashed".into()))?;
    let id = new_id();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, username, display_name, role, password_hash, active, created_at)
           VALUES (?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(&id)
    .bind(&username)
    .bind(&display_name)
    .bind(&form.role)
    .bind(password_hash)
    .bind(now)
    .execute(&state.db)
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "id": id,
        "username": username,
        "display_name": display_name,
        "role": form.role,
    })))
}

async fn list_shops(state: web::Data<AppState>) -> Result<HttpResponse, QueueError> {
    let shops = directory::list_shops(&state.db).await?;
    Ok(HttpResponse::Ok().json(shops))
}

async fn shop_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, QueueError> {
    let shop_id = path.into_inner();
    let shop = directory::fetch_shop(&state.db, &shop_id)
        .await?
        .ok_or(QueueError::ShopNotFound)?;
    Ok(HttpResponse::Ok().json(shop))
}

async fn list_services() -> HttpResponse {
    HttpResponse::Ok().json(service_catalog())
}
