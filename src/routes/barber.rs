use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::{
    auth::{barber_validator, AuthUser},
    db, directory,
    error::QueueError,
    queue,
    state::{AppState, QueueEvent},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/barber")
            .wrap(HttpAuthentication::basic(barber_validator))
            .service(web::resource("/shops").route(web::post().to(create_shop)))
            .service(web::resource("/shops/{id}").route(web::post().to(update_shop)))
            .service(
                web::resource("/shops/{id}/membership")
                    .route(web::put().to(register_at_shop))
                    .route(web::delete().to(deregister_from_shop)),
            )
            .service(web::resource("/shops/{id}/queue").route(web::get().to(shop_queue)))
            .service(
                web::resource("/appointments/{id}/start").route(web::post().to(start_service)),
            )
            .service(
                web::resource("/appointments/{id}/complete")
                    .route(web::post().to(complete_service)),
            )
            .service(
                web::resource("/appointments/{id}").route(web::delete().to(delete_appointment)),
            ),
    );
}

async fn create_shop(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    body: web::Json<directory::NewShop>,
) -> Result<HttpResponse, QueueError> {
    let shop = directory::create_shop(&state.db, &auth, body.into_inner()).await?;
    db::log_activity(
        &state.db,
        "shop_created",
        &format!("{} opened {}.", auth.display_name, shop.name),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(HttpResponse::Created().json(shop))
}

async fn update_shop(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    body: web::Json<directory::ShopUpdate>,
) -> Result<HttpResponse, QueueError> {
    let shop_id = path.into_inner();
    let shop = directory::update_shop(&state.db, &auth, &shop_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(shop))
}

async fn register_at_shop(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, QueueError> {
    let shop_id = path.into_inner();
    let association = directory::register_barber(&state.db, &auth, &shop_id).await?;
    db::log_activity(
        &state.db,
        "barber_registered",
        &format!("{} now serves shop {}.", auth.display_name, shop_id),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(HttpResponse::Created().json(association))
}

async fn deregister_from_shop(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, QueueError> {
    let shop_id = path.into_inner();
    directory::deregister_barber(&state.db, &auth, &shop_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn shop_queue(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, QueueError> {
    let shop_id = path.into_inner();
    let queue = queue::shop_queue(&state.db, &shop_id, &auth.id).await?;
    Ok(HttpResponse::Ok().json(queue))
}

async fn start_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, QueueError> {
    let appointment_id = path.into_inner();
    let row = queue::start_service(&state.db, &appointment_id, &auth.id).await?;

    db::log_activity(
        &state.db,
        "service_started",
        &format!("{} started serving {}.", auth.display_name, row.customer_name),
        Some(&auth.id),
        Some(&row.id),
    )
    .await;
    let _ = state
        .events
        .send(QueueEvent::appointment("service_started", &row));

    Ok(HttpResponse::Ok().json(row))
}

async fn complete_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, QueueError> {
    let appointment_id = path.into_inner();
    let row = queue::complete_service(&state.db, &appointment_id, &auth.id).await?;

    db::log_activity(
        &state.db,
        "service_completed",
        &format!("{} finished serving {}.", auth.display_name, row.customer_name),
        Some(&auth.id),
        Some(&row.id),
    )
    .await;
    let _ = state
        .events
        .send(QueueEvent::appointment("service_completed", &row));

    Ok(HttpResponse::Ok().json(row))
}

async fn delete_appointment(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, QueueError> {
    let appointment_id = path.into_inner();
    let shop_id = queue::delete_appointment(&state.db, &appointment_id, &auth.id).await?;

    db::log_activity(
        &state.db,
        "appointment_deleted",
        &format!("{} removed an appointment from the queue.", auth.display_name),
        Some(&auth.id),
        Some(&appointment_id),
    )
    .await;
    let _ = state.events.send(QueueEvent::removed(
        "appointment_deleted",
        &shop_id,
        &appointment_id,
    ));

    Ok(HttpResponse::NoContent().finish())
}
