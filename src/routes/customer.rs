use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;

use crate::{
    auth::{customer_validator, AuthUser},
    db,
    error::QueueError,
    queue::{self, NewAppointment},
    state::{AppState, QueueEvent},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/customer")
            .wrap(HttpAuthentication::basic(customer_validator))
            .service(
                web::resource("/appointments")
                    .route(web::get().to(list_active))
                    .route(web::post().to(create_appointment)),
            )
            .service(
                web::resource("/appointments/{id}/cancel")
                    .route(web::post().to(cancel_appointment)),
            ),
    );
}

async fn list_active(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, QueueError> {
    let rows = queue::customer_active(&state.db, &auth.id).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn create_appointment(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    body: web::Json<NewAppointment>,
) -> Result<HttpResponse, QueueError> {
    let row = queue::create_appointment(&state.db, &auth.id, body.into_inner()).await?;

    db::log_activity(
        &state.db,
        "appointment_created",
        &format!(
            "{} joined the queue at position {}.",
            auth.display_name, row.queue_position
        ),
        Some(&auth.id),
        Some(&row.id),
    )
    .await;
    let _ = state
        .events
        .send(QueueEvent::appointment("appointment_created", &row));

    Ok(HttpResponse::Created().json(row))
}

async fn cancel_appointment(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, QueueError> {
    let appointment_id = path.into_inner();
    let row = queue::cancel_appointment(&state.db, &appointment_id, &auth.id).await?;

    db::log_activity(
        &state.db,
        "appointment_cancelled",
        &format!("{} left the queue.", auth.display_name),
        Some(&auth.id),
        Some(&row.id),
    )
    .await;
    let _ = state
        .events
        .send(QueueEvent::appointment("appointment_cancelled", &row));

    Ok(HttpResponse::NoContent().finish())
}
