use actix_web::{http::header, web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::{
    auth::basic_validator,
    state::{AppState, QueueEvent},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/events")
            .wrap(HttpAuthentication::basic(basic_validator))
            .route(web::get().to(stream_events)),
    )
    .service(
        web::resource("/shops/{id}/events")
            .wrap(HttpAuthentication::basic(basic_validator))
            .route(web::get().to(stream_shop_events)),
    );
}

async fn stream_events(state: web::Data<AppState>) -> HttpResponse {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(Ok::<web::Bytes, actix_web::Error>(event_to_bytes(&event))),
        // lagged receivers just miss signals; the consumer re-fetches anyway
        Err(_) => None,
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}

async fn stream_shop_events(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let shop_id = path.into_inner();
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let event = match result {
            Ok(event) => event,
            Err(_) => return None,
        };
        if event.shop_id != shop_id {
            return None;
        }
        Some(Ok::<web::Bytes, actix_web::Error>(event_to_bytes(&event)))
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}

fn event_to_bytes(event: &QueueEvent) -> web::Bytes {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("event: update\ndata: {}\n\n", payload))
}
