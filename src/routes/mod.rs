pub mod chat;
pub mod health;
pub mod itinerary;
pub mod maps;
pub mod weather;

use std::sync::Arc;

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use log::debug;
use serde_json::json;

use crate::middleware::rate_limit::{RateLimit, RateLimiter};

/// Request bodies above this size are rejected.
pub const JSON_LIMIT: usize = 10 * 1024 * 1024;

/// Registers every `/api` route behind the shared rate limiter.
pub fn configure(cfg: &mut web::ServiceConfig, limiter: Arc<RateLimiter>) {
    cfg.service(
        web::scope("/api")
            .wrap(RateLimit::new(limiter))
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/weather")
                    .route("/forecast/{city}", web::get().to(weather::forecast))
                    .route("/alerts/{city}", web::get().to(weather::alerts))
                    .route("/{city}", web::get().to(weather::current)),
            )
            .service(
                web::scope("/maps")
                    .route("/config", web::get().to(maps::config))
                    .route("/geocode/{address}", web::get().to(maps::geocode))
                    .route("/places/{query}", web::get().to(maps::search))
                    .route("/place/{place_id}", web::get().to(maps::details))
                    .route("/directions", web::get().to(maps::directions))
                    .route("/nearby", web::get().to(maps::nearby))
                    .route("/accommodations", web::get().to(maps::accommodations)),
            )
            .service(
                web::scope("/chat")
                    .route("", web::post().to(chat::chat))
                    .route("/recommendations", web::post().to(chat::recommendations))
                    .route("/weather-activities", web::post().to(chat::weather_activities))
                    .route("/history/{user_id}", web::get().to(chat::history))
                    .route("/history/{user_id}", web::delete().to(chat::clear_history))
                    .route("/status", web::get().to(chat::status))
                    .route("/budget-estimate", web::post().to(chat::budget_estimate)),
            )
            .service(
                web::scope("/itineraries")
                    .route("", web::post().to(itinerary::create))
                    .route("", web::get().to(itinerary::get_all))
                    .route("/{id}", web::get().to(itinerary::get_by_id))
                    .route("/{id}", web::put().to(itinerary::update))
                    .route("/{id}", web::delete().to(itinerary::delete))
                    .route("/{id}/expenses", web::post().to(itinerary::add_expense))
                    .route("/{id}/budget", web::get().to(itinerary::budget))
                    .route("/{id}/export/ical", web::get().to(itinerary::export_ical)),
            ),
    );
}

/// Malformed or oversized JSON bodies answer 400 in the API's error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            debug!("Rejected JSON body: {err}");
            let response = HttpResponse::BadRequest().json(json!({
                "error": "Invalid JSON body",
                "message": err.to_string(),
            }));
            actix_web::error::InternalError::from_response(err, response).into()
        })
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Route not found" }))
}
