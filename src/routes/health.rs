use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{mask_secret, AppConfig};
use crate::services::itinerary_store::ItineraryStore;
use crate::services::maps::MapsService;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    message: String,
    timestamp: String,
    database: String,
    storage: String,
    environment: String,
    version: String,
    services: BTreeMap<String, ServiceStatus>,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

impl ServiceStatus {
    fn ok(details: String) -> Self {
        Self {
            status: "ok".to_string(),
            details: Some(details),
        }
    }

    fn fallback(details: String) -> Self {
        Self {
            status: "fallback".to_string(),
            details: Some(details),
        }
    }
}

/*
    GET /api/health
*/
pub async fn health_check(
    config: web::Data<AppConfig>,
    store: web::Data<dyn ItineraryStore>,
    maps: web::Data<MapsService>,
) -> HttpResponse {
    let storage = check_storage(store.get_ref()).await;
    let database = match (store.backend(), storage.status.as_str()) {
        ("memory", _) => "In-memory",
        (_, "ok") => "Connected",
        _ => "Disconnected",
    };

    let mut services = BTreeMap::new();
    services.insert("storage".to_string(), storage);
    services.insert(
        "weather".to_string(),
        key_status(config.keys.openweather.as_deref(), "OpenWeatherMap", "Open-Meteo"),
    );
    services.insert(
        "geocoding".to_string(),
        key_status(config.keys.geocode.as_deref(), "Google Geocoding", "Nominatim"),
    );
    services.insert(
        "places".to_string(),
        key_status(config.keys.places.as_deref(), "Google Places", "Overpass/Nominatim"),
    );
    services.insert(
        "routing".to_string(),
        ServiceStatus::ok(format!("Routing via {}", maps.config().routing_provider)),
    );
    services.insert(
        "ai".to_string(),
        key_status(config.keys.gemini.as_deref(), &config.gemini_model, "rule-based replies"),
    );

    let status = if services.values().any(|s| s.status == "error") {
        "degraded"
    } else {
        "OK"
    };

    HttpResponse::Ok().json(HealthStatus {
        status: status.to_string(),
        message: "TripTrackr API is running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        database: database.to_string(),
        storage: store.backend().to_string(),
        environment: config.environment.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}

async fn check_storage(store: &dyn ItineraryStore) -> ServiceStatus {
    match store.ping().await {
        Ok(()) if store.backend() == "memory" => {
            ServiceStatus::fallback("Using in-memory storage; data is lost on restart".to_string())
        }
        Ok(()) => ServiceStatus::ok(format!("Connected to {}", store.backend())),
        Err(e) => {
            warn!("Storage health check failed: {e}");
            ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("Failed to connect: {e}")),
            }
        }
    }
}

fn key_status(key: Option<&str>, provider: &str, fallback: &str) -> ServiceStatus {
    match key {
        Some(key) => ServiceStatus::ok(format!("{provider} configured ({})", mask_secret(key))),
        None => ServiceStatus::fallback(format!("No key configured, using {fallback}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_status_masks_secret() {
        let status = key_status(Some("AIzaSyExampleKey1234"), "Google Places", "Overpass");
        assert_eq!(status.status, "ok");
        assert_eq!(status.details.as_deref(), Some("Google Places configured (AIza***1234)"));

        let status = key_status(None, "Google Places", "Overpass");
        assert_eq!(status.status, "fallback");
    }
}
