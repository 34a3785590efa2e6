use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Utc;
use env_logger::Env;
use log::{info, warn};

use triptrackr_api::config::AppConfig;
use triptrackr_api::db::mongo;
use triptrackr_api::middleware::{self, rate_limit::RateLimiter};
use triptrackr_api::routes;
use triptrackr_api::services::chat::{ChatService, IDLE_TIMEOUT, PRUNE_INTERVAL};
use triptrackr_api::services::itinerary_store::{InMemoryItineraryStore, ItineraryStore, MongoItineraryStore};
use triptrackr_api::services::maps::MapsService;
use triptrackr_api::services::{http_client, weather::WeatherService};

/// MongoDB when configured and reachable, the in-memory store otherwise.
async fn connect_store(config: &AppConfig) -> Arc<dyn ItineraryStore> {
    let uri = match &config.mongo_uri {
        Some(uri) => uri,
        None => {
            warn!("MONGODB_URI not set, itineraries will be kept in memory");
            return Arc::new(InMemoryItineraryStore::new());
        }
    };

    let client = match mongo::create_mongo_client(uri, &config.mongo_database).await {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to create MongoDB client ({e}), falling back to in-memory storage");
            return Arc::new(InMemoryItineraryStore::new());
        }
    };

    match mongo::ping(&client, &config.mongo_database).await {
        Ok(()) => Arc::new(MongoItineraryStore::new(client, &config.mongo_database)),
        Err(_) => {
            warn!("MongoDB unreachable, falling back to in-memory storage");
            Arc::new(InMemoryItineraryStore::new())
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env();
    info!("Starting TripTrackr API in {} mode", config.environment);

    let http = http_client();
    let store = web::Data::from(connect_store(&config).await);
    let weather = web::Data::new(WeatherService::from_config(&config, http.clone()));
    let maps = web::Data::new(MapsService::from_config(&config, http.clone()));
    let chat = web::Data::new(ChatService::from_config(&config, http));
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_max, config.rate_limit_window));

    let pruned = chat.clone();
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = pruned.prune_idle(Utc::now().timestamp_millis(), IDLE_TIMEOUT);
            if removed > 0 {
                info!("Pruned {removed} idle conversations");
            }
        }
    });

    let bind = (config.host.clone(), config.port);
    info!("Listening on {}:{}", bind.0, bind.1);
    let app_config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(middleware::cors(&app_config))
            .wrap(middleware::security_headers())
            .app_data(routes::json_config())
            .app_data(app_config.clone())
            .app_data(store.clone())
            .app_data(weather.clone())
            .app_data(maps.clone())
            .app_data(chat.clone())
            .configure(|cfg| routes::configure(cfg, limiter.clone()))
            .default_service(web::to(routes::not_found))
    })
    .bind(bind)?
    .run()
    .await
}
