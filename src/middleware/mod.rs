pub mod rate_limit;

use actix_cors::Cors;
use actix_web::middleware::DefaultHeaders;

use crate::config::AppConfig;

/// Browser hardening headers sent on every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("X-DNS-Prefetch-Control", "off"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Strict-Transport-Security", "max-age=15552000; includeSubDomains"))
        .add(("Cross-Origin-Opener-Policy", "same-origin"))
}

pub fn cors(config: &AppConfig) -> Cors {
    let cors = config
        .cors_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin));

    cors.allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}
