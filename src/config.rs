use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::{info, warn};

pub const HOST: &str = "0.0.0.0";
pub const PORT: u16 = 5000;
pub const DEFAULT_DATABASE: &str = "TripTrackr";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_COUNTRY: &str = "India";
const DEV_CORS_ORIGIN: &str = "http://localhost:3000";

/// Per-capability provider keys. Geocoding, places and routing each fall back
/// to `GOOGLE_MAPS_API_KEY` when their own key is unset.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub openweather: Option<String>,
    pub geocode: Option<String>,
    pub places: Option<String>,
    pub routing: Option<String>,
    pub gemini: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub mongo_uri: Option<String>,
    pub mongo_database: String,
    pub cors_origins: Vec<String>,
    pub keys: ProviderKeys,
    pub gemini_model: String,
    pub default_country: Option<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = get("RUST_ENV").unwrap_or_else(|| "development".to_string());
        let google_maps = get("GOOGLE_MAPS_API_KEY");

        let cors_origins = if environment == "production" {
            get("CORS_ORIGIN")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        } else {
            vec![DEV_CORS_ORIGIN.to_string()]
        };

        Self {
            host: get("HOST").unwrap_or_else(|| HOST.to_string()),
            port: parse_or("PORT", get("PORT"), PORT),
            environment,
            mongo_uri: get("MONGODB_URI"),
            mongo_database: get("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            cors_origins,
            keys: ProviderKeys {
                openweather: get("OPENWEATHER_API_KEY"),
                geocode: get("GEOCODE_API_KEY").or_else(|| google_maps.clone()),
                places: get("PLACES_API_KEY").or_else(|| google_maps.clone()),
                routing: get("ROUTING_API_KEY").or_else(|| google_maps.clone()),
                gemini: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
            },
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            default_country: match get("DEFAULT_COUNTRY") {
                Some(country) if country.eq_ignore_ascii_case("none") => None,
                Some(country) => Some(country),
                None => Some(DEFAULT_COUNTRY.to_string()),
            },
            rate_limit_max: parse_or("RATE_LIMIT_MAX", get("RATE_LIMIT_MAX"), 100),
            rate_limit_window: Duration::from_secs(parse_or(
                "RATE_LIMIT_WINDOW_SECS",
                get("RATE_LIMIT_WINDOW_SECS"),
                15 * 60,
            )),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw {
        Some(value) => value.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {value:?}: {e}, using default {default}");
            default
        }),
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

/// Shows only the ends of a secret, for health output.
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() > 8 {
        let head: String = secret.chars().take(4).collect();
        let mut tail: Vec<char> = secret.chars().rev().take(4).collect();
        tail.reverse();
        format!("{head}***{}", tail.into_iter().collect::<String>())
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.host, HOST);
        assert_eq!(config.port, PORT);
        assert!(config.mongo_uri.is_none());
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.cors_origins, vec![DEV_CORS_ORIGIN.to_string()]);
        assert_eq!(config.default_country.as_deref(), Some(DEFAULT_COUNTRY));
        assert_eq!(config.rate_limit_max, 100);
        assert_eq!(config.rate_limit_window, Duration::from_secs(900));
    }

    #[test]
    fn test_maps_keys_fall_back_to_shared_key() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_MAPS_API_KEY", "shared"),
            ("ROUTING_API_KEY", "routing-only"),
            ("GEOCODE_API_KEY", "   "),
        ]));
        assert_eq!(config.keys.geocode.as_deref(), Some("shared"));
        assert_eq!(config.keys.places.as_deref(), Some("shared"));
        assert_eq!(config.keys.routing.as_deref(), Some("routing-only"));
    }

    #[test]
    fn test_production_cors_and_bad_port() {
        let config = AppConfig::from_lookup(lookup(&[
            ("RUST_ENV", "production"),
            ("CORS_ORIGIN", "https://a.example, https://b.example,"),
            ("PORT", "not-a-port"),
        ]));
        assert!(config.is_production());
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.port, PORT);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        env::set_var("GEMINI_API_KEY", "");
        env::set_var("GOOGLE_API_KEY", "AIzaFallbackKeyFromGoogle123");
        env::set_var("DEFAULT_COUNTRY", "none");

        let config = AppConfig::from_env();
        assert_eq!(config.keys.gemini.as_deref(), Some("AIzaFallbackKeyFromGoogle123"));
        assert!(config.default_country.is_none());

        env::remove_var("GEMINI_API_KEY");
        env::remove_var("GOOGLE_API_KEY");
        env::remove_var("DEFAULT_COUNTRY");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefghijkl"), "abcd***ijkl");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("aééééé-key"), "aééé***-key");
        assert_eq!(mask_secret("ééééé"), "***");
    }
}
