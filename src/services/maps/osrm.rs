use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::ProviderError;
use crate::models::itinerary::Coordinates;
use crate::models::place::{Directions, DirectionsParams, TextValue};
use crate::services::fallback::Provider;
use crate::services::maps::{parse_lat_lng, RoutingProvider};
use crate::services::read_json;

pub const NAME: &str = "OSRM";
pub const BASE_URL: &str = "https://router.project-osrm.org";

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

/// Keyless public router. Only understands coordinates.
pub struct Osrm {
    http: reqwest::Client,
    base_url: String,
}

impl Osrm {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
        }
    }

    fn route_url(&self, profile: &str, from: Coordinates, to: Coordinates) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ProviderError::Decode(format!("{NAME}: {e}")))?;
        let waypoints = format!("{},{};{},{}", from.lng, from.lat, to.lng, to.lat);
        url.path_segments_mut()
            .map_err(|_| ProviderError::Decode(format!("{NAME}: base URL cannot carry a path")))?
            .pop_if_empty()
            .extend(&["route", "v1", profile, &waypoints]);
        url.query_pairs_mut()
            .append_pair("overview", "false")
            .append_pair("alternatives", "false")
            .append_pair("annotations", "duration,distance");
        Ok(url)
    }
}

impl Provider for Osrm {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_open_data(&self) -> bool {
        true
    }
}

#[async_trait]
impl RoutingProvider for Osrm {
    async fn directions(&self, origin: &str, destination: &str, params: &DirectionsParams) -> Result<Directions, ProviderError> {
        let (from, to) = match (parse_lat_lng(origin), parse_lat_lng(destination)) {
            (Some(from), Some(to)) => (from, to),
            _ => return Err(ProviderError::InvalidInput("Invalid coordinates for routing".to_string())),
        };

        let url = self.route_url(profile(&params.mode), from, to)?;
        let response = self.http.get(url).send().await?;
        let parsed: OsrmResponse = read_json(NAME, response).await?;
        normalize(parsed, origin, destination)
    }
}

/// Google travel modes onto OSRM profiles.
fn profile(mode: &str) -> &'static str {
    match mode {
        "walking" => "foot",
        "bicycling" => "bike",
        _ => "driving",
    }
}

fn normalize(parsed: OsrmResponse, origin: &str, destination: &str) -> Result<Directions, ProviderError> {
    if parsed.code != "Ok" {
        return Err(ProviderError::NotFound(format!(
            "{NAME}: {}",
            parsed.message.unwrap_or(parsed.code)
        )));
    }
    let route = parsed
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NotFound(format!("{NAME}: no route")))?;

    Ok(Directions {
        summary: "OSRM route".to_string(),
        distance: Some(TextValue {
            text: format!("{:.1} km", route.distance / 1000.0),
            value: route.distance,
        }),
        duration: Some(TextValue {
            text: format!("{} mins", (route.duration / 60.0).round()),
            value: route.duration,
        }),
        duration_in_traffic: None,
        start_address: origin.to_string(),
        end_address: destination.to_string(),
        steps: Vec::new(),
        polyline: None,
        bounds: None,
        fare: None,
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_url_orders_lng_first() {
        let osrm = Osrm::new(reqwest::Client::new());
        let url = osrm
            .route_url(
                profile("walking"),
                Coordinates { lat: 12.9, lng: 77.5 },
                Coordinates { lat: 13.0, lng: 77.6 },
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://router.project-osrm.org/route/v1/foot/77.5,12.9;77.6,13?overview=false&alternatives=false&annotations=duration%2Cdistance"
        );
    }

    #[test]
    fn test_normalize_formats_distance_and_duration() {
        let parsed: OsrmResponse = serde_json::from_value(json!({
            "code": "Ok",
            "routes": [{ "distance": 15320.0, "duration": 1290.0 }]
        }))
        .unwrap();

        let directions = normalize(parsed, "12.9,77.5", "13.0,77.6").unwrap();
        assert_eq!(directions.distance.unwrap().text, "15.3 km");
        assert_eq!(directions.duration.unwrap().text, "22 mins");
        assert_eq!(directions.start_address, "12.9,77.5");
    }

    #[test]
    fn test_no_route_is_not_found() {
        let parsed: OsrmResponse =
            serde_json::from_value(json!({ "code": "NoRoute", "message": "Impossible route" })).unwrap();
        assert!(matches!(normalize(parsed, "a", "b"), Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn test_free_text_is_rejected() {
        let osrm = Osrm::new(reqwest::Client::new());
        let result = tokio_test::block_on(osrm.directions("Mumbai", "Pune", &DirectionsParams::default()));
        assert!(matches!(result, Err(ProviderError::InvalidInput(_))));
    }
}
