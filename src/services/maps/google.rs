use std::collections::HashSet;

use async_trait::async_trait;
use chrono::DateTime;
use futures::future::join_all;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::models::itinerary::Coordinates;
use crate::models::place::{
    AddressComponent, Directions, DirectionsParams, GeocodedAddress, Lodging, OpeningHours, Photo,
    Place, PlaceDetails, PlaceSearch, PlaceSearchParams, Review, RouteStep, TextValue,
};
use crate::services::fallback::Provider;
use crate::services::maps::{format_center, PlacesProvider, RoutingProvider, MAX_NEARBY_TYPES, MAX_RADIUS};
use crate::services::read_json;

pub const NAME: &str = "Google Maps";
pub const BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const DETAIL_FIELDS: &str = "place_id,name,formatted_address,geometry,rating,user_ratings_total,types,price_level,opening_hours,photos,website,formatted_phone_number,reviews";

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
    location_type: Option<String>,
    viewport: Option<Value>,
    bounds: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
    place_id: String,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct GoogleReview {
    #[serde(default)]
    author_name: String,
    rating: Option<f64>,
    #[serde(default)]
    text: String,
    time: Option<i64>,
    profile_photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GooglePlace {
    #[serde(default)]
    place_id: String,
    #[serde(default)]
    name: String,
    formatted_address: Option<String>,
    vicinity: Option<String>,
    geometry: Option<Geometry>,
    rating: Option<f64>,
    user_ratings_total: Option<u64>,
    #[serde(default)]
    types: Vec<String>,
    price_level: Option<u8>,
    opening_hours: Option<OpeningHours>,
    #[serde(default)]
    photos: Vec<Photo>,
    icon: Option<String>,
    icon_background_color: Option<String>,
    icon_mask_base_uri: Option<String>,
    website: Option<String>,
    formatted_phone_number: Option<String>,
    #[serde(default)]
    reviews: Vec<GoogleReview>,
}

impl GooglePlace {
    fn into_details(self) -> PlaceDetails {
        let website = self.website.clone();
        let phone = self.formatted_phone_number.clone();
        let reviews = self
            .reviews
            .iter()
            .map(|r| Review {
                author_name: r.author_name.clone(),
                rating: r.rating,
                text: r.text.clone(),
                time: r.time.and_then(|t| DateTime::from_timestamp(t, 0)),
                profile_photo_url: r.profile_photo_url.clone(),
            })
            .collect();

        PlaceDetails {
            place: self.into(),
            website,
            phone,
            reviews,
        }
    }
}

impl From<GooglePlace> for Place {
    fn from(place: GooglePlace) -> Self {
        Place {
            place_id: place.place_id,
            name: place.name,
            address: place.formatted_address.or(place.vicinity),
            coordinates: place.geometry.map(|g| Coordinates {
                lat: g.location.lat,
                lng: g.location.lng,
            }),
            rating: place.rating,
            user_ratings_total: place.user_ratings_total,
            types: place.types,
            price_level: place.price_level,
            opening_hours: place.opening_hours,
            photos: place.photos,
            icon: place.icon,
            icon_background_color: place.icon_background_color,
            icon_mask_base_uri: place.icon_mask_base_uri,
        }
    }
}

/// Envelope shared by every Maps web service: a `status` string plus the
/// payload under `results`, `result` or `routes`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    error_message: Option<String>,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    result: Option<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Polyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct Step {
    #[serde(default)]
    html_instructions: String,
    distance: Option<TextValue>,
    duration: Option<TextValue>,
    travel_mode: Option<String>,
    polyline: Option<Polyline>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    distance: Option<TextValue>,
    duration: Option<TextValue>,
    duration_in_traffic: Option<TextValue>,
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    legs: Vec<Leg>,
    overview_polyline: Option<Polyline>,
    bounds: Option<Value>,
    fare: Option<Value>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

/// Maps a Google `status` field onto provider errors. `ZERO_RESULTS` is only
/// an error where the caller asks for it.
fn check_status(status: &str, error_message: Option<&str>, zero_is_ok: bool) -> Result<(), ProviderError> {
    match status {
        "OK" => Ok(()),
        "ZERO_RESULTS" if zero_is_ok => Ok(()),
        "ZERO_RESULTS" | "NOT_FOUND" => Err(ProviderError::NotFound(format!("{NAME}: {status}"))),
        other => Err(ProviderError::Status {
            provider: NAME,
            status: 200,
            message: match error_message {
                Some(message) => format!("{other}: {message}"),
                None => other.to_string(),
            },
        }),
    }
}

pub struct GoogleMaps {
    http: reqwest::Client,
    geocode_key: Option<String>,
    places_key: Option<String>,
    routing_key: Option<String>,
    base_url: String,
}

impl GoogleMaps {
    pub fn new(
        http: reqwest::Client,
        geocode_key: Option<String>,
        places_key: Option<String>,
        routing_key: Option<String>,
    ) -> Self {
        Self {
            http,
            geocode_key,
            places_key,
            routing_key,
            base_url: BASE_URL.to_string(),
        }
    }

    fn places_key(&self) -> Result<&str, ProviderError> {
        self.places_key.as_deref().ok_or(ProviderError::NotConfigured(NAME))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .query(params)
            .send()
            .await?;
        read_json(NAME, response).await
    }

    async fn nearby_search(
        &self,
        key: &str,
        center: Coordinates,
        radius: f64,
        place_type: &str,
        language: &str,
    ) -> Result<Vec<GooglePlace>, ProviderError> {
        let params = [
            ("key", key.to_string()),
            ("location", format_center(center)),
            ("radius", radius.min(MAX_RADIUS).round().to_string()),
            ("type", place_type.to_string()),
            ("language", language.to_string()),
        ];
        let envelope: Envelope<GooglePlace> = self.get("place/nearbysearch/json", &params).await?;
        check_status(&envelope.status, envelope.error_message.as_deref(), true)?;
        Ok(envelope.results)
    }

    async fn text_search(&self, params: Vec<(&str, String)>) -> Result<Envelope<GooglePlace>, ProviderError> {
        let envelope: Envelope<GooglePlace> = self.get("place/textsearch/json", &params).await?;
        check_status(&envelope.status, envelope.error_message.as_deref(), true)?;
        Ok(envelope)
    }
}

impl Provider for GoogleMaps {
    fn name(&self) -> &'static str {
        NAME
    }
}

#[async_trait]
impl PlacesProvider for GoogleMaps {
    async fn geocode(&self, address: &str, language: &str) -> Result<GeocodedAddress, ProviderError> {
        let key = self.geocode_key.as_deref().ok_or(ProviderError::NotConfigured(NAME))?;
        let params = [
            ("address", address.to_string()),
            ("key", key.to_string()),
            ("language", language.to_string()),
        ];
        let envelope: Envelope<GeocodeResult> = self.get("geocode/json", &params).await?;
        check_status(&envelope.status, envelope.error_message.as_deref(), false)?;

        let result = envelope
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("{NAME}: no geocoding result")))?;

        Ok(GeocodedAddress {
            address: result.formatted_address,
            coordinates: Coordinates {
                lat: result.geometry.location.lat,
                lng: result.geometry.location.lng,
            },
            location_type: result.geometry.location_type,
            viewport: result.geometry.viewport,
            bounds: result.geometry.bounds,
            place_id: result.place_id,
            types: result.types,
            components: result.address_components,
        })
    }

    async fn search(&self, query: &str, params: &PlaceSearchParams) -> Result<PlaceSearch, ProviderError> {
        let mut request = vec![
            ("query", query.to_string()),
            ("key", self.places_key()?.to_string()),
            ("language", params.language.clone()),
            ("type", params.place_type.clone()),
            ("minprice", params.minprice.to_string()),
            ("maxprice", params.maxprice.to_string()),
            ("opennow", params.opennow.to_string()),
        ];
        if let Some(location) = params.location.as_deref().filter(|l| !l.trim().is_empty()) {
            request.push(("location", location.to_string()));
            request.push(("radius", params.radius.to_string()));
        }

        let envelope = self.text_search(request).await?;
        let results: Vec<Place> = envelope.results.into_iter().map(Place::from).collect();

        Ok(PlaceSearch {
            query: query.to_string(),
            total_results: results.len(),
            results,
            status: envelope.status,
            next_page_token: envelope.next_page_token,
        })
    }

    async fn details(&self, place_id: &str, language: &str) -> Result<PlaceDetails, ProviderError> {
        let params = [
            ("place_id", place_id.to_string()),
            ("key", self.places_key()?.to_string()),
            ("language", language.to_string()),
            ("fields", DETAIL_FIELDS.to_string()),
        ];
        let envelope: Envelope<GooglePlace> = self.get("place/details/json", &params).await?;
        if envelope.status == "INVALID_REQUEST" {
            return Err(ProviderError::NotFound(format!("{NAME}: unknown place id {place_id}")));
        }
        check_status(&envelope.status, envelope.error_message.as_deref(), false)?;

        let place = envelope
            .result
            .ok_or_else(|| ProviderError::NotFound(format!("{NAME}: empty details for {place_id}")))?;
        Ok(place.into_details())
    }

    /// One nearby search per type, run concurrently and merged in type
    /// order, first occurrence of each place id kept.
    async fn nearby(
        &self,
        center: Coordinates,
        radius: f64,
        types: &[String],
        language: &str,
    ) -> Result<Vec<Place>, ProviderError> {
        let key = self.places_key()?;
        let searches = types
            .iter()
            .take(MAX_NEARBY_TYPES)
            .map(|t| self.nearby_search(key, center, radius, t, language));
        let responses = join_all(searches).await;

        let mut seen = HashSet::new();
        let mut places = Vec::new();
        let mut last_error = None;
        let mut any_ok = false;

        for response in responses {
            match response {
                Ok(found) => {
                    any_ok = true;
                    for place in found {
                        if seen.insert(place.place_id.clone()) {
                            places.push(Place::from(place));
                        }
                    }
                }
                Err(err) => {
                    debug!("Nearby search for one type failed: {err}");
                    last_error = Some(err);
                }
            }
        }

        match (any_ok, last_error) {
            (false, Some(err)) => Err(err),
            _ => Ok(places),
        }
    }

    /// Nearby lodging search widening r, 2r, 4r then 25 km, then a text
    /// search for hotels.
    async fn lodging(
        &self,
        center: Option<Coordinates>,
        area: Option<&str>,
        radius: f64,
        language: &str,
    ) -> Result<Vec<Lodging>, ProviderError> {
        let key = self.places_key()?;

        if let Some(center) = center {
            for step in [radius, radius * 2.0, radius * 4.0, MAX_RADIUS] {
                match self.nearby_search(key, center, step, "lodging", language).await {
                    Ok(found) if !found.is_empty() => {
                        return Ok(found.into_iter().map(|p| Lodging::from(Place::from(p))).collect());
                    }
                    Ok(_) => debug!("No lodging within {step} m of {}", format_center(center)),
                    Err(err) => warn!("Lodging search at {step} m failed: {err}"),
                }
            }
        }

        let mut params = vec![("key", key.to_string()), ("language", language.to_string())];
        match (center, area) {
            (Some(center), _) => {
                params.push(("query", "hotels".to_string()));
                params.push(("location", format_center(center)));
                params.push(("radius", radius.to_string()));
            }
            (None, Some(area)) => params.push(("query", format!("hotels in {area}"))),
            (None, None) => return Err(ProviderError::InvalidInput("A center or area is required".to_string())),
        }

        let envelope = self.text_search(params).await?;
        Ok(envelope
            .results
            .into_iter()
            .map(|p| Lodging::from(Place::from(p)))
            .collect())
    }
}

#[async_trait]
impl RoutingProvider for GoogleMaps {
    async fn directions(&self, origin: &str, destination: &str, params: &DirectionsParams) -> Result<Directions, ProviderError> {
        let key = self.routing_key.as_deref().ok_or(ProviderError::NotConfigured(NAME))?;
        let mut request = vec![
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("key", key.to_string()),
            ("mode", params.mode.clone()),
            ("language", params.language.clone()),
            ("units", params.units.clone()),
            ("traffic_model", params.traffic_model.clone()),
            ("departure_time", params.departure_time.clone()),
        ];
        if let Some(avoid) = params.avoid.as_deref().filter(|a| !a.is_empty()) {
            request.push(("avoid", avoid.to_string()));
        }

        let response: DirectionsResponse = self.get("directions/json", &request).await?;
        check_status(&response.status, response.error_message.as_deref(), false)?;
        normalize_route(response.routes)
    }
}

fn normalize_route(routes: Vec<Route>) -> Result<Directions, ProviderError> {
    let mut route = routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NotFound(format!("{NAME}: no route")))?;
    if route.legs.is_empty() {
        return Err(ProviderError::Decode(format!("{NAME}: route without legs")));
    }
    let leg = route.legs.swap_remove(0);

    Ok(Directions {
        summary: route.summary,
        distance: leg.distance,
        duration: leg.duration,
        duration_in_traffic: leg.duration_in_traffic,
        start_address: leg.start_address,
        end_address: leg.end_address,
        steps: leg
            .steps
            .into_iter()
            .map(|step| RouteStep {
                instruction: step.html_instructions,
                distance: step.distance,
                duration: step.duration,
                travel_mode: step.travel_mode,
                polyline: step.polyline.map(|p| p.points),
            })
            .collect(),
        polyline: route.overview_polyline.map(|p| p.points),
        bounds: route.bounds,
        fare: route.fare,
        warnings: route.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert!(check_status("OK", None, false).is_ok());
        assert!(check_status("ZERO_RESULTS", None, true).is_ok());
        assert!(matches!(
            check_status("ZERO_RESULTS", None, false),
            Err(ProviderError::NotFound(_))
        ));
        match check_status("REQUEST_DENIED", Some("key invalid"), true) {
            Err(ProviderError::Status { message, .. }) => assert_eq!(message, "REQUEST_DENIED: key invalid"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_place_prefers_formatted_address_over_vicinity() {
        let envelope: Envelope<GooglePlace> = serde_json::from_value(json!({
            "status": "OK",
            "results": [{
                "place_id": "abc",
                "name": "Amber Fort",
                "vicinity": "Devisinghpura, Amer",
                "geometry": { "location": { "lat": 26.98, "lng": 75.85 } },
                "rating": 4.6,
                "types": ["tourist_attraction", "point_of_interest"],
                "opening_hours": { "open_now": true },
                "photos": [{ "photo_reference": "ref", "height": 100, "width": 200 }]
            }]
        }))
        .unwrap();

        let place = Place::from(envelope.results.into_iter().next().unwrap());
        assert_eq!(place.address.as_deref(), Some("Devisinghpura, Amer"));
        assert_eq!(place.coordinates, Some(Coordinates { lat: 26.98, lng: 75.85 }));
        assert_eq!(place.photos.len(), 1);

        let lodging = Lodging::from(place);
        assert_eq!(lodging.open_now, Some(true));
    }

    #[test]
    fn test_details_include_reviews() {
        let envelope: Envelope<GooglePlace> = serde_json::from_value(json!({
            "status": "OK",
            "result": {
                "place_id": "xyz",
                "name": "Cafe",
                "formatted_address": "1 Main St",
                "website": "https://cafe.example",
                "formatted_phone_number": "+91 00000",
                "reviews": [{ "author_name": "A", "rating": 5, "text": "Great", "time": 1700000000 }]
            }
        }))
        .unwrap();

        let details = envelope.result.unwrap().into_details();
        assert_eq!(details.place.name, "Cafe");
        assert_eq!(details.website.as_deref(), Some("https://cafe.example"));
        assert_eq!(details.reviews[0].text, "Great");
        assert!(details.reviews[0].time.is_some());
    }

    #[test]
    fn test_route_normalization() {
        let response: DirectionsResponse = serde_json::from_value(json!({
            "status": "OK",
            "routes": [{
                "summary": "NH48",
                "legs": [{
                    "distance": { "text": "148 km", "value": 148000 },
                    "duration": { "text": "3 hours", "value": 10800 },
                    "start_address": "Mumbai",
                    "end_address": "Pune",
                    "steps": [{
                        "html_instructions": "Head <b>east</b>",
                        "distance": { "text": "1 km", "value": 1000 },
                        "duration": { "text": "2 mins", "value": 120 },
                        "travel_mode": "DRIVING",
                        "polyline": { "points": "abc" }
                    }]
                }],
                "overview_polyline": { "points": "xyz" },
                "warnings": ["Tolls"]
            }]
        }))
        .unwrap();

        let directions = normalize_route(response.routes).unwrap();
        assert_eq!(directions.summary, "NH48");
        assert_eq!(directions.distance.unwrap().value, 148000.0);
        assert_eq!(directions.steps[0].polyline.as_deref(), Some("abc"));
        assert_eq!(directions.polyline.as_deref(), Some("xyz"));
        assert!(directions.fare.is_none());
        assert_eq!(directions.warnings, vec!["Tolls"]);
    }

    #[test]
    fn test_missing_keys_are_not_configured() {
        let google = GoogleMaps::new(reqwest::Client::new(), None, None, None);
        assert!(matches!(google.places_key(), Err(ProviderError::NotConfigured(NAME))));
    }
}
