use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::itinerary::Coordinates;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedAddress {
    pub address: String,
    pub coordinates: Coordinates,
    pub location_type: Option<String>,
    pub viewport: Option<Value>,
    pub bounds: Option<Value>,
    pub place_id: String,
    pub types: Vec<String>,
    pub components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub photo_reference: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub html_attributions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday_text: Option<Vec<String>>,
}

/// Normalized place shape shared by every places provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u64>,
    pub types: Vec<String>,
    pub price_level: Option<u8>,
    pub opening_hours: Option<OpeningHours>,
    pub photos: Vec<Photo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_mask_base_uri: Option<String>,
}

impl Place {
    /// Minimal place used by the OpenStreetMap providers.
    pub fn bare(place_id: String, name: String, address: Option<String>, coordinates: Option<Coordinates>, types: Vec<String>) -> Self {
        Self {
            place_id,
            name,
            address,
            coordinates,
            rating: None,
            user_ratings_total: None,
            types,
            price_level: None,
            opening_hours: None,
            photos: Vec::new(),
            icon: None,
            icon_background_color: None,
            icon_mask_base_uri: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceSearch {
    pub query: String,
    pub results: Vec<Place>,
    pub total_results: usize,
    pub status: String,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub author_name: String,
    pub rating: Option<f64>,
    pub text: String,
    pub time: Option<DateTime<Utc>>,
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceDetails {
    #[serde(flatten)]
    pub place: Place,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lodging {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u64>,
    pub price_level: Option<u8>,
    pub open_now: Option<bool>,
    pub photos: Vec<Photo>,
}

impl From<Place> for Lodging {
    fn from(place: Place) -> Self {
        Self {
            open_now: place.opening_hours.as_ref().and_then(|h| h.open_now),
            place_id: place.place_id,
            name: place.name,
            address: place.address,
            coordinates: place.coordinates,
            rating: place.rating,
            user_ratings_total: place.user_ratings_total,
            price_level: place.price_level,
            photos: place.photos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyPlaces {
    pub center: Option<String>,
    pub radius: f64,
    pub results: Vec<Place>,
    pub total_results: usize,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accommodations {
    pub center: Option<String>,
    pub radius: f64,
    pub results: Vec<Lodging>,
    pub total_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub instruction: String,
    pub distance: Option<TextValue>,
    pub duration: Option<TextValue>,
    pub travel_mode: Option<String>,
    pub polyline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directions {
    pub summary: String,
    pub distance: Option<TextValue>,
    pub duration: Option<TextValue>,
    pub duration_in_traffic: Option<TextValue>,
    pub start_address: String,
    pub end_address: String,
    pub steps: Vec<RouteStep>,
    pub polyline: Option<String>,
    pub bounds: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fare: Option<Value>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapsCapabilities {
    pub routing: bool,
    pub routing_provider: String,
    pub places: bool,
    pub geocoding: bool,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_search_radius() -> f64 {
    5000.0
}

fn default_place_type() -> String {
    "establishment".to_string()
}

fn default_max_price() -> u8 {
    4
}

fn default_mode() -> String {
    "driving".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_traffic_model() -> String {
    "best_guess".to_string()
}

fn default_departure_time() -> String {
    "now".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageParams {
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceSearchParams {
    pub location: Option<String>,
    #[serde(default = "default_search_radius")]
    pub radius: f64,
    #[serde(rename = "type", default = "default_place_type")]
    pub place_type: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub minprice: u8,
    #[serde(default = "default_max_price")]
    pub maxprice: u8,
    #[serde(default)]
    pub opennow: bool,
    /// `osm` skips the keyed providers.
    pub source: Option<String>,
}

impl Default for PlaceSearchParams {
    fn default() -> Self {
        Self {
            location: None,
            radius: default_search_radius(),
            place_type: default_place_type(),
            language: default_language(),
            minprice: 0,
            maxprice: default_max_price(),
            opennow: false,
            source: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsParams {
    pub origin: Option<String>,
    pub destination: Option<String>,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_units")]
    pub units: String,
    pub avoid: Option<String>,
    #[serde(default = "default_traffic_model")]
    pub traffic_model: String,
    #[serde(default = "default_departure_time")]
    pub departure_time: String,
}

impl Default for DirectionsParams {
    fn default() -> Self {
        Self {
            origin: None,
            destination: None,
            mode: default_mode(),
            language: default_language(),
            units: default_units(),
            avoid: None,
            traffic_model: default_traffic_model(),
            departure_time: default_departure_time(),
        }
    }
}

/// Center is `location` (`lat,lng`) or a free-text `query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbyParams {
    pub query: Option<String>,
    pub location: Option<String>,
    pub radius: Option<f64>,
    #[serde(default = "default_language")]
    pub language: String,
    pub types: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccommodationParams {
    pub query: Option<String>,
    pub location: Option<String>,
    pub radius: Option<f64>,
    #[serde(default = "default_language")]
    pub language: String,
}
