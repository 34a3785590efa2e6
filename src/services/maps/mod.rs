pub mod google;
pub mod nominatim;
pub mod osrm;
pub mod overpass;

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, info};

use crate::config::AppConfig;
use crate::error::{ApiError, ProviderError};
use crate::models::itinerary::Coordinates;
use crate::models::place::{
    AccommodationParams, Accommodations, Directions, DirectionsParams, GeocodedAddress, Lodging,
    MapsCapabilities, NearbyParams, NearbyPlaces, Place, PlaceDetails, PlaceSearch, PlaceSearchParams,
};
use crate::services::fallback::{first_success, Provider};

pub use google::GoogleMaps;
pub use nominatim::Nominatim;
pub use osrm::Osrm;
pub use overpass::Overpass;

/// Google caps nearby and lodging radii at 25 km.
pub const MAX_RADIUS: f64 = 25_000.0;
pub const MAX_NEARBY_TYPES: usize = 12;
pub const DEFAULT_NEARBY_TYPES: &[&str] = &[
    "tourist_attraction",
    "park",
    "museum",
    "art_gallery",
    "amusement_park",
    "zoo",
    "aquarium",
    "point_of_interest",
    "shopping_mall",
    "church",
    "hindu_temple",
    "mosque",
    "viewpoint",
    "restaurant",
    "cafe",
    "fast_food",
    "bar",
    "night_club",
    "hotel",
    "lodging",
    "food",
    "food_court",
];

const ADMINISTRATIVE_TYPES: &[&str] = &[
    "political",
    "locality",
    "country",
    "sublocality",
    "neighborhood",
    "colloquial_area",
    "route",
    "postal_code",
    "sublocality_level_1",
    "sublocality_level_2",
];

const OSM_PLACE_CLASSES: &[&str] = &[
    "city",
    "state",
    "region",
    "province",
    "county",
    "district",
    "quarter",
    "town",
    "village",
    "hamlet",
    "suburb",
    "island",
    "archipelago",
    "continent",
    "municipality",
    "borough",
    "state_district",
];

#[async_trait]
pub trait PlacesProvider: Provider {
    async fn geocode(&self, _address: &str, _language: &str) -> Result<GeocodedAddress, ProviderError> {
        Err(ProviderError::Unsupported(self.name()))
    }

    async fn search(&self, _query: &str, _params: &PlaceSearchParams) -> Result<PlaceSearch, ProviderError> {
        Err(ProviderError::Unsupported(self.name()))
    }

    async fn details(&self, _place_id: &str, _language: &str) -> Result<PlaceDetails, ProviderError> {
        Err(ProviderError::Unsupported(self.name()))
    }

    async fn nearby(
        &self,
        _center: Coordinates,
        _radius: f64,
        _types: &[String],
        _language: &str,
    ) -> Result<Vec<Place>, ProviderError> {
        Err(ProviderError::Unsupported(self.name()))
    }

    /// Lodging around `center`, or in the free-text `area` when no center
    /// could be resolved.
    async fn lodging(
        &self,
        _center: Option<Coordinates>,
        _area: Option<&str>,
        _radius: f64,
        _language: &str,
    ) -> Result<Vec<Lodging>, ProviderError> {
        Err(ProviderError::Unsupported(self.name()))
    }
}

#[async_trait]
pub trait RoutingProvider: Provider {
    async fn directions(&self, origin: &str, destination: &str, params: &DirectionsParams) -> Result<Directions, ProviderError>;
}

pub struct MapsService {
    places: Vec<Arc<dyn PlacesProvider>>,
    open_places: Vec<Arc<dyn PlacesProvider>>,
    routers: Vec<Arc<dyn RoutingProvider>>,
    capabilities: MapsCapabilities,
    default_country: Option<String>,
}

impl MapsService {
    pub fn new(
        places: Vec<Arc<dyn PlacesProvider>>,
        routers: Vec<Arc<dyn RoutingProvider>>,
        capabilities: MapsCapabilities,
        default_country: Option<String>,
    ) -> Self {
        let open_places = places.iter().filter(|p| p.is_open_data()).cloned().collect();
        Self {
            places,
            open_places,
            routers,
            capabilities,
            default_country,
        }
    }

    /// Google first (per-capability keys), then Overpass and Nominatim for
    /// places, OSRM for routing.
    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Self {
        let google = Arc::new(GoogleMaps::new(
            http.clone(),
            config.keys.geocode.clone(),
            config.keys.places.clone(),
            config.keys.routing.clone(),
        ));

        let capabilities = MapsCapabilities {
            routing: true,
            routing_provider: if config.keys.routing.is_some() { "GOOGLE" } else { "OSRM" }.to_string(),
            places: config.keys.places.is_some(),
            geocoding: config.keys.geocode.is_some(),
        };

        Self::new(
            vec![
                google.clone(),
                Arc::new(Overpass::new(http.clone())),
                Arc::new(Nominatim::new(http.clone())),
            ],
            vec![google, Arc::new(Osrm::new(http))],
            capabilities,
            config.default_country.clone(),
        )
    }

    pub fn config(&self) -> MapsCapabilities {
        self.capabilities.clone()
    }

    fn chain(&self, source: Option<&str>) -> &[Arc<dyn PlacesProvider>] {
        if prefers_open_data(source) {
            &self.open_places
        } else {
            &self.places
        }
    }

    pub async fn geocode(&self, address: &str, language: &str) -> Result<GeocodedAddress, ApiError> {
        first_success("geocode", &self.places, |p| p.geocode(address, language), |_| false)
            .await
            .map(|resolved| resolved.value)
            .map_err(|e| e.into_api("Failed to geocode address", "Unable to geocode address"))
    }

    pub async fn search(&self, query: &str, params: &PlaceSearchParams) -> Result<PlaceSearch, ApiError> {
        first_success(
            "place search",
            self.chain(params.source.as_deref()),
            |p| {
                p.search(query, params).map(|result| {
                    result.map(|mut search| {
                        search.results = retain_visitable(search.results);
                        search.total_results = search.results.len();
                        search
                    })
                })
            },
            |search: &PlaceSearch| search.results.is_empty(),
        )
        .await
        .map(|resolved| resolved.value)
        .map_err(|e| e.into_api("Failed to search places", "No places found"))
    }

    pub async fn details(&self, place_id: &str, language: &str) -> Result<PlaceDetails, ApiError> {
        first_success("place details", &self.places, |p| p.details(place_id, language), |_| false)
            .await
            .map(|resolved| resolved.value)
            .map_err(|e| e.into_api("Failed to get place details", "Place not found"))
    }

    pub async fn directions(&self, params: &DirectionsParams) -> Result<Directions, ApiError> {
        let (origin, destination) = match (non_blank(&params.origin), non_blank(&params.destination)) {
            (Some(origin), Some(destination)) => (origin, destination),
            _ => return Err(ApiError::bad_request("Origin and destination are required")),
        };

        first_success(
            "directions",
            &self.routers,
            |p| p.directions(origin, destination, params),
            |_| false,
        )
        .await
        .map(|resolved| resolved.value)
        .map_err(|e| e.into_api("Failed to get directions", "No route found"))
    }

    pub async fn nearby(&self, params: &NearbyParams) -> Result<NearbyPlaces, ApiError> {
        let radius = positive_or(params.radius, 5000.0);
        let source = params.source.as_deref();

        let center = self
            .resolve_center(params.location.as_deref(), params.query.as_deref(), &params.language, source)
            .await?
            .ok_or_else(|| ApiError::bad_request("Unable to resolve location"))?;

        let types = requested_types(params.types.as_deref());
        let result = first_success(
            "nearby places",
            self.chain(source),
            |p| {
                p.nearby(center, radius, &types, &params.language)
                    .map(|result| result.map(retain_visitable))
            },
            Vec::is_empty,
        )
        .await;

        let (results, source) = match result {
            Ok(resolved) => (resolved.value, source_label(resolved.provider)),
            Err(err) => {
                info!("Nearby search around {} found nothing: {err}", format_center(center));
                (Vec::new(), "NONE")
            }
        };

        Ok(NearbyPlaces {
            center: Some(format_center(center)),
            radius,
            total_results: results.len(),
            results,
            source: source.to_string(),
        })
    }

    pub async fn accommodations(&self, params: &AccommodationParams) -> Result<Accommodations, ApiError> {
        let radius = positive_or(params.radius, 3000.0);
        let area = non_blank(&params.query);

        let center = self
            .resolve_center(params.location.as_deref(), area, &params.language, None)
            .await?;

        let results = first_success(
            "accommodations",
            &self.places,
            |p| p.lodging(center, area, radius, &params.language),
            Vec::is_empty,
        )
        .await
        .map(|resolved| resolved.value)
        .unwrap_or_else(|err| {
            info!("No accommodations found: {err}");
            Vec::new()
        });

        Ok(Accommodations {
            center: center.map(format_center),
            radius,
            total_results: results.len(),
            results,
        })
    }

    /// Resolves an explicit `lat,lng` location, or geocodes a free-text
    /// query over the candidate list. `Ok(None)` means nothing matched.
    async fn resolve_center(
        &self,
        location: Option<&str>,
        query: Option<&str>,
        language: &str,
        source: Option<&str>,
    ) -> Result<Option<Coordinates>, ApiError> {
        if let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) {
            return parse_lat_lng(location)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request("Location must be in lat,lng format"));
        }

        let query = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => query,
            None => return Err(ApiError::bad_request("Provide either location or query")),
        };

        if let Some(center) = parse_lat_lng(query) {
            return Ok(Some(center));
        }

        for candidate in geocode_candidates(query, self.default_country.as_deref()) {
            match first_success(
                "center lookup",
                self.chain(source),
                |p| p.geocode(&candidate, language),
                |_| false,
            )
            .await
            {
                Ok(resolved) => {
                    debug!("Resolved {candidate:?} via {}", resolved.provider);
                    return Ok(Some(resolved.value.coordinates));
                }
                Err(err) => debug!("Could not resolve {candidate:?}: {err}"),
            }
        }

        Ok(None)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn positive_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(default)
}

pub fn prefers_open_data(source: Option<&str>) -> bool {
    source.is_some_and(|s| s.trim().eq_ignore_ascii_case("osm"))
}

fn source_label(provider: &str) -> &'static str {
    match provider {
        google::NAME => "GOOGLE",
        overpass::NAME => "OSM",
        nominatim::NAME => "OSM-NOMINATIM",
        _ => "OTHER",
    }
}

pub fn format_center(center: Coordinates) -> String {
    format!("{},{}", center.lat, center.lng)
}

/// Parses `"lat,lng"` (whitespace tolerated) into coordinates.
pub fn parse_lat_lng(value: &str) -> Option<Coordinates> {
    let (lat, lng) = value.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;

    let valid = lat.is_finite() && lng.is_finite() && lat.abs() <= 90.0 && lng.abs() <= 180.0;
    valid.then_some(Coordinates { lat, lng })
}

/// The query itself, then the query qualified by the default country.
pub fn geocode_candidates(query: &str, default_country: Option<&str>) -> Vec<String> {
    let mut candidates = vec![query.to_string()];
    if let Some(country) = default_country {
        let already_qualified = query.to_lowercase().contains(&country.to_lowercase());
        if !already_qualified {
            candidates.push(format!("{query}, {country}"));
        }
    }
    candidates
}

fn requested_types(types: Option<&str>) -> Vec<String> {
    let requested: Vec<String> = types
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if requested.is_empty() {
        DEFAULT_NEARBY_TYPES.iter().map(|t| t.to_string()).collect()
    } else {
        requested
    }
}

/// True for cities, regions, roads and other non-visitable entries.
pub fn is_administrative(types: &[String]) -> bool {
    let lowered: Vec<String> = types.iter().map(|t| t.to_lowercase()).collect();

    let google_admin = lowered.iter().any(|t| {
        ADMINISTRATIVE_TYPES.contains(&t.as_str())
            || t.strip_prefix("administrative_area_level_")
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    });
    if google_admin {
        return true;
    }

    lowered.iter().any(|t| t == "place") && lowered.iter().any(|t| OSM_PLACE_CLASSES.contains(&t.as_str()))
}

pub fn retain_visitable(places: Vec<Place>) -> Vec<Place> {
    places.into_iter().filter(|p| !is_administrative(&p.types)).collect()
}
