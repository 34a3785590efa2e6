#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{web, App};
use async_trait::async_trait;
use chrono::Utc;

use triptrackr_api::config::AppConfig;
use triptrackr_api::error::ProviderError;
use triptrackr_api::middleware::{rate_limit::RateLimiter, security_headers};
use triptrackr_api::models::itinerary::Coordinates;
use triptrackr_api::models::place::{
    DirectionsParams, Directions, GeocodedAddress, Lodging, MapsCapabilities, Place, PlaceDetails, PlaceSearch,
    PlaceSearchParams, TextValue,
};
use triptrackr_api::models::weather::{
    CityInfo, CurrentConditions, CurrentWeather, Forecast, ForecastSlot, GeoPoint, WeatherQuery,
};
use triptrackr_api::routes;
use triptrackr_api::services::chat::gemini::{ChatModel, Generation};
use triptrackr_api::services::chat::ChatService;
use triptrackr_api::services::fallback::Provider;
use triptrackr_api::services::itinerary_store::{InMemoryItineraryStore, ItineraryStore};
use triptrackr_api::services::maps::{nominatim, overpass, MapsService, PlacesProvider, RoutingProvider};
use triptrackr_api::services::weather::{group_into_days, WeatherProvider, WeatherService};

pub const GEMINI_KEY: &str = "AIzaSyIntegrationTestKey0001";

/// Stands in for a keyed provider whose key is missing.
pub struct Unconfigured(pub &'static str);

impl Provider for Unconfigured {
    fn name(&self) -> &'static str {
        self.0
    }
}

#[async_trait]
impl WeatherProvider for Unconfigured {
    async fn current(&self, _city: &str, _query: &WeatherQuery) -> Result<CurrentWeather, ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }

    async fn forecast(&self, _city: &str, _query: &WeatherQuery) -> Result<Forecast, ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

#[async_trait]
impl PlacesProvider for Unconfigured {}

#[async_trait]
impl RoutingProvider for Unconfigured {
    async fn directions(&self, _o: &str, _d: &str, _p: &DirectionsParams) -> Result<Directions, ProviderError> {
        Err(ProviderError::NotConfigured(self.0))
    }
}

/// Keyless weather source that knows a single city.
pub struct FakeWeather {
    pub city: &'static str,
}

impl Provider for FakeWeather {
    fn name(&self) -> &'static str {
        "Fake Weather"
    }

    fn is_open_data(&self) -> bool {
        true
    }
}

impl FakeWeather {
    fn check(&self, city: &str) -> Result<(), ProviderError> {
        if city.eq_ignore_ascii_case(self.city) {
            Ok(())
        } else {
            Err(ProviderError::NotFound(format!("{city} not found")))
        }
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current(&self, city: &str, _query: &WeatherQuery) -> Result<CurrentWeather, ProviderError> {
        self.check(city)?;
        Ok(CurrentWeather {
            city: self.city.to_string(),
            country: Some("IN".to_string()),
            coordinates: GeoPoint { lat: 15.49, lon: 73.82 },
            current: Some(CurrentConditions {
                temperature: 31.0,
                feels_like: 31.0,
                humidity: None,
                pressure: None,
                description: "Current conditions".to_string(),
                icon: None,
                wind_speed: Some(4.0),
                wind_direction: None,
                visibility: None,
                sunrise: None,
                sunset: None,
            }),
            timestamp: Utc::now(),
        })
    }

    async fn forecast(&self, city: &str, _query: &WeatherQuery) -> Result<Forecast, ProviderError> {
        self.check(city)?;
        let start = chrono::DateTime::from_timestamp(1_772_323_200, 0).unwrap_or_default();
        let slots = (0..16)
            .map(|i| {
                let at = start + chrono::Duration::hours(3 * i);
                (
                    at,
                    ForecastSlot {
                        time: at.format("%H:%M").to_string(),
                        temperature: 30.0,
                        feels_like: 32.0,
                        humidity: 85.0,
                        description: "humid".to_string(),
                        icon: None,
                        wind_speed: 3.0,
                        precipitation_probability: if i == 3 { 80.0 } else { 10.0 },
                    },
                )
            })
            .collect();

        Ok(Forecast {
            city: CityInfo {
                name: self.city.to_string(),
                country: Some("IN".to_string()),
                coordinates: GeoPoint { lat: 15.49, lon: 73.82 },
            },
            forecast: group_into_days(slots),
            generated_at: Utc::now(),
        })
    }
}

/// Open-data places provider with canned answers. Named after Overpass so
/// results are labelled like real OpenStreetMap hits.
pub struct FakePlaces {
    pub name: &'static str,
    pub center: Coordinates,
    pub places: Vec<Place>,
    pub lodging: Vec<Lodging>,
}

impl FakePlaces {
    pub fn overpass() -> Self {
        let museum = Place::bare(
            "osm-node-1".to_string(),
            "Goa State Museum".to_string(),
            Some("Patto, Panaji".to_string()),
            Some(Coordinates { lat: 15.4989, lng: 73.8278 }),
            vec!["museum".to_string(), "tourism".to_string()],
        );
        let city = Place::bare(
            "osm-node-2".to_string(),
            "Panaji".to_string(),
            None,
            Some(Coordinates { lat: 15.49, lng: 73.82 }),
            vec!["place".to_string(), "city".to_string()],
        );
        let hotel = Lodging {
            place_id: "lodging-node-3".to_string(),
            name: "Mandovi Hotel".to_string(),
            address: Some("Address not available".to_string()),
            coordinates: Some(Coordinates { lat: 15.5, lng: 73.83 }),
            rating: None,
            user_ratings_total: None,
            price_level: None,
            open_now: None,
            photos: Vec::new(),
        };

        Self {
            name: overpass::NAME,
            center: Coordinates { lat: 15.49, lng: 73.82 },
            places: vec![museum, city],
            lodging: vec![hotel],
        }
    }
}

impl Provider for FakePlaces {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_open_data(&self) -> bool {
        true
    }
}

#[async_trait]
impl PlacesProvider for FakePlaces {
    async fn geocode(&self, address: &str, _language: &str) -> Result<GeocodedAddress, ProviderError> {
        if !address.to_lowercase().contains("goa") {
            return Err(ProviderError::NotFound(format!("{address} not found")));
        }
        Ok(GeocodedAddress {
            address: "Goa, India".to_string(),
            coordinates: self.center,
            location_type: None,
            viewport: None,
            bounds: None,
            place_id: "osm-relation-11".to_string(),
            types: vec!["state".to_string()],
            components: Vec::new(),
        })
    }

    async fn search(&self, query: &str, _params: &PlaceSearchParams) -> Result<PlaceSearch, ProviderError> {
        Ok(PlaceSearch {
            query: query.to_string(),
            total_results: self.places.len(),
            results: self.places.clone(),
            status: "OSM".to_string(),
            next_page_token: None,
        })
    }

    async fn details(&self, place_id: &str, _language: &str) -> Result<PlaceDetails, ProviderError> {
        let place = self
            .places
            .iter()
            .find(|p| p.place_id == place_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(place_id.to_string()))?;
        Ok(PlaceDetails {
            place,
            website: None,
            phone: None,
            reviews: Vec::new(),
        })
    }

    async fn nearby(
        &self,
        _center: Coordinates,
        _radius: f64,
        _types: &[String],
        _language: &str,
    ) -> Result<Vec<Place>, ProviderError> {
        Ok(self.places.clone())
    }

    async fn lodging(
        &self,
        center: Option<Coordinates>,
        _area: Option<&str>,
        _radius: f64,
        _language: &str,
    ) -> Result<Vec<Lodging>, ProviderError> {
        match center {
            Some(_) => Ok(self.lodging.clone()),
            None => Err(ProviderError::Unsupported(self.name)),
        }
    }
}

/// Places provider that knows nothing, used to exhaust chains.
pub struct EmptyPlaces;

impl Provider for EmptyPlaces {
    fn name(&self) -> &'static str {
        nominatim::NAME
    }

    fn is_open_data(&self) -> bool {
        true
    }
}

#[async_trait]
impl PlacesProvider for EmptyPlaces {
    async fn nearby(&self, _c: Coordinates, _r: f64, _t: &[String], _l: &str) -> Result<Vec<Place>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Straight-line router for coordinates only.
pub struct FakeRouter;

impl Provider for FakeRouter {
    fn name(&self) -> &'static str {
        "Fake Router"
    }
}

#[async_trait]
impl RoutingProvider for FakeRouter {
    async fn directions(&self, origin: &str, destination: &str, _p: &DirectionsParams) -> Result<Directions, ProviderError> {
        if !origin.contains(',') || !destination.contains(',') {
            return Err(ProviderError::InvalidInput("Invalid coordinates for routing".to_string()));
        }
        Ok(Directions {
            summary: "Fake route".to_string(),
            distance: Some(TextValue {
                text: "1.0 km".to_string(),
                value: 1000.0,
            }),
            duration: Some(TextValue {
                text: "3 mins".to_string(),
                value: 180.0,
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
}

/// Chat model that replays scripted answers and records prompts.
#[derive(Default)]
pub struct ScriptedModel {
    pub answers: Mutex<Vec<Result<String, ProviderError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn with_answers(answers: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, _api_key: &str, prompt: &str, _generation: Generation) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            Err(ProviderError::Decode("no scripted answer".to_string()))
        } else {
            answers.remove(0)
        }
    }
}

pub struct TestApp {
    pub config: web::Data<AppConfig>,
    pub store: web::Data<dyn ItineraryStore>,
    pub weather: web::Data<WeatherService>,
    pub maps: web::Data<MapsService>,
    pub chat: web::Data<ChatService>,
    pub limiter: Arc<RateLimiter>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_chat(ScriptedModel::with_answers(Vec::new()), None)
    }

    pub fn with_chat(model: Arc<ScriptedModel>, gemini_key: Option<&str>) -> Self {
        let store: Arc<dyn ItineraryStore> = Arc::new(InMemoryItineraryStore::new());

        let weather = WeatherService::new(vec![
            Arc::new(Unconfigured("OpenWeatherMap")),
            Arc::new(FakeWeather { city: "Goa" }),
        ]);

        let capabilities = MapsCapabilities {
            routing: true,
            routing_provider: "OSRM".to_string(),
            places: false,
            geocoding: false,
        };
        let maps = MapsService::new(
            vec![
                Arc::new(Unconfigured("Google Maps")),
                Arc::new(FakePlaces::overpass()),
                Arc::new(EmptyPlaces),
            ],
            vec![Arc::new(Unconfigured("Google Maps")), Arc::new(FakeRouter)],
            capabilities,
            Some("India".to_string()),
        );

        Self {
            config: web::Data::new(AppConfig::default()),
            store: web::Data::from(store),
            weather: web::Data::new(weather),
            maps: web::Data::new(maps),
            chat: web::Data::new(ChatService::new(model, gemini_key.map(str::to_string))),
            limiter: Arc::new(RateLimiter::new(1_000, Duration::from_secs(900))),
        }
    }

    pub fn with_rate_limit(mut self, max_requests: u32) -> Self {
        self.limiter = Arc::new(RateLimiter::new(max_requests, Duration::from_secs(900)));
        self
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let limiter = self.limiter.clone();
        App::new()
            .wrap(security_headers())
            .app_data(routes::json_config())
            .app_data(self.config.clone())
            .app_data(self.store.clone())
            .app_data(self.weather.clone())
            .app_data(self.maps.clone())
            .app_data(self.chat.clone())
            .configure(move |cfg| routes::configure(cfg, limiter))
            .default_service(web::to(routes::not_found))
    }
}
