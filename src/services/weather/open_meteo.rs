use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::models::weather::{
    CityInfo, CurrentConditions, CurrentWeather, DaySummary, Forecast, ForecastDay, GeoPoint,
    WeatherQuery,
};
use crate::services::fallback::Provider;
use crate::services::read_json;
use crate::services::weather::{day_name, recommendations, round1, WeatherProvider, FORECAST_DAYS};

const NAME: &str = "Open-Meteo";
pub const GEOCODE_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone, Deserialize)]
struct GeoResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<GeoResult>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature: f64,
    windspeed: Option<f64>,
    winddirection: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Daily {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentBlock>,
    #[serde(default)]
    daily: Daily,
}

/// Keyless fallback. City names are resolved through Open-Meteo's own
/// geocoder before the forecast call.
pub struct OpenMeteo {
    http: reqwest::Client,
    geocode_url: String,
    forecast_url: String,
}

impl OpenMeteo {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            geocode_url: GEOCODE_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
        }
    }

    async fn locate(&self, city: &str) -> Result<GeoResult, ProviderError> {
        let response = self
            .http
            .get(&self.geocode_url)
            .query(&[("name", city), ("count", "1")])
            .send()
            .await?;
        let raw: GeoResponse = read_json(NAME, response).await?;
        raw.results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("{NAME}: no match for {city}")))
    }

    async fn fetch(&self, place: &GeoResult, query: &WeatherQuery, extra: &[(&str, &str)]) -> Result<ForecastResponse, ProviderError> {
        let (lat, lon) = (place.latitude.to_string(), place.longitude.to_string());
        let mut params = vec![("latitude", lat.as_str()), ("longitude", lon.as_str())];
        params.extend_from_slice(extra);
        if query.units == "imperial" {
            params.push(("temperature_unit", "fahrenheit"));
            params.push(("windspeed_unit", "mph"));
        }

        let response = self.http.get(&self.forecast_url).query(&params).send().await?;
        read_json(NAME, response).await
    }
}

impl Provider for OpenMeteo {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_open_data(&self) -> bool {
        true
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteo {
    async fn current(&self, city: &str, query: &WeatherQuery) -> Result<CurrentWeather, ProviderError> {
        let place = self.locate(city).await?;
        let raw = self.fetch(&place, query, &[("current_weather", "true")]).await?;
        Ok(normalize_current(place, raw))
    }

    async fn forecast(&self, city: &str, query: &WeatherQuery) -> Result<Forecast, ProviderError> {
        let place = self.locate(city).await?;
        let raw = self
            .fetch(
                &place,
                query,
                &[
                    ("timezone", "auto"),
                    ("daily", "temperature_2m_max,temperature_2m_min,precipitation_probability_max"),
                ],
            )
            .await?;
        Ok(normalize_forecast(place, raw))
    }
}

fn coordinates(place: &GeoResult) -> GeoPoint {
    GeoPoint {
        lat: place.latitude,
        lon: place.longitude,
    }
}

fn normalize_current(place: GeoResult, raw: ForecastResponse) -> CurrentWeather {
    CurrentWeather {
        coordinates: coordinates(&place),
        city: place.name,
        country: place.country_code,
        current: raw.current_weather.map(|cw| CurrentConditions {
            temperature: cw.temperature,
            feels_like: cw.temperature,
            humidity: None,
            pressure: None,
            description: "Current conditions".to_string(),
            icon: None,
            wind_speed: cw.windspeed,
            wind_direction: cw.winddirection,
            visibility: None,
            sunrise: None,
            sunset: None,
        }),
        timestamp: Utc::now(),
    }
}

/// Daily rows only; Open-Meteo has no 3-hourly slots, so `forecasts` stays
/// empty and the average is the midpoint of max and min.
fn normalize_forecast(place: GeoResult, raw: ForecastResponse) -> Forecast {
    let daily = raw.daily;
    let value_at = |column: &[Option<f64>], idx: usize| column.get(idx).copied().flatten();

    let forecast = daily
        .time
        .iter()
        .take(FORECAST_DAYS)
        .enumerate()
        .map(|(idx, date)| {
            let max = value_at(&daily.temperature_2m_max, idx).unwrap_or(0.0);
            let min = value_at(&daily.temperature_2m_min, idx).unwrap_or(0.0);
            let avg = (max + min) / 2.0;
            let precipitation = value_at(&daily.precipitation_probability_max, idx).unwrap_or(0.0);

            ForecastDay {
                date: date.clone(),
                day_name: day_name(date),
                forecasts: Vec::new(),
                summary: DaySummary {
                    avg_temperature: round1(avg),
                    avg_humidity: None,
                    max_precipitation_probability: precipitation.round(),
                    recommendations: recommendations(avg, precipitation, None),
                },
            }
        })
        .collect();

    Forecast {
        city: CityInfo {
            coordinates: coordinates(&place),
            name: place.name,
            country: place.country_code,
        },
        forecast,
        generated_at: Utc::now(),
    }
}
