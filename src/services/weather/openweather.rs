use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::models::weather::{
    CityInfo, CurrentConditions, CurrentWeather, Forecast, ForecastSlot, GeoPoint, WeatherAlert,
    WeatherAlerts, WeatherQuery,
};
use crate::services::fallback::Provider;
use crate::services::read_json;
use crate::services::weather::{group_into_days, WeatherProvider};

const NAME: &str = "OpenWeatherMap";
pub const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Sys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    humidity: f64,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: String,
    coord: Coord,
    #[serde(default)]
    sys: Sys,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
    visibility: Option<f64>,
    dt: i64,
}

#[derive(Debug, Deserialize)]
struct ForecastCity {
    name: String,
    country: Option<String>,
    coord: Coord,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    city: ForecastCity,
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct Alert {
    event: String,
    #[serde(default)]
    description: String,
    start: Option<i64>,
    end: Option<i64>,
    #[serde(default)]
    tags: Vec<String>,
    sender_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    #[serde(default)]
    alerts: Vec<Alert>,
}

pub struct OpenWeatherMap {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeatherMap {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_url(http, api_key, BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, api_key: Option<String>, base_url: &str) -> Self {
        Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::NotConfigured(NAME))
    }

    async fn fetch_current(&self, city: &str, query: &WeatherQuery) -> Result<CurrentResponse, ProviderError> {
        let response = self
            .http
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("q", city),
                ("appid", self.key()?),
                ("units", query.units.as_str()),
                ("lang", query.lang.as_str()),
            ])
            .send()
            .await?;
        read_json(NAME, response).await
    }
}

impl Provider for OpenWeatherMap {
    fn name(&self) -> &'static str {
        NAME
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMap {
    async fn current(&self, city: &str, query: &WeatherQuery) -> Result<CurrentWeather, ProviderError> {
        let raw = self.fetch_current(city, query).await?;
        Ok(normalize_current(raw))
    }

    async fn forecast(&self, city: &str, query: &WeatherQuery) -> Result<Forecast, ProviderError> {
        let response = self
            .http
            .get(format!("{}/forecast", self.base_url))
            .query(&[
                ("q", city),
                ("appid", self.key()?),
                ("units", query.units.as_str()),
                ("lang", query.lang.as_str()),
            ])
            .send()
            .await?;
        let raw: ForecastResponse = read_json(NAME, response).await?;
        Ok(normalize_forecast(raw, Utc::now()))
    }

    /// Resolves the city through the current-weather endpoint, then asks One
    /// Call for alerts only.
    async fn alerts(&self, city: &str, query: &WeatherQuery) -> Result<WeatherAlerts, ProviderError> {
        let current = self.fetch_current(city, query).await?;
        let (lat, lon) = (current.coord.lat.to_string(), current.coord.lon.to_string());

        let response = self
            .http
            .get(format!("{}/onecall", self.base_url))
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.key()?),
                ("units", query.units.as_str()),
                ("lang", query.lang.as_str()),
                ("exclude", "current,minutely,hourly,daily"),
            ])
            .send()
            .await?;
        let raw: OneCallResponse = read_json(NAME, response).await?;

        let alerts: Vec<WeatherAlert> = raw
            .alerts
            .into_iter()
            .map(|alert| WeatherAlert {
                severity: alert.tags.into_iter().next().unwrap_or_else(|| "Unknown".to_string()),
                event: alert.event,
                description: alert.description,
                start: alert.start.and_then(from_unix),
                end: alert.end.and_then(from_unix),
                sender: alert.sender_name,
            })
            .collect();

        Ok(WeatherAlerts {
            city: current.name,
            coordinates: GeoPoint {
                lat: current.coord.lat,
                lon: current.coord.lon,
            },
            has_alerts: !alerts.is_empty(),
            alerts,
        })
    }
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn normalize_current(raw: CurrentResponse) -> CurrentWeather {
    let condition = raw.weather.into_iter().next();

    CurrentWeather {
        city: raw.name,
        country: raw.sys.country,
        coordinates: GeoPoint {
            lat: raw.coord.lat,
            lon: raw.coord.lon,
        },
        current: Some(CurrentConditions {
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            humidity: Some(raw.main.humidity),
            pressure: raw.main.pressure,
            description: condition.as_ref().map(|c| c.description.clone()).unwrap_or_default(),
            icon: condition.and_then(|c| c.icon),
            wind_speed: Some(raw.wind.speed),
            wind_direction: raw.wind.deg,
            visibility: raw.visibility,
            sunrise: raw.sys.sunrise.and_then(from_unix),
            sunset: raw.sys.sunset.and_then(from_unix),
        }),
        timestamp: from_unix(raw.dt).unwrap_or_else(Utc::now),
    }
}

fn normalize_forecast(raw: ForecastResponse, generated_at: DateTime<Utc>) -> Forecast {
    let slots = raw
        .list
        .into_iter()
        .filter_map(|item| {
            let at = from_unix(item.dt)?;
            let condition = item.weather.into_iter().next();
            Some((
                at,
                ForecastSlot {
                    time: at.format("%H:%M").to_string(),
                    temperature: item.main.temp,
                    feels_like: item.main.feels_like,
                    humidity: item.main.humidity,
                    description: condition.as_ref().map(|c| c.description.clone()).unwrap_or_default(),
                    icon: condition.and_then(|c| c.icon),
                    wind_speed: item.wind.speed,
                    precipitation_probability: item.pop * 100.0,
                },
            ))
        })
        .collect();

    Forecast {
        city: CityInfo {
            name: raw.city.name,
            country: raw.city.country,
            coordinates: GeoPoint {
                lat: raw.city.coord.lat,
                lon: raw.city.coord.lon,
            },
        },
        forecast: group_into_days(slots),
        generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_current() {
        let raw: CurrentResponse = serde_json::from_value(json!({
            "name": "Pune",
            "coord": { "lat": 18.52, "lon": 73.86 },
            "sys": { "country": "IN", "sunrise": 1767230000, "sunset": 1767270000 },
            "main": { "temp": 24.3, "feels_like": 25.1, "humidity": 40, "pressure": 1012 },
            "weather": [{ "description": "haze", "icon": "50d" }],
            "wind": { "speed": 3.1, "deg": 270 },
            "visibility": 4000,
            "dt": 1767250000
        }))
        .unwrap();

        let weather = normalize_current(raw);
        assert_eq!(weather.city, "Pune");
        assert_eq!(weather.country.as_deref(), Some("IN"));
        let current = weather.current.unwrap();
        assert_eq!(current.description, "haze");
        assert_eq!(current.icon.as_deref(), Some("50d"));
        assert_eq!(current.humidity, Some(40.0));
        assert_eq!(current.wind_direction, Some(270.0));
        assert!(current.sunrise.is_some());
    }

    #[test]
    fn test_normalize_forecast_groups_three_hour_slots() {
        // 2026-03-01T00:00:00Z
        let start = 1_772_323_200;
        let list: Vec<_> = (0..16)
            .map(|i| {
                json!({
                    "dt": start + i * 3 * 3600,
                    "main": { "temp": 30.0, "feels_like": 31.0, "humidity": 85 },
                    "weather": [{ "description": "humid", "icon": "02d" }],
                    "wind": { "speed": 1.0 },
                    "pop": 0.1
                })
            })
            .collect();

        let raw: ForecastResponse = serde_json::from_value(json!({
            "city": { "name": "Chennai", "country": "IN", "coord": { "lat": 13.08, "lon": 80.27 } },
            "list": list
        }))
        .unwrap();

        let forecast = normalize_forecast(raw, Utc::now());
        assert_eq!(forecast.city.name, "Chennai");
        assert_eq!(forecast.forecast.len(), 2);
        assert_eq!(forecast.forecast[0].date, "2026-03-01");
        assert_eq!(forecast.forecast[0].forecasts.len(), 8);
        assert_eq!(forecast.forecast[0].forecasts[1].time, "03:00");
        assert_eq!(forecast.forecast[0].summary.max_precipitation_probability, 10.0);
        assert_eq!(
            forecast.forecast[0].summary.recommendations,
            vec!["Pack light clothing and sunscreen", "High humidity - stay hydrated"]
        );
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let provider = OpenWeatherMap::new(reqwest::Client::new(), None);
        assert!(matches!(provider.key(), Err(ProviderError::NotConfigured(NAME))));
    }
}
