pub mod open_meteo;
pub mod openweather;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::config::AppConfig;
use crate::error::{ApiError, ProviderError};
use crate::models::weather::{
    CurrentWeather, DaySummary, Forecast, ForecastDay, ForecastSlot, WeatherAlerts, WeatherQuery,
};
use crate::services::fallback::{first_success, Provider};

pub use open_meteo::OpenMeteo;
pub use openweather::OpenWeatherMap;

pub const FORECAST_DAYS: usize = 5;

#[async_trait]
pub trait WeatherProvider: Provider {
    async fn current(&self, city: &str, query: &WeatherQuery) -> Result<CurrentWeather, ProviderError>;

    async fn forecast(&self, city: &str, query: &WeatherQuery) -> Result<Forecast, ProviderError>;

    async fn alerts(&self, _city: &str, _query: &WeatherQuery) -> Result<WeatherAlerts, ProviderError> {
        Err(ProviderError::Unsupported(self.name()))
    }
}

pub struct WeatherService {
    providers: Vec<Arc<dyn WeatherProvider>>,
}

impl WeatherService {
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>) -> Self {
        Self { providers }
    }

    /// OpenWeatherMap first, Open-Meteo (keyless) as the fallback.
    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Self {
        Self::new(vec![
            Arc::new(OpenWeatherMap::new(http.clone(), config.keys.openweather.clone())),
            Arc::new(OpenMeteo::new(http)),
        ])
    }

    pub async fn current(&self, city: &str, query: &WeatherQuery) -> Result<CurrentWeather, ApiError> {
        first_success("current weather", &self.providers, |p| p.current(city, query), |_| false)
            .await
            .map(|resolved| resolved.value)
            .map_err(|e| e.into_api("Failed to fetch weather data", "City not found"))
    }

    pub async fn forecast(&self, city: &str, query: &WeatherQuery) -> Result<Forecast, ApiError> {
        first_success(
            "weather forecast",
            &self.providers,
            |p| p.forecast(city, query),
            |f: &Forecast| f.forecast.is_empty(),
        )
        .await
        .map(|resolved| resolved.value)
        .map_err(|e| e.into_api("Failed to fetch weather forecast", "City not found"))
    }

    pub async fn alerts(&self, city: &str, query: &WeatherQuery) -> Result<WeatherAlerts, ApiError> {
        first_success("weather alerts", &self.providers, |p| p.alerts(city, query), |_| false)
            .await
            .map(|resolved| resolved.value)
            .map_err(|e| e.into_api("Failed to fetch weather alerts", "City not found"))
    }
}

/// Packing advice derived from a day's aggregates (metric thresholds).
pub fn recommendations(avg_temperature: f64, max_precipitation: f64, avg_humidity: Option<f64>) -> Vec<String> {
    let mut advice = Vec::new();
    if avg_temperature < 10.0 {
        advice.push("Pack warm clothing".to_string());
    }
    if avg_temperature > 25.0 {
        advice.push("Pack light clothing and sunscreen".to_string());
    }
    if max_precipitation > 70.0 {
        advice.push("High chance of rain - pack umbrella/raincoat".to_string());
    }
    if avg_humidity.is_some_and(|h| h > 80.0) {
        advice.push("High humidity - stay hydrated".to_string());
    }
    advice
}

pub fn summarize_slots(slots: &[ForecastSlot]) -> DaySummary {
    let count = slots.len().max(1) as f64;
    let avg_temperature = slots.iter().map(|s| s.temperature).sum::<f64>() / count;
    let avg_humidity = slots.iter().map(|s| s.humidity).sum::<f64>() / count;
    let max_precipitation = slots
        .iter()
        .map(|s| s.precipitation_probability)
        .fold(0.0, f64::max);

    DaySummary {
        avg_temperature: round1(avg_temperature),
        avg_humidity: Some(avg_humidity.round()),
        max_precipitation_probability: max_precipitation.round(),
        recommendations: recommendations(avg_temperature, max_precipitation, Some(avg_humidity)),
    }
}

/// Groups timestamped slots by UTC calendar day, oldest first, keeping at
/// most [`FORECAST_DAYS`] days.
pub fn group_into_days(slots: Vec<(DateTime<Utc>, ForecastSlot)>) -> Vec<ForecastDay> {
    let mut by_day: BTreeMap<NaiveDate, Vec<ForecastSlot>> = BTreeMap::new();
    for (at, slot) in slots {
        by_day.entry(at.date_naive()).or_default().push(slot);
    }

    by_day
        .into_iter()
        .take(FORECAST_DAYS)
        .map(|(date, forecasts)| ForecastDay {
            date: date.format("%Y-%m-%d").to_string(),
            day_name: date.format("%A").to_string(),
            summary: summarize_slots(&forecasts),
            forecasts,
        })
        .collect()
}

pub fn day_name(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%A").to_string())
        .unwrap_or_default()
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
