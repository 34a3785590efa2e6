use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherQuery {
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

impl Default for WeatherQuery {
    fn default() -> Self {
        Self {
            units: default_units(),
            lang: default_lang(),
        }
    }
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub description: String,
    pub icon: Option<String>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub visibility: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentWeather {
    pub city: String,
    pub country: Option<String>,
    pub coordinates: GeoPoint,
    pub current: Option<CurrentConditions>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityInfo {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: GeoPoint,
}

/// One 3-hourly slot inside a forecast day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSlot {
    pub time: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub description: String,
    pub icon: Option<String>,
    pub wind_speed: f64,
    pub precipitation_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub avg_temperature: f64,
    pub avg_humidity: Option<f64>,
    pub max_precipitation_probability: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    pub date: String,
    pub day_name: String,
    pub forecasts: Vec<ForecastSlot>,
    pub summary: DaySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub city: CityInfo,
    pub forecast: Vec<ForecastDay>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherAlert {
    pub event: String,
    pub description: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub severity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherAlerts {
    pub city: String,
    pub coordinates: GeoPoint,
    pub alerts: Vec<WeatherAlert>,
    pub has_alerts: bool,
}
