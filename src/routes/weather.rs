use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::models::weather::WeatherQuery;
use crate::services::weather::WeatherService;

/*
    GET /api/weather/{city}?units=&lang=
*/
pub async fn current(
    service: web::Data<WeatherService>,
    path: web::Path<String>,
    query: web::Query<WeatherQuery>,
) -> Result<HttpResponse, ApiError> {
    let weather = service.current(path.trim(), &query).await?;
    Ok(HttpResponse::Ok().json(weather))
}

/*
    GET /api/weather/forecast/{city}?units=&lang=
*/
pub async fn forecast(
    service: web::Data<WeatherService>,
    path: web::Path<String>,
    query: web::Query<WeatherQuery>,
) -> Result<HttpResponse, ApiError> {
    let forecast = service.forecast(path.trim(), &query).await?;
    Ok(HttpResponse::Ok().json(forecast))
}

/*
    GET /api/weather/alerts/{city}
*/
pub async fn alerts(
    service: web::Data<WeatherService>,
    path: web::Path<String>,
    query: web::Query<WeatherQuery>,
) -> Result<HttpResponse, ApiError> {
    let alerts = service.alerts(path.trim(), &query).await?;
    Ok(HttpResponse::Ok().json(alerts))
}
