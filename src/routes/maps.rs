use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::models::place::{AccommodationParams, DirectionsParams, LanguageParams, NearbyParams, PlaceSearchParams};
use crate::services::maps::MapsService;

type Maps = web::Data<MapsService>;

/*
    GET /api/maps/config
*/
pub async fn config(maps: Maps) -> HttpResponse {
    HttpResponse::Ok().json(maps.config())
}

/*
    GET /api/maps/geocode/{address}?language=
*/
pub async fn geocode(
    maps: Maps,
    path: web::Path<String>,
    query: web::Query<LanguageParams>,
) -> Result<HttpResponse, ApiError> {
    let address = maps.geocode(path.trim(), &query.language).await?;
    Ok(HttpResponse::Ok().json(address))
}

/*
    GET /api/maps/places/{query}?location=&radius=&type=&source=
*/
pub async fn search(
    maps: Maps,
    path: web::Path<String>,
    query: web::Query<PlaceSearchParams>,
) -> Result<HttpResponse, ApiError> {
    let results = maps.search(path.trim(), &query).await?;
    Ok(HttpResponse::Ok().json(results))
}

/*
    GET /api/maps/place/{placeId}?language=
*/
pub async fn details(
    maps: Maps,
    path: web::Path<String>,
    query: web::Query<LanguageParams>,
) -> Result<HttpResponse, ApiError> {
    let place = maps.details(path.trim(), &query.language).await?;
    Ok(HttpResponse::Ok().json(place))
}

/*
    GET /api/maps/directions?origin=&destination=&mode=
*/
pub async fn directions(maps: Maps, query: web::Query<DirectionsParams>) -> Result<HttpResponse, ApiError> {
    let directions = maps.directions(&query).await?;
    Ok(HttpResponse::Ok().json(directions))
}

/*
    GET /api/maps/nearby?query=|location=&radius=&types=&source=
*/
pub async fn nearby(maps: Maps, query: web::Query<NearbyParams>) -> Result<HttpResponse, ApiError> {
    let places = maps.nearby(&query).await?;
    Ok(HttpResponse::Ok().json(places))
}

/*
    GET /api/maps/accommodations?query=|location=&radius=
*/
pub async fn accommodations(maps: Maps, query: web::Query<AccommodationParams>) -> Result<HttpResponse, ApiError> {
    let lodging = maps.accommodations(&query).await?;
    Ok(HttpResponse::Ok().json(lodging))
}
