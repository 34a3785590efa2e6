use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;

use crate::error::ApiError;
use crate::models::itinerary::{ExpenseInput, Itinerary, ItineraryInput, ItineraryPatch, ItineraryView};
use crate::services::ical;
use crate::services::itinerary_store::ItineraryStore;

const NOT_FOUND: &str = "Itinerary not found";

type Store = web::Data<dyn ItineraryStore>;

async fn load(store: &Store, id: &str) -> Result<Itinerary, ApiError> {
    store
        .get(id)
        .await
        .map_err(|e| ApiError::internal("Failed to retrieve itinerary", e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

async fn save(store: &Store, id: &str, itinerary: Itinerary, failure: &str) -> Result<Itinerary, ApiError> {
    store
        .replace(id, itinerary)
        .await
        .map_err(|e| ApiError::internal(failure, e))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/*
    POST /api/itineraries
*/
pub async fn create(store: Store, body: web::Json<ItineraryInput>) -> Result<HttpResponse, ApiError> {
    let itinerary = body.into_inner().into_itinerary(Utc::now())?;
    let saved = store
        .insert(itinerary)
        .await
        .map_err(|e| ApiError::internal("Failed to create itinerary", e))?;

    info!("Created itinerary {:?} in {}", saved.id, store.backend());
    Ok(HttpResponse::Created().json(json!({
        "message": "Itinerary created",
        "itinerary": ItineraryView::from(&saved),
    })))
}

/*
    GET /api/itineraries
*/
pub async fn get_all(store: Store) -> Result<HttpResponse, ApiError> {
    let itineraries = store
        .list()
        .await
        .map_err(|e| ApiError::internal("Failed to retrieve itineraries", e))?;
    let views: Vec<ItineraryView> = itineraries.iter().map(ItineraryView::from).collect();

    Ok(HttpResponse::Ok().json(json!({
        "total": views.len(),
        "itineraries": views,
    })))
}

/*
    GET /api/itineraries/{id}
*/
pub async fn get_by_id(store: Store, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let itinerary = load(&store, &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "itinerary": ItineraryView::from(&itinerary) })))
}

/*
    PUT /api/itineraries/{id}
*/
pub async fn update(
    store: Store,
    path: web::Path<String>,
    body: web::Json<ItineraryPatch>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut itinerary = load(&store, &id).await?;
    itinerary.apply(body.into_inner(), Utc::now())?;

    let saved = save(&store, &id, itinerary, "Failed to update itinerary").await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Itinerary updated",
        "itinerary": ItineraryView::from(&saved),
    })))
}

/*
    DELETE /api/itineraries/{id}
*/
pub async fn delete(store: Store, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let removed = store
        .delete(&id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete itinerary", e))?;
    if !removed {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    info!("Deleted itinerary {id}");
    Ok(HttpResponse::Ok().json(json!({ "message": "Itinerary deleted", "deletedId": id })))
}

/*
    POST /api/itineraries/{id}/expenses
*/
pub async fn add_expense(
    store: Store,
    path: web::Path<String>,
    body: web::Json<ExpenseInput>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut itinerary = load(&store, &id).await?;
    let now = Utc::now();
    itinerary.budget.add_expense(body.into_inner(), now)?;
    itinerary.updated_at = now;

    let saved = save(&store, &id, itinerary, "Failed to add expense").await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Expense added",
        "itinerary": ItineraryView::from(&saved),
        "summary": saved.budget.summary(),
    })))
}

/*
    GET /api/itineraries/{id}/budget
*/
pub async fn budget(store: Store, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let itinerary = load(&store, &path).await?;
    Ok(HttpResponse::Ok().json(json!({
        "currency": itinerary.budget.currency,
        "summary": itinerary.budget.summary(),
        "status": itinerary.budget.status(),
        "breakdown": itinerary.budget.breakdown,
        "expenses": itinerary.budget.expenses,
    })))
}

/*
    GET /api/itineraries/{id}/export/ical
*/
pub async fn export_ical(store: Store, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let itinerary = load(&store, &path).await?;
    let calendar = ical::render(&itinerary, Utc::now());

    Ok(HttpResponse::Ok()
        .content_type("text/calendar; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"itinerary-{}.ics\"", path.as_str()),
        ))
        .body(calendar))
}
