use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::error::ApiError;
use crate::models::chat::{BudgetEstimateRequest, ChatRequest, RecommendationsRequest, WeatherActivitiesRequest};
use crate::services::chat::ChatService;

pub const KEY_HEADER: &str = "x-gemini-key";

type Chat = web::Data<ChatService>;

fn header_key(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/*
    POST /api/chat
*/
pub async fn chat(chat: Chat, req: HttpRequest, body: web::Json<ChatRequest>) -> Result<HttpResponse, ApiError> {
    let reply = chat.chat(body.into_inner(), header_key(&req)).await?;
    Ok(HttpResponse::Ok().json(reply))
}

/*
    POST /api/chat/recommendations
*/
pub async fn recommendations(
    chat: Chat,
    req: HttpRequest,
    body: web::Json<RecommendationsRequest>,
) -> Result<HttpResponse, ApiError> {
    let recommendations = chat.recommendations(body.into_inner(), header_key(&req)).await?;
    Ok(HttpResponse::Ok().json(recommendations))
}

/*
    POST /api/chat/weather-activities
*/
pub async fn weather_activities(
    chat: Chat,
    req: HttpRequest,
    body: web::Json<WeatherActivitiesRequest>,
) -> Result<HttpResponse, ApiError> {
    let suggestions = chat.weather_activities(body.into_inner(), header_key(&req)).await?;
    Ok(HttpResponse::Ok().json(suggestions))
}

/*
    GET /api/chat/history/{userId}
*/
pub async fn history(chat: Chat, path: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(chat.history(&path))
}

/*
    DELETE /api/chat/history/{userId}
*/
pub async fn clear_history(chat: Chat, path: web::Path<String>) -> HttpResponse {
    let user_id = path.into_inner();
    chat.clear_history(&user_id);
    HttpResponse::Ok().json(json!({
        "message": "Conversation history cleared",
        "conversationId": user_id,
    }))
}

/*
    GET /api/chat/status
*/
pub async fn status(chat: Chat, req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().json(chat.status(header_key(&req)))
}

/*
    POST /api/chat/budget-estimate
*/
pub async fn budget_estimate(
    chat: Chat,
    req: HttpRequest,
    body: web::Json<BudgetEstimateRequest>,
) -> Result<HttpResponse, ApiError> {
    let estimate = chat.budget_estimate(body.into_inner(), header_key(&req)).await?;
    Ok(HttpResponse::Ok().json(estimate))
}
