pub mod budget;
pub mod gemini;
pub mod rules;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::chat::{
    value_text, BudgetEstimate, BudgetEstimateRequest, ChatHistory, ChatMessage, ChatReply, ChatRequest,
    ChatRole, ChatStatus, Recommendations, RecommendationsRequest, WeatherActivities, WeatherActivitiesRequest,
};
use budget::{HeuristicReason, TripProfile};
use gemini::{is_valid_key, ChatModel, GeminiClient, Generation};

pub const HISTORY_LIMIT: usize = 20;
pub const CONTEXT_MESSAGES: usize = 5;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(30 * 60);

const NO_KEY: &str = "Gemini API key not configured";

const TRAVEL_PERSONA: &str = "You are TripTrackr, an intelligent travel planning assistant.\n\
Provide accurate, practical travel guidance. Be concise but complete and prefer bullet points.\n\
Ask 1-2 clarifying questions if the request is underspecified.\n\
Format using Markdown. Structure itineraries by day, note weather contingencies, and break budgets down by category.\n\
End with a short Next steps section.";

#[derive(Debug, Default)]
struct Conversation {
    messages: Vec<ChatMessage>,
    last_activity: i64,
}

/// AI travel assistant with per-user conversation memory.
pub struct ChatService {
    model: Arc<dyn ChatModel>,
    configured_key: Option<String>,
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl ChatService {
    pub fn new(model: Arc<dyn ChatModel>, configured_key: Option<String>) -> Self {
        Self {
            model,
            configured_key,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Self {
        Self::new(
            Arc::new(GeminiClient::new(http, config.gemini_model.clone())),
            config.keys.gemini.clone(),
        )
    }

    fn conversations(&self) -> MutexGuard<'_, HashMap<String, Conversation>> {
        self.conversations.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The configured key wins; a request header key is accepted only when
    /// no valid key is configured.
    pub fn resolve_key(&self, header_key: Option<&str>) -> Option<String> {
        self.configured_key
            .as_deref()
            .filter(|k| is_valid_key(k))
            .or_else(|| header_key.filter(|k| is_valid_key(k)))
            .map(|k| k.trim().to_string())
    }

    pub async fn chat(&self, request: ChatRequest, header_key: Option<&str>) -> Result<ChatReply, ApiError> {
        let message = match request.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(message) => message.to_string(),
            None => return Err(ApiError::bad_request("Message is required")),
        };
        let user_id = request
            .user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let context = request.context.unwrap_or_else(|| "travel".to_string());

        let recent = {
            let mut conversations = self.conversations();
            let conversation = conversations.entry(user_id.clone()).or_default();
            conversation.last_activity = Utc::now().timestamp_millis();
            let skip = conversation.messages.len().saturating_sub(CONTEXT_MESSAGES);
            conversation.messages[skip..]
                .iter()
                .map(|m| format!("{}: {}", m.role.as_str(), m.content))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let reply = match self.resolve_key(header_key) {
            Some(key) => {
                let prompt = chat_prompt(&context, &recent, &message);
                match self.model.generate(&key, &prompt, Generation::default()).await {
                    Ok(text) => text,
                    Err(err) => {
                        warn!("Gemini error, using rule-based reply: {err}");
                        rules::rule_based_reply(&message)
                    }
                }
            }
            None => rules::rule_based_reply(&message),
        };

        let now = Utc::now().timestamp_millis();
        {
            let mut conversations = self.conversations();
            let conversation = conversations.entry(user_id.clone()).or_default();
            conversation.messages.push(ChatMessage {
                role: ChatRole::User,
                content: message,
                timestamp: now,
            });
            conversation.messages.push(ChatMessage {
                role: ChatRole::Assistant,
                content: reply.clone(),
                timestamp: now,
            });
            let overflow = conversation.messages.len().saturating_sub(HISTORY_LIMIT);
            conversation.messages.drain(..overflow);
            conversation.last_activity = now;
        }

        Ok(ChatReply {
            response: reply,
            conversation_id: user_id,
            timestamp: now,
        })
    }

    pub async fn recommendations(
        &self,
        request: RecommendationsRequest,
        header_key: Option<&str>,
    ) -> Result<Recommendations, ApiError> {
        let destination = required(request.destination.as_deref(), "Destination is required")?;
        let key = self
            .resolve_key(header_key)
            .ok_or_else(|| ApiError::internal(NO_KEY, "Set GEMINI_API_KEY or send x-gemini-key"))?;

        let mut details = Vec::new();
        if let Some(weather) = request.weather.as_deref().filter(|w| !w.is_empty()) {
            details.push(format!("Weather conditions: {weather}"));
        }
        if let Some(duration) = request.trip_duration.as_ref().map(value_text).filter(|d| !d.is_empty()) {
            details.push(format!("Trip duration: {duration}"));
        }
        if !request.interests.is_empty() {
            details.push(format!("Interests: {}", request.interests.join(", ")));
        }
        if let Some(budget) = request.budget.as_ref().map(value_text).filter(|b| !b.is_empty()) {
            details.push(format!("Budget: {budget}"));
        }

        let prompt = format!(
            "As TripTrackr, provide detailed travel recommendations for {destination}.\n\n{}\n\n\
Please provide:\n1. Top attractions and activities\n2. Weather-appropriate clothing and gear recommendations\n\
3. Best times to visit attractions\n4. Local cuisine recommendations\n5. Transportation tips\n\
6. Budget-friendly options\n7. Cultural considerations\n8. Safety tips\n\n\
Format your response in a clear, structured way.",
            details.join("\n")
        );

        let recommendations = self
            .model
            .generate(&key, &prompt, Generation::default())
            .await
            .map_err(|e| ApiError::internal("Failed to generate recommendations", e))?;

        Ok(Recommendations {
            destination: destination.to_string(),
            recommendations,
            generated_at: Utc::now().timestamp_millis(),
        })
    }

    pub async fn weather_activities(
        &self,
        request: WeatherActivitiesRequest,
        header_key: Option<&str>,
    ) -> Result<WeatherActivities, ApiError> {
        let (destination, weather) = match (
            request.destination.as_deref().map(str::trim).filter(|d| !d.is_empty()),
            request.weather.as_deref().map(str::trim).filter(|w| !w.is_empty()),
        ) {
            (Some(destination), Some(weather)) => (destination, weather),
            _ => return Err(ApiError::bad_request("Destination and weather are required")),
        };
        let key = self
            .resolve_key(header_key)
            .ok_or_else(|| ApiError::internal(NO_KEY, "Set GEMINI_API_KEY or send x-gemini-key"))?;

        let reading = |value: &Option<serde_json::Value>| value.as_ref().map(value_text).unwrap_or_default();
        let prompt = format!(
            "As TripTrackr, suggest activities for {destination} based on these weather conditions:\n\n\
Weather: {weather}\nTemperature: {}°C\nPrecipitation: {}%\nWind Speed: {} km/h\n\n\
Please provide:\n1. Indoor activities (if weather is poor)\n2. Outdoor activities (if weather is good)\n\
3. Alternative plans for different weather scenarios\n4. Packing recommendations\n\
5. Timing suggestions for activities\n6. Safety considerations\n\n\
Format your response clearly and provide practical, actionable advice.",
            reading(&request.temperature),
            reading(&request.precipitation),
            reading(&request.wind_speed),
        );

        let suggestions = self
            .model
            .generate(&key, &prompt, Generation::default())
            .await
            .map_err(|e| ApiError::internal("Failed to generate weather-based suggestions", e))?;

        Ok(WeatherActivities {
            destination: destination.to_string(),
            weather: weather.to_string(),
            suggestions,
            generated_at: Utc::now().timestamp_millis(),
        })
    }

    pub fn history(&self, user_id: &str) -> ChatHistory {
        let conversations = self.conversations();
        match conversations.get(user_id) {
            Some(conversation) => ChatHistory {
                messages: conversation.messages.clone(),
                conversation_id: user_id.to_string(),
                last_activity: Some(conversation.last_activity),
            },
            None => ChatHistory {
                messages: Vec::new(),
                conversation_id: user_id.to_string(),
                last_activity: None,
            },
        }
    }

    pub fn clear_history(&self, user_id: &str) -> bool {
        self.conversations().remove(user_id).is_some()
    }

    pub fn status(&self, header_key: Option<&str>) -> ChatStatus {
        let configured = self.resolve_key(header_key).is_some();
        ChatStatus {
            configured,
            model: self.model.model().to_string(),
            message: if configured {
                "OK".to_string()
            } else {
                format!("{NO_KEY} (you can send x-gemini-key header in development)")
            },
        }
    }

    /// Model estimate when a key is available, destination heuristic
    /// otherwise. Never fails once a destination is given.
    pub async fn budget_estimate(
        &self,
        request: BudgetEstimateRequest,
        header_key: Option<&str>,
    ) -> Result<BudgetEstimate, ApiError> {
        let destination = required(request.destination.as_deref(), "Destination is required")?;
        let profile = TripProfile::new(
            destination.to_string(),
            request.days.as_ref(),
            request.travelers.as_ref(),
            request.style,
            request.currency,
            request.season,
        );

        let key = match self.resolve_key(header_key) {
            Some(key) => key,
            None => return Ok(budget::heuristic(&profile, HeuristicReason::NoApiKey)),
        };

        let json = Generation {
            temperature: 0.15,
            json: true,
        };
        let first = match self.model.generate(&key, &profile.prompt(false), json).await {
            Ok(text) => text,
            Err(err) => {
                warn!("Budget estimate model call failed: {err}");
                return Ok(budget::heuristic(&profile, HeuristicReason::ModelError));
            }
        };

        let parsed = match budget::extract_json(&first) {
            Some(parsed) => Some(parsed),
            None => {
                info!("Budget estimate was not JSON, retrying with a stricter prompt");
                let strict = Generation {
                    temperature: 0.0,
                    json: true,
                };
                match self.model.generate(&key, &profile.prompt(true), strict).await {
                    Ok(text) => budget::extract_json(&text),
                    Err(err) => {
                        warn!("Budget estimate retry failed: {err}");
                        return Ok(budget::heuristic(&profile, HeuristicReason::ModelError));
                    }
                }
            }
        };

        Ok(match parsed {
            Some(parsed) => budget::from_model(&parsed, &profile),
            None => budget::heuristic(&profile, HeuristicReason::Unparseable),
        })
    }

    /// Drops conversations idle for longer than `max_idle`. Returns how many
    /// were removed.
    pub fn prune_idle(&self, now_millis: i64, max_idle: Duration) -> usize {
        let cutoff = now_millis - max_idle.as_millis() as i64;
        let mut conversations = self.conversations();
        let before = conversations.len();
        conversations.retain(|_, c| c.last_activity >= cutoff);
        before - conversations.len()
    }
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}

fn chat_prompt(context: &str, recent: &str, message: &str) -> String {
    let persona = if context == "travel" { TRAVEL_PERSONA } else { "" };
    let history = if recent.is_empty() {
        String::new()
    } else {
        format!("Previous conversation:\n{recent}\n\n")
    };
    format!("{persona}\n\n{history}User: {message}\n\nPlease provide a helpful response as TripTrackr:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    const KEY: &str = "AIzaSyTestKey1234567890";

    /// Replays canned answers and records every prompt it was sent.
    struct ScriptedModel {
        answers: StdMutex<Vec<Result<String, ProviderError>>>,
        prompts: StdMutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(answers: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: StdMutex::new(answers),
                prompts: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _api_key: &str, prompt: &str, _generation: Generation) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                Err(ProviderError::Decode("script exhausted".to_string()))
            } else {
                answers.remove(0)
            }
        }
    }

    fn chat_request(message: &str, user: &str) -> ChatRequest {
        serde_json::from_value(json!({ "message": message, "userId": user })).unwrap()
    }

    #[test]
    fn test_key_resolution() {
        let model = ScriptedModel::new(vec![]);
        let service = ChatService::new(model.clone(), Some("your_api_key_here".to_string()));
        assert_eq!(service.resolve_key(None), None);
        assert_eq!(service.resolve_key(Some(KEY)).as_deref(), Some(KEY));

        let service = ChatService::new(model, Some(KEY.to_string()));
        assert_eq!(
            service.resolve_key(Some("AIzaSyHeaderKey999999999")).as_deref(),
            Some(KEY)
        );
    }

    #[test]
    fn test_history_is_capped_and_context_is_recent() {
        let model = ScriptedModel::new((0..12).map(|i| Ok(format!("reply {i}"))).collect());
        let service = ChatService::new(model.clone(), Some(KEY.to_string()));

        for i in 0..12 {
            tokio_test::block_on(service.chat(chat_request(&format!("question {i}"), "asha"), None)).unwrap();
        }

        let history = service.history("asha");
        assert_eq!(history.messages.len(), HISTORY_LIMIT);
        assert_eq!(history.messages[0].content, "question 2");
        assert_eq!(history.messages[19].content, "reply 11");

        let prompts = model.prompts.lock().unwrap();
        let last = prompts.last().unwrap();
        assert!(last.contains("assistant: reply 10"));
        assert!(!last.contains("question 8"));
        assert!(last.contains("User: question 11"));
    }

    #[test]
    fn test_model_error_falls_back_to_rules() {
        let model = ScriptedModel::new(vec![Err(ProviderError::Decode("quota".to_string()))]);
        let service = ChatService::new(model, Some(KEY.to_string()));

        let reply = tokio_test::block_on(service.chat(chat_request("what is the cost?", "ravi"), None)).unwrap();
        assert!(reply.response.starts_with("Here's a quick budget planning guide"));
        assert_eq!(reply.conversation_id, "ravi");
    }

    #[test]
    fn test_blank_message_rejected_and_anonymous_user_gets_id() {
        let service = ChatService::new(ScriptedModel::new(vec![]), None);
        assert!(tokio_test::block_on(service.chat(chat_request("   ", "x"), None)).is_err());

        let request: ChatRequest = serde_json::from_value(json!({ "message": "hi" })).unwrap();
        let reply = tokio_test::block_on(service.chat(request, None)).unwrap();
        assert!(Uuid::parse_str(&reply.conversation_id).is_ok());
    }

    #[test]
    fn test_budget_estimate_retries_then_falls_back() {
        let model = ScriptedModel::new(vec![Ok("not json".to_string()), Ok("still not".to_string())]);
        let service = ChatService::new(model.clone(), Some(KEY.to_string()));
        let request: BudgetEstimateRequest = serde_json::from_value(json!({ "destination": "Goa" })).unwrap();

        let estimate = tokio_test::block_on(service.budget_estimate(request, None)).unwrap();
        assert_eq!(estimate.assumptions, vec!["Heuristic fallback used due to unparseable AI response"]);
        assert_eq!(model.prompts.lock().unwrap().len(), 2);
        assert!(model.prompts.lock().unwrap()[1].contains("Return ONLY valid minified JSON"));
    }

    #[test]
    fn test_budget_estimate_uses_model_json() {
        let model = ScriptedModel::new(vec![Ok(
            r#"{"currency":"INR","per_day":{"transport":500,"hotel":2500,"food":1000,"activities":800,"other":200},"assumptions":["Off season"]}"#
                .to_string(),
        )]);
        let service = ChatService::new(model, Some(KEY.to_string()));
        let request: BudgetEstimateRequest =
            serde_json::from_value(json!({ "destination": "Goa", "days": 4, "travelers": 1 })).unwrap();

        let estimate = tokio_test::block_on(service.budget_estimate(request, None)).unwrap();
        assert_eq!(estimate.total_trip.categories.hotel, 10000.0);
        assert_eq!(estimate.total_trip.total, 20000.0);
    }

    #[test]
    fn test_budget_estimate_model_path_defaults_missing_days() {
        let answer = r#"{"per_day":{"transport":100,"hotel":1000,"food":300,"activities":100,"other":0}}"#;
        let model = ScriptedModel::new(vec![Ok(answer.to_string()), Ok(answer.to_string())]);
        let service = ChatService::new(model.clone(), Some(KEY.to_string()));

        for body in [json!({ "destination": "Goa" }), json!({ "destination": "Goa", "days": 0 })] {
            let request: BudgetEstimateRequest = serde_json::from_value(body).unwrap();
            let estimate = tokio_test::block_on(service.budget_estimate(request, None)).unwrap();
            // 3 days x 2 travelers
            assert_eq!(estimate.total_trip.categories.hotel, 6000.0);
            assert_eq!(estimate.total_trip.total, 9000.0);
        }
        assert!(model.prompts.lock().unwrap().iter().all(|p| p.contains("Days: 3\nTravelers: 2")));
    }

    #[test]
    fn test_prune_idle() {
        let service = ChatService::new(ScriptedModel::new(vec![]), None);
        tokio_test::block_on(service.chat(chat_request("hello", "old"), None)).unwrap();

        let later = Utc::now().timestamp_millis() + IDLE_TIMEOUT.as_millis() as i64 + 1;
        assert_eq!(service.prune_idle(later, IDLE_TIMEOUT), 1);
        assert!(service.history("old").messages.is_empty());
    }
}
