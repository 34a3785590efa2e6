use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, NoneAsEmptyString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub user_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    pub messages: Vec<ChatMessage>,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChatStatus {
    pub configured: bool,
    pub model: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsRequest {
    pub destination: Option<String>,
    pub weather: Option<String>,
    pub trip_duration: Option<Value>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub budget: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct Recommendations {
    pub destination: String,
    pub recommendations: String,
    pub generated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherActivitiesRequest {
    pub destination: Option<String>,
    pub weather: Option<String>,
    pub temperature: Option<Value>,
    pub precipitation: Option<Value>,
    pub wind_speed: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct WeatherActivities {
    pub destination: String,
    pub weather: String,
    pub suggestions: String,
    pub generated_at: i64,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct BudgetEstimateRequest {
    pub destination: Option<String>,
    pub days: Option<Value>,
    pub travelers: Option<Value>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub style: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub currency: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub season: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryCosts {
    pub transport: f64,
    pub hotel: f64,
    pub food: f64,
    pub activities: f64,
    pub other: f64,
}

impl CategoryCosts {
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            transport: f(self.transport),
            hotel: f(self.hotel),
            food: f(self.food),
            activities: f(self.activities),
            other: f(self.other),
        }
    }

    pub fn sum(&self) -> f64 {
        self.transport + self.hotel + self.food + self.activities + self.other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TripCosts {
    #[serde(flatten)]
    pub categories: CategoryCosts,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetEstimate {
    pub currency: String,
    pub per_day: CategoryCosts,
    pub total_trip: TripCosts,
    pub assumptions: Vec<String>,
}

/// Renders a loosely typed request value for a prompt line.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
