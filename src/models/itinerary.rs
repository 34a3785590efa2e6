use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DefaultOnNull};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Title must not be empty")]
    EmptyTitle,
    #[error("Please provide at least one destination with a name")]
    NoDestination,
    #[error("Invalid date for {0}")]
    InvalidDate(&'static str),
    #[error("End date must be after start date")]
    EndBeforeStart,
    #[error("Invalid budget: {0}")]
    InvalidBudget(String),
    #[error("Expense amount must be a positive number")]
    InvalidExpense,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation: Option<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Inr,
    Usd,
    Eur,
    Gbp,
    Jpy,
    Cad,
    Aud,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Accommodation,
    Transportation,
    Food,
    Activities,
    Shopping,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetBreakdown {
    pub accommodation: f64,
    pub transportation: f64,
    pub food: f64,
    pub activities: f64,
    pub shopping: f64,
    pub other: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub category: ExpenseCategory,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Null `currency`, `breakdown` or `expenses` fall back to their defaults.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, deserialize_with = "deserialize_non_negative_amount")]
    pub total: f64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub currency: Currency,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub breakdown: BudgetBreakdown,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub total: f64,
    pub spent: f64,
    pub remaining: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetStatus {
    NoBudget,
    OverBudget,
    LowBudget,
    OnTrack,
}

impl Budget {
    /// Lenient construction from a request body: anything but an object is
    /// treated as "no budget".
    pub fn from_value(value: Option<Value>) -> Result<Self, ValidationError> {
        match value {
            Some(value @ Value::Object(_)) => serde_json::from_value(value)
                .map_err(|e| ValidationError::InvalidBudget(e.to_string())),
            _ => Ok(Budget::default()),
        }
    }

    pub fn spent(&self) -> f64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    pub fn summary(&self) -> BudgetSummary {
        if self.total <= 0.0 {
            return BudgetSummary {
                total: 0.0,
                spent: 0.0,
                remaining: 0.0,
                percentage: 0.0,
            };
        }

        let spent = self.spent();
        let percentage = (spent / self.total) * 100.0;

        BudgetSummary {
            total: self.total,
            spent,
            remaining: self.total - spent,
            percentage: (percentage * 100.0).round() / 100.0,
        }
    }

    pub fn status(&self) -> BudgetStatus {
        if self.total <= 0.0 {
            return BudgetStatus::NoBudget;
        }

        let remaining = self.total - self.spent();
        if remaining < 0.0 {
            BudgetStatus::OverBudget
        } else if remaining < self.total * 0.1 {
            BudgetStatus::LowBudget
        } else {
            BudgetStatus::OnTrack
        }
    }

    pub fn add_expense(&mut self, input: ExpenseInput, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if !input.amount.is_finite() || input.amount <= 0.0 {
            return Err(ValidationError::InvalidExpense);
        }

        self.expenses.push(Expense {
            category: input.category,
            amount: input.amount,
            description: input.description,
            date: now,
            location: input.location,
        });
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ExpenseInput {
    pub category: ExpenseCategory,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItineraryStatus {
    #[default]
    Planning,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastNote {
    pub destination: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripWeather {
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub forecasts: Vec<ForecastNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRecommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: ItineraryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<TripWeather>,
    #[serde(default)]
    pub ai_recommendations: Vec<AiRecommendation>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Itinerary {
    /// Whole days covered by the trip, rounded up.
    pub fn duration_days(&self) -> i64 {
        let millis = (self.end_date - self.start_date).num_milliseconds().abs();
        (millis as f64 / 86_400_000.0).ceil() as i64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.end_date <= self.start_date {
            return Err(ValidationError::EndBeforeStart);
        }
        if !self.destinations.iter().any(|d| !d.name.trim().is_empty()) {
            return Err(ValidationError::NoDestination);
        }
        Ok(())
    }

    /// Merges a partial update and re-checks every invariant. The receiver is
    /// left untouched when the merged record is invalid.
    pub fn apply(&mut self, patch: ItineraryPatch, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let mut next = self.clone();

        if let Some(title) = patch.title {
            next.title = title.trim().to_string();
        }
        if let Some(start) = patch.start_date {
            next.start_date = parse_date(&start).ok_or(ValidationError::InvalidDate("startDate"))?;
        }
        if let Some(end) = patch.end_date {
            next.end_date = parse_date(&end).ok_or(ValidationError::InvalidDate("endDate"))?;
        }
        if let Some(destinations) = patch.destinations {
            next.destinations = normalize_destinations(destinations)?;
        }
        if let Some(budget) = patch.budget {
            next.budget = Budget::from_value(Some(budget))?;
        }
        if let Some(notes) = patch.notes {
            next.notes = notes.trim().to_string();
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(weather) = patch.weather {
            next.weather = Some(weather);
        }
        if let Some(recommendations) = patch.ai_recommendations {
            next.ai_recommendations = recommendations;
        }
        if let Some(tags) = patch.tags {
            next.tags = tags;
        }
        if let Some(is_public) = patch.is_public {
            next.is_public = is_public;
        }

        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

/// Itinerary as returned to clients, with its derived fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryView<'a> {
    #[serde(flatten)]
    pub itinerary: &'a Itinerary,
    pub duration: i64,
    pub budget_status: BudgetStatus,
}

impl<'a> From<&'a Itinerary> for ItineraryView<'a> {
    fn from(itinerary: &'a Itinerary) -> Self {
        Self {
            itinerary,
            duration: itinerary.duration_days(),
            budget_status: itinerary.budget.status(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryInput {
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub destinations: Option<Vec<Value>>,
    pub budget: Option<Value>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl ItineraryInput {
    pub fn into_itinerary(self, now: DateTime<Utc>) -> Result<Itinerary, ValidationError> {
        let (title, start, end, destinations) =
            match (self.title, self.start_date, self.end_date, self.destinations) {
                (Some(t), Some(s), Some(e), Some(d)) if !t.trim().is_empty() => (t, s, e, d),
                _ => return Err(ValidationError::MissingFields),
            };

        let itinerary = Itinerary {
            id: None,
            title: title.trim().to_string(),
            start_date: parse_date(&start).ok_or(ValidationError::InvalidDate("startDate"))?,
            end_date: parse_date(&end).ok_or(ValidationError::InvalidDate("endDate"))?,
            destinations: normalize_destinations(destinations)?,
            budget: Budget::from_value(self.budget)?,
            notes: self.notes.map(|n| n.trim().to_string()).unwrap_or_default(),
            status: ItineraryStatus::Planning,
            weather: None,
            ai_recommendations: Vec::new(),
            tags: self.tags,
            is_public: self.is_public,
            created_at: now,
            updated_at: now,
        };

        itinerary.validate()?;
        Ok(itinerary)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryPatch {
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub destinations: Option<Vec<Value>>,
    pub budget: Option<Value>,
    pub notes: Option<String>,
    pub status: Option<ItineraryStatus>,
    pub weather: Option<TripWeather>,
    pub ai_recommendations: Option<Vec<AiRecommendation>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DestinationInput {
    name: Option<String>,
    coordinates: Option<Value>,
    arrival_date: Option<String>,
    departure_date: Option<String>,
    accommodation: Option<String>,
    activities: Option<Vec<String>>,
    notes: Option<String>,
}

/// Keeps object entries with a non-empty name. Coordinates survive only when
/// both `lat` and `lng` are finite numbers.
pub fn normalize_destinations(values: Vec<Value>) -> Result<Vec<Destination>, ValidationError> {
    let mut destinations = Vec::new();

    for value in values.into_iter().filter(Value::is_object) {
        let input: DestinationInput = match serde_json::from_value(value) {
            Ok(input) => input,
            Err(_) => continue,
        };

        let name = input.name.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            continue;
        }

        let coordinates = input.coordinates.and_then(|c| {
            let lat = c.get("lat").and_then(Value::as_f64)?;
            let lng = c.get("lng").and_then(Value::as_f64)?;
            (lat.is_finite() && lng.is_finite()).then_some(Coordinates { lat, lng })
        });

        let arrival_date = match input.arrival_date {
            Some(s) => Some(parse_date(&s).ok_or(ValidationError::InvalidDate("arrivalDate"))?),
            None => None,
        };
        let departure_date = match input.departure_date {
            Some(s) => Some(parse_date(&s).ok_or(ValidationError::InvalidDate("departureDate"))?),
            None => None,
        };

        destinations.push(Destination {
            name,
            coordinates,
            arrival_date,
            departure_date,
            accommodation: input.accommodation.filter(|a| !a.is_empty()),
            activities: input.activities.unwrap_or_default(),
            notes: input.notes.filter(|n| !n.is_empty()),
        });
    }

    if destinations.is_empty() {
        return Err(ValidationError::NoDestination);
    }
    Ok(destinations)
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` or a plain
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
    {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Numbers pass through, numeric strings are parsed, anything else is 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

fn deserialize_non_negative_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value).max(0.0))
}
