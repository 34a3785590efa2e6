use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::chat::{BudgetEstimate, CategoryCosts, TripCosts};
use crate::models::itinerary::coerce_amount;

pub const DEFAULT_DAYS: f64 = 3.0;
pub const DEFAULT_TRAVELERS: f64 = 2.0;
pub const DEFAULT_STYLE: &str = "mid-range";
pub const DEFAULT_CURRENCY: &str = "INR";
const MAX_ASSUMPTIONS: usize = 10;

/// City price levels relative to a mid-sized Indian city.
const CITY_PATTERNS: &[(&str, f64)] = &[
    (r"mumbai|bombay", 1.35),
    (r"goa", 1.20),
    (r"delhi", 1.05),
    (r"bengaluru|bangalore", 1.15),
    (r"hyderabad", 1.00),
    (r"chennai", 1.05),
    (r"kolkata|calcutta", 0.95),
    (r"jaipur", 0.90),
    (r"manali|shimla|leh|ladakh", 1.10),
    (r"agra|varanasi|mathura", 0.95),
    (r"singapore", 2.50),
    (r"dubai|uae", 2.00),
];

static CITY_FACTORS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    CITY_PATTERNS
        .iter()
        .filter_map(|(pattern, factor)| Regex::new(pattern).ok().map(|re| (re, *factor)))
        .collect()
});
static PEAK_SEASON: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"peak|dec|jan|new\s*year").ok());
static MONSOON: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"monsoon|rain").ok());

/// Why the heuristic answered instead of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicReason {
    NoApiKey,
    Unparseable,
    ModelError,
}

/// Normalized budget request with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TripProfile {
    pub destination: String,
    pub days: f64,
    pub travelers: f64,
    pub style: String,
    pub currency: String,
    pub season: Option<String>,
}

impl TripProfile {
    pub fn new(
        destination: String,
        days: Option<&Value>,
        travelers: Option<&Value>,
        style: Option<String>,
        currency: Option<String>,
        season: Option<String>,
    ) -> Self {
        Self {
            destination,
            days: count(days, DEFAULT_DAYS),
            travelers: count(travelers, DEFAULT_TRAVELERS),
            style: style.unwrap_or_else(|| DEFAULT_STYLE.to_string()),
            currency: currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            season,
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        "You are TripTrackr's budget planner. Produce realistic, destination-aware trip cost estimates.\n\
Return STRICT JSON ONLY (no prose, no code fences), matching this TypeScript type:\n\
type Budget = {\n  currency: string;\n  per_day: { transport: number; hotel: number; food: number; activities: number; other: number; };\n  total_trip: { transport: number; hotel: number; food: number; activities: number; other: number; total: number; };\n  assumptions: string[];\n};"
    }

    pub fn prompt(&self, strict: bool) -> String {
        let season = self
            .season
            .as_deref()
            .map(|s| format!("Season: {s}\n"))
            .unwrap_or_default();
        let mut prompt = format!(
            "{}\n\nDestination: {}\nDays: {}\nTravelers: {}\nStyle: {} (budget | mid-range | luxury)\nCurrency: {}\n{season}\n\
Estimate realistic per-person PER-DAY costs (per_day) and total TRIP costs (total_trip) for ALL travelers.\n\
Rules:\n- All numbers MUST be numeric (no strings), currency = {}\n- per_day are per-person per-day averages\n\
- total_trip amounts MUST equal per_day * Days * Travelers (rounded to nearest integer)\n\
- Provide 3-8 short assumptions capturing major drivers (season, city price level, style)",
            self.system_prompt(),
            self.destination,
            self.days,
            self.travelers,
            self.style,
            self.currency,
            self.currency,
        );
        if strict {
            prompt.push_str("\n\nReturn ONLY valid minified JSON. Do not include any prose or code fences.");
        }
        prompt
    }
}

/// Positive count from a loosely typed value; zero, garbage and missing
/// values take the default, and the result is never below 1.
pub fn count(value: Option<&Value>, default: f64) -> f64 {
    let parsed = value.map(coerce_amount).unwrap_or(0.0);
    let chosen = if parsed == 0.0 { default } else { parsed };
    chosen.max(1.0)
}

pub fn style_base(style: &str) -> CategoryCosts {
    let style = style.to_lowercase();
    let (transport, hotel, food, activities, other) = if style.contains("lux") {
        (1200.0, 6000.0, 2000.0, 2000.0, 800.0)
    } else if style.contains("budget") {
        (400.0, 1500.0, 800.0, 600.0, 300.0)
    } else {
        (700.0, 3000.0, 1200.0, 1000.0, 500.0)
    };
    CategoryCosts {
        transport,
        hotel,
        food,
        activities,
        other,
    }
}

pub fn city_factor(destination: &str) -> f64 {
    let destination = destination.to_lowercase();
    CITY_FACTORS
        .iter()
        .find(|(re, _)| re.is_match(&destination))
        .map(|(_, factor)| *factor)
        .unwrap_or(1.0)
}

pub fn season_factor(season: Option<&str>) -> f64 {
    let season = season.unwrap_or_default().to_lowercase();
    let matches = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(&season));

    if matches(&*PEAK_SEASON) {
        1.15
    } else if matches(&*MONSOON) {
        0.95
    } else {
        1.0
    }
}

/// `per_day × days × travelers` per category, each rounded, plus the sum.
pub fn trip_totals(per_day: &CategoryCosts, days: f64, travelers: f64) -> TripCosts {
    let categories = per_day.map(|v| (v * days * travelers).round());
    TripCosts {
        total: categories.sum(),
        categories,
    }
}

pub fn heuristic(profile: &TripProfile, reason: HeuristicReason) -> BudgetEstimate {
    let factor = city_factor(&profile.destination) * season_factor(profile.season.as_deref());
    let per_day = style_base(&profile.style).map(|v| (v * factor).round());

    let assumptions = match reason {
        HeuristicReason::NoApiKey => vec![
            "Destination-aware heuristic used because AI key is not configured".to_string(),
            format!("Destination: {}", profile.destination),
            format!("Style: {}", profile.style),
            match &profile.season {
                Some(season) => format!("Season considered: {season}"),
                None => "Season not specified".to_string(),
            },
        ],
        HeuristicReason::Unparseable => vec!["Heuristic fallback used due to unparseable AI response".to_string()],
        HeuristicReason::ModelError => vec!["Destination-aware fallback estimate used due to AI error".to_string()],
    };

    BudgetEstimate {
        currency: profile.currency.clone(),
        total_trip: trip_totals(&per_day, profile.days, profile.travelers),
        per_day,
        assumptions,
    }
}

/// Builds the estimate from model JSON. Only `per_day` is trusted; totals are
/// recomputed.
pub fn from_model(parsed: &Value, profile: &TripProfile) -> BudgetEstimate {
    let field = |name: &str| parsed.pointer(&format!("/per_day/{name}")).map(coerce_amount).unwrap_or(0.0);
    let per_day = CategoryCosts {
        transport: field("transport"),
        hotel: field("hotel"),
        food: field("food"),
        activities: field("activities"),
        other: field("other"),
    };

    let currency = parsed
        .get("currency")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(profile.currency.as_str())
        .to_string();

    let assumptions = parsed
        .get("assumptions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(MAX_ASSUMPTIONS)
                .map(crate::models::chat::value_text)
                .collect()
        })
        .unwrap_or_default();

    BudgetEstimate {
        currency,
        total_trip: trip_totals(&per_day, profile.days, profile.travelers),
        per_day,
        assumptions,
    }
}

/// Pulls a JSON object out of model output that may be wrapped in prose or
/// a code fence.
pub fn extract_json(text: &str) -> Option<Value> {
    let as_object = |candidate: &str| {
        serde_json::from_str::<Value>(candidate.trim())
            .ok()
            .filter(Value::is_object)
    };

    if let Some(value) = as_object(text) {
        return Some(value);
    }

    let fenced = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").ok()?;
    if let Some(value) = fenced
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| as_object(m.as_str()))
    {
        return Some(value);
    }

    let braces = Regex::new(r"(?s)\{.*\}").ok()?;
    braces.find(text).and_then(|m| as_object(m.as_str()))
}
