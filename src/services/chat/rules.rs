use std::sync::LazyLock;

use regex::Regex;

const BUDGET_GUIDE: &str = "Here's a quick budget planning guide:\n\
- Budget: ₹1.5k-₹3k per person/day (local transport, hostels, simple meals)\n\
- Mid-range: ₹3k-₹6k per person/day (cabs/metros, 3★ hotels, restaurants)\n\
- Luxury: ₹6k-₹12k+ per person/day (private transport, 4-5★, fine dining)\n\
Tip: Book stays near transit hubs, eat where locals queue, and pre-book popular sights to avoid surge pricing.";

const WEATHER_GUIDE: &str = "For weather-aware planning: check the Weather page for current and 5-day trends.\n\
General rules: <10°C pack warm layers; >25°C carry sunscreen and hydrate; rain >70% pack a raincoat; strong winds avoid high viewpoints.";

const HOTEL_TIP: &str = "Use the Maps page search for \"hotels near <area>\" and sort by rating and recent reviews.";
const ITINERARY_TIP: &str = "Balance days: 1) landmark highlights, 2) local neighborhoods/food walk, 3) nature or day-trip. Keep 20% buffer time.";
const VISA_TIP: &str = "Always verify visa/entry rules on the official government site for your nationality before booking.";
const GENERIC_PROMPT: &str = "Tell me your destination, dates, budget style, and interests. I'll suggest an itinerary, packing list, and must-try food.";

type Keywords = LazyLock<Option<Regex>>;

fn mentions(keywords: &Option<Regex>, text: &str) -> bool {
    keywords.as_ref().is_some_and(|re| re.is_match(text))
}

static BUDGET: Keywords = LazyLock::new(|| Regex::new("budget|cost|price|expense").ok());
// Word boundaries keep "hotel" from reading as "hot".
static WEATHER: Keywords =
    LazyLock::new(|| Regex::new(r"\b(weather|rain|rainy|temperature|forecast|hot|cold|wind|windy)\b").ok());
static HOTEL: Keywords = LazyLock::new(|| Regex::new("hotel|stay|accommodation").ok());
static ITINERARY: Keywords = LazyLock::new(|| Regex::new("itinerary|plan|things to do|what to do|activities").ok());
static VISA: Keywords = LazyLock::new(|| Regex::new("visa|entry|passport|document").ok());

/// Keyword-driven answer used whenever the AI model is unavailable.
///
/// Budget and weather questions get a full guide on their own; the remaining
/// topics contribute one tip each.
pub fn rule_based_reply(message: &str) -> String {
    let text = message.to_lowercase();

    if mentions(&BUDGET, &text) {
        return BUDGET_GUIDE.to_string();
    }
    if mentions(&WEATHER, &text) {
        return WEATHER_GUIDE.to_string();
    }

    let mut tips = Vec::new();
    if mentions(&HOTEL, &text) {
        tips.push(HOTEL_TIP);
    }
    if mentions(&ITINERARY, &text) {
        tips.push(ITINERARY_TIP);
    }
    if mentions(&VISA, &text) {
        tips.push(VISA_TIP);
    }
    if tips.is_empty() {
        tips.push(GENERIC_PROMPT);
    }
    tips.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_wins_over_other_topics() {
        assert_eq!(rule_based_reply("Hotel COST in Goa and weather?"), BUDGET_GUIDE);
    }

    #[test]
    fn test_weather_guide() {
        assert_eq!(rule_based_reply("Will it rain in Munnar?"), WEATHER_GUIDE);
        assert_ne!(rule_based_reply("Any hotel near the beach?"), WEATHER_GUIDE);
    }

    #[test]
    fn test_tips_are_combined() {
        let reply = rule_based_reply("Need a hotel and an itinerary, plus passport advice");
        assert_eq!(reply, format!("{HOTEL_TIP}\n{ITINERARY_TIP}\n{VISA_TIP}"));
    }

    #[test]
    fn test_keyword_patterns_compile() {
        for keywords in [&BUDGET, &WEATHER, &HOTEL, &ITINERARY, &VISA] {
            assert!(keywords.is_some());
        }
    }

    #[test]
    fn test_generic_prompt() {
        assert_eq!(rule_based_reply("hello there"), GENERIC_PROMPT);
    }
}
