use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::itinerary::Itinerary;

const PRODUCT_ID: &str = "-//TripTrackr//Itinerary Export//EN";
const UID_DOMAIN: &str = "triptrackr";
const MAX_LINE_OCTETS: usize = 75;

/// Renders an itinerary as an iCalendar (RFC 5545) document: one all-day
/// event spanning the trip plus one per destination with an arrival date.
pub fn render(itinerary: &Itinerary, now: DateTime<Utc>) -> String {
    let id = itinerary.id.as_deref().unwrap_or("draft");
    let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODUCT_ID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{}", escape(&itinerary.title)),
    ];

    let stops = itinerary
        .destinations
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut description = format!("Destinations: {stops}");
    if !itinerary.notes.is_empty() {
        description.push_str(&format!("\n{}", itinerary.notes));
    }

    lines.extend(event(
        format!("{id}@{UID_DOMAIN}"),
        &stamp,
        itinerary.start_date.date_naive(),
        itinerary.end_date.date_naive(),
        &itinerary.title,
        Some(&description),
        None,
    ));

    for (index, destination) in itinerary.destinations.iter().enumerate() {
        let arrival = match destination.arrival_date {
            Some(arrival) => arrival.date_naive(),
            None => continue,
        };
        let departure = destination
            .departure_date
            .map(|d| d.date_naive())
            .unwrap_or(arrival);

        let mut details = Vec::new();
        if let Some(accommodation) = &destination.accommodation {
            details.push(format!("Stay: {accommodation}"));
        }
        if !destination.activities.is_empty() {
            details.push(format!("Activities: {}", destination.activities.join(", ")));
        }
        if let Some(notes) = &destination.notes {
            details.push(notes.clone());
        }
        let description = (!details.is_empty()).then(|| details.join("\n"));

        lines.extend(event(
            format!("{id}-{}@{UID_DOMAIN}", index + 1),
            &stamp,
            arrival,
            departure,
            &destination.name,
            description.as_deref(),
            Some(&destination.name),
        ));
    }

    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in lines {
        out.push_str(&fold(&line));
        out.push_str("\r\n");
    }
    out
}

/// All-day events take an exclusive end date, so the last day is included
/// by ending the day after it.
fn event(
    uid: String,
    stamp: &str,
    first_day: NaiveDate,
    last_day: NaiveDate,
    summary: &str,
    description: Option<&str>,
    location: Option<&str>,
) -> Vec<String> {
    let last_day = last_day.max(first_day);
    let end = last_day + Duration::days(1);

    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{stamp}"),
        format!("DTSTART;VALUE=DATE:{}", first_day.format("%Y%m%d")),
        format!("DTEND;VALUE=DATE:{}", end.format("%Y%m%d")),
        format!("SUMMARY:{}", escape(summary)),
    ];
    if let Some(description) = description {
        lines.push(format!("DESCRIPTION:{}", escape(description)));
    }
    if let Some(location) = location {
        lines.push(format!("LOCATION:{}", escape(location)));
    }
    lines.push("END:VEVENT".to_string());
    lines
}

/// TEXT value escaping (RFC 5545 §3.3.11).
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Splits content lines longer than 75 octets, never inside a UTF-8
/// sequence. Continuation lines start with a single space, which counts
/// toward their length.
fn fold(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out
}
