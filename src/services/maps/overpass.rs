use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::models::itinerary::Coordinates;
use crate::models::place::{Lodging, Place};
use crate::services::fallback::Provider;
use crate::services::maps::PlacesProvider;
use crate::services::read_json;

pub const NAME: &str = "Overpass";
pub const INTERPRETER_URL: &str = "https://overpass-api.de/api/interpreter";

const LODGING_TOURISM: &str = "hotel|guest_house|motel|hostel|apartment|chalet|resort|alpine_hut|camp_site|caravan_site";

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl Element {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Nodes carry their own position; ways and relations the `out center`
    /// point.
    fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lng), _) => Some(Coordinates { lat, lng }),
            (_, _, Some(center)) => Some(Coordinates {
                lat: center.lat,
                lng: center.lon,
            }),
            _ => None,
        }
    }

    fn name(&self, fallback: &str) -> String {
        self.tag("name")
            .or_else(|| self.tag("name:en"))
            .unwrap_or(fallback)
            .to_string()
    }

    fn address(&self, parts: &[&str]) -> Option<String> {
        let joined = parts
            .iter()
            .filter_map(|key| self.tag(key))
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            self.tag("addr:full").map(str::to_string)
        } else {
            Some(joined)
        }
    }

    fn feature_types(&self) -> Vec<String> {
        ["tourism", "historic", "natural", "leisure", "amenity"]
            .iter()
            .filter_map(|key| self.tag(key))
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

pub struct Overpass {
    http: reqwest::Client,
    url: String,
}

impl Overpass {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            url: INTERPRETER_URL.to_string(),
        }
    }

    async fn run(&self, query: String) -> Result<Vec<Element>, ProviderError> {
        let response = self.http.post(&self.url).form(&[("data", query)]).send().await?;
        let parsed: OverpassResponse = read_json(NAME, response).await?;
        Ok(parsed.elements)
    }
}

impl Provider for Overpass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_open_data(&self) -> bool {
        true
    }
}

#[async_trait]
impl PlacesProvider for Overpass {
    async fn nearby(
        &self,
        center: Coordinates,
        radius: f64,
        _types: &[String],
        _language: &str,
    ) -> Result<Vec<Place>, ProviderError> {
        let elements = self.run(attractions_query(center, radius)).await?;
        Ok(elements
            .iter()
            .map(|el| {
                Place::bare(
                    format!("osm-{}-{}", el.kind, el.id),
                    el.name("Attraction"),
                    Some(el.address(&["addr:housenumber", "addr:street", "addr:city"]).unwrap_or_default()),
                    el.coordinates(),
                    el.feature_types(),
                )
            })
            .collect())
    }

    async fn lodging(
        &self,
        center: Option<Coordinates>,
        _area: Option<&str>,
        radius: f64,
        _language: &str,
    ) -> Result<Vec<Lodging>, ProviderError> {
        let center = center.ok_or(ProviderError::Unsupported(NAME))?;
        let elements = self.run(lodging_query(center, radius)).await?;
        Ok(elements
            .iter()
            .map(|el| {
                let address = el
                    .address(&["addr:housenumber", "addr:street", "addr:city", "addr:postcode", "addr:state"])
                    .unwrap_or_else(|| "Address not available".to_string());
                Lodging::from(Place::bare(
                    format!("lodging-{}-{}", el.kind, el.id),
                    el.name("Hotel"),
                    Some(address),
                    el.coordinates(),
                    el.feature_types(),
                ))
            })
            .collect())
    }
}

fn around(radius: f64, center: Coordinates) -> String {
    format!("(around:{},{},{})", radius.round(), center.lat, center.lng)
}

pub fn attractions_query(center: Coordinates, radius: f64) -> String {
    let a = around(radius, center);
    let selectors = [
        format!(r#"node["tourism"~"attraction|museum|gallery|viewpoint"]{a};"#),
        format!(r#"way["tourism"~"attraction|museum|gallery|viewpoint"]{a};"#),
        format!(r#"node["leisure"~"park|garden"]{a};"#),
        format!(r#"way["leisure"~"park|garden"]{a};"#),
        format!(r#"node["historic"]{a};"#),
        format!(r#"way["historic"]{a};"#),
        format!(r#"node["natural"~"peak|volcano|waterfall"]{a};"#),
        format!(r#"node["amenity"~"restaurant|cafe|fast_food|bar|pub|food_court"]{a};"#),
        format!(r#"way["amenity"~"restaurant|cafe|fast_food|bar|pub|food_court"]{a};"#),
        format!(r#"node["tourism"~"hotel|guest_house|motel"]{a};"#),
        format!(r#"way["tourism"~"hotel|guest_house|motel"]{a};"#),
        format!(r#"node["amenity"="place_of_worship"]{a};"#),
    ];
    format!("[out:json][timeout:25];({});out center 60;", selectors.concat())
}

pub fn lodging_query(center: Coordinates, radius: f64) -> String {
    let a = around(radius, center);
    let selectors: String = ["node", "way", "relation"]
        .iter()
        .map(|kind| format!(r#"{kind}["tourism"~"{LODGING_TOURISM}"]{a};"#))
        .collect();
    format!("[out:json][timeout:25];({selectors});out center 40;")
}
