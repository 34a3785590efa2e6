use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::error::ProviderError;
use crate::models::itinerary::Coordinates;
use crate::models::place::{GeocodedAddress, Lodging, Place, PlaceDetails, PlaceSearch, PlaceSearchParams};
use crate::services::fallback::Provider;
use crate::services::maps::PlacesProvider;
use crate::services::read_json;

pub const NAME: &str = "Nominatim";
pub const BASE_URL: &str = "https://nominatim.openstreetmap.org";

const BOUNDED_LIMIT: usize = 25;
const ATTRACTION_QUERIES: &[&str] = &[
    "tourist attraction",
    "park",
    "museum",
    "zoo",
    "aquarium",
    "viewpoint",
    "garden",
    "historic",
    "restaurant",
    "hotel",
];
const LODGING_QUERIES: &[&str] = &["hotel", "guest house", "resort", "hostel", "lodging", "motel", "homestay"];

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
struct Item {
    osm_type: Option<String>,
    osm_id: Option<u64>,
    #[serde(default)]
    display_name: String,
    name: Option<String>,
    #[serde_as(as = "DisplayFromStr")]
    lat: f64,
    #[serde_as(as = "DisplayFromStr")]
    lon: f64,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(alias = "category")]
    class: Option<String>,
    importance: Option<f64>,
}

impl Item {
    fn osm_key(&self) -> String {
        format!(
            "{}-{}",
            self.osm_type.as_deref().unwrap_or("unknown"),
            self.osm_id.unwrap_or_default()
        )
    }

    fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lon,
        }
    }

    fn types(&self) -> Vec<String> {
        [self.kind.clone(), self.class.clone()].into_iter().flatten().collect()
    }

    /// First segment of the display name, which is the feature's own name.
    fn short_name(&self, fallback: &str) -> String {
        self.display_name
            .split(',')
            .next()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn into_place(self, fallback_name: &str) -> Place {
        Place::bare(
            format!("osm-{}", self.osm_key()),
            self.short_name(fallback_name),
            Some(self.display_name.clone()),
            Some(self.coordinates()),
            self.types(),
        )
    }
}

pub struct Nominatim {
    http: reqwest::Client,
    base_url: String,
}

impl Nominatim {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
        }
    }

    async fn get_items(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<Item>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .query(&[("format", "jsonv2")])
            .query(params)
            .send()
            .await?;
        read_json(NAME, response).await
    }

    /// Runs each query bounded to the viewbox, de-duplicating by OSM id and
    /// stopping once enough results are collected.
    async fn bounded_search(&self, center: Coordinates, radius: f64, queries: &[&str], per_query: usize) -> Result<Vec<Item>, ProviderError> {
        let viewbox = viewbox(center, radius);
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for query in queries {
            let params = [
                ("q", query.to_string()),
                ("viewbox", viewbox.clone()),
                ("bounded", "1".to_string()),
                ("limit", per_query.to_string()),
            ];
            for item in self.get_items("search", &params).await? {
                if seen.insert(item.osm_key()) {
                    items.push(item);
                }
            }
            if items.len() >= BOUNDED_LIMIT {
                break;
            }
        }
        Ok(items)
    }
}

impl Provider for Nominatim {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_open_data(&self) -> bool {
        true
    }
}

#[async_trait]
impl PlacesProvider for Nominatim {
    async fn geocode(&self, address: &str, _language: &str) -> Result<GeocodedAddress, ProviderError> {
        let params = [("q", address.to_string()), ("limit", "5".to_string())];
        let items = self.get_items("search", &params).await?;

        let best = most_important(items)
            .ok_or_else(|| ProviderError::NotFound(format!("{NAME}: no match for {address}")))?;

        Ok(GeocodedAddress {
            address: best.display_name.clone(),
            coordinates: best.coordinates(),
            location_type: None,
            viewport: None,
            bounds: None,
            place_id: format!("osm-{}", best.osm_key()),
            types: best.types(),
            components: Vec::new(),
        })
    }

    async fn search(&self, query: &str, _params: &PlaceSearchParams) -> Result<PlaceSearch, ProviderError> {
        let params = [
            ("q", query.to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", "15".to_string()),
        ];
        let results: Vec<Place> = self
            .get_items("search", &params)
            .await?
            .into_iter()
            .map(|item| item.into_place("Place"))
            .collect();

        Ok(PlaceSearch {
            query: query.to_string(),
            total_results: results.len(),
            results,
            status: "OSM".to_string(),
            next_page_token: None,
        })
    }

    async fn details(&self, place_id: &str, _language: &str) -> Result<PlaceDetails, ProviderError> {
        let osm_id = lookup_id(place_id)
            .ok_or_else(|| ProviderError::NotFound(format!("{NAME}: {place_id} is not an OpenStreetMap id")))?;

        let params = [("osm_ids", osm_id), ("addressdetails", "1".to_string())];
        let item = self
            .get_items("lookup", &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("{NAME}: {place_id} not found")))?;

        let mut place = item.into_place("Place");
        place.place_id = place_id.to_string();

        Ok(PlaceDetails {
            place,
            website: None,
            phone: None,
            reviews: Vec::new(),
        })
    }

    async fn nearby(
        &self,
        center: Coordinates,
        radius: f64,
        _types: &[String],
        _language: &str,
    ) -> Result<Vec<Place>, ProviderError> {
        let items = self.bounded_search(center, radius, ATTRACTION_QUERIES, 20).await?;
        Ok(items.into_iter().map(|item| item.into_place("Attraction")).collect())
    }

    async fn lodging(
        &self,
        center: Option<Coordinates>,
        _area: Option<&str>,
        radius: f64,
        _language: &str,
    ) -> Result<Vec<Lodging>, ProviderError> {
        let center = center.ok_or(ProviderError::Unsupported(NAME))?;
        let items = self.bounded_search(center, radius, LODGING_QUERIES, BOUNDED_LIMIT).await?;
        Ok(items
            .into_iter()
            .map(|item| Lodging::from(item.into_place("Hotel")))
            .collect())
    }
}

fn most_important(items: Vec<Item>) -> Option<Item> {
    items.into_iter().reduce(|best, item| {
        if item.importance.unwrap_or(0.0) > best.importance.unwrap_or(0.0) {
            item
        } else {
            best
        }
    })
}

/// Extracts a lookup id (`N123`, `W45`, `R6`) from ids like
/// `osm-node-123` or `lodging-way-45`.
pub fn lookup_id(place_id: &str) -> Option<String> {
    let re = Regex::new(r"(?i)(?:^|[-_])(node|way|relation)-(\d+)").ok()?;
    let captures = re.captures(place_id)?;
    let kind = captures.get(1)?.as_str().chars().next()?.to_ascii_uppercase();
    Some(format!("{kind}{}", captures.get(2)?.as_str()))
}

/// `left,top,right,bottom` box around `center`, about `radius` meters each way.
pub fn viewbox(center: Coordinates, radius: f64) -> String {
    let km = radius / 1000.0;
    let delta_lat = km / 111.0;
    let lng_scale = 111.0 * center.lat.to_radians().cos();
    let delta_lng = if lng_scale.abs() > f64::EPSILON { km / lng_scale } else { km };

    format!(
        "{:.6},{:.6},{:.6},{:.6}",
        center.lng - delta_lng,
        center.lat + delta_lat,
        center.lng + delta_lng,
        center.lat - delta_lat
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_id_formats() {
        assert_eq!(lookup_id("osm-node-123").as_deref(), Some("N123"));
        assert_eq!(lookup_id("lodging-way-45").as_deref(), Some("W45"));
        assert_eq!(lookup_id("Relation-6").as_deref(), Some("R6"));
        assert_eq!(lookup_id("ChIJN1t_tDeuEmsRUsoyG83frY4"), None);
    }

    #[test]
    fn test_viewbox_at_equator() {
        let center = Coordinates { lat: 0.0, lng: 10.0 };
        assert_eq!(viewbox(center, 111_000.0), "9.000000,1.000000,11.000000,-1.000000");
    }

    #[test]
    fn test_item_parsing_and_naming() {
        let items: Vec<Item> = serde_json::from_value(json!([
            {
                "osm_type": "way", "osm_id": 42, "display_name": "Lalbagh, Bengaluru, India",
                "lat": "12.95", "lon": "77.58", "type": "park", "category": "leisure", "importance": 0.4
            },
            {
                "osm_type": "relation", "osm_id": 7, "display_name": "Bengaluru, Karnataka, India",
                "lat": "12.97", "lon": "77.59", "type": "city", "category": "place", "importance": 0.8
            }
        ]))
        .unwrap();

        let place = items[0].clone().into_place("Place");
        assert_eq!(place.place_id, "osm-way-42");
        assert_eq!(place.name, "Lalbagh");
        assert_eq!(place.types, vec!["park", "leisure"]);

        let best = most_important(items).unwrap();
        assert_eq!(best.osm_key(), "relation-7");
    }
}
