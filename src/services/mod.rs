pub mod chat;
pub mod fallback;
pub mod ical;
pub mod itinerary_store;
pub mod maps;
pub mod weather;

use std::time::Duration;

use log::warn;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;

pub const USER_AGENT: &str = concat!("TripTrackr/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared outbound client. OpenStreetMap services reject requests without a
/// User-Agent, so one is always sent.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build configured HTTP client ({e}), using defaults");
            reqwest::Client::new()
        })
}

/// Reads a JSON body, turning non-2xx statuses into `ProviderError::Status`
/// (404 becomes `NotFound`).
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let text = response.text().await?;

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound(format!("{provider}: {}", upstream_message(&text))));
    }
    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            message: upstream_message(&text),
        });
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::Decode(format!("{provider}: {e}")))
}

/// Pulls the human-readable message out of an upstream error body.
fn upstream_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error_message"))
                .or_else(|| v.pointer("/error/message"))
                .and_then(|m| m.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.chars().take(200).collect())
}
