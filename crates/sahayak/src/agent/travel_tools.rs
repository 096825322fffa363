//! Travel lookup tools: geocoding, weather, places and advisories.
//!
//! Every tool is one HTTP GET against a public provider plus a pure
//! `summarize_*` reshape of the provider's JSON into a compact payload the
//! model can read. Provider-level problems (no results, unconfigured key)
//! come back as `{"error": …}` values; transport failures bubble as `Err`
//! and the registry converts them to the same shape.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::tools::{AssistantTool, ToolRegistry};

/// Nominatim rejects requests without an identifying User-Agent.
const USER_AGENT: &str = "sahayak-travel/0.1";

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const PLACES_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
const WIKIPEDIA_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Hourly forecast entries kept in a weather summary.
const FORECAST_HOURS: usize = 5;
/// Place results kept in a hotel/restaurant summary.
const MAX_PLACES: usize = 5;
/// Search hits kept in an advisory summary.
const MAX_ADVISORIES: usize = 3;

/// HTTP client shared by the lookup tools.
pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

/// Build the standard registry: geocoding, weather, hotels, restaurants and
/// advisories. `google_api_key` gates the two Places-backed tools at call
/// time, not registration time, so the model always sees their schemas.
pub fn default_registry(client: Client, google_api_key: Option<String>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(GeocodeTool::new(client.clone())));
    registry.register(Arc::new(WeatherTool::new(client.clone())));
    registry.register(Arc::new(HotelSearchTool::new(
        client.clone(),
        google_api_key.clone(),
    )));
    registry.register(Arc::new(RestaurantSearchTool::new(
        client.clone(),
        google_api_key,
    )));
    registry.register(Arc::new(AdvisoryTool::new(client)));
    registry
}

/// Accept numbers that arrive either as JSON numbers or numeric strings;
/// models are not consistent about which they emit.
fn value_as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .ok_or_else(|| anyhow!("Missing '{}' parameter", key))
}

// ── Geocoding ────────────────────────────────────────────────────

pub struct GeocodeTool {
    client: Client,
}

impl GeocodeTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Reshape a Nominatim result array into {latitude, longitude, display_name}.
/// Nominatim serializes coordinates as strings.
fn summarize_geocode(location: &str, body: &Value) -> Value {
    let first = match body.as_array().and_then(|a| a.first()) {
        Some(hit) => hit,
        None => return json!({ "error": format!("No location found for '{}'", location) }),
    };

    match (value_as_f64(&first["lat"]), value_as_f64(&first["lon"])) {
        (Some(lat), Some(lon)) => json!({
            "latitude": lat,
            "longitude": lon,
            "display_name": first["display_name"].as_str().unwrap_or(location),
        }),
        _ => json!({ "error": format!("Malformed geocoding result for '{}'", location) }),
    }
}

#[async_trait]
impl AssistantTool for GeocodeTool {
    fn name(&self) -> &str {
        "get_location_coordinates"
    }

    fn description(&self) -> &str {
        "Resolve a place name to geographic coordinates. Use this before \
         fetching a weather forecast when only a city or address is known."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City, address or landmark to resolve"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let location = required_str(args, "location")?;
        tracing::debug!(location = %location, "Geocoding lookup");

        let body: Value = self
            .client
            .get(NOMINATIM_URL)
            .query(&[("q", location), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .json()
            .await?;

        Ok(summarize_geocode(location, &body))
    }
}

// ── Weather ──────────────────────────────────────────────────────

pub struct WeatherTool {
    client: Client,
}

impl WeatherTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Keep the current-weather block and zip the hourly series down to the next
/// `FORECAST_HOURS` entries. Full hourly arrays span days and would drown the
/// follow-up completion.
fn summarize_forecast(body: &Value) -> Value {
    let hourly = &body["hourly"];
    let times = hourly["time"].as_array().cloned().unwrap_or_default();

    let series = |key: &str| hourly[key].as_array().cloned().unwrap_or_default();
    let temperature = series("temperature_2m");
    let apparent = series("apparent_temperature");
    let humidity = series("relative_humidity_2m");
    let wind = series("wind_speed_10m");
    let rain = series("rain");

    let next_hours: Vec<Value> = times
        .iter()
        .take(FORECAST_HOURS)
        .enumerate()
        .map(|(i, time)| {
            json!({
                "time": time,
                "temperature": temperature.get(i).cloned().unwrap_or(Value::Null),
                "apparent_temperature": apparent.get(i).cloned().unwrap_or(Value::Null),
                "humidity": humidity.get(i).cloned().unwrap_or(Value::Null),
                "wind_speed": wind.get(i).cloned().unwrap_or(Value::Null),
                "rain": rain.get(i).cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    json!({
        "current_weather": body["current_weather"].clone(),
        "next_5_hours": next_hours,
    })
}

#[async_trait]
impl AssistantTool for WeatherTool {
    fn name(&self) -> &str {
        "fetch_weather_forecast"
    }

    fn description(&self) -> &str {
        "Fetch current weather and the next few hours of forecast for a \
         coordinate pair. Requires latitude and longitude; resolve them with \
         get_location_coordinates first if needed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": {
                    "type": "number",
                    "description": "Latitude in decimal degrees"
                },
                "longitude": {
                    "type": "number",
                    "description": "Longitude in decimal degrees"
                }
            },
            "required": ["latitude", "longitude"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let latitude = value_as_f64(&args["latitude"])
            .ok_or_else(|| anyhow!("Missing or non-numeric 'latitude' parameter"))?;
        let longitude = value_as_f64(&args["longitude"])
            .ok_or_else(|| anyhow!("Missing or non-numeric 'longitude' parameter"))?;
        tracing::debug!(latitude, longitude, "Weather lookup");

        let body: Value = self
            .client
            .get(OPEN_METEO_URL)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
                (
                    "hourly",
                    "temperature_2m,apparent_temperature,relative_humidity_2m,wind_speed_10m,rain"
                        .to_string(),
                ),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(summarize_forecast(&body))
    }
}

// ── Google Places: hotels & restaurants ──────────────────────────

/// Map a budget tier to the wording used in the Places text query. Unknown
/// tiers fall back to mid-range rather than failing the lookup.
fn budget_tier(budget: &str) -> &'static str {
    match budget.to_lowercase().as_str() {
        "budget" => "budget",
        "mid" => "mid-range",
        "luxury" => "luxury",
        _ => "mid-range",
    }
}

fn summarize_places(body: &Value, key: &str, include_price_level: bool) -> Value {
    let results = body["results"].as_array().cloned().unwrap_or_default();
    let places: Vec<Value> = results
        .iter()
        .take(MAX_PLACES)
        .map(|r| {
            let mut place = json!({
                "name": r["name"].clone(),
                "address": r["formatted_address"].clone(),
                "rating": r.get("rating").cloned().unwrap_or(json!("N/A")),
            });
            if include_price_level {
                if let Some(level) = r.get("price_level") {
                    place["price_level"] = level.clone();
                }
            }
            place
        })
        .collect();
    json!({ key: places })
}

pub struct HotelSearchTool {
    client: Client,
    api_key: Option<String>,
}

impl HotelSearchTool {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl AssistantTool for HotelSearchTool {
    fn name(&self) -> &str {
        "search_hotels_by_budget"
    }

    fn description(&self) -> &str {
        "Search for hotels in a location filtered by budget tier. Returns up \
         to five results with name, address and rating."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or area to search in"
                },
                "budget": {
                    "type": "string",
                    "enum": ["budget", "mid", "luxury"],
                    "description": "Price tier to filter by"
                }
            },
            "required": ["location", "budget"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let location = required_str(args, "location")?;
        let budget = required_str(args, "budget")?;

        let key = match &self.api_key {
            Some(k) => k,
            None => return Ok(json!({ "error": "Google API key not configured." })),
        };

        let query = format!("{} hotel in {}", budget_tier(budget), location);
        tracing::debug!(query = %query, "Hotel search");

        let body: Value = self
            .client
            .get(PLACES_URL)
            .query(&[
                ("query", query.as_str()),
                ("radius", "5000"),
                ("key", key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(summarize_places(&body, "hotels", true))
    }
}

pub struct RestaurantSearchTool {
    client: Client,
    api_key: Option<String>,
}

impl RestaurantSearchTool {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl AssistantTool for RestaurantSearchTool {
    fn name(&self) -> &str {
        "search_restaurants_by_cuisine"
    }

    fn description(&self) -> &str {
        "Search for restaurants serving a given cuisine in a location. \
         Returns up to five results with name, address and rating."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or area to search in"
                },
                "cuisine": {
                    "type": "string",
                    "description": "Cuisine to look for, e.g. 'italian' or 'ramen'"
                }
            },
            "required": ["location", "cuisine"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let location = required_str(args, "location")?;
        let cuisine = required_str(args, "cuisine")?;

        let key = match &self.api_key {
            Some(k) => k,
            None => return Ok(json!({ "error": "Google API key not configured." })),
        };

        let query = format!("{} restaurants in {}", cuisine, location);
        tracing::debug!(query = %query, "Restaurant search");

        let body: Value = self
            .client
            .get(PLACES_URL)
            .query(&[
                ("query", query.as_str()),
                ("radius", "5000"),
                ("key", key.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(summarize_places(&body, "restaurants", false))
    }
}

// ── Travel advisories ────────────────────────────────────────────

pub struct AdvisoryTool {
    client: Client,
}

impl AdvisoryTool {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Render the top Wikipedia search hits as "- title: snippet" lines.
fn summarize_advisories(location: &str, body: &Value) -> Value {
    let hits = body["query"]["search"].as_array().cloned().unwrap_or_default();
    if hits.is_empty() {
        return json!({
            "advisories": format!("No recent advisory entries found for {}.", location)
        });
    }

    let lines: Vec<String> = hits
        .iter()
        .take(MAX_ADVISORIES)
        .map(|hit| {
            format!(
                "- {}: {}",
                hit["title"].as_str().unwrap_or("Untitled"),
                hit["snippet"].as_str().unwrap_or("")
            )
        })
        .collect();

    json!({ "advisories": lines.join("\n") })
}

#[async_trait]
impl AssistantTool for AdvisoryTool {
    fn name(&self) -> &str {
        "get_travel_advisory_for_location"
    }

    fn description(&self) -> &str {
        "Look up recent events and advisories for a location from Wikipedia's \
         search index. Use for safety or current-events questions."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Country, region or city to check"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let location = required_str(args, "location")?;
        let search = format!("{} current events", location);
        tracing::debug!(location = %location, "Advisory lookup");

        let body: Value = self
            .client
            .get(WIKIPEDIA_URL)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", search.as_str()),
                ("format", "json"),
                ("srlimit", "3"),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(summarize_advisories(location, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geocode_summary_parses_string_coordinates() {
        let body = json!([{
            "lat": "48.8566",
            "lon": "2.3522",
            "display_name": "Paris, Île-de-France, France"
        }]);
        let summary = summarize_geocode("Paris", &body);
        assert!((summary["latitude"].as_f64().unwrap() - 48.8566).abs() < 1e-9);
        assert!((summary["longitude"].as_f64().unwrap() - 2.3522).abs() < 1e-9);
        assert_eq!(summary["display_name"], "Paris, Île-de-France, France");
    }

    #[test]
    fn test_geocode_summary_empty_result_is_error_payload() {
        let summary = summarize_geocode("Atlantis", &json!([]));
        assert_eq!(summary["error"], "No location found for 'Atlantis'");
    }

    #[test]
    fn test_forecast_summary_truncates_to_five_hours() {
        let hours: Vec<String> = (0..24).map(|h| format!("2026-08-23T{:02}:00", h)).collect();
        let temps: Vec<f64> = (0..24).map(|h| 20.0 + h as f64 * 0.1).collect();
        let body = json!({
            "current_weather": { "temperature": 21.5, "windspeed": 12.0, "time": "2026-08-23T10:00" },
            "hourly": {
                "time": hours,
                "temperature_2m": temps,
                "apparent_temperature": temps,
                "relative_humidity_2m": vec![60; 24],
                "wind_speed_10m": vec![10; 24],
                "rain": vec![0.0; 24],
            }
        });

        let summary = summarize_forecast(&body);
        let next = summary["next_5_hours"].as_array().unwrap();
        assert_eq!(next.len(), 5);
        assert_eq!(next[0]["time"], "2026-08-23T00:00");
        assert_eq!(next[4]["time"], "2026-08-23T04:00");
        assert_eq!(summary["current_weather"]["temperature"], 21.5);
    }

    #[test]
    fn test_forecast_summary_with_short_series() {
        let body = json!({
            "current_weather": { "temperature": 18.0 },
            "hourly": {
                "time": ["2026-08-23T00:00", "2026-08-23T01:00"],
                "temperature_2m": [18.0, 18.5],
                "apparent_temperature": [17.0, 17.5],
                "relative_humidity_2m": [70, 71],
                "wind_speed_10m": [8, 9],
                "rain": [0.0, 0.1],
            }
        });
        let next = summarize_forecast(&body)["next_5_hours"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(next, 2);
    }

    #[test]
    fn test_budget_tier_mapping() {
        assert_eq!(budget_tier("budget"), "budget");
        assert_eq!(budget_tier("mid"), "mid-range");
        assert_eq!(budget_tier("luxury"), "luxury");
        assert_eq!(budget_tier("LUXURY"), "luxury");
        // Unknown tiers degrade to mid-range instead of failing the lookup
        assert_eq!(budget_tier("platinum"), "mid-range");
    }

    #[test]
    fn test_places_summary_caps_at_five_and_defaults_rating() {
        let results: Vec<Value> = (0..8)
            .map(|i| {
                json!({
                    "name": format!("Hotel {}", i),
                    "formatted_address": format!("{} Rue de Test", i),
                    "price_level": 2,
                })
            })
            .collect();
        let summary = summarize_places(&json!({ "results": results }), "hotels", true);
        let hotels = summary["hotels"].as_array().unwrap();
        assert_eq!(hotels.len(), 5);
        assert_eq!(hotels[0]["name"], "Hotel 0");
        assert_eq!(hotels[0]["rating"], "N/A");
        assert_eq!(hotels[0]["price_level"], 2);
    }

    #[test]
    fn test_advisory_summary_formats_lines() {
        let body = json!({
            "query": {
                "search": [
                    { "title": "2026 in France", "snippet": "events overview" },
                    { "title": "Paris", "snippet": "capital city" },
                    { "title": "Transport strike", "snippet": "ongoing" },
                    { "title": "Ignored", "snippet": "beyond the cap" },
                ]
            }
        });
        let summary = summarize_advisories("France", &body);
        let text = summary["advisories"].as_str().unwrap();
        assert!(text.starts_with("- 2026 in France: events overview"));
        assert_eq!(text.lines().count(), 3);
        assert!(!text.contains("Ignored"));
    }

    #[test]
    fn test_advisory_summary_empty() {
        let summary = summarize_advisories("Nowhere", &json!({ "query": { "search": [] } }));
        assert!(summary["advisories"]
            .as_str()
            .unwrap()
            .contains("No recent advisory entries"));
    }

    #[test]
    fn test_geocode_summary_feeds_weather_arguments() {
        // The coordinate handoff the assistant performs between the two tools
        let geo = summarize_geocode(
            "Paris",
            &json!([{ "lat": "48.8566", "lon": "2.3522", "display_name": "Paris" }]),
        );
        let args = json!({
            "latitude": geo["latitude"],
            "longitude": geo["longitude"],
        });
        assert!(value_as_f64(&args["latitude"]).unwrap() > 48.0);
        assert!(value_as_f64(&args["longitude"]).unwrap() < 3.0);
    }

    #[tokio::test]
    async fn test_places_tools_report_missing_key_at_first_use() {
        let client = http_client().unwrap();
        let hotels = HotelSearchTool::new(client.clone(), None);
        let out = hotels
            .execute(&json!({ "location": "Rome", "budget": "mid" }))
            .await
            .unwrap();
        assert_eq!(out["error"], "Google API key not configured.");

        let restaurants = RestaurantSearchTool::new(client, None);
        let out = restaurants
            .execute(&json!({ "location": "Rome", "cuisine": "roman" }))
            .await
            .unwrap();
        assert_eq!(out["error"], "Google API key not configured.");
    }

    #[test]
    fn test_default_registry_exposes_all_five_tools() {
        let registry = default_registry(http_client().unwrap(), None);
        assert_eq!(
            registry.names(),
            vec![
                "fetch_weather_forecast",
                "get_location_coordinates",
                "get_travel_advisory_for_location",
                "search_hotels_by_budget",
                "search_restaurants_by_cuisine",
            ]
        );
    }
}
