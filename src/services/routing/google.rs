//! Google Directions API client
//!
//! API documentation:
//! https://developers.google.com/maps/documentation/directions/get-directions

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::types::Coordinates;

use super::{DirectionsLeg, DirectionsProvider, DirectionsRoute, ProviderFailure};

pub const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Google Directions client configuration
#[derive(Debug, Clone)]
pub struct GoogleDirectionsConfig {
    /// Endpoint URL, overridable for proxies and local fakes
    pub base_url: String,
    pub api_key: String,
}

/// Google Directions client
pub struct GoogleDirectionsClient {
    client: Client,
    config: GoogleDirectionsConfig,
}

impl GoogleDirectionsClient {
    pub fn new(config: GoogleDirectionsConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("fieldroute-worker/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn build_url(&self, origin: Coordinates, destination: Coordinates, waypoints: &[Coordinates]) -> String {
        let mut url = format!(
            "{}?origin={}&destination={}",
            self.config.base_url,
            format_point(origin),
            format_point(destination)
        );

        if !waypoints.is_empty() {
            let joined: Vec<String> = waypoints.iter().map(|p| format_point(*p)).collect();
            let param = format!("optimize:true|{}", joined.join("|"));
            url.push_str("&waypoints=");
            url.push_str(&urlencoding::encode(&param));
        }

        url.push_str("&key=");
        url.push_str(&urlencoding::encode(&self.config.api_key));
        url
    }
}

fn format_point(point: Coordinates) -> String {
    format!("{},{}", point.lat, point.lng)
}

#[async_trait]
impl DirectionsProvider for GoogleDirectionsClient {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Result<DirectionsRoute, ProviderFailure> {
        let url = self.build_url(origin, destination, waypoints);

        debug!("Requesting Google directions with {} waypoints", waypoints.len());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderFailure::Transport(e.to_string()))?;

        let http_status = response.status();
        if http_status.is_server_error() {
            return Err(ProviderFailure::Transport(format!("HTTP {}", http_status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderFailure::Transport(e.to_string()))?;

        parse_directions(&body)
    }

    fn name(&self) -> &str {
        "Google Directions"
    }
}

/// Turn a Directions JSON body into a route
fn parse_directions(body: &str) -> Result<DirectionsRoute, ProviderFailure> {
    let parsed: DirectionsResponse = serde_json::from_str(body)
        .map_err(|e| ProviderFailure::InvalidResponse(format!("unparseable body: {}", e)))?;

    if parsed.status != "OK" {
        return Err(ProviderFailure::Status {
            status: parsed.status,
            message: parsed.error_message.unwrap_or_default(),
        });
    }

    let route = parsed
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderFailure::InvalidResponse("status OK but no routes".to_string()))?;

    let legs = route
        .legs
        .iter()
        .map(|leg| DirectionsLeg {
            distance_meters: leg.distance.as_ref().map(|d| d.value).unwrap_or(0),
            duration_seconds: leg.duration.as_ref().map(|d| d.value).unwrap_or(0),
        })
        .collect();

    Ok(DirectionsRoute {
        legs,
        waypoint_order: route.waypoint_order,
        polyline: route
            .overview_polyline
            .map(|p| p.points)
            .filter(|points| !points.is_empty()),
    })
}

// ============================================================================
// Google API types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<GoogleRoute>,
}

#[derive(Debug, Deserialize)]
struct GoogleRoute {
    #[serde(default)]
    legs: Vec<GoogleLeg>,
    #[serde(default)]
    waypoint_order: Vec<usize>,
    #[serde(default)]
    overview_polyline: Option<GooglePolyline>,
}

#[derive(Debug, Deserialize)]
struct GoogleLeg {
    #[serde(default)]
    distance: Option<GoogleValue>,
    #[serde(default)]
    duration: Option<GoogleValue>,
}

#[derive(Debug, Deserialize)]
struct GoogleValue {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct GooglePolyline {
    points: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleDirectionsClient {
        GoogleDirectionsClient::new(GoogleDirectionsConfig {
            base_url: "http://directions.test/json".to_string(),
            api_key: "k&y".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_build_url_with_waypoints() {
        let url = client().build_url(
            Coordinates::new(50.0, 14.0),
            Coordinates::new(49.5, 16.5),
            &[Coordinates::new(49.8, 15.0), Coordinates::new(49.7, 15.5)],
        );

        assert!(url.starts_with("http://directions.test/json?origin=50,14&destination=49.5,16.5"));
        assert!(url.contains("&waypoints=optimize%3Atrue%7C49.8%2C15%7C49.7%2C15.5"));
        assert!(url.ends_with("&key=k%26y"));
    }

    #[test]
    fn test_build_url_without_waypoints() {
        let url = client().build_url(Coordinates::new(50.0, 14.0), Coordinates::new(49.5, 16.5), &[]);
        assert!(!url.contains("waypoints"));
    }

    #[test]
    fn test_parse_ok_response() {
        let body = r#"{
            "status": "OK",
            "routes": [{
                "waypoint_order": [1, 0],
                "overview_polyline": { "points": "abc" },
                "legs": [
                    { "distance": { "value": 1000, "text": "1 km" }, "duration": { "value": 90 } },
                    { "distance": { "value": 2500 }, "duration": { "value": 200 } },
                    { "distance": { "value": 500 } }
                ]
            }]
        }"#;

        let route = parse_directions(body).unwrap();
        assert_eq!(route.waypoint_order, vec![1, 0]);
        assert_eq!(route.polyline.as_deref(), Some("abc"));
        assert_eq!(route.legs.len(), 3);
        assert_eq!(route.legs[1].distance_meters, 2500);
        // missing duration counts as zero
        assert_eq!(route.legs[2].duration_seconds, 0);
    }

    #[test]
    fn test_parse_error_status() {
        let body = r#"{ "status": "REQUEST_DENIED", "error_message": "bad key", "routes": [] }"#;
        let failure = parse_directions(body).unwrap_err();
        assert_eq!(
            failure,
            ProviderFailure::Status {
                status: "REQUEST_DENIED".to_string(),
                message: "bad key".to_string()
            }
        );
    }

    #[test]
    fn test_parse_ok_without_routes() {
        let failure = parse_directions(r#"{ "status": "OK", "routes": [] }"#).unwrap_err();
        assert!(matches!(failure, ProviderFailure::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_garbage() {
        let failure = parse_directions("<html>").unwrap_err();
        assert!(matches!(failure, ProviderFailure::InvalidResponse(_)));
    }
}
