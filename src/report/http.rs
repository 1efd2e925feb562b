use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};

use super::error::ReportError;
use super::types::{ProgressReport, ProgressReporter, RemoteProgress};
use crate::geo::Coordinate;
use crate::route::Route;

/// Talks to the navigation backend's `init_route` / `location_update` endpoints.
pub struct HttpReporter {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct InitRouteRequest<'a> {
    coords: &'a [Coordinate],
    duration_text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationUpdateResponse {
    snapped_location: Option<Coordinate>,
    remaining_km: Option<f64>,
    eta_minutes: Option<f64>,
    // The backend answers failures with 200 and an error body.
    error: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
}

impl HttpReporter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ReportError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: ClientBuilder::new().timeout(timeout).build()?,
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ReportError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ReportError::Remote(format!("{} from {}: {}", status, path, text)));
        }
        Ok(response)
    }
}

#[async_trait]
impl ProgressReporter for HttpReporter {
    async fn init_route(&self, route: &Route) -> Result<(), ReportError> {
        let request = InitRouteRequest {
            coords: &route.waypoints,
            duration_text: &route.duration_label,
        };
        let body: ErrorBody = self
            .post("/navigation/init_route", &request)
            .await?
            .json()
            .await?;
        match body.error {
            Some(error) => Err(remote_error(error, body.details)),
            None => Ok(()),
        }
    }

    async fn location_update(
        &self,
        report: &ProgressReport,
    ) -> Result<RemoteProgress, ReportError> {
        let body: LocationUpdateResponse = self
            .post("/navigation/location_update", report)
            .await?
            .json()
            .await?;
        into_remote_progress(body, report)
    }
}

fn remote_error(error: String, details: Option<String>) -> ReportError {
    match details {
        Some(details) => ReportError::Remote(format!("{error}: {details}")),
        None => ReportError::Remote(error),
    }
}

fn into_remote_progress(
    body: LocationUpdateResponse,
    report: &ProgressReport,
) -> Result<RemoteProgress, ReportError> {
    if let Some(error) = body.error {
        return Err(remote_error(error, body.details));
    }
    let (Some(remaining_km), Some(eta)) = (body.remaining_km, body.eta_minutes) else {
        return Err(ReportError::Remote(
            "response is missing remainingKm or etaMinutes".into(),
        ));
    };
    if !remaining_km.is_finite() || !eta.is_finite() {
        return Err(ReportError::Remote("response holds non-finite progress".into()));
    }

    Ok(RemoteProgress {
        snapped_position: body.snapped_location.filter(Coordinate::is_valid),
        remaining_km: remaining_km.max(0.0),
        eta_minutes: eta.max(0.0).round() as u32,
        sample_timestamp: report.timestamp,
        received_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ProgressReport {
        ProgressReport {
            location: Coordinate::new(24.714, 46.6755),
            heading: 45.0,
            speed_kmh: 40.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn report_serializes_to_backend_shape() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["location"]["latitude"], 24.714);
        assert_eq!(json["heading"], 45.0);
        assert_eq!(json["speed_kmh"], 40.0);
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn parses_location_update() {
        let body: LocationUpdateResponse = serde_json::from_str(
            r#"{
                "driverLocation": {"latitude": 24.714, "longitude": 46.6755},
                "snappedLocation": {"latitude": 24.7136, "longitude": 46.6753},
                "heading": 45.0,
                "currentSpeedKmh": 40.0,
                "remainingKm": 1.23,
                "etaMinutes": 2
            }"#,
        )
        .unwrap();
        let report = report();
        let progress = into_remote_progress(body, &report).unwrap();

        assert_eq!(
            progress.snapped_position,
            Some(Coordinate::new(24.7136, 46.6753))
        );
        assert_eq!(progress.remaining_km, 1.23);
        assert_eq!(progress.eta_minutes, 2);
        assert_eq!(progress.sample_timestamp, report.timestamp);
    }

    #[test]
    fn error_body_is_an_error() {
        let body: LocationUpdateResponse = serde_json::from_str(
            r#"{"error": "Server error inside /navigation/location_update", "details": "boom"}"#,
        )
        .unwrap();
        let err = into_remote_progress(body, &report()).unwrap_err();
        assert!(matches!(err, ReportError::Remote(msg) if msg.ends_with("boom")));
    }

    #[test]
    fn incomplete_body_is_an_error() {
        let body: LocationUpdateResponse =
            serde_json::from_str(r#"{"snappedLocation": null, "remainingKm": 1.0}"#).unwrap();
        assert!(into_remote_progress(body, &report()).is_err());
    }

    #[test]
    fn base_url_trailing_slash() {
        let reporter = HttpReporter::new("http://127.0.0.1:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(reporter.base_url, "http://127.0.0.1:8000");
    }
}
