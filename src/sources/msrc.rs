//! MSRC CVRF bulletin source.
//!
//! Fetches one month's security bulletin from the Microsoft Security
//! Response Center CVRF API.
//!
//! # Data Source
//!
//! - API: <https://api.msrc.microsoft.com/cvrf/v2.0/cvrf/{YEAR-MMM}>
//! - Updated: monthly (Patch Tuesday)
//! - A 404 means the month's bulletin has not been published yet, which is
//!   surfaced distinctly from general unreachability.

use crate::error::{BulletinError, Result};
use crate::parser::CvrfDocument;
use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info};

/// Base URL for the MSRC CVRF API.
pub const MSRC_API_URL: &str = "https://api.msrc.microsoft.com/cvrf/v2.0/cvrf";

/// English month abbreviations, uppercased as the endpoint expects.
const MONTH_ABBREVIATIONS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// MSRC bulletin source.
///
/// Performs the single fetch the pipeline needs. No retry or backoff: a
/// failed month is reported to the caller, not re-attempted.
pub struct MsrcSource {
    client: reqwest::Client,
    /// Optional API URL override (useful for tests / mocks).
    api_url: Option<String>,
}

impl MsrcSource {
    /// Create a new MSRC source.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: None,
        }
    }

    /// Override the API base URL (useful for mock servers in tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Map a target date to the endpoint's month identifier, e.g.
    /// 2024-01-09 becomes "2024-JAN".
    pub fn month_id(date: NaiveDate) -> String {
        let abbreviation = MONTH_ABBREVIATIONS[date.month0() as usize];
        format!("{}-{}", date.year(), abbreviation)
    }

    /// URL of the bulletin for a given date's month.
    pub fn month_url(&self, date: NaiveDate) -> String {
        let base = self.api_url.as_deref().unwrap_or(MSRC_API_URL);
        format!("{}/{}", base, Self::month_id(date))
    }

    /// Fetch the bulletin for the month containing `date`, defaulting to
    /// the current date resolved at call time.
    ///
    /// Returns [`BulletinError::NotYetPublished`] on 404 and
    /// [`BulletinError::Unreachable`] on any other non-success status.
    pub async fn fetch_month(&self, date: Option<NaiveDate>) -> Result<CvrfDocument> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let month = Self::month_id(date);
        let url = self.month_url(date);

        info!(%month, "fetching MSRC bulletin");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BulletinError::NotYetPublished { month });
        }
        if !status.is_success() {
            return Err(BulletinError::Unreachable {
                status: status.as_u16(),
            });
        }

        let document: CvrfDocument = response.json().await?;
        debug!(
            %month,
            vulnerabilities = document.vulnerabilities.len(),
            "bulletin received"
        );
        Ok(document)
    }
}

impl Default for MsrcSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn month_id_is_year_dash_uppercase_abbreviation() {
        assert_eq!(MsrcSource::month_id(day(2024, 1, 9)), "2024-JAN");
        assert_eq!(MsrcSource::month_id(day(2024, 12, 31)), "2024-DEC");
        assert_eq!(MsrcSource::month_id(day(2099, 6, 1)), "2099-JUN");
    }

    #[test]
    fn month_url_uses_default_endpoint() {
        let source = MsrcSource::new();
        assert_eq!(
            source.month_url(day(2024, 3, 12)),
            "https://api.msrc.microsoft.com/cvrf/v2.0/cvrf/2024-MAR"
        );
    }

    #[test]
    fn month_url_honors_override() {
        let source = MsrcSource::new().with_api_url("http://127.0.0.1:9000/cvrf");
        assert_eq!(
            source.month_url(day(2024, 3, 12)),
            "http://127.0.0.1:9000/cvrf/2024-MAR"
        );
    }

    #[tokio::test]
    async fn fetch_maps_404_to_not_yet_published() {
        let mock_server = MockServer::start().await;
        let source = MsrcSource::new().with_api_url(mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/2099-JAN"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = source.fetch_month(Some(day(2099, 1, 9))).await.unwrap_err();
        assert!(matches!(
            err,
            BulletinError::NotYetPublished { ref month } if month == "2099-JAN"
        ));
    }

    #[tokio::test]
    async fn fetch_maps_other_non_success_to_unreachable() {
        let mock_server = MockServer::start().await;
        let source = MsrcSource::new().with_api_url(mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/2099-JAN"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let err = source.fetch_month(Some(day(2099, 1, 9))).await.unwrap_err();
        assert!(matches!(err, BulletinError::Unreachable { status: 503 }));
    }

    #[tokio::test]
    async fn fetch_hands_body_to_document_model() {
        let mock_server = MockServer::start().await;
        let source = MsrcSource::new().with_api_url(mock_server.uri());

        let body = json!({
            "ProductTree": {
                "Branch": [{
                    "Items": [{
                        "Name": "TestFamily",
                        "Items": [{"ProductID": "P1", "Value": "Test OS"}]
                    }]
                }]
            },
            "Vulnerability": [{
                "CVE": "CVE-2099-0001",
                "ProductStatuses": [{"ProductID": ["P1"]}],
                "Threats": [],
                "Remediations": [],
                "RevisionHistory": [{"Date": "2099-01-05T00:00:00"}]
            }]
        });

        Mock::given(method("GET"))
            .and(path("/2099-JAN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let document = source.fetch_month(Some(day(2099, 1, 9))).await.unwrap();
        assert_eq!(document.vulnerabilities.len(), 1);
        assert_eq!(document.vulnerabilities[0].cve.as_deref(), Some("CVE-2099-0001"));

        let catalog = crate::parser::parse_document(document).unwrap();
        assert_eq!(catalog.products.len(), 1);
        assert_eq!(catalog.vulnerabilities[0].cve, "CVE-2099-0001");
    }
}
