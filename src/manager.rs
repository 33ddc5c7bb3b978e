//! End-to-end pipeline orchestration.
//!
//! [`BulletinManager`] wires the stages together: fetch the month's raw
//! document, parse it into the catalog, aggregate into the flat table, and
//! serialize to the caller's delivery format. Each stage is independently
//! usable; the manager is the convenience path.

use crate::config::Config;
use crate::aggregator::TableAggregator;
use crate::delivery::{deliver, Delivery, DeliveryFormat};
use crate::error::Result;
use crate::models::BulletinTable;
use crate::parser;
use crate::sources::msrc::MsrcSource;
use chrono::NaiveDate;
use tracing::info;

pub struct BulletinManager {
    source: MsrcSource,
}

impl BulletinManager {
    pub fn new(config: &Config) -> Self {
        let mut source = MsrcSource::new();
        if let Some(api_url) = &config.api_url {
            source = source.with_api_url(api_url.clone());
        }
        Self { source }
    }

    /// Fetch and flatten the bulletin for the month containing `date`
    /// (current month when `None`).
    pub async fn monthly_table(&self, date: Option<NaiveDate>) -> Result<BulletinTable> {
        let document = self.source.fetch_month(date).await?;
        let catalog = parser::parse_document(document)?;
        info!(
            products = catalog.products.len(),
            vulnerabilities = catalog.vulnerabilities.len(),
            "catalog built"
        );
        TableAggregator::aggregate(&catalog)
    }

    /// Fetch, flatten, and serialize in one call.
    pub async fn monthly_report(
        &self,
        date: Option<NaiveDate>,
        format: DeliveryFormat,
    ) -> Result<Delivery> {
        let table = self.monthly_table(date).await?;
        Ok(deliver(&table, format))
    }
}

impl Default for BulletinManager {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
