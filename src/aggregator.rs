//! Table aggregation.
//!
//! This module unions the per-vulnerability row sets produced by
//! [`crate::flatten`], joins them against the product catalog to attach
//! display name and family, and projects to the fixed output column order.

use crate::error::{BulletinError, Result};
use crate::flatten::{flatten, FlatRow};
use crate::models::{BulletinRow, BulletinTable, Catalog, Product};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Aggregator for turning a parsed catalog into the final flat table.
pub struct TableAggregator;

impl TableAggregator {
    /// Flatten every vulnerability, union the surviving row sets in
    /// document order, and join against the product catalog.
    ///
    /// Rows whose product id has no catalog entry are dropped at the join,
    /// matching the inner-join semantics of the per-vulnerability stage.
    /// Returns [`BulletinError::NoReportableData`] when nothing survives,
    /// so callers never receive an empty table.
    pub fn aggregate(catalog: &Catalog) -> Result<BulletinTable> {
        let product_index: HashMap<&str, &Product> = catalog
            .products
            .iter()
            .map(|p| (p.product_id.as_str(), p))
            .collect();

        let mut rows = Vec::new();
        let mut flattened = 0usize;
        for vulnerability in &catalog.vulnerabilities {
            let Some(row_set) = flatten(vulnerability) else {
                continue;
            };
            flattened += 1;
            for flat in row_set {
                match product_index.get(flat.product_id.as_str()) {
                    Some(product) => rows.push(Self::project(flat, product)),
                    None => {
                        warn!(
                            cve = %flat.cve,
                            product_id = %flat.product_id,
                            "product id not in catalog, row dropped"
                        );
                    }
                }
            }
        }

        debug!(
            vulnerabilities = catalog.vulnerabilities.len(),
            reportable = flattened,
            rows = rows.len(),
            "aggregation finished"
        );

        if rows.is_empty() {
            return Err(BulletinError::NoReportableData);
        }

        info!(rows = rows.len(), "built bulletin table");
        Ok(BulletinTable { rows })
    }

    fn project(flat: FlatRow, product: &Product) -> BulletinRow {
        BulletinRow {
            release_date: flat.release_date,
            product_family: product.product_family.clone(),
            product_id: flat.product_id,
            product_name: product.product_name.clone(),
            impact: flat.impact,
            severity: flat.severity,
            kb_article: flat.kb_article,
            cve_code: flat.cve,
        }
    }
}
