//! Per-vulnerability flattening.
//!
//! This is the algorithmic core: one vulnerability's product list, threat
//! ratings, and remediations are exploded and inner-joined into a set of
//! per-product rows. Products with partial information (missing impact,
//! missing severity, or no patch reference) are dropped rather than emitted
//! with empty fields, so every surviving row is fully populated.

use crate::models::{ThreatKind, Vulnerability};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

/// One flattened row before the product-catalog join. The aggregator
/// attaches `product_name` and `product_family` afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub release_date: NaiveDate,
    pub product_id: String,
    pub impact: String,
    pub severity: String,
    pub kb_article: String,
    pub cve: String,
}

/// Flatten one vulnerability into its per-product row set.
///
/// Returns `None` when no usable row set exists: the vulnerability has no
/// remediations at all (a CVE without a known patch is not reportable), or
/// no product id survives the base ⋈ remediation ⋈ rating join chain.
///
/// Join semantics, in order:
/// 1. Base: one entry per product id in the vulnerability's product list.
///    Duplicate ids in the source list stay duplicated.
/// 2. Ratings: impact and severity associations keyed by product id,
///    inner-joined with each other. A product with only one of the two is
///    dropped here. On a duplicate key the first occurrence wins.
/// 3. Remediations: (kb_article, product id) pairs; a product id matching
///    several patches yields one row per patch.
pub fn flatten(vulnerability: &Vulnerability) -> Option<Vec<FlatRow>> {
    if vulnerability.remediations.is_empty() {
        debug!(cve = %vulnerability.cve, "no remediations, vulnerability excluded");
        return None;
    }

    let mut impacts: HashMap<&str, &str> = HashMap::new();
    let mut severities: HashMap<&str, &str> = HashMap::new();
    for threat in &vulnerability.threats {
        let slot = match threat.kind {
            ThreatKind::Impact => &mut impacts,
            ThreatKind::Severity => &mut severities,
            ThreatKind::Other => continue,
        };
        slot.entry(threat.product_id.as_str())
            .or_insert(threat.description.as_str());
    }

    // Inner join of the two rating associations on product id.
    let ratings: HashMap<&str, (&str, &str)> = impacts
        .iter()
        .filter_map(|(product_id, impact)| {
            severities
                .get(product_id)
                .map(|severity| (*product_id, (*impact, *severity)))
        })
        .collect();

    let mut rows = Vec::new();
    for product_id in &vulnerability.product_ids {
        let Some((impact, severity)) = ratings.get(product_id.as_str()) else {
            continue;
        };
        for remediation in &vulnerability.remediations {
            if remediation.product_id != *product_id {
                continue;
            }
            rows.push(FlatRow {
                release_date: vulnerability.release_date,
                product_id: product_id.clone(),
                impact: (*impact).to_string(),
                severity: (*severity).to_string(),
                kb_article: remediation.kb_article.clone(),
                cve: vulnerability.cve.clone(),
            });
        }
    }

    if rows.is_empty() {
        debug!(cve = %vulnerability.cve, "join chain empty, vulnerability excluded");
        return None;
    }

    Some(rows)
}
