//! Core data models for a parsed CVRF bulletin.
//!
//! This module defines the typed entities extracted from a monthly CVRF
//! document ([`Product`], [`Threat`], [`Remediation`], [`Vulnerability`]),
//! the document root [`Catalog`], and the flat output shape
//! ([`BulletinRow`] / [`BulletinTable`]) the rest of the pipeline produces.
//!
//! All of these are pure data: construction-time filtering lives in the
//! parser, join logic lives in the flattener and aggregator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fixed column order of the output table. The delimited-text delivery
/// writes exactly this header.
pub const COLUMN_HEADER: [&str; 8] = [
    "release_date",
    "product_family",
    "product_id",
    "product_name",
    "impact",
    "severity",
    "kb_article",
    "cve_code",
];

/// Classification of a threat record, derived from its integer wire code.
///
/// Code 0 maps to `Impact`, code 3 to `Severity`. Code 1 is a reserved
/// rating type and is dropped at parse time; every other code becomes
/// `Other`, which stays in the model but never contributes to output rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatKind {
    Impact,
    Severity,
    Other,
}

impl ThreatKind {
    /// Classify a wire code. Returns `None` for code 1, which is excluded
    /// from the model entirely.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Impact),
            1 => None,
            3 => Some(Self::Severity),
            _ => Some(Self::Other),
        }
    }
}

/// A rating statement scoped to exactly one product.
///
/// When the source record lists several product ids, only the first is kept.
/// Known first-element approximation; later ids are not guaranteed to match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub product_id: String,
    pub description: String,
    pub kind: ThreatKind,
}

/// A patch reference scoped to one product.
///
/// `kb_article` always carries the literal `KB` prefix; the parser admits
/// only remediation records whose description begins with a digit, so prose
/// like "no fix available" never reaches this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remediation {
    pub product_id: String,
    pub kb_article: String,
}

/// A shipped product/version and the family (OS line, application line) it
/// belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub product_family: String,
}

/// One vulnerability entry of the bulletin, with its affected products,
/// ratings, and patch references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    /// CVE identifier, e.g. "CVE-2024-1234".
    pub cve: String,
    /// Product ids from the first product-status entry of the record.
    pub product_ids: Vec<String>,
    pub threats: Vec<Threat>,
    pub remediations: Vec<Remediation>,
    /// Date component of the first revision-history timestamp.
    pub release_date: NaiveDate,
}

/// The parsed document root: product catalog plus vulnerability entries.
///
/// Built once per fetched bulletin and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl Catalog {
    /// Look up a product by id. Linear scan; catalogs hold a few hundred
    /// entries at most.
    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.product_id == product_id)
    }
}

/// One fully-populated output row. Field declaration order is the mandatory
/// column order, so serializing a row yields columns in the right sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletinRow {
    pub release_date: NaiveDate,
    pub product_family: String,
    pub product_id: String,
    pub product_name: String,
    pub impact: String,
    pub severity: String,
    pub kb_article: String,
    pub cve_code: String,
}

impl BulletinRow {
    /// Column values in header order, formatted for delimited output.
    pub fn values(&self) -> [String; 8] {
        [
            self.release_date.format("%Y-%m-%d").to_string(),
            self.product_family.clone(),
            self.product_id.clone(),
            self.product_name.clone(),
            self.impact.clone(),
            self.severity.clone(),
            self.kb_article.clone(),
            self.cve_code.clone(),
        ]
    }
}

/// The aggregated output table. Always non-empty: an empty join result is
/// surfaced as [`crate::error::BulletinError::NoReportableData`] instead of
/// an empty table, so callers branch on presence explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinTable {
    pub rows: Vec<BulletinRow>,
}

impl BulletinTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
