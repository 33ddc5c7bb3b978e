//! CVRF document parsing.
//!
//! This module deserializes the raw nested bulletin JSON into [`CvrfDocument`]
//! and builds the typed [`Catalog`] from it, applying the inclusion filters
//! at parse time: threat code 1 is dropped, only type-2 remediations whose
//! description starts with a digit count as patches.
//!
//! Parsing is pure construction with no side effects. Structural problems
//! (a vulnerability without a CVE, product statuses, or revision history)
//! are hard errors, never skipped silently.

use crate::error::{BulletinError, Result};
use crate::models::{Catalog, Product, Remediation, Threat, ThreatKind, Vulnerability};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, warn};

/// Raw CVRF document root as served by the bulletin endpoint.
///
/// Only the branches the transformation needs are modeled; everything else
/// in the document (titles, publisher, notes, scores) is ignored by serde.
#[derive(Debug, Clone, Deserialize)]
pub struct CvrfDocument {
    #[serde(rename = "ProductTree", default)]
    pub product_tree: Option<ProductTree>,
    #[serde(rename = "Vulnerability", default)]
    pub vulnerabilities: Vec<VulnerabilityRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductTree {
    #[serde(rename = "Branch", default)]
    pub branches: Vec<Branch>,
}

/// A branch of the product tree. The root branch's `Items` are the family
/// branches; a family branch's `Items` are the products themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Items", default)]
    pub items: Vec<FamilyBranch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyBranch {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Items", default)]
    pub items: Vec<ProductEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductEntry {
    #[serde(rename = "ProductID")]
    pub product_id: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VulnerabilityRecord {
    #[serde(rename = "CVE", default)]
    pub cve: Option<String>,
    #[serde(rename = "ProductStatuses", default)]
    pub product_statuses: Vec<ProductStatus>,
    #[serde(rename = "Threats", default)]
    pub threats: Vec<ThreatRecord>,
    #[serde(rename = "Remediations", default)]
    pub remediations: Vec<RemediationRecord>,
    #[serde(rename = "RevisionHistory", default)]
    pub revision_history: Vec<Revision>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductStatus {
    #[serde(rename = "ProductID", default)]
    pub product_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreatRecord {
    #[serde(rename = "Type")]
    pub kind_code: i64,
    #[serde(rename = "Description", default)]
    pub description: Option<WrappedValue>,
    #[serde(rename = "ProductID", default)]
    pub product_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemediationRecord {
    #[serde(rename = "Type")]
    pub kind_code: i64,
    #[serde(rename = "Description", default)]
    pub description: Option<WrappedValue>,
    #[serde(rename = "ProductID", default)]
    pub product_ids: Vec<String>,
}

/// CVRF wraps localizable strings in `{"Value": "..."}` objects.
#[derive(Debug, Clone, Deserialize)]
pub struct WrappedValue {
    #[serde(rename = "Value", default)]
    pub value: String,
}

/// Remediation type code for an actual security update (a KB patch), as
/// opposed to workarounds or mitigations.
const REMEDIATION_TYPE_PATCH: i64 = 2;

/// Parse a raw JSON bulletin body into a [`Catalog`].
pub fn parse_json(body: &str) -> Result<Catalog> {
    let document: CvrfDocument = serde_json::from_str(body)?;
    parse_document(document)
}

/// Build the typed [`Catalog`] from a deserialized document.
pub fn parse_document(document: CvrfDocument) -> Result<Catalog> {
    let products = extract_products(document.product_tree.as_ref());

    let mut vulnerabilities = Vec::with_capacity(document.vulnerabilities.len());
    for record in document.vulnerabilities {
        vulnerabilities.push(extract_vulnerability(record)?);
    }

    debug!(
        products = products.len(),
        vulnerabilities = vulnerabilities.len(),
        "parsed CVRF document"
    );

    Ok(Catalog {
        products,
        vulnerabilities,
    })
}

/// Walk the first top-level branch's family branches and emit one [`Product`]
/// per listed item, tagged with the owning family's name. A family with no
/// items contributes nothing; a missing tree yields an empty catalog.
fn extract_products(tree: Option<&ProductTree>) -> Vec<Product> {
    let Some(root) = tree.and_then(|t| t.branches.first()) else {
        warn!("bulletin has no product tree; catalog will be empty");
        return Vec::new();
    };

    let mut products = Vec::new();
    for family in &root.items {
        let family_name = family.name.clone().unwrap_or_default();
        for entry in &family.items {
            products.push(Product {
                product_id: entry.product_id.clone(),
                product_name: entry.value.clone(),
                product_family: family_name.clone(),
            });
        }
    }
    products
}

fn extract_vulnerability(record: VulnerabilityRecord) -> Result<Vulnerability> {
    let cve = record
        .cve
        .filter(|c| !c.is_empty())
        .ok_or_else(|| BulletinError::malformed("<unknown>", "CVE"))?;

    // First product-status entry only. A record may in principle carry
    // independent product lists per status; later entries are ignored.
    let product_ids = record
        .product_statuses
        .first()
        .map(|status| status.product_ids.clone())
        .ok_or_else(|| BulletinError::malformed(&cve, "ProductStatuses"))?;

    let release_date = record
        .revision_history
        .first()
        .ok_or_else(|| BulletinError::malformed(&cve, "RevisionHistory"))
        .and_then(|revision| parse_revision_date(&cve, &revision.date))?;

    let threats = extract_threats(&cve, &record.threats);
    let remediations = extract_remediations(&record.remediations);

    Ok(Vulnerability {
        cve,
        product_ids,
        threats,
        remediations,
        release_date,
    })
}

/// Keep threats whose code classifies (code 1 is dropped), scoped to the
/// first listed product id. Threats without a product id or description are
/// unusable for the rating join and are skipped.
fn extract_threats(cve: &str, records: &[ThreatRecord]) -> Vec<Threat> {
    let mut threats = Vec::new();
    for record in records {
        let Some(kind) = ThreatKind::from_code(record.kind_code) else {
            continue;
        };
        let Some(product_id) = record.product_ids.first() else {
            warn!(cve, code = record.kind_code, "threat without product id, skipping");
            continue;
        };
        let Some(description) = record.description.as_ref() else {
            warn!(cve, code = record.kind_code, "threat without description, skipping");
            continue;
        };
        threats.push(Threat {
            product_id: product_id.clone(),
            description: description.value.clone(),
            kind,
        });
    }
    threats
}

/// Keep type-2 remediation records whose description begins with a digit
/// (genuine KB numbers; prose like "Workaround only" is rejected), exploded
/// into one [`Remediation`] per listed product id, with the "KB" prefix
/// applied.
fn extract_remediations(records: &[RemediationRecord]) -> Vec<Remediation> {
    let mut remediations = Vec::new();
    for record in records {
        if record.kind_code != REMEDIATION_TYPE_PATCH {
            continue;
        }
        let Some(description) = record.description.as_ref() else {
            continue;
        };
        if !description.value.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let kb_article = format!("KB{}", description.value);
        for product_id in &record.product_ids {
            remediations.push(Remediation {
                product_id: product_id.clone(),
                kb_article: kb_article.clone(),
            });
        }
    }
    remediations
}

#[derive(Debug, Clone, Deserialize)]
pub struct Revision {
    #[serde(rename = "Date")]
    pub date: String,
}

/// Parse a revision timestamp and truncate to the calendar date.
///
/// The canonical bulletin format is seconds precision without an offset
/// ("2024-01-09T08:00:00"), but feeds have been seen with fractional
/// seconds and with full RFC 3339 offsets, so both are accepted.
fn parse_revision_date(cve: &str, value: &str) -> Result<NaiveDate> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.date());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.date());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }

    Err(BulletinError::date_parse(cve, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> &'static str {
        r#"{
            "ProductTree": {
                "Branch": [{
                    "Items": [
                        {
                            "Name": "TestFamily",
                            "Items": [
                                {"ProductID": "P1", "Value": "Test OS"},
                                {"ProductID": "P2", "Value": "Test Server"}
                            ]
                        },
                        {"Name": "EmptyFamily", "Items": []}
                    ]
                }]
            },
            "Vulnerability": [{
                "CVE": "CVE-2099-0001",
                "ProductStatuses": [{"ProductID": ["P1", "P2"]}],
                "Threats": [
                    {"Type": 0, "Description": {"Value": "Remote Code Execution"}, "ProductID": ["P1"]},
                    {"Type": 3, "Description": {"Value": "Critical"}, "ProductID": ["P1"]},
                    {"Type": 1, "Description": {"Value": "reserved"}, "ProductID": ["P1"]},
                    {"Type": 4, "Description": {"Value": "something else"}, "ProductID": ["P2"]}
                ],
                "Remediations": [
                    {"Type": 2, "Description": {"Value": "5001234"}, "ProductID": ["P1"]},
                    {"Type": 2, "Description": {"Value": "Workaround only"}, "ProductID": ["P1"]},
                    {"Type": 1, "Description": {"Value": "5009999"}, "ProductID": ["P1"]}
                ],
                "RevisionHistory": [
                    {"Date": "2099-01-05T00:00:00"},
                    {"Date": "2099-02-01T00:00:00"}
                ]
            }]
        }"#
    }

    #[test]
    fn parses_products_with_family_names() {
        let catalog = parse_json(sample_document()).unwrap();

        assert_eq!(catalog.products.len(), 2);
        assert_eq!(catalog.products[0].product_id, "P1");
        assert_eq!(catalog.products[0].product_name, "Test OS");
        assert_eq!(catalog.products[0].product_family, "TestFamily");
        assert_eq!(catalog.products[1].product_family, "TestFamily");
    }

    #[test]
    fn drops_reserved_threat_code_keeps_other() {
        let catalog = parse_json(sample_document()).unwrap();
        let vuln = &catalog.vulnerabilities[0];

        assert_eq!(vuln.threats.len(), 3);
        assert_eq!(vuln.threats[0].kind, ThreatKind::Impact);
        assert_eq!(vuln.threats[1].kind, ThreatKind::Severity);
        assert_eq!(vuln.threats[2].kind, ThreatKind::Other);
        assert!(vuln.threats.iter().all(|t| t.description != "reserved"));
    }

    #[test]
    fn remediation_filter_requires_type_two_and_leading_digit() {
        let catalog = parse_json(sample_document()).unwrap();
        let vuln = &catalog.vulnerabilities[0];

        assert_eq!(vuln.remediations.len(), 1);
        assert_eq!(vuln.remediations[0].kb_article, "KB5001234");
        assert_eq!(vuln.remediations[0].product_id, "P1");
    }

    #[test]
    fn remediation_with_multiple_products_is_exploded() {
        let records = vec![RemediationRecord {
            kind_code: 2,
            description: Some(WrappedValue {
                value: "5001234".to_string(),
            }),
            product_ids: vec!["P1".to_string(), "P2".to_string()],
        }];

        let remediations = extract_remediations(&records);
        assert_eq!(remediations.len(), 2);
        assert!(remediations.iter().all(|r| r.kb_article == "KB5001234"));
        assert_eq!(remediations[0].product_id, "P1");
        assert_eq!(remediations[1].product_id, "P2");
    }

    #[test]
    fn release_date_comes_from_first_revision() {
        let catalog = parse_json(sample_document()).unwrap();
        let vuln = &catalog.vulnerabilities[0];

        assert_eq!(vuln.release_date.to_string(), "2099-01-05");
    }

    #[test]
    fn product_ids_come_from_first_status_entry() {
        let body = r#"{
            "Vulnerability": [{
                "CVE": "CVE-2099-0002",
                "ProductStatuses": [
                    {"ProductID": ["P1"]},
                    {"ProductID": ["P2", "P3"]}
                ],
                "Threats": [],
                "Remediations": [],
                "RevisionHistory": [{"Date": "2099-01-05T00:00:00"}]
            }]
        }"#;

        let catalog = parse_json(body).unwrap();
        assert_eq!(catalog.vulnerabilities[0].product_ids, vec!["P1"]);
    }

    #[test]
    fn missing_cve_is_a_hard_error() {
        let body = r#"{
            "Vulnerability": [{
                "ProductStatuses": [{"ProductID": ["P1"]}],
                "RevisionHistory": [{"Date": "2099-01-05T00:00:00"}]
            }]
        }"#;

        let err = parse_json(body).unwrap_err();
        assert!(matches!(
            err,
            BulletinError::MalformedVulnerability { ref field, .. } if field == "CVE"
        ));
    }

    #[test]
    fn missing_product_statuses_is_a_hard_error() {
        let body = r#"{
            "Vulnerability": [{
                "CVE": "CVE-2099-0003",
                "RevisionHistory": [{"Date": "2099-01-05T00:00:00"}]
            }]
        }"#;

        let err = parse_json(body).unwrap_err();
        assert!(matches!(
            err,
            BulletinError::MalformedVulnerability { ref cve, ref field }
                if cve == "CVE-2099-0003" && field == "ProductStatuses"
        ));
    }

    #[test]
    fn missing_revision_history_is_a_hard_error() {
        let body = r#"{
            "Vulnerability": [{
                "CVE": "CVE-2099-0004",
                "ProductStatuses": [{"ProductID": ["P1"]}]
            }]
        }"#;

        let err = parse_json(body).unwrap_err();
        assert!(matches!(
            err,
            BulletinError::MalformedVulnerability { ref field, .. } if field == "RevisionHistory"
        ));
    }

    #[test]
    fn revision_date_fallback_formats() {
        assert_eq!(
            parse_revision_date("CVE-X", "2024-01-09T08:00:00").unwrap().to_string(),
            "2024-01-09"
        );
        assert_eq!(
            parse_revision_date("CVE-X", "2024-01-09T08:00:00.000").unwrap().to_string(),
            "2024-01-09"
        );
        assert_eq!(
            parse_revision_date("CVE-X", "2024-01-09T08:00:00Z").unwrap().to_string(),
            "2024-01-09"
        );
        assert!(parse_revision_date("CVE-X", "January 9th").is_err());
    }

    #[test]
    fn empty_document_parses_to_empty_catalog() {
        let catalog = parse_json("{}").unwrap();
        assert!(catalog.products.is_empty());
        assert!(catalog.vulnerabilities.is_empty());
    }
}
