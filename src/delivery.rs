//! Delivery formats for the aggregated table.
//!
//! Two output shapes are supported: delimited text (header row plus one line
//! per output row, no index column) and a sequence of plain JSON records
//! keyed by column name. The delimited form quotes fields containing the
//! delimiter, quotes, or newlines; [`parse_csv`] reads the same dialect back,
//! which the round-trip tests rely on.

use crate::error::{BulletinError, Result};
use crate::models::{BulletinRow, BulletinTable, COLUMN_HEADER};
use chrono::NaiveDate;
use serde_json::{json, Value};

/// Output format selector for the fetch/deliver shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryFormat {
    /// Delimited text with a header row.
    #[default]
    Csv,
    /// One JSON object per row, keyed by column name.
    Records,
}

/// A delivered table in the caller's chosen format.
#[derive(Debug, Clone)]
pub enum Delivery {
    Csv(String),
    Records(Vec<Value>),
}

/// Serialize a table into the requested delivery format.
pub fn deliver(table: &BulletinTable, format: DeliveryFormat) -> Delivery {
    match format {
        DeliveryFormat::Csv => Delivery::Csv(to_csv(table)),
        DeliveryFormat::Records => Delivery::Records(to_records(table)),
    }
}

/// Render the table as delimited text in the fixed column order.
pub fn to_csv(table: &BulletinTable) -> String {
    let mut out = String::new();
    out.push_str(&COLUMN_HEADER.join(","));
    out.push('\n');
    for row in &table.rows {
        let fields: Vec<String> = row.values().iter().map(|v| escape_field(v)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Render the table as a sequence of records keyed by column name.
pub fn to_records(table: &BulletinTable) -> Vec<Value> {
    table
        .rows
        .iter()
        .map(|row| {
            json!({
                "release_date": row.release_date.format("%Y-%m-%d").to_string(),
                "product_family": row.product_family,
                "product_id": row.product_id,
                "product_name": row.product_name,
                "impact": row.impact,
                "severity": row.severity,
                "kb_article": row.kb_article,
                "cve_code": row.cve_code,
            })
        })
        .collect()
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Parse delimited text produced by [`to_csv`] back into rows.
///
/// Expects the exact eight-column header. Used by tests and by callers that
/// want to re-ingest a previously delivered table.
pub fn parse_csv(text: &str) -> Result<Vec<BulletinRow>> {
    let mut records = split_records(text)?.into_iter();
    let header = records
        .next()
        .ok_or_else(|| BulletinError::config("empty delimited input"))?;
    if header.iter().map(String::as_str).ne(COLUMN_HEADER) {
        return Err(BulletinError::config(format!(
            "unexpected header: {}",
            header.join(",")
        )));
    }

    let mut rows = Vec::new();
    for fields in records {
        if fields.len() != COLUMN_HEADER.len() {
            return Err(BulletinError::config(format!(
                "expected {} fields, got {}: {}",
                COLUMN_HEADER.len(),
                fields.len(),
                fields.join(",")
            )));
        }
        let release_date = NaiveDate::parse_from_str(&fields[0], "%Y-%m-%d")
            .map_err(|_| BulletinError::config(format!("bad date field: {}", fields[0])))?;
        rows.push(BulletinRow {
            release_date,
            product_family: fields[1].clone(),
            product_id: fields[2].clone(),
            product_name: fields[3].clone(),
            impact: fields[4].clone(),
            severity: fields[5].clone(),
            kb_article: fields[6].clone(),
            cve_code: fields[7].clone(),
        });
    }
    Ok(rows)
}

/// Split delimited text into records, honoring double-quote escaping.
/// A newline inside a quoted field belongs to the field, not to the record
/// boundary, so quoted multi-line fields survive a round trip. Blank
/// records between rows are skipped.
fn split_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
                if fields.len() > 1 || !fields[0].trim().is_empty() {
                    records.push(std::mem::take(&mut fields));
                } else {
                    fields.clear();
                }
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(BulletinError::config(format!(
            "unterminated quote: {current}"
        )));
    }
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        records.push(fields);
    }
    Ok(records)
}
