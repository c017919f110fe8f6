//! Dataset loading: CSV to typed order rows, plus a per-path cache.
//!
//! Required columns: order_id, customer_unique_id, order_purchase_timestamp,
//! total_payment, customer_state. Every other column is optional and
//! unknown columns are ignored.

use crate::{
    error::{DashError, DashResult},
    types::{CustomerId, OrderId, RegionCode},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

// ── Public types ─────────────────────────────────────────────────────────────

/// One order-item row. Serialises back to the same column names it is
/// loaded from, so generated data round-trips through the loader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    #[serde(rename = "customer_unique_id")]
    pub customer_id: CustomerId,
    #[serde(rename = "order_purchase_timestamp")]
    pub purchase_timestamp: NaiveDateTime,
    #[serde(rename = "order_delivered_customer_date")]
    pub delivered_timestamp: Option<NaiveDateTime>,
    #[serde(rename = "total_payment")]
    pub payment_amount: f64,
    #[serde(rename = "customer_state")]
    pub region: RegionCode,
    pub review_score: Option<f64>,
    #[serde(rename = "product_category_name_english")]
    pub category: Option<String>,
    #[serde(rename = "delivery_time_days")]
    pub delivery_days: Option<f64>,
    #[serde(rename = "delivery_delay_days")]
    pub delay_days: Option<f64>,
    pub is_delayed: Option<bool>,
    pub is_satisfied: Option<bool>,
    pub is_unsatisfied: Option<bool>,
}

impl OrderRecord {
    pub fn purchase_date(&self) -> NaiveDate {
        self.purchase_timestamp.date()
    }
}

/// The loaded, validated table. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<OrderRecord>,
}

impl Dataset {
    pub fn new(rows: Vec<OrderRecord>) -> Self {
        Self { rows }
    }

    pub fn load_csv(path: impl AsRef<Path>) -> DashResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let dataset = Self::from_reader(BufReader::new(file))?;
        log::info!("Loaded {} order rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Parse CSV text with a header row. Fails on the first bad row.
    pub fn from_reader<R: Read>(reader: R) -> DashResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (idx, result) in reader.deserialize::<RawOrderRow>().enumerate() {
            let raw = result?;
            rows.push(raw.into_record(idx + 1)?);
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[OrderRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest and latest purchase date, or None for an empty dataset.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(OrderRecord::purchase_date).min()?;
        let max = self.rows.iter().map(OrderRecord::purchase_date).max()?;
        Some((min, max))
    }

    /// Distinct region codes, sorted.
    pub fn regions(&self) -> Vec<RegionCode> {
        self.rows
            .iter()
            .map(|r| r.region.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }
}

// ── Cache ────────────────────────────────────────────────────────────────────

/// Memoises loaded datasets by path. Owned by the caller and passed
/// explicitly; there is no process-wide instance.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `path`, reading the file on first use.
    pub fn get_or_load(&mut self, path: impl AsRef<Path>) -> DashResult<Arc<Dataset>> {
        let path = path.as_ref();
        if let Some(dataset) = self.entries.get(path) {
            log::debug!("Dataset cache hit: {}", path.display());
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(Dataset::load_csv(path)?);
        self.entries.insert(path.to_path_buf(), Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Drop one entry. Returns true if it was cached.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        self.entries.remove(path.as_ref()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Raw CSV row ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOrderRow {
    order_id: Option<String>,
    customer_unique_id: Option<String>,
    order_purchase_timestamp: Option<String>,
    order_delivered_customer_date: Option<String>,
    total_payment: Option<f64>,
    customer_state: Option<String>,
    review_score: Option<f64>,
    product_category_name_english: Option<String>,
    delivery_time_days: Option<f64>,
    delivery_delay_days: Option<f64>,
    is_delayed: Option<String>,
    is_satisfied: Option<String>,
    is_unsatisfied: Option<String>,
}

impl RawOrderRow {
    fn into_record(self, row: usize) -> DashResult<OrderRecord> {
        let order_id = required(self.order_id, row, "order_id")?;
        let customer_id = required(self.customer_unique_id, row, "customer_unique_id")?;
        let region = required(self.customer_state, row, "customer_state")?;

        let purchase_raw = required(
            self.order_purchase_timestamp,
            row,
            "order_purchase_timestamp",
        )?;
        let purchase_timestamp = parse_timestamp(&purchase_raw)
            .ok_or_else(|| not_a_timestamp(row, "order_purchase_timestamp", &purchase_raw))?;

        let delivered_timestamp = match non_blank(self.order_delivered_customer_date) {
            Some(raw) => Some(
                parse_timestamp(&raw)
                    .ok_or_else(|| not_a_timestamp(row, "order_delivered_customer_date", &raw))?,
            ),
            None => None,
        };

        let payment_amount = self
            .total_payment
            .ok_or_else(|| malformed(row, "total_payment", "is missing".into()))?;
        if !payment_amount.is_finite() || payment_amount < 0.0 {
            return Err(malformed(
                row,
                "total_payment",
                format!("must be a non-negative amount, got {payment_amount}"),
            ));
        }

        let review_score = match self.review_score {
            Some(score) if !(1.0..=5.0).contains(&score) => {
                return Err(malformed(
                    row,
                    "review_score",
                    format!("must be within 1..=5, got {score}"),
                ));
            }
            other => other,
        };

        Ok(OrderRecord {
            order_id,
            customer_id,
            purchase_timestamp,
            delivered_timestamp,
            payment_amount,
            region,
            review_score,
            category: non_blank(self.product_category_name_english),
            delivery_days: self.delivery_time_days.filter(|d| d.is_finite()),
            delay_days: self.delivery_delay_days.filter(|d| d.is_finite()),
            is_delayed: parse_flag(self.is_delayed, row, "is_delayed")?,
            is_satisfied: parse_flag(self.is_satisfied, row, "is_satisfied")?,
            is_unsatisfied: parse_flag(self.is_unsatisfied, row, "is_unsatisfied")?,
        })
    }
}

fn malformed(row: usize, field: &'static str, reason: String) -> DashError {
    DashError::MalformedRow { row, field, reason }
}

fn not_a_timestamp(row: usize, field: &'static str, raw: &str) -> DashError {
    malformed(row, field, format!("is not a timestamp: '{raw}'"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, row: usize, field: &'static str) -> DashResult<String> {
    non_blank(value).ok_or_else(|| malformed(row, field, "is missing".into()))
}

fn parse_flag(value: Option<String>, row: usize, field: &'static str) -> DashResult<Option<bool>> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" => Ok(Some(true)),
        "false" | "0" | "0.0" => Ok(Some(false)),
        _ => Err(malformed(row, field, format!("is not a boolean: '{raw}'"))),
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, the ISO `T` variant (both with optional
/// fractional seconds) and a bare date taken as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
