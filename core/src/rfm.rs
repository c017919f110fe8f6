//! RFM engine: Recency / Frequency / Monetary customer scoring.
//!
//! Steps, in order:
//!   1. Aggregate rows per customer (first-appearance order).
//!   2. Score each axis 1..=5 by quintile binning over all customers.
//!   3. Composite score = mean of the three integer scores.
//!   4. Segment by the ordered rule table in `Segment::classify`.
//!
//! The reference instant is the latest purchase in the input plus a fixed
//! offset, never the wall clock. The engine holds no state between calls.

use crate::{
    config::{DegeneratePolicy, RfmConfig},
    dataset::OrderRecord,
    error::{DashError, DashResult},
    types::CustomerId,
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

pub const QUINTILES: u8 = 5;

// ── Input seam ───────────────────────────────────────────────────────────────

/// The four fields the engine reads from an order row.
pub trait OrderLike {
    fn customer_id(&self) -> &str;
    fn order_id(&self) -> &str;
    fn purchase_timestamp(&self) -> NaiveDateTime;
    fn payment_amount(&self) -> f64;
}

impl OrderLike for OrderRecord {
    fn customer_id(&self) -> &str {
        &self.customer_id
    }
    fn order_id(&self) -> &str {
        &self.order_id
    }
    fn purchase_timestamp(&self) -> NaiveDateTime {
        self.purchase_timestamp
    }
    fn payment_amount(&self) -> f64 {
        self.payment_amount
    }
}

impl<T: OrderLike + ?Sized> OrderLike for &T {
    fn customer_id(&self) -> &str {
        (**self).customer_id()
    }
    fn order_id(&self) -> &str {
        (**self).order_id()
    }
    fn purchase_timestamp(&self) -> NaiveDateTime {
        (**self).purchase_timestamp()
    }
    fn payment_amount(&self) -> f64 {
        (**self).payment_amount()
    }
}

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "Champions")]
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalist")]
    PotentialLoyalist,
    #[serde(rename = "Recent Customers")]
    RecentCustomers,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Can't Lose Them")]
    CantLoseThem,
    #[serde(rename = "Hibernating")]
    Hibernating,
    #[serde(rename = "Need Attention")]
    NeedAttention,
}

impl Segment {
    /// Rule evaluation order.
    pub const ALL: [Segment; 8] = [
        Segment::Champions,
        Segment::LoyalCustomers,
        Segment::PotentialLoyalist,
        Segment::RecentCustomers,
        Segment::AtRisk,
        Segment::CantLoseThem,
        Segment::Hibernating,
        Segment::NeedAttention,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Champions => "Champions",
            Self::LoyalCustomers => "Loyal Customers",
            Self::PotentialLoyalist => "Potential Loyalist",
            Self::RecentCustomers => "Recent Customers",
            Self::AtRisk => "At Risk",
            Self::CantLoseThem => "Can't Lose Them",
            Self::Hibernating => "Hibernating",
            Self::NeedAttention => "Need Attention",
        }
    }

    /// First matching rule wins. Order must not change.
    pub fn classify(r: u8, f: u8, m: u8) -> Segment {
        if r >= 4 && f >= 4 && m >= 4 {
            Self::Champions
        } else if r >= 3 && f >= 4 {
            Self::LoyalCustomers
        } else if r >= 4 && (2..=3).contains(&f) {
            Self::PotentialLoyalist
        } else if r >= 4 && f == 1 {
            Self::RecentCustomers
        } else if r <= 2 && f >= 3 {
            Self::AtRisk
        } else if r <= 2 && m >= 4 {
            Self::CantLoseThem
        } else if r <= 2 && f <= 2 {
            Self::Hibernating
        } else {
            Self::NeedAttention
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRfm {
    pub customer_id: CustomerId,
    /// Whole days between the reference instant and the last purchase.
    pub recency: i64,
    /// Distinct orders.
    pub frequency: usize,
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub rfm_score: f64,
    pub segment: Segment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreAxis {
    Recency,
    Frequency,
    Monetary,
}

impl ScoreAxis {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Recency => "recency",
            Self::Frequency => "frequency",
            Self::Monetary => "monetary",
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RfmEngine {
    config: RfmConfig,
}

impl RfmEngine {
    pub fn new(config: RfmConfig) -> Self {
        Self { config }
    }

    /// One record per distinct customer, in order of first appearance.
    pub fn compute<R: OrderLike>(&self, rows: &[R]) -> DashResult<Vec<CustomerRfm>> {
        if rows.is_empty() {
            return Err(DashError::EmptyInput);
        }

        let (customers, latest) = aggregate(rows)?;
        let reference = latest + Duration::days(self.config.reference_offset_days);
        let policy = self.config.degenerate_policy;

        let recency: Vec<i64> = customers
            .iter()
            .map(|c| (reference - c.last_purchase).num_days())
            .collect();
        let frequency: Vec<usize> = customers.iter().map(|c| c.orders.len()).collect();
        let monetary: Vec<f64> = customers.iter().map(|c| c.monetary).collect();

        let recency_values: Vec<f64> = recency.iter().map(|&d| d as f64).collect();
        let r_scores: Vec<u8> = score_axis(&recency_values, ScoreAxis::Recency, policy)?
            .into_iter()
            .map(|bucket| QUINTILES + 1 - bucket)
            .collect();
        let f_scores = score_axis(&first_ranks(&frequency), ScoreAxis::Frequency, policy)?;
        let m_scores = score_axis(&monetary, ScoreAxis::Monetary, policy)?;

        let records = customers
            .into_iter()
            .enumerate()
            .map(|(i, customer)| {
                let (r, f, m) = (r_scores[i], f_scores[i], m_scores[i]);
                CustomerRfm {
                    customer_id: customer.customer_id.to_owned(),
                    recency: recency[i],
                    frequency: frequency[i],
                    monetary: monetary[i],
                    r_score: r,
                    f_score: f,
                    m_score: m,
                    rfm_score: (r as f64 + f as f64 + m as f64) / 3.0,
                    segment: Segment::classify(r, f, m),
                }
            })
            .collect();
        Ok(records)
    }
}

// ── Step 1: aggregation ──────────────────────────────────────────────────────

struct CustomerAggregate<'a> {
    customer_id: &'a str,
    last_purchase: NaiveDateTime,
    orders: HashSet<&'a str>,
    monetary: f64,
}

fn aggregate<R: OrderLike>(
    rows: &[R],
) -> DashResult<(Vec<CustomerAggregate<'_>>, NaiveDateTime)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut customers: Vec<CustomerAggregate<'_>> = Vec::new();
    let mut latest: Option<NaiveDateTime> = None;

    for (i, row) in rows.iter().enumerate() {
        let position = i + 1;
        let customer_id = row.customer_id();
        let order_id = row.order_id();
        let amount = row.payment_amount();
        let ts = row.purchase_timestamp();

        if customer_id.trim().is_empty() {
            return Err(malformed(position, "customer_id", "is blank"));
        }
        if order_id.trim().is_empty() {
            return Err(malformed(position, "order_id", "is blank"));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(malformed(position, "payment_amount", "must be a non-negative amount"));
        }

        latest = Some(latest.map_or(ts, |l| l.max(ts)));

        let slot = *index.entry(customer_id).or_insert_with(|| {
            customers.push(CustomerAggregate {
                customer_id,
                last_purchase: ts,
                orders: HashSet::new(),
                monetary: 0.0,
            });
            customers.len() - 1
        });
        let customer = &mut customers[slot];
        customer.last_purchase = customer.last_purchase.max(ts);
        customer.orders.insert(order_id);
        customer.monetary += amount;
    }

    let latest = latest.ok_or(DashError::EmptyInput)?;
    Ok((customers, latest))
}

fn malformed(row: usize, field: &'static str, reason: &str) -> DashError {
    DashError::MalformedRow {
        row,
        field,
        reason: reason.to_owned(),
    }
}

// ── Step 2: quintile scoring ─────────────────────────────────────────────────

/// 1-based ranks; equal values keep their input order.
fn first_ranks(values: &[usize]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by_key(|&i| values[i]);

    let mut ranks = vec![0.0; values.len()];
    for (rank, &i) in order.iter().enumerate() {
        ranks[i] = (rank + 1) as f64;
    }
    ranks
}

/// Edges at the 0, 20, 40, 60, 80 and 100th percentiles, interpolating
/// linearly between order statistics. `values` must be non-empty.
fn quintile_edges(values: &[f64]) -> [f64; QUINTILES as usize + 1] {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = sorted.len() - 1;

    let mut edges = [0.0; QUINTILES as usize + 1];
    let q = QUINTILES as usize;
    for (k, edge) in edges.iter_mut().enumerate() {
        // position k * last / 5, split into whole and fractional parts
        let lo = k * last / q;
        let rem = k * last % q;
        *edge = if rem == 0 {
            sorted[lo]
        } else {
            let frac = rem as f64 / q as f64;
            sorted[lo] + (sorted[lo + 1] - sorted[lo]) * frac
        };
    }
    edges
}

/// Lowest quintile whose upper edge covers the value. The first quintile
/// includes the minimum.
fn bucket_of(value: f64, edges: &[f64; QUINTILES as usize + 1]) -> u8 {
    (1..=QUINTILES)
        .find(|&k| value <= edges[k as usize])
        .unwrap_or(QUINTILES)
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Ascending bucket numbers 1..=5, one per value.
fn score_axis(values: &[f64], axis: ScoreAxis, policy: DegeneratePolicy) -> DashResult<Vec<u8>> {
    let edges = quintile_edges(values);

    if policy == DegeneratePolicy::Strict {
        let distinct = distinct_count(values);
        let increasing = edges.windows(2).all(|w| w[0] < w[1]);
        if distinct < QUINTILES as usize || !increasing {
            return Err(DashError::DegenerateDistribution {
                axis: axis.name(),
                distinct,
            });
        }
    }

    Ok(values.iter().map(|&v| bucket_of(v, &edges)).collect())
}
