//! RFM segmentation page: runs the RFM engine over the filtered rows
//! and summarises the resulting segments.

use crate::{
    dataset::OrderRecord,
    error::DashResult,
    rfm::{CustomerRfm, RfmEngine, Segment},
    view::{mean_of, DashboardView, Page, ViewReport},
};
use serde::Serialize;
use std::collections::BTreeMap;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentCount {
    pub segment: Segment,
    pub customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRevenue {
    pub segment: Segment,
    pub revenue: f64,
}

/// Per-segment means, rounded to 2 decimal places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentDetail {
    pub segment: Segment,
    pub count: usize,
    pub avg_recency: f64,
    pub avg_frequency: f64,
    pub avg_monetary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationReport {
    pub champions: usize,
    pub at_risk: usize,
    pub avg_monetary: f64,
    pub avg_frequency: f64,
    /// Ascending by customer count.
    pub segment_counts: Vec<SegmentCount>,
    /// Descending by revenue.
    pub segment_revenue: Vec<SegmentRevenue>,
    /// In segment rule order; only segments that occur.
    pub segment_details: Vec<SegmentDetail>,
    pub customers: Vec<CustomerRfm>,
}

// ── View ─────────────────────────────────────────────────────────────────────

pub struct SegmentationView {
    engine: RfmEngine,
}

impl SegmentationView {
    pub fn new(engine: RfmEngine) -> Self {
        Self { engine }
    }

    pub fn build_report(&self, orders: &[&OrderRecord]) -> DashResult<SegmentationReport> {
        let customers = self.engine.compute(orders)?;
        Ok(summarise(customers))
    }
}

impl DashboardView for SegmentationView {
    fn page(&self) -> Page {
        Page::Segmentation
    }

    fn render(&self, orders: &[&OrderRecord]) -> DashResult<ViewReport> {
        let report = self.build_report(orders)?;
        log::debug!(
            "Segmentation view: {} customers, {} champions",
            report.customers.len(),
            report.champions
        );
        Ok(ViewReport::Segmentation(report))
    }
}

// ── Aggregations ─────────────────────────────────────────────────────────────

pub fn summarise(customers: Vec<CustomerRfm>) -> SegmentationReport {
    let mut groups: BTreeMap<Segment, Vec<&CustomerRfm>> = BTreeMap::new();
    for customer in &customers {
        groups.entry(customer.segment).or_default().push(customer);
    }

    let count_of = |segment: Segment| groups.get(&segment).map_or(0, Vec::len);

    let mut segment_counts: Vec<SegmentCount> = groups
        .iter()
        .map(|(&segment, members)| SegmentCount {
            segment,
            customers: members.len(),
        })
        .collect();
    segment_counts.sort_by(|a, b| a.customers.cmp(&b.customers).then(a.segment.cmp(&b.segment)));

    let mut segment_revenue: Vec<SegmentRevenue> = groups
        .iter()
        .map(|(&segment, members)| SegmentRevenue {
            segment,
            revenue: members.iter().map(|c| c.monetary).sum(),
        })
        .collect();
    segment_revenue.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then(a.segment.cmp(&b.segment))
    });

    let segment_details = groups
        .iter()
        .map(|(&segment, members)| SegmentDetail {
            segment,
            count: members.len(),
            avg_recency: round2(mean_of(members.iter().map(|c| c.recency as f64)).unwrap_or(0.0)),
            avg_frequency: round2(
                mean_of(members.iter().map(|c| c.frequency as f64)).unwrap_or(0.0),
            ),
            avg_monetary: round2(mean_of(members.iter().map(|c| c.monetary)).unwrap_or(0.0)),
        })
        .collect();

    let champions = count_of(Segment::Champions);
    let at_risk = count_of(Segment::AtRisk);
    drop(groups);

    let avg_monetary = mean_of(customers.iter().map(|c| c.monetary)).unwrap_or(0.0);
    let avg_frequency = mean_of(customers.iter().map(|c| c.frequency as f64)).unwrap_or(0.0);

    SegmentationReport {
        champions,
        at_risk,
        avg_monetary,
        avg_frequency,
        segment_counts,
        segment_revenue,
        segment_details,
        customers,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
