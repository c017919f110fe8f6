//! Geographic page: per-region customers, orders and revenue, the
//! leading region, and how concentrated revenue is.

use crate::{
    config::GeoConfig,
    dataset::OrderRecord,
    error::DashResult,
    types::RegionCode,
    view::{DashboardView, Page, ViewReport},
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const OTHERS_LABEL: &str = "Others";

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    pub region: RegionCode,
    pub customers: usize,
    pub orders: usize,
    pub revenue: f64,
    pub revenue_per_customer: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueShare {
    pub label: String,
    pub revenue: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoReport {
    /// Descending by revenue, ties by region code.
    pub regions: Vec<RegionStats>,
    pub top_region: Option<RegionCode>,
    pub top_region_revenue: f64,
    pub top_region_share_pct: Option<f64>,
    pub top_by_revenue: Vec<RegionStats>,
    pub top_by_customers: Vec<RegionStats>,
    /// Top regions individually, remainder folded into "Others".
    pub revenue_shares: Vec<RevenueShare>,
    pub concentration_top_n: usize,
    pub concentration_share_pct: Option<f64>,
}

// ── View ─────────────────────────────────────────────────────────────────────

pub struct GeoView {
    config: GeoConfig,
}

impl GeoView {
    pub fn new(config: GeoConfig) -> Self {
        Self { config }
    }

    pub fn build_report(&self, orders: &[&OrderRecord]) -> GeoReport {
        let regions = region_stats(orders);
        let total_revenue: f64 = regions.iter().map(|r| r.revenue).sum();
        let share_of =
            |revenue: f64| (total_revenue > 0.0).then(|| revenue / total_revenue * 100.0);

        let top = regions.first();
        let top_region_revenue = top.map_or(0.0, |r| r.revenue);

        let top_n = self.config.top_regions;
        let top_by_revenue: Vec<RegionStats> = regions.iter().take(top_n).cloned().collect();

        let mut top_by_customers = regions.clone();
        top_by_customers.sort_by(|a, b| {
            b.customers
                .cmp(&a.customers)
                .then_with(|| b.revenue.total_cmp(&a.revenue))
                .then_with(|| a.region.cmp(&b.region))
        });
        top_by_customers.truncate(top_n);

        let mut revenue_shares: Vec<RevenueShare> = top_by_revenue
            .iter()
            .map(|r| RevenueShare {
                label: r.region.clone(),
                revenue: r.revenue,
                share_pct: share_of(r.revenue).unwrap_or(0.0),
            })
            .collect();
        if regions.len() > top_n {
            let others: f64 = regions.iter().skip(top_n).map(|r| r.revenue).sum();
            revenue_shares.push(RevenueShare {
                label: OTHERS_LABEL.to_string(),
                revenue: others,
                share_pct: share_of(others).unwrap_or(0.0),
            });
        }

        let head_revenue: f64 = regions
            .iter()
            .take(self.config.concentration_top_n)
            .map(|r| r.revenue)
            .sum();

        GeoReport {
            top_region: top.map(|r| r.region.clone()),
            top_region_revenue,
            top_region_share_pct: top.and_then(|r| share_of(r.revenue)),
            top_by_revenue,
            top_by_customers,
            revenue_shares,
            concentration_top_n: self.config.concentration_top_n,
            concentration_share_pct: share_of(head_revenue),
            regions,
        }
    }
}

impl DashboardView for GeoView {
    fn page(&self) -> Page {
        Page::Geo
    }

    fn render(&self, orders: &[&OrderRecord]) -> DashResult<ViewReport> {
        let report = self.build_report(orders);
        if let (Some(region), Some(share)) = (&report.top_region, report.concentration_share_pct) {
            log::debug!(
                "Geo view: top region {region}, top {} hold {share:.1}% of revenue",
                report.concentration_top_n
            );
        }
        Ok(ViewReport::Geo(report))
    }
}

// ── Aggregations ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct RegionAccumulator<'a> {
    customers: HashSet<&'a str>,
    orders: HashSet<&'a str>,
    revenue: f64,
}

fn region_stats(orders: &[&OrderRecord]) -> Vec<RegionStats> {
    let mut by_region: HashMap<&str, RegionAccumulator<'_>> = HashMap::new();
    for row in orders {
        let acc = by_region.entry(row.region.as_str()).or_default();
        acc.customers.insert(row.customer_id.as_str());
        acc.orders.insert(row.order_id.as_str());
        acc.revenue += row.payment_amount;
    }

    let mut stats: Vec<RegionStats> = by_region
        .into_iter()
        .map(|(region, acc)| RegionStats {
            region: region.to_owned(),
            customers: acc.customers.len(),
            orders: acc.orders.len(),
            revenue: acc.revenue,
            revenue_per_customer: acc.revenue / acc.customers.len() as f64,
        })
        .collect();
    stats.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.region.cmp(&b.region))
    });
    stats
}
