//! Overview page: headline metrics, monthly order trend, review
//! distribution and top categories by revenue.

use crate::{
    config::OverviewConfig,
    dataset::OrderRecord,
    error::DashResult,
    types::MonthKey,
    view::{mean_of, DashboardView, Page, ViewReport},
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOrders {
    pub month: MonthKey,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewBucket {
    /// Exact score as loaded; fractional scores get their own bucket.
    pub score: f64,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub orders: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewReport {
    pub total_orders: usize,
    pub total_customers: usize,
    /// Sum of `total_payment` across item rows.
    pub total_revenue: f64,
    pub avg_review_score: Option<f64>,
    /// Ascending by month.
    pub monthly_orders: Vec<MonthlyOrders>,
    /// Ascending by score.
    pub review_distribution: Vec<ReviewBucket>,
    /// Descending by revenue.
    pub top_categories: Vec<CategoryRevenue>,
}

// ── View ─────────────────────────────────────────────────────────────────────

pub struct OverviewView {
    config: OverviewConfig,
}

impl OverviewView {
    pub fn new(config: OverviewConfig) -> Self {
        Self { config }
    }

    pub fn build_report(&self, orders: &[&OrderRecord]) -> OverviewReport {
        let total_orders = orders
            .iter()
            .map(|r| r.order_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let total_customers = orders
            .iter()
            .map(|r| r.customer_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        OverviewReport {
            total_orders,
            total_customers,
            total_revenue: orders.iter().map(|r| r.payment_amount).sum(),
            avg_review_score: mean_of(orders.iter().filter_map(|r| r.review_score)),
            monthly_orders: monthly_orders(orders),
            review_distribution: review_distribution(orders),
            top_categories: top_categories(orders, self.config.top_categories),
        }
    }
}

impl DashboardView for OverviewView {
    fn page(&self) -> Page {
        Page::Overview
    }

    fn render(&self, orders: &[&OrderRecord]) -> DashResult<ViewReport> {
        Ok(ViewReport::Overview(self.build_report(orders)))
    }
}

// ── Aggregations ─────────────────────────────────────────────────────────────

fn monthly_orders(orders: &[&OrderRecord]) -> Vec<MonthlyOrders> {
    let mut by_month: BTreeMap<MonthKey, HashSet<&str>> = BTreeMap::new();
    for row in orders {
        let month = row.purchase_timestamp.format("%Y-%m").to_string();
        by_month.entry(month).or_default().insert(row.order_id.as_str());
    }
    by_month
        .into_iter()
        .map(|(month, ids)| MonthlyOrders {
            month,
            orders: ids.len(),
        })
        .collect()
}

fn review_distribution(orders: &[&OrderRecord]) -> Vec<ReviewBucket> {
    let mut scores: Vec<f64> = orders.iter().filter_map(|r| r.review_score).collect();
    scores.sort_by(f64::total_cmp);

    let mut buckets: Vec<ReviewBucket> = Vec::new();
    for score in scores {
        match buckets.last_mut() {
            Some(bucket) if bucket.score == score => bucket.rows += 1,
            _ => buckets.push(ReviewBucket { score, rows: 1 }),
        }
    }
    buckets
}

fn top_categories(orders: &[&OrderRecord], limit: usize) -> Vec<CategoryRevenue> {
    let mut by_category: HashMap<&str, (HashSet<&str>, f64)> = HashMap::new();
    for row in orders {
        let Some(category) = row.category.as_deref() else {
            continue;
        };
        let entry = by_category.entry(category).or_default();
        entry.0.insert(row.order_id.as_str());
        entry.1 += row.payment_amount;
    }

    let mut ranked: Vec<CategoryRevenue> = by_category
        .into_iter()
        .map(|(category, (ids, revenue))| CategoryRevenue {
            category: category.to_owned(),
            orders: ids.len(),
            revenue,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.category.cmp(&b.category))
    });
    ranked.truncate(limit);
    ranked
}
