//! Delivery performance page: delivery time, on-time rate, and how
//! lateness moves review scores and satisfaction.

use crate::{
    config::DeliveryConfig,
    dataset::OrderRecord,
    error::DashResult,
    view::{mean_of, pct, DashboardView, Page, ViewReport},
};
use serde::Serialize;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayBand {
    OnTimeOrEarly,
    SlightlyLate,
    Late,
    VeryLate,
}

impl DelayBand {
    pub const ALL: [DelayBand; 4] = [
        DelayBand::OnTimeOrEarly,
        DelayBand::SlightlyLate,
        DelayBand::Late,
        DelayBand::VeryLate,
    ];

    pub fn classify(delay_days: f64, config: &DeliveryConfig) -> DelayBand {
        if delay_days <= 0.0 {
            Self::OnTimeOrEarly
        } else if delay_days <= config.late_short_max_days {
            Self::SlightlyLate
        } else if delay_days <= config.late_medium_max_days {
            Self::Late
        } else {
            Self::VeryLate
        }
    }

    /// Band for a row's delay. Rows with no delay value (never delivered)
    /// land in the last band.
    pub fn for_delay(delay_days: Option<f64>, config: &DeliveryConfig) -> DelayBand {
        delay_days.map_or(Self::VeryLate, |d| Self::classify(d, config))
    }

    pub fn label(&self, config: &DeliveryConfig) -> String {
        match self {
            Self::OnTimeOrEarly => "On Time/Early".to_string(),
            Self::SlightlyLate => format!("1-{} days late", config.late_short_max_days),
            Self::Late => format!(
                "{}-{} days late",
                config.late_short_max_days + 1.0,
                config.late_medium_max_days
            ),
            Self::VeryLate => format!(">{} days late", config.late_medium_max_days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayBandSatisfaction {
    pub band: DelayBand,
    pub label: String,
    pub rows: usize,
    pub satisfied_pct: Option<f64>,
    pub unsatisfied_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub avg_delivery_days: Option<f64>,
    /// Rows explicitly not delayed, over all rows.
    pub on_time_rate_pct: Option<f64>,
    pub delayed_rows: usize,
    pub avg_review_on_time: Option<f64>,
    pub avg_review_delayed: Option<f64>,
    /// Always one entry per band, in band order.
    pub satisfaction_by_delay: Vec<DelayBandSatisfaction>,
}

// ── View ─────────────────────────────────────────────────────────────────────

pub struct DeliveryView {
    config: DeliveryConfig,
}

impl DeliveryView {
    pub fn new(config: DeliveryConfig) -> Self {
        Self { config }
    }

    /// `is_satisfied` when present, otherwise derived from the review score.
    pub fn satisfied(&self, row: &OrderRecord) -> Option<bool> {
        row.is_satisfied
            .or_else(|| row.review_score.map(|s| s >= self.config.satisfied_min_review))
    }

    /// `is_unsatisfied` when present, otherwise derived from the review score.
    pub fn unsatisfied(&self, row: &OrderRecord) -> Option<bool> {
        row.is_unsatisfied
            .or_else(|| row.review_score.map(|s| s <= self.config.unsatisfied_max_review))
    }

    pub fn build_report(&self, orders: &[&OrderRecord]) -> DeliveryReport {
        let on_time = orders.iter().filter(|r| r.is_delayed == Some(false)).count();
        let delayed_rows = orders.iter().filter(|r| r.is_delayed == Some(true)).count();

        DeliveryReport {
            avg_delivery_days: mean_of(orders.iter().filter_map(|r| r.delivery_days)),
            on_time_rate_pct: pct(on_time, orders.len()),
            delayed_rows,
            avg_review_on_time: mean_of(
                orders
                    .iter()
                    .filter(|r| r.is_delayed == Some(false))
                    .filter_map(|r| r.review_score),
            ),
            avg_review_delayed: mean_of(
                orders
                    .iter()
                    .filter(|r| r.is_delayed == Some(true))
                    .filter_map(|r| r.review_score),
            ),
            satisfaction_by_delay: self.satisfaction_by_delay(orders),
        }
    }

    fn satisfaction_by_delay(&self, orders: &[&OrderRecord]) -> Vec<DelayBandSatisfaction> {
        DelayBand::ALL
            .iter()
            .map(|&band| {
                let in_band: Vec<&OrderRecord> = orders
                    .iter()
                    .copied()
                    .filter(|r| DelayBand::for_delay(r.delay_days, &self.config) == band)
                    .collect();
                let share = |flag: Option<bool>| flag.map(|f| if f { 1.0 } else { 0.0 });

                DelayBandSatisfaction {
                    band,
                    label: band.label(&self.config),
                    rows: in_band.len(),
                    satisfied_pct: mean_of(in_band.iter().filter_map(|r| share(self.satisfied(r))))
                        .map(|m| m * 100.0),
                    unsatisfied_pct: mean_of(
                        in_band.iter().filter_map(|r| share(self.unsatisfied(r))),
                    )
                    .map(|m| m * 100.0),
                }
            })
            .collect()
    }
}

impl DashboardView for DeliveryView {
    fn page(&self) -> Page {
        Page::Delivery
    }

    fn render(&self, orders: &[&OrderRecord]) -> DashResult<ViewReport> {
        log::debug!("Delivery view over {} rows", orders.len());
        Ok(ViewReport::Delivery(self.build_report(orders)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_follow_configured_thresholds() {
        let config = DeliveryConfig::default();
        assert_eq!(DelayBand::classify(-3.0, &config), DelayBand::OnTimeOrEarly);
        assert_eq!(DelayBand::classify(0.0, &config), DelayBand::OnTimeOrEarly);
        assert_eq!(DelayBand::classify(0.5, &config), DelayBand::SlightlyLate);
        assert_eq!(DelayBand::classify(7.0, &config), DelayBand::SlightlyLate);
        assert_eq!(DelayBand::classify(14.0, &config), DelayBand::Late);
        assert_eq!(DelayBand::classify(14.1, &config), DelayBand::VeryLate);
    }

    #[test]
    fn missing_delay_counts_as_very_late() {
        let config = DeliveryConfig::default();
        assert_eq!(DelayBand::for_delay(None, &config), DelayBand::VeryLate);
        assert_eq!(DelayBand::for_delay(Some(-1.0), &config), DelayBand::OnTimeOrEarly);
    }

    #[test]
    fn undelivered_rows_fill_the_last_band() {
        let row = OrderRecord {
            order_id: "o1".into(),
            customer_id: "c1".into(),
            purchase_timestamp: crate::dataset::parse_timestamp("2018-03-01").unwrap(),
            delivered_timestamp: None,
            payment_amount: 20.0,
            region: "SP".into(),
            review_score: Some(1.0),
            category: None,
            delivery_days: None,
            delay_days: None,
            is_delayed: None,
            is_satisfied: None,
            is_unsatisfied: None,
        };
        let report = DeliveryView::new(DeliveryConfig::default()).build_report(&[&row]);

        let last = &report.satisfaction_by_delay[3];
        assert_eq!(last.band, DelayBand::VeryLate);
        assert_eq!(last.rows, 1);
        assert_eq!(last.unsatisfied_pct, Some(100.0));
        assert_eq!(last.satisfied_pct, Some(0.0));
        assert!(report.satisfaction_by_delay[..3].iter().all(|b| b.rows == 0));
    }

    #[test]
    fn default_labels_match_dashboard_wording() {
        let config = DeliveryConfig::default();
        let labels: Vec<String> = DelayBand::ALL.iter().map(|b| b.label(&config)).collect();
        assert_eq!(
            labels,
            vec!["On Time/Early", "1-7 days late", "8-14 days late", ">14 days late"]
        );
    }
}
