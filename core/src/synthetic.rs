//! Synthetic order data shaped like the Olist `main_data.csv` export.
//!
//! Used for demos and tests when the real dataset is not at hand.
//! Same seed and config = byte-identical rows.

use crate::{
    dataset::OrderRecord,
    error::DashResult,
    rng::{SeedBank, StreamRng, StreamSlot},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::io::Write;

/// Review-score weights (1..=5) by delivery outcome.
const REVIEW_WEIGHTS_ON_TIME: [f64; 5] = [0.06, 0.03, 0.08, 0.20, 0.63];
const REVIEW_WEIGHTS_LATE: [f64; 5] = [0.30, 0.10, 0.20, 0.20, 0.20];
const REVIEW_WEIGHTS_VERY_LATE: [f64; 5] = [0.55, 0.12, 0.13, 0.10, 0.10];
const REVIEW_WEIGHTS_UNDELIVERED: [f64; 5] = [0.75, 0.10, 0.08, 0.04, 0.03];

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub customers: usize,
    pub start: NaiveDate,
    /// Length of the purchase window in days.
    pub window_days: i64,
    /// Chance, per extra order, that a customer orders again.
    pub repeat_probability: f64,
    pub max_orders_per_customer: u32,
    pub max_items_per_order: u32,
    /// Region code and relative weight.
    pub regions: Vec<(String, f64)>,
    pub categories: Vec<String>,
    pub payment_x_min: f64,
    pub payment_alpha: f64,
    pub undelivered_probability: f64,
    pub missing_review_probability: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        let regions = [
            ("SP", 0.42),
            ("RJ", 0.13),
            ("MG", 0.12),
            ("RS", 0.055),
            ("PR", 0.05),
            ("SC", 0.036),
            ("BA", 0.034),
            ("DF", 0.021),
            ("GO", 0.020),
            ("ES", 0.020),
            ("PE", 0.017),
            ("CE", 0.013),
        ];
        let categories = [
            "bed_bath_table",
            "health_beauty",
            "sports_leisure",
            "furniture_decor",
            "computers_accessories",
            "housewares",
            "watches_gifts",
            "telephony",
            "garden_tools",
            "auto",
            "toys",
            "cool_stuff",
        ];
        Self {
            customers: 500,
            start: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or(NaiveDate::MIN),
            window_days: 600,
            repeat_probability: 0.12,
            max_orders_per_customer: 5,
            max_items_per_order: 3,
            regions: regions.iter().map(|(r, w)| (r.to_string(), *w)).collect(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            payment_x_min: 25.0,
            payment_alpha: 1.6,
            undelivered_probability: 0.03,
            missing_review_probability: 0.01,
        }
    }
}

/// Generate order-item rows sorted by purchase time.
pub fn generate(seed: u64, config: &SyntheticConfig) -> Vec<OrderRecord> {
    let bank = SeedBank::new(seed);
    let mut customers_rng = bank.for_stream(StreamSlot::Customers);
    let mut orders_rng = bank.for_stream(StreamSlot::Orders);
    let mut logistics_rng = bank.for_stream(StreamSlot::Logistics);
    let mut reviews_rng = bank.for_stream(StreamSlot::Reviews);

    let region_weights: Vec<f64> = config.regions.iter().map(|(_, w)| *w).collect();
    let mut rows = Vec::new();

    for _ in 0..config.customers {
        let customer_id = hex_id(&mut customers_rng);
        let region = config.regions[customers_rng.weighted_index(&region_weights)]
            .0
            .clone();

        let mut order_count = 1;
        while order_count < config.max_orders_per_customer
            && customers_rng.chance(config.repeat_probability)
        {
            order_count += 1;
        }

        for _ in 0..order_count {
            let order_id = hex_id(&mut orders_rng);
            let purchase = purchase_time(&mut orders_rng, config);
            let items = orders_rng.range_inclusive(1, config.max_items_per_order.max(1) as i64);

            let logistics = Logistics::roll(&mut logistics_rng, purchase, config);
            let review_score = if reviews_rng.chance(config.missing_review_probability) {
                None
            } else {
                let weights = logistics.review_weights();
                Some((reviews_rng.weighted_index(weights) + 1) as f64)
            };

            for _ in 0..items {
                let category = config
                    .categories
                    .get(orders_rng.next_u64_below(config.categories.len().max(1) as u64) as usize)
                    .cloned();
                let payment = orders_rng.pareto(config.payment_x_min, config.payment_alpha);

                rows.push(OrderRecord {
                    order_id: order_id.clone(),
                    customer_id: customer_id.clone(),
                    purchase_timestamp: purchase,
                    delivered_timestamp: logistics.delivered,
                    payment_amount: (payment * 100.0).round() / 100.0,
                    region: region.clone(),
                    review_score,
                    category,
                    delivery_days: logistics.delivery_days,
                    delay_days: logistics.delay_days,
                    is_delayed: logistics.delay_days.map(|d| d > 0.0),
                    is_satisfied: review_score.map(|s| s >= 4.0),
                    is_unsatisfied: review_score.map(|s| s <= 2.0),
                });
            }
        }
    }

    rows.sort_by(|a, b| {
        a.purchase_timestamp
            .cmp(&b.purchase_timestamp)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
    log::debug!(
        "Generated {} rows for {} customers (seed {seed})",
        rows.len(),
        config.customers
    );
    rows
}

/// Write rows with a header, using the loader's column names.
pub fn write_csv<W: Write>(rows: &[OrderRecord], writer: W) -> DashResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

// ── Internals ────────────────────────────────────────────────────────────────

struct Logistics {
    delivered: Option<NaiveDateTime>,
    delivery_days: Option<f64>,
    delay_days: Option<f64>,
}

impl Logistics {
    fn roll(rng: &mut StreamRng, purchase: NaiveDateTime, config: &SyntheticConfig) -> Self {
        if rng.chance(config.undelivered_probability) {
            return Self {
                delivered: None,
                delivery_days: None,
                delay_days: None,
            };
        }

        let estimated = rng.range_inclusive(10, 30);
        // mostly early, with a long late tail
        let actual = if rng.chance(0.9) {
            rng.range_inclusive(2, estimated)
        } else {
            estimated + rng.range_inclusive(1, 25)
        };
        let hours = rng.range_inclusive(0, 23);

        Self {
            delivered: Some(purchase + Duration::days(actual) + Duration::hours(hours)),
            delivery_days: Some(actual as f64),
            delay_days: Some((actual - estimated) as f64),
        }
    }

    fn review_weights(&self) -> &'static [f64; 5] {
        match self.delay_days {
            None => &REVIEW_WEIGHTS_UNDELIVERED,
            Some(d) if d <= 0.0 => &REVIEW_WEIGHTS_ON_TIME,
            Some(d) if d <= 7.0 => &REVIEW_WEIGHTS_LATE,
            Some(_) => &REVIEW_WEIGHTS_VERY_LATE,
        }
    }
}

fn purchase_time(rng: &mut StreamRng, config: &SyntheticConfig) -> NaiveDateTime {
    let day = rng.range_inclusive(0, config.window_days.max(1) - 1);
    let second = rng.range_inclusive(0, 86_399);
    config.start.and_time(chrono::NaiveTime::MIN) + Duration::days(day) + Duration::seconds(second)
}

/// 32-hex identifier drawn from the seeded stream.
fn hex_id(rng: &mut StreamRng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .simple()
        .to_string()
}
