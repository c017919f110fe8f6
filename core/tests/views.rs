//! Dashboard pages rendered end to end over a small hand-built dataset.

use chrono::NaiveDate;
use ecomdash_core::{
    config::DashConfig,
    dataset::parse_timestamp,
    delivery_view::DelayBand,
    geo_view::OTHERS_LABEL,
    overview_view::{OverviewView, ReviewBucket},
    segmentation_view::SegmentDetail,
    Dashboard, DashError, Dataset, OrderFilter, OrderRecord, Page, Segment, ViewReport,
};
use std::sync::Arc;

#[allow(clippy::too_many_arguments)]
fn row(
    order: &str,
    customer: &str,
    ts: &str,
    amount: f64,
    region: &str,
    review: Option<f64>,
    category: Option<&str>,
    delay: Option<f64>,
) -> OrderRecord {
    OrderRecord {
        order_id: order.into(),
        customer_id: customer.into(),
        purchase_timestamp: parse_timestamp(ts).unwrap(),
        delivered_timestamp: None,
        payment_amount: amount,
        region: region.into(),
        review_score: review,
        category: category.map(str::to_string),
        delivery_days: delay.map(|d| 10.0 + d),
        delay_days: delay,
        is_delayed: delay.map(|d| d > 0.0),
        is_satisfied: None,
        is_unsatisfied: None,
    }
}

/// Nine item rows, seven orders, five customers, three regions.
fn fixture() -> Arc<Dataset> {
    Arc::new(Dataset::new(vec![
        row("o1", "alice", "2018-01-03 10:00:00", 100.0, "SP", Some(5.0), Some("toys"), Some(-2.0)),
        row("o1", "alice", "2018-01-03 10:00:00", 50.0, "SP", Some(5.0), Some("auto"), Some(-2.0)),
        row("o2", "bob", "2018-01-20 09:30:00", 80.0, "RJ", Some(1.0), Some("toys"), Some(10.0)),
        row("o3", "carol", "2018-02-02 14:00:00", 20.0, "SP", Some(4.0), None, Some(3.0)),
        row("o4", "alice", "2018-02-10 08:00:00", 30.0, "SP", None, Some("toys"), Some(0.0)),
        row("o5", "dave", "2018-02-11 17:45:00", 200.0, "MG", Some(2.0), Some("auto"), Some(20.0)),
        row("o6", "erin", "2018-03-01 12:00:00", 5.0, "RJ", Some(3.0), Some("toys"), None),
        row("o7", "erin", "2018-03-05 12:00:00", 15.0, "RJ", Some(5.0), Some("auto"), Some(-1.0)),
        row("o7", "erin", "2018-03-05 12:00:00", 0.0, "RJ", Some(5.0), Some("auto"), Some(-1.0)),
    ]))
}

fn dashboard() -> Dashboard {
    let _ = env_logger::builder().is_test(true).try_init();
    Dashboard::build(DashConfig::default(), fixture())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn pages_are_registered_in_fixed_order() {
    assert_eq!(
        dashboard().pages(),
        vec![Page::Overview, Page::Delivery, Page::Segmentation, Page::Geo]
    );
}

#[test]
fn render_all_returns_one_report_per_page() {
    let reports = dashboard().render_all(&OrderFilter::all()).unwrap();
    let pages: Vec<Page> = reports.iter().map(ViewReport::page).collect();
    assert_eq!(pages, Page::ALL.to_vec());
}

#[test]
fn overview_headline_metrics() {
    let ViewReport::Overview(report) =
        dashboard().render(Page::Overview, &OrderFilter::all()).unwrap()
    else {
        panic!("expected overview report");
    };

    assert_eq!(report.total_orders, 7);
    assert_eq!(report.total_customers, 5);
    assert_close(report.total_revenue, 500.0);
    // eight rows carry a review: 5+5+1+4+2+3+5+5
    assert_close(report.avg_review_score.unwrap(), 30.0 / 8.0);

    let months: Vec<(&str, usize)> = report
        .monthly_orders
        .iter()
        .map(|m| (m.month.as_str(), m.orders))
        .collect();
    assert_eq!(months, vec![("2018-01", 2), ("2018-02", 3), ("2018-03", 2)]);

    let scores: Vec<(f64, usize)> = report
        .review_distribution
        .iter()
        .map(|b| (b.score, b.rows))
        .collect();
    assert_eq!(scores, vec![(1.0, 1), (2.0, 1), (3.0, 1), (4.0, 1), (5.0, 4)]);

    let categories: Vec<&str> = report.top_categories.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(categories, vec!["auto", "toys"]);
    assert_close(report.top_categories[0].revenue, 265.0);
    assert_eq!(report.top_categories[0].orders, 3);
    assert_close(report.top_categories[1].revenue, 215.0);
}

#[test]
fn delivery_rates_and_bands() {
    let ViewReport::Delivery(report) =
        dashboard().render(Page::Delivery, &OrderFilter::all()).unwrap()
    else {
        panic!("expected delivery report");
    };

    // five rows on time, three delayed, one unknown row counted in the total
    assert_close(report.on_time_rate_pct.unwrap(), 5.0 / 9.0 * 100.0);
    assert_eq!(report.delayed_rows, 3);
    assert_close(report.avg_review_delayed.unwrap(), 7.0 / 3.0);
    assert_close(report.avg_review_on_time.unwrap(), 20.0 / 4.0);

    let bands: Vec<(DelayBand, usize)> = report
        .satisfaction_by_delay
        .iter()
        .map(|b| (b.band, b.rows))
        .collect();
    assert_eq!(
        bands,
        vec![
            (DelayBand::OnTimeOrEarly, 5),
            (DelayBand::SlightlyLate, 1),
            (DelayBand::Late, 1),
            // erin's undelivered o6 joins dave's 20-day delay
            (DelayBand::VeryLate, 2),
        ]
    );

    let on_time = &report.satisfaction_by_delay[0];
    // alice x2 (5), alice o4 (no review), erin x2 (5)
    assert_close(on_time.satisfied_pct.unwrap(), 100.0);
    assert_close(on_time.unsatisfied_pct.unwrap(), 0.0);
    let very_late = &report.satisfaction_by_delay[3];
    assert_close(very_late.unsatisfied_pct.unwrap(), 50.0);
    assert_close(very_late.satisfied_pct.unwrap(), 0.0);
}

#[test]
fn segmentation_summarises_engine_output() {
    let ViewReport::Segmentation(report) =
        dashboard().render(Page::Segmentation, &OrderFilter::all()).unwrap()
    else {
        panic!("expected segmentation report");
    };

    let ids: Vec<&str> = report.customers.iter().map(|c| c.customer_id.as_str()).collect();
    assert_eq!(ids, vec!["alice", "bob", "carol", "dave", "erin"]);

    let total: usize = report.segment_counts.iter().map(|s| s.customers).sum();
    assert_eq!(total, 5);
    assert!(report
        .segment_counts
        .windows(2)
        .all(|w| w[0].customers <= w[1].customers));
    assert!(report
        .segment_revenue
        .windows(2)
        .all(|w| w[0].revenue >= w[1].revenue));

    let revenue: f64 = report.segment_revenue.iter().map(|s| s.revenue).sum();
    assert_close(revenue, 500.0);
    assert_close(report.avg_monetary, 100.0);
    assert_close(report.avg_frequency, 7.0 / 5.0);

    let champions = report
        .customers
        .iter()
        .filter(|c| c.segment == Segment::Champions)
        .count();
    assert_eq!(report.champions, champions);
}

#[test]
fn geo_ranks_regions_by_revenue() {
    let ViewReport::Geo(report) = dashboard().render(Page::Geo, &OrderFilter::all()).unwrap() else {
        panic!("expected geo report");
    };

    let regions: Vec<(&str, usize, usize)> = report
        .regions
        .iter()
        .map(|r| (r.region.as_str(), r.customers, r.orders))
        .collect();
    assert_eq!(regions, vec![("MG", 1, 1), ("SP", 2, 3), ("RJ", 2, 3)]);

    assert_eq!(report.top_region.as_deref(), Some("MG"));
    assert_close(report.top_region_revenue, 200.0);
    assert_close(report.top_region_share_pct.unwrap(), 40.0);
    assert_close(report.regions[1].revenue_per_customer, 100.0);

    // customer ties fall back to revenue
    let by_customers: Vec<&str> = report
        .top_by_customers
        .iter()
        .map(|r| r.region.as_str())
        .collect();
    assert_eq!(by_customers, vec!["SP", "RJ", "MG"]);
    assert_close(report.concentration_share_pct.unwrap(), 100.0);
    assert!(report.revenue_shares.iter().all(|s| s.label != OTHERS_LABEL));
}

#[test]
fn geo_folds_tail_into_others() {
    let mut config = DashConfig::default();
    config.geo.top_regions = 1;
    config.geo.concentration_top_n = 2;
    let dashboard = Dashboard::build(config, fixture());

    let ViewReport::Geo(report) = dashboard.render(Page::Geo, &OrderFilter::all()).unwrap() else {
        panic!("expected geo report");
    };
    let shares: Vec<(&str, f64)> = report
        .revenue_shares
        .iter()
        .map(|s| (s.label.as_str(), s.share_pct))
        .collect();
    assert_eq!(shares.len(), 2);
    assert_eq!(shares[0].0, "MG");
    assert_eq!(shares[1].0, OTHERS_LABEL);
    assert_close(shares[1].1, 60.0);
    assert_close(report.concentration_share_pct.unwrap(), 80.0);
}

#[test]
fn filters_narrow_every_page() {
    let filter = OrderFilter::between(date(2018, 2, 1), date(2018, 2, 28)).with_region("SP");
    let reports = dashboard().render_all(&filter).unwrap();

    let ViewReport::Overview(overview) = &reports[0] else {
        panic!("expected overview report");
    };
    assert_eq!(overview.total_orders, 2);
    assert_eq!(overview.total_customers, 2);
    assert_close(overview.total_revenue, 50.0);

    let ViewReport::Segmentation(rfm) = &reports[2] else {
        panic!("expected segmentation report");
    };
    let ids: Vec<&str> = rfm.customers.iter().map(|c| c.customer_id.as_str()).collect();
    assert_eq!(ids, vec!["carol", "alice"]);
    // alice's January order falls outside the range
    assert_eq!(rfm.customers[1].frequency, 1);
}

#[test]
fn unknown_region_empties_aggregates_but_fails_rfm() {
    let filter = OrderFilter::all().with_region("AC");
    let dashboard = dashboard();

    let ViewReport::Overview(overview) = dashboard.render(Page::Overview, &filter).unwrap() else {
        panic!("expected overview report");
    };
    assert_eq!(overview.total_orders, 0);
    assert_eq!(overview.avg_review_score, None);
    assert!(overview.monthly_orders.is_empty());

    let ViewReport::Geo(geo) = dashboard.render(Page::Geo, &filter).unwrap() else {
        panic!("expected geo report");
    };
    assert_eq!(geo.top_region, None);
    assert_eq!(geo.concentration_share_pct, None);

    let err = dashboard.render(Page::Segmentation, &filter).unwrap_err();
    assert!(matches!(err, DashError::EmptyInput));
}

#[test]
fn inverted_range_is_rejected_before_rendering() {
    let filter = OrderFilter::between(date(2018, 3, 1), date(2018, 1, 1));
    let err = dashboard().render_all(&filter).unwrap_err();
    assert!(matches!(err, DashError::InvalidDateRange { .. }));
}

#[test]
fn filter_options_cover_the_dataset() {
    let options = dashboard().filter_options();
    assert_eq!(options.min_date, Some(date(2018, 1, 3)));
    assert_eq!(options.max_date, Some(date(2018, 3, 5)));
    assert_eq!(options.regions, vec!["MG", "RJ", "SP"]);
}

#[test]
fn reports_serialise_with_page_tag() {
    let report = dashboard().render(Page::Segmentation, &OrderFilter::all()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["page"], "rfm");
    assert_eq!(json["customers"].as_array().unwrap().len(), 5);
}

#[test]
fn fractional_review_scores_keep_their_own_bucket() {
    let rows = [
        row("o1", "a", "2018-01-01", 10.0, "SP", Some(4.5), None, None),
        row("o2", "b", "2018-01-02", 10.0, "SP", Some(4.0), None, None),
        row("o3", "c", "2018-01-03", 10.0, "SP", Some(4.5), None, None),
        row("o4", "d", "2018-01-04", 10.0, "SP", Some(5.0), None, None),
    ];
    let orders: Vec<&OrderRecord> = rows.iter().collect();

    let report = OverviewView::new(DashConfig::default().overview).build_report(&orders);

    assert_eq!(
        report.review_distribution,
        vec![
            ReviewBucket { score: 4.0, rows: 1 },
            ReviewBucket { score: 4.5, rows: 2 },
            ReviewBucket { score: 5.0, rows: 1 },
        ]
    );
}

fn detail(
    segment: Segment,
    count: usize,
    recency: f64,
    frequency: f64,
    monetary: f64,
) -> SegmentDetail {
    SegmentDetail {
        segment,
        count,
        avg_recency: recency,
        avg_frequency: frequency,
        avg_monetary: monetary,
    }
}

#[test]
fn segment_details_are_rounded_means_in_rule_order() {
    // (customer, last purchase day, orders); spend is i/3 for the i-th customer
    let customers = [
        ("c1", 2, 1),
        ("c2", 3, 1),
        ("c3", 4, 2),
        ("c4", 20, 1),
        ("c5", 21, 2),
        ("c6", 22, 3),
        ("c7", 23, 3),
    ];
    let mut rows = Vec::new();
    for (i, &(customer, day, orders)) in customers.iter().enumerate() {
        for k in 0..orders {
            let amount = if k == 0 { (i + 1) as f64 / 3.0 } else { 0.0 };
            rows.push(row(
                &format!("{customer}-o{k}"),
                customer,
                &format!("2018-01-{:02} 12:00:00", day - k),
                amount,
                "SP",
                None,
                None,
                None,
            ));
        }
    }
    let dashboard = Dashboard::build(DashConfig::default(), Arc::new(Dataset::new(rows)));

    let ViewReport::Segmentation(report) =
        dashboard.render(Page::Segmentation, &OrderFilter::all()).unwrap()
    else {
        panic!("expected segmentation report");
    };

    assert_eq!(
        report.segment_details,
        vec![
            detail(Segment::Champions, 3, 2.0, 2.67, 2.0),
            detail(Segment::AtRisk, 1, 20.0, 2.0, 1.0),
            detail(Segment::Hibernating, 2, 21.5, 1.0, 0.5),
            detail(Segment::NeedAttention, 1, 4.0, 1.0, 1.33),
        ]
    );
    assert_eq!(report.champions, 3);
    assert_eq!(report.at_risk, 1);
}

#[test]
fn hand_registered_views_limit_the_pages() {
    let mut dashboard = Dashboard::new(fixture());
    dashboard.register(Box::new(OverviewView::new(DashConfig::default().overview)));

    assert_eq!(dashboard.pages(), vec![Page::Overview]);
    assert_eq!(dashboard.render_all(&OrderFilter::all()).unwrap().len(), 1);
    assert!(dashboard.render(Page::Geo, &OrderFilter::all()).is_err());
}
