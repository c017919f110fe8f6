//! Filter stage: narrows the dataset before any aggregation runs.

use crate::{
    dataset::{Dataset, OrderRecord},
    error::{DashError, DashResult},
    types::RegionCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date range plus optional region. `None` everywhere means "all rows".
///
/// The date range only applies when both bounds are set; it is inclusive
/// on calendar dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub region: Option<RegionCode>,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<RegionCode>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn validate(&self) -> DashResult<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(DashError::InvalidDateRange { start, end });
            }
        }
        Ok(())
    }

    pub fn matches(&self, row: &OrderRecord) -> bool {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            let date = row.purchase_date();
            if date < start || date > end {
                return false;
            }
        }
        match &self.region {
            Some(region) => row.region == *region,
            None => true,
        }
    }

    /// Rows passing the filter, in dataset order.
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> DashResult<Vec<&'a OrderRecord>> {
        self.validate()?;
        let rows: Vec<&OrderRecord> = dataset.rows().iter().filter(|r| self.matches(r)).collect();
        log::debug!(
            "Filter {:?}..{:?} region={:?}: {} of {} rows",
            self.start,
            self.end,
            self.region,
            rows.len(),
            dataset.len()
        );
        Ok(rows)
    }
}

/// What a presentation layer can offer as filter choices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub regions: Vec<RegionCode>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let bounds = dataset.date_bounds();
        Self {
            min_date: bounds.map(|(min, _)| min),
            max_date: bounds.map(|(_, max)| max),
            regions: dataset.regions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(order: &str, date: &str, region: &str) -> OrderRecord {
        OrderRecord {
            order_id: order.into(),
            customer_id: format!("cust-{order}"),
            purchase_timestamp: crate::dataset::parse_timestamp(date).unwrap(),
            delivered_timestamp: None,
            payment_amount: 10.0,
            region: region.into(),
            review_score: None,
            category: None,
            delivery_days: None,
            delay_days: None,
            is_delayed: None,
            is_satisfied: None,
            is_unsatisfied: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            row("a", "2018-01-01 08:00:00", "SP"),
            row("b", "2018-01-15 23:59:59", "RJ"),
            row("c", "2018-01-31 00:00:00", "SP"),
            row("d", "2018-02-01 00:00:00", "SP"),
        ])
    }

    #[test]
    fn date_range_is_inclusive_on_calendar_dates() {
        let dataset = sample();
        let rows = OrderFilter::between(date(2018, 1, 15), date(2018, 1, 31))
            .apply(&dataset)
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn region_narrows_within_range() {
        let dataset = sample();
        let rows = OrderFilter::between(date(2018, 1, 1), date(2018, 1, 31))
            .with_region("SP")
            .apply(&dataset)
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn half_open_range_is_ignored() {
        let dataset = sample();
        let filter = OrderFilter {
            start: Some(date(2018, 1, 20)),
            end: None,
            region: None,
        };
        assert_eq!(filter.apply(&dataset).unwrap().len(), 4);
    }

    #[test]
    fn inverted_range_is_an_error() {
        let dataset = sample();
        let err = OrderFilter::between(date(2018, 2, 1), date(2018, 1, 1))
            .apply(&dataset)
            .unwrap_err();
        assert!(matches!(err, DashError::InvalidDateRange { .. }));
    }

    #[test]
    fn options_list_bounds_and_sorted_regions() {
        let options = FilterOptions::from_dataset(&sample());
        assert_eq!(options.min_date, Some(date(2018, 1, 1)));
        assert_eq!(options.max_date, Some(date(2018, 2, 1)));
        assert_eq!(options.regions, vec!["RJ".to_string(), "SP".to_string()]);
    }
}
