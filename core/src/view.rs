//! View trait and page registry.
//!
//! RULE: Every dashboard page implements DashboardView.
//! A view receives the already-filtered rows and returns a report;
//! it never filters, caches or reaches for the dataset itself.
//! Registration order is fixed and documented in dashboard.rs.

use crate::{
    dataset::OrderRecord,
    delivery_view::DeliveryReport,
    error::DashResult,
    geo_view::GeoReport,
    overview_view::OverviewReport,
    segmentation_view::SegmentationReport,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The contract every page fulfills.
pub trait DashboardView {
    fn page(&self) -> Page;

    /// Aggregate the filtered rows into this page's report.
    fn render(&self, orders: &[&OrderRecord]) -> DashResult<ViewReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Overview,
    Delivery,
    #[serde(rename = "rfm", alias = "segmentation")]
    Segmentation,
    Geo,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Overview, Page::Delivery, Page::Segmentation, Page::Geo];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Delivery => "delivery",
            Self::Segmentation => "rfm",
            Self::Geo => "geo",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Overview => "Business Overview",
            Self::Delivery => "Delivery Performance",
            Self::Segmentation => "RFM Customer Segmentation",
            Self::Geo => "Geographic Distribution",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" => Ok(Self::Overview),
            "delivery" => Ok(Self::Delivery),
            "rfm" | "segmentation" => Ok(Self::Segmentation),
            "geo" | "geospatial" => Ok(Self::Geo),
            other => Err(format!("unknown page '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum ViewReport {
    Overview(OverviewReport),
    Delivery(DeliveryReport),
    #[serde(rename = "rfm")]
    Segmentation(SegmentationReport),
    Geo(GeoReport),
}

impl ViewReport {
    pub fn page(&self) -> Page {
        match self {
            Self::Overview(_) => Page::Overview,
            Self::Delivery(_) => Page::Delivery,
            Self::Segmentation(_) => Page::Segmentation,
            Self::Geo(_) => Page::Geo,
        }
    }
}

/// Mean of the present values, or None when there are none.
pub(crate) fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Percentage `part / whole * 100`, or None when `whole` is zero.
pub(crate) fn pct(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_parse_back() {
        for page in Page::ALL {
            assert_eq!(page.name().parse::<Page>().unwrap(), page);
        }
        assert_eq!("Segmentation".parse::<Page>().unwrap(), Page::Segmentation);
        assert!("charts".parse::<Page>().is_err());
    }

    #[test]
    fn page_serde_uses_short_names() {
        assert_eq!(serde_json::to_string(&Page::Segmentation).unwrap(), "\"rfm\"");
        let page: Page = serde_json::from_str("\"segmentation\"").unwrap();
        assert_eq!(page, Page::Segmentation);
    }

    #[test]
    fn mean_and_pct_handle_empty_input() {
        assert_eq!(mean_of(std::iter::empty()), None);
        assert_eq!(mean_of([1.0, 2.0, 6.0].into_iter()), Some(3.0));
        assert_eq!(pct(1, 0), None);
        assert_eq!(pct(1, 4), Some(25.0));
    }
}
