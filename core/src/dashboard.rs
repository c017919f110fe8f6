//! The dashboard: wires config, dataset and views together.
//!
//! REGISTRATION ORDER (fixed, documented, never reordered):
//!   1. Overview
//!   2. Delivery
//!   3. Segmentation (RFM)
//!   4. Geo
//!
//! RULES:
//!   - Every render call filters the shared dataset afresh.
//!   - Views never see unfiltered rows.
//!   - Nothing is retained between render calls.

use crate::{
    config::DashConfig,
    dataset::Dataset,
    delivery_view::DeliveryView,
    error::DashResult,
    filter::{FilterOptions, OrderFilter},
    geo_view::GeoView,
    overview_view::OverviewView,
    rfm::RfmEngine,
    segmentation_view::SegmentationView,
    view::{DashboardView, Page, ViewReport},
};
use anyhow::anyhow;
use std::sync::Arc;

pub struct Dashboard {
    dataset: Arc<Dataset>,
    views: Vec<Box<dyn DashboardView>>,
}

impl Dashboard {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            views: Vec::new(),
        }
    }

    /// Build a dashboard with all four views registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: DashConfig, dataset: Arc<Dataset>) -> Self {
        let mut dashboard = Dashboard::new(dataset);
        dashboard.register(Box::new(OverviewView::new(config.overview)));
        dashboard.register(Box::new(DeliveryView::new(config.delivery)));
        dashboard.register(Box::new(SegmentationView::new(RfmEngine::new(config.rfm))));
        dashboard.register(Box::new(GeoView::new(config.geo)));
        dashboard
    }

    /// Register a view. Call in the documented order.
    pub fn register(&mut self, view: Box<dyn DashboardView>) {
        self.views.push(view);
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn pages(&self) -> Vec<Page> {
        self.views.iter().map(|v| v.page()).collect()
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions::from_dataset(&self.dataset)
    }

    /// Render a single page for the given filter.
    pub fn render(&self, page: Page, filter: &OrderFilter) -> DashResult<ViewReport> {
        let view = self
            .views
            .iter()
            .find(|v| v.page() == page)
            .ok_or_else(|| anyhow!("Page '{page}' is not registered"))?;

        let orders = filter.apply(&self.dataset)?;
        view.render(&orders)
    }

    /// Render every registered page, in registration order.
    /// Stops at the first failing page.
    pub fn render_all(&self, filter: &OrderFilter) -> DashResult<Vec<ViewReport>> {
        let orders = filter.apply(&self.dataset)?;
        log::info!(
            "Rendering {} pages over {} filtered rows",
            self.views.len(),
            orders.len()
        );
        self.views.iter().map(|v| v.render(&orders)).collect()
    }
}
