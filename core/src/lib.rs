//! ecomdash-core: descriptive analytics over an e-commerce order dataset.
//!
//! PIPELINE (one-directional, nothing writes back):
//!   1. dataset  : load the CSV into typed order rows
//!   2. filter   : narrow to a date range and optional region
//!   3. rfm      : per-customer recency/frequency/monetary scoring
//!   4. *_view   : aggregate the filtered rows into page reports
//!   5. dashboard: wires views together in a fixed order

pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod delivery_view;
pub mod error;
pub mod filter;
pub mod geo_view;
pub mod overview_view;
pub mod rfm;
pub mod rng;
pub mod segmentation_view;
pub mod synthetic;
pub mod types;
pub mod view;

pub use dashboard::Dashboard;
pub use dataset::{Dataset, DatasetCache, OrderRecord};
pub use error::{DashError, DashResult};
pub use filter::{FilterOptions, OrderFilter};
pub use rfm::{CustomerRfm, RfmEngine, Segment};
pub use view::{DashboardView, Page, ViewReport};
