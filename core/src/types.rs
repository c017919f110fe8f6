//! Shared primitive types used across the entire crate.

/// Stable identifier of a real-world customer (`customer_unique_id`).
pub type CustomerId = String;

/// Order identifier. Several item rows may share one.
pub type OrderId = String;

/// Geographic region code, e.g. a Brazilian state such as `SP`.
pub type RegionCode = String;

/// Calendar month key formatted as `YYYY-MM`.
pub type MonthKey = String;
