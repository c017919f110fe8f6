use serde::{Deserialize, Serialize};

// ── Dataset ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    /// CSV path, relative to the working directory of the caller.
    pub path: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: "main_data.csv".into(),
        }
    }
}

// ── RFM scoring ────────────────────────────────────────────────────

/// What to do when an axis cannot be split into 5 non-degenerate quintiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Coinciding quintile edges are tolerated; each value takes the lowest
    /// quintile whose upper edge covers it.
    #[default]
    Collapse,
    /// Fail with `DashError::DegenerateDistribution`.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RfmConfig {
    /// Reference instant = latest purchase in the input + this many days.
    pub reference_offset_days: i64,
    pub degenerate_policy: DegeneratePolicy,
}

impl Default for RfmConfig {
    fn default() -> Self {
        Self {
            reference_offset_days: 1,
            degenerate_policy: DegeneratePolicy::Collapse,
        }
    }
}

// ── Views ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverviewConfig {
    pub top_categories: usize,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self { top_categories: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Upper bound (inclusive) of the first "late" band, in days.
    pub late_short_max_days: f64,
    /// Upper bound (inclusive) of the second "late" band, in days.
    pub late_medium_max_days: f64,
    /// Review score at or above which a row counts as satisfied when the
    /// dataset carries no `is_satisfied` column.
    pub satisfied_min_review: f64,
    /// Review score at or below which a row counts as unsatisfied.
    pub unsatisfied_max_review: f64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            late_short_max_days: 7.0,
            late_medium_max_days: 14.0,
            satisfied_min_review: 4.0,
            unsatisfied_max_review: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeoConfig {
    /// Regions shown individually in rankings and the revenue share split.
    pub top_regions: usize,
    /// Size of the head used for the concentration share.
    pub concentration_top_n: usize,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            top_regions: 10,
            concentration_top_n: 5,
        }
    }
}

// ── Root ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DashConfig {
    pub dataset: DatasetConfig,
    pub rfm: RfmConfig,
    pub overview: OverviewConfig,
    pub delivery: DeliveryConfig,
    pub geo: GeoConfig,
}

impl DashConfig {
    pub const FILE_NAME: &'static str = "dashboard.json";

    /// Load from `<config_dir>/dashboard.json`.
    /// Missing sections and keys fall back to their defaults.
    pub fn load(config_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{config_dir}/{}", Self::FILE_NAME);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DashConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;

        if config.delivery.late_short_max_days > config.delivery.late_medium_max_days {
            anyhow::bail!(
                "{path}: late_short_max_days ({}) exceeds late_medium_max_days ({})",
                config.delivery.late_short_max_days,
                config.delivery.late_medium_max_days
            );
        }

        log::debug!("Loaded dashboard config from {path}");
        Ok(config)
    }
}
