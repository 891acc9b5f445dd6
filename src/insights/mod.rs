//! Business intelligence aggregation engine. Each submodule is a family of
//! pure functions over already-fetched, org-scoped row sets; the HTTP layer
//! in `routes::insights` wires them to the row fetchers.

pub mod compose;
pub mod customers;
pub mod growth;
pub mod numeric;
pub mod orders;
pub mod period;
pub mod products;
pub mod ranking;
pub mod revenue;

use crate::config::{AppConfig, DiscountRateBasis};

/// Default RFM label bands: composite score floor → segment label.
/// Scores run 3–15 (R + F + M, each 1–5).
const DEFAULT_RFM_BANDS: [(u8, &str); 5] = [
    (13, "Champions"),
    (10, "Loyal"),
    (7, "Promising"),
    (5, "At Risk"),
    (3, "Hibernating"),
];

/// Engine tunables, resolved once per process from configuration and passed
/// into the aggregators alongside an explicit reference date. Nothing in the
/// engine reads the global clock or the environment directly.
#[derive(Debug, Clone)]
pub struct InsightsSettings {
    pub discount_rate_basis: DiscountRateBasis,
    /// Days after `order_date` before an unpaid balance counts as overdue.
    pub overdue_grace_days: i64,
    /// Trailing window for retention/churn.
    pub churn_window_days: i64,
    pub default_top_limit: usize,
    pub max_period_days: Option<i64>,
    /// Score floor → label, ordered by descending floor.
    pub rfm_bands: Vec<(u8, String)>,
}

impl InsightsSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            discount_rate_basis: config.insights_discount_rate_basis,
            overdue_grace_days: config.insights_overdue_grace_days,
            churn_window_days: config.insights_churn_window_days,
            default_top_limit: config.insights_default_top_limit,
            max_period_days: config.insights_max_period_days,
            rfm_bands: config
                .insights_rfm_bands
                .clone()
                .unwrap_or_else(default_rfm_bands),
        }
    }

    pub fn rfm_label(&self, score: u8) -> &str {
        self.rfm_bands
            .iter()
            .find(|(floor, _)| score >= *floor)
            .map(|(_, label)| label.as_str())
            .unwrap_or("Hibernating")
    }
}

fn default_rfm_bands() -> Vec<(u8, String)> {
    DEFAULT_RFM_BANDS
        .iter()
        .map(|(floor, label)| (*floor, (*label).to_string()))
        .collect()
}

#[cfg(test)]
impl Default for InsightsSettings {
    fn default() -> Self {
        Self {
            discount_rate_basis: DiscountRateBasis::Subtotal,
            overdue_grace_days: 30,
            churn_window_days: 90,
            default_top_limit: 10,
            max_period_days: None,
            rfm_bands: default_rfm_bands(),
        }
    }
}
