use crate::data::model::{Record, Row};

use super::{Metric, sums_by_first_appearance};

/// Absolute per-market totals of `metric`, markets in first-appearance order.
/// Brandless rows count; rows without a market are skipped.
pub fn market_share(rows: &[&Row], metric: Metric) -> Vec<Record> {
    sums_by_first_appearance(rows, |r| r.market.as_deref(), metric)
        .into_iter()
        .map(|(name, value)| Record::new().with("name", name).with("value", value))
        .collect()
}
