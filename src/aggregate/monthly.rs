use std::collections::{BTreeMap, BTreeSet};

use crate::data::model::{Record, Row};

use super::Metric;
use super::brand::BrandPivot;

/// Chart labels for months 1..=12.
pub const MONTH_LABELS: [&str; 12] = [
    "1-Jan", "2-Feb", "3-Mar", "4-Apr", "5-May", "6-Jun", "7-Jul", "8-Aug", "9-Sep", "10-Oct",
    "11-Nov", "12-Dec",
];

/// Label for a calendar month, `None` outside 1..=12.
pub fn month_label(month: i64) -> Option<&'static str> {
    usize::try_from(month)
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|i| MONTH_LABELS.get(i).copied())
}

/// The row's month when it is a valid calendar month.
pub fn valid_month(row: &Row) -> Option<i64> {
    row.month.filter(|m| (1..=12).contains(m))
}

/// The months present in a subset, in calendar order. Shared by every
/// month-keyed result so they all list the same months in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthAxis {
    months: Vec<i64>,
}

impl MonthAxis {
    /// `None` when no row carries a valid month.
    pub fn from_rows(rows: &[&Row]) -> Option<Self> {
        let months: BTreeSet<i64> = rows.iter().filter_map(|r| valid_month(r)).collect();
        if months.is_empty() {
            return None;
        }
        Some(MonthAxis {
            months: months.into_iter().collect(),
        })
    }

    pub fn months(&self) -> &[i64] {
        &self.months
    }
}

/// Brand × month pivot ordered by `axis`; the key column is `MonthLabel`.
pub fn stacked_by_month(
    branded: &[&Row],
    brands_order: &[String],
    axis: &MonthAxis,
    metric: Metric,
) -> Vec<Record> {
    let pivot = BrandPivot::build(branded, brands_order, metric, valid_month);
    pivot.to_records(axis.months().iter().copied(), "MonthLabel", label_of)
}

/// Per-month totals of `metric` ordered by `axis`.
pub fn totals_by_month(branded: &[&Row], axis: &MonthAxis, metric: Metric) -> Vec<Record> {
    let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
    for row in branded {
        if let Some(month) = valid_month(row) {
            *totals.entry(month).or_insert(0.0) += metric.of(row);
        }
    }
    axis.months()
        .iter()
        .map(|&m| {
            Record::new()
                .with("Month", label_of(m))
                .with(metric.label(), totals.get(&m).copied().unwrap_or(0.0))
        })
        .collect()
}

/// Sales per `"<year>-<month:02>"`, ascending by that key. Rows lacking a year
/// or a month are skipped; brandless rows count.
pub fn monthly_trend(rows: &[&Row]) -> Vec<Record> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        if let (Some(year), Some(month)) = (row.year, row.month) {
            *totals.entry(format!("{year}-{month:02}")).or_insert(0.0) += row.sales();
        }
    }
    totals
        .into_iter()
        .map(|(key, total)| {
            Record::new()
                .with("YearMonth", key)
                .with(Metric::Sales.label(), total)
        })
        .collect()
}

fn label_of(month: i64) -> &'static str {
    month_label(month).unwrap_or_default()
}
