use std::collections::BTreeMap;

use crate::data::model::{Record, Row};

use super::Metric;
use super::brand::BrandPivot;

/// Sum `metric` per year, ascending by year. Rows without a year are skipped.
pub fn totals_by_year(rows: &[&Row], metric: Metric) -> Vec<Record> {
    let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
    for row in rows {
        if let Some(year) = row.year {
            *totals.entry(year).or_insert(0.0) += metric.of(row);
        }
    }
    totals
        .into_iter()
        .map(|(year, total)| Record::new().with("Year", year).with(metric.label(), total))
        .collect()
}

/// Brand × year pivot: one record per year with a field per brand.
pub fn stacked_by_year(branded: &[&Row], brands_order: &[String], metric: Metric) -> Vec<Record> {
    let pivot = BrandPivot::build(branded, brands_order, metric, |row| row.year);
    pivot.to_records(pivot.keys(), "Year", |year| year)
}
