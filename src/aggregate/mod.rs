//! Aggregation pipeline: every chart result computed from one filtered subset.
//!
//! ```text
//!   filtered rows ──┬── yearly   totals by year
//!                   ├── brand    brand order, brand × year pivots, brand totals
//!                   ├── monthly  month axis, brand × month pivots, month totals, trend
//!                   └── market   market share by sales / volume
//!                         │
//!                         ▼
//!                    ChartData
//! ```
//!
//! Each routine is a pure function of the rows it is given.

pub mod brand;
pub mod market;
pub mod monthly;
pub mod yearly;

use std::collections::HashMap;

use serde::Serialize;

use crate::data::model::{IntegerMetrics, Record, Row};

use self::monthly::MonthAxis;

/// The summed measure of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Sales,
    Volume,
}

impl Metric {
    /// Output column name for the summed value.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Sales => "Sales Value",
            Metric::Volume => "Volume (kg)",
        }
    }

    /// The row's contribution; missing values count as zero.
    pub fn of(self, row: &Row) -> f64 {
        match self {
            Metric::Sales => row.sales(),
            Metric::Volume => row.volume(),
        }
    }
}

/// Sums of `metric` grouped by `key`, groups in first-appearance order. Rows
/// whose key is `None` are skipped.
pub(crate) fn sums_by_first_appearance<'a, F>(
    rows: &[&'a Row],
    key: F,
    metric: Metric,
) -> Vec<(&'a str, f64)>
where
    F: Fn(&'a Row) -> Option<&'a str>,
{
    let mut sums: Vec<(&'a str, f64)> = Vec::new();
    let mut slots: HashMap<&'a str, usize> = HashMap::new();
    for &row in rows {
        let Some(group) = key(row) else {
            continue;
        };
        let slot = *slots.entry(group).or_insert_with(|| {
            sums.push((group, 0.0));
            sums.len() - 1
        });
        sums[slot].1 += metric.of(row);
    }
    sums
}

/// Month-keyed results. Present only when the subset has valid-month rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCharts {
    pub sales_by_month_stacked: Vec<Record>,
    pub volume_by_month_stacked: Vec<Record>,
    pub sales_by_month: Vec<Record>,
    pub volume_by_month: Vec<Record>,
}

impl MonthlyCharts {
    /// Every month-keyed result, ordered by the same shared `axis`.
    pub fn compute(branded: &[&Row], brands_order: &[String], axis: &MonthAxis) -> Self {
        MonthlyCharts {
            sales_by_month_stacked: monthly::stacked_by_month(
                branded,
                brands_order,
                axis,
                Metric::Sales,
            ),
            volume_by_month_stacked: monthly::stacked_by_month(
                branded,
                brands_order,
                axis,
                Metric::Volume,
            ),
            sales_by_month: monthly::totals_by_month(branded, axis, Metric::Sales),
            volume_by_month: monthly::totals_by_month(branded, axis, Metric::Volume),
        }
    }
}

/// The combined chart payload. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub sales_by_year: Vec<Record>,
    pub volume_by_year: Vec<Record>,
    pub brands_order: Vec<String>,
    pub sales_by_year_stacked: Vec<Record>,
    pub volume_by_year_stacked: Vec<Record>,
    pub brand_volume_totals: Vec<Record>,
    #[serde(flatten)]
    pub monthly: Option<MonthlyCharts>,
    pub year_wise_sales: Vec<Record>,
    pub monthly_sales: Vec<Record>,
    pub market_share_sales: Vec<Record>,
    pub market_share_volume: Vec<Record>,
}

impl ChartData {
    /// Run the whole pipeline over an already filtered subset.
    pub fn compute(rows: &[&Row]) -> Self {
        let branded: Vec<&Row> = rows.iter().copied().filter(|r| r.brand.is_some()).collect();
        let brands_order = brand::brand_order(&branded);

        let sales_by_year = yearly::totals_by_year(rows, Metric::Sales);
        let monthly_charts = MonthAxis::from_rows(&branded)
            .map(|axis| MonthlyCharts::compute(&branded, &brands_order, &axis));

        ChartData {
            year_wise_sales: sales_by_year.clone(),
            sales_by_year,
            volume_by_year: yearly::totals_by_year(rows, Metric::Volume),
            sales_by_year_stacked: yearly::stacked_by_year(&branded, &brands_order, Metric::Sales),
            volume_by_year_stacked: yearly::stacked_by_year(
                &branded,
                &brands_order,
                Metric::Volume,
            ),
            brand_volume_totals: brand::volume_totals(&branded, &brands_order),
            brands_order,
            monthly: monthly_charts,
            monthly_sales: monthly::monthly_trend(rows),
            market_share_sales: market::market_share(rows, Metric::Sales),
            market_share_volume: market::market_share(rows, Metric::Volume),
        }
    }

    /// [`ChartData::compute`], with sums over integer-only metric columns
    /// reported as integers.
    pub fn compute_typed(rows: &[&Row], integers: IntegerMetrics) -> Self {
        let mut data = Self::compute(rows);
        for (metric, integral) in [
            (Metric::Sales, integers.sales),
            (Metric::Volume, integers.volume),
        ] {
            if integral {
                for records in data.results_of_mut(metric) {
                    records.iter_mut().for_each(Record::integral_values);
                }
            }
        }
        data
    }

    /// Every result list whose values are sums of `metric`.
    fn results_of_mut(&mut self, metric: Metric) -> Vec<&mut Vec<Record>> {
        let monthly = self.monthly.as_mut();
        let mut lists = match metric {
            Metric::Sales => vec![
                &mut self.sales_by_year,
                &mut self.year_wise_sales,
                &mut self.sales_by_year_stacked,
                &mut self.monthly_sales,
                &mut self.market_share_sales,
            ],
            Metric::Volume => vec![
                &mut self.volume_by_year,
                &mut self.volume_by_year_stacked,
                &mut self.brand_volume_totals,
                &mut self.market_share_volume,
            ],
        };
        if let Some(m) = monthly {
            match metric {
                Metric::Sales => {
                    lists.extend([&mut m.sales_by_month_stacked, &mut m.sales_by_month])
                }
                Metric::Volume => {
                    lists.extend([&mut m.volume_by_month_stacked, &mut m.volume_by_month])
                }
            }
        }
        lists
    }
}
