use std::collections::{BTreeMap, HashMap, HashSet};

use crate::data::model::{Record, Row, Scalar};

use super::{Metric, sums_by_first_appearance};

/// Brands ranked by descending total sales. Ties keep first-appearance order.
///
/// Rows without a brand are ignored.
pub fn brand_order(rows: &[&Row]) -> Vec<String> {
    let mut totals = sums_by_first_appearance(rows, |r| r.brand.as_deref(), Metric::Sales);
    // `sort_by` is stable, so equal totals stay in first-appearance order.
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals.into_iter().map(|(brand, _)| brand.to_string()).collect()
}

/// Total volume for every brand in `brands_order`, in that order.
pub fn volume_totals(branded: &[&Row], brands_order: &[String]) -> Vec<Record> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for row in branded {
        if let Some(brand) = row.brand.as_deref() {
            *totals.entry(brand).or_insert(0.0) += row.volume();
        }
    }
    brands_order
        .iter()
        .map(|brand| {
            let total = totals.get(brand.as_str()).copied().unwrap_or(0.0);
            Record::new()
                .with("Brand", brand.as_str())
                .with(Metric::Volume.label(), total)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Brand pivot
// ---------------------------------------------------------------------------

/// Sums of a metric keyed by (`K`, brand). Columns are the brands of
/// `brands_order` that occur in the pivot input, in ranking order.
#[derive(Debug, Clone)]
pub struct BrandPivot<K> {
    columns: Vec<String>,
    cells: BTreeMap<K, HashMap<String, f64>>,
}

impl<K: Ord + Copy> BrandPivot<K> {
    /// Group brand-bearing rows by `key` × brand. Rows whose key is `None` do
    /// not take part, and neither do their brands.
    pub fn build<F>(rows: &[&Row], brands_order: &[String], metric: Metric, key: F) -> Self
    where
        F: Fn(&Row) -> Option<K>,
    {
        let mut cells: BTreeMap<K, HashMap<String, f64>> = BTreeMap::new();
        let mut present: HashSet<&str> = HashSet::new();
        for row in rows {
            let (Some(brand), Some(k)) = (row.brand.as_deref(), key(*row)) else {
                continue;
            };
            present.insert(brand);
            *cells
                .entry(k)
                .or_default()
                .entry(brand.to_string())
                .or_insert(0.0) += metric.of(row);
        }
        let columns = brands_order
            .iter()
            .filter(|b| present.contains(b.as_str()))
            .cloned()
            .collect();
        BrandPivot { columns, cells }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Keys present in the input, ascending.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.cells.keys().copied()
    }

    /// Sum for (`key`, `brand`), zero when no row matched.
    pub fn value(&self, key: K, brand: &str) -> f64 {
        self.cells
            .get(&key)
            .and_then(|by_brand| by_brand.get(brand))
            .copied()
            .unwrap_or(0.0)
    }

    /// One record per key of `axis`: `key_column` first, then one field per
    /// column brand. A brand named like `key_column` is left out.
    pub fn to_records<I, F, L>(&self, axis: I, key_column: &str, label: F) -> Vec<Record>
    where
        I: IntoIterator<Item = K>,
        F: Fn(K) -> L,
        L: Into<Scalar>,
    {
        let columns: Vec<&String> = self
            .columns
            .iter()
            .filter(|brand| {
                let clash = brand.as_str() == key_column;
                if clash {
                    log::warn!("brand {brand:?} clashes with the {key_column} column; left out");
                }
                !clash
            })
            .collect();
        axis.into_iter()
            .map(|k| {
                columns.iter().fold(
                    Record::new().with(key_column, label(k)),
                    |record, brand| {
                        let value = self.value(k, brand);
                        record.with(brand.as_str(), value)
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::sale;

    #[test]
    fn test_brand_order_by_descending_sales() {
        let rows = [
            sale(Some("Low"), "X", 2023, None, Some(1.0), None),
            sale(Some("High"), "X", 2023, None, Some(50.0), None),
            sale(Some("Mid"), "X", 2023, None, Some(10.0), None),
            sale(Some("Low"), "X", 2023, None, Some(2.0), None),
        ];
        let subset: Vec<&Row> = rows.iter().collect();
        assert_eq!(brand_order(&subset), vec!["High", "Mid", "Low"]);
    }

    #[test]
    fn test_brand_order_ties_keep_first_appearance() {
        let rows = [
            sale(Some("Zed"), "X", 2023, None, Some(5.0), None),
            sale(Some("Amy"), "X", 2023, None, Some(5.0), None),
            sale(Some("Bob"), "X", 2023, None, None, None),
            sale(Some("Cal"), "X", 2023, None, Some(9.0), None),
        ];
        let subset: Vec<&Row> = rows.iter().collect();
        assert_eq!(brand_order(&subset), vec!["Cal", "Zed", "Amy", "Bob"]);
    }

    #[test]
    fn test_brand_order_skips_missing_and_lists_once() {
        let rows = [
            sale(None, "X", 2023, None, Some(500.0), None),
            sale(Some("A"), "X", 2023, None, Some(1.0), None),
            sale(Some("A"), "X", 2023, None, Some(1.0), None),
        ];
        let subset: Vec<&Row> = rows.iter().collect();
        assert_eq!(brand_order(&subset), vec!["A"]);
    }

    #[test]
    fn test_volume_totals_cover_every_brand() {
        let rows = [
            sale(Some("A"), "X", 2023, None, Some(1.0), Some(3.0)),
            sale(Some("A"), "X", 2022, None, Some(1.0), Some(4.0)),
            sale(Some("B"), "X", 2023, None, Some(9.0), None),
        ];
        let subset: Vec<&Row> = rows.iter().collect();
        let order = brand_order(&subset);
        let totals = volume_totals(&subset, &order);
        assert_eq!(totals.len(), order.len());
        assert_eq!(
            totals,
            vec![
                Record::new().with("Brand", "B").with("Volume (kg)", 0.0),
                Record::new().with("Brand", "A").with("Volume (kg)", 7.0),
            ]
        );
    }

    #[test]
    fn test_brand_named_like_key_column_keeps_the_key() {
        let rows = [
            sale(Some("Year"), "X", 2023, None, Some(7.0), None),
            sale(Some("A"), "X", 2023, None, Some(1.0), None),
        ];
        let subset: Vec<&Row> = rows.iter().collect();
        let order = brand_order(&subset);
        let pivot = BrandPivot::build(&subset, &order, Metric::Sales, |r| r.year);
        let records = pivot.to_records(pivot.keys(), "Year", |year| year);
        assert_eq!(
            records,
            vec![Record::new().with("Year", 2023_i64).with("A", 1.0)]
        );
    }

    #[test]
    fn test_pivot_fills_missing_cells_with_zero() {
        let rows = [
            sale(Some("A"), "X", 2022, None, Some(1.0), None),
            sale(Some("B"), "X", 2023, None, Some(2.0), None),
        ];
        let subset: Vec<&Row> = rows.iter().collect();
        let order = vec!["B".to_string(), "A".to_string(), "Absent".to_string()];
        let pivot = BrandPivot::build(&subset, &order, Metric::Sales, |r| r.year);
        assert_eq!(pivot.columns(), ["B".to_string(), "A".to_string()]);
        assert_eq!(pivot.keys().collect::<Vec<_>>(), vec![2022_i64, 2023]);
        assert_eq!(pivot.value(2022, "B"), 0.0);
        assert_eq!(pivot.value(2023, "B"), 2.0);
    }
}
