use std::collections::BTreeSet;

use serde::Serialize;

use super::model::{Row, Table};

/// The month picker is always the full calendar, never derived from data.
pub const ALL_MONTHS: [u32; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Distinct values usable as filter options, each list sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub brands: Vec<String>,
    pub pack_types: Vec<String>,
    pub ppgs: Vec<String>,
    pub channels: Vec<String>,
    pub years: Vec<i64>,
    pub months: Vec<u32>,
}

fn distinct_text<F>(table: &Table, field: F) -> Vec<String>
where
    F: Fn(&Row) -> Option<&String>,
{
    let set: BTreeSet<&String> = table.rows.iter().filter_map(field).collect();
    set.into_iter().cloned().collect()
}

/// Scan the categorical columns of `table` for their distinct non-missing values.
pub fn compute_filter_options(table: &Table) -> FilterOptions {
    let years: BTreeSet<i64> = table.rows.iter().filter_map(|r| r.year).collect();
    FilterOptions {
        brands: distinct_text(table, |r| r.brand.as_ref()),
        pack_types: distinct_text(table, |r| r.pack_type.as_ref()),
        ppgs: distinct_text(table, |r| r.ppg.as_ref()),
        channels: distinct_text(table, |r| r.channel.as_ref()),
        years: years.into_iter().collect(),
        months: ALL_MONTHS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(brand: Option<&str>, pack: &str, year: Option<i64>, month: Option<i64>) -> Row {
        Row {
            brand: brand.map(str::to_string),
            pack_type: Some(pack.to_string()),
            ppg: Some("P1".to_string()),
            channel: Some("Retail".to_string()),
            year,
            month,
            ..Row::default()
        }
    }

    #[test]
    fn test_options_are_distinct_and_sorted() {
        let table = Table::from_rows(vec![
            row(Some("Zest"), "Pouch", Some(2023), Some(4)),
            row(Some("Alpha"), "Can", Some(2021), Some(4)),
            row(Some("Zest"), "Can", Some(2022), None),
            row(None, "Pouch", None, Some(1)),
        ]);
        let options = compute_filter_options(&table);
        assert_eq!(options.brands, vec!["Alpha", "Zest"]);
        assert_eq!(options.pack_types, vec!["Can", "Pouch"]);
        assert_eq!(options.ppgs, vec!["P1"]);
        assert_eq!(options.channels, vec!["Retail"]);
        assert_eq!(options.years, vec![2021, 2022, 2023]);
    }

    #[test]
    fn test_months_are_always_full_calendar() {
        let options = compute_filter_options(&Table::default());
        assert_eq!(options.months, (1..=12).collect::<Vec<u32>>());
        assert!(options.brands.is_empty());
        assert!(options.years.is_empty());
    }

    #[test]
    fn test_sort_is_case_sensitive_lexicographic() {
        let table = Table::from_rows(vec![
            row(Some("beta"), "Can", None, None),
            row(Some("Beta"), "Can", None, None),
            row(Some("alpha"), "Can", None, None),
        ]);
        let options = compute_filter_options(&table);
        assert_eq!(options.brands, vec!["Beta", "alpha", "beta"]);
    }
}
