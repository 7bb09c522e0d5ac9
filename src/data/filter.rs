use std::collections::BTreeSet;

use crate::error::DashboardError;

use super::model::{Row, Table};

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per dimension
// ---------------------------------------------------------------------------

/// Per-dimension selection. An empty set means "no restriction" on that
/// dimension, never "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub brands: BTreeSet<String>,
    pub pack_types: BTreeSet<String>,
    pub ppgs: BTreeSet<String>,
    pub channels: BTreeSet<String>,
    pub years: BTreeSet<i64>,
    pub months: BTreeSet<i64>,
}

impl FilterSelection {
    /// Decode a URL query string such as `brand=A&brand=B&year=2023`.
    pub fn from_query(query: &str) -> Result<Self, DashboardError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    /// Build a selection from repeated `key=value` parameters. Unknown keys are
    /// ignored; `year` and `month` values must parse as integers.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, DashboardError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut selection = FilterSelection::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "brand" => {
                    selection.brands.insert(value.to_string());
                }
                "pack_type" => {
                    selection.pack_types.insert(value.to_string());
                }
                "ppg" => {
                    selection.ppgs.insert(value.to_string());
                }
                "channel" => {
                    selection.channels.insert(value.to_string());
                }
                "year" => {
                    selection.years.insert(parse_int("year", value)?);
                }
                "month" => {
                    selection.months.insert(parse_int("month", value)?);
                }
                other => log::debug!("ignoring unknown filter parameter '{other}'"),
            }
        }
        Ok(selection)
    }

    /// Whether no dimension is restricted.
    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
            && self.pack_types.is_empty()
            && self.ppgs.is_empty()
            && self.channels.is_empty()
            && self.years.is_empty()
            && self.months.is_empty()
    }

    /// Whether `row` passes every active predicate.
    ///
    /// A row passes a dimension when:
    /// * the selection for that dimension is empty → passes (no constraint)
    /// * the row's value is in the selected set → passes
    /// * the row's value is missing → fails
    pub fn matches(&self, row: &Row) -> bool {
        text_passes(&self.brands, &row.brand)
            && text_passes(&self.pack_types, &row.pack_type)
            && text_passes(&self.ppgs, &row.ppg)
            && text_passes(&self.channels, &row.channel)
            && int_passes(&self.years, row.year)
            && int_passes(&self.months, row.month)
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, DashboardError> {
    value.trim().parse::<i64>().map_err(|_| {
        DashboardError::BadRequest(format!("invalid {name} filter value '{value}'"))
    })
}

fn text_passes(selected: &BTreeSet<String>, value: &Option<String>) -> bool {
    selected.is_empty() || value.as_ref().is_some_and(|v| selected.contains(v))
}

fn int_passes(selected: &BTreeSet<i64>, value: Option<i64>) -> bool {
    selected.is_empty() || value.is_some_and(|v| selected.contains(&v))
}

/// Return the rows that pass all active filters, in table order.
pub fn apply_filters<'a>(table: &'a Table, selection: &FilterSelection) -> Vec<&'a Row> {
    if selection.is_empty() {
        return table.rows.iter().collect();
    }
    table.rows.iter().filter(|row| selection.matches(row)).collect()
}
