use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

// ---------------------------------------------------------------------------
// Cell – a single raw value read from a source file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a source file can carry.
/// Loaders produce `Cell`s; [`Row::from_cells`] coerces them per column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::String(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Null => write!(f, "<null>"),
        }
    }
}

impl Cell {
    /// Categorical reading: empty strings and nulls are missing.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::String(s) if s.is_empty() => None,
            Cell::Float(v) if v.is_nan() => None,
            other => Some(other.to_string()),
        }
    }

    /// Integer reading for `Year` / `Month`. Integral floats such as `2023.0`
    /// are accepted; anything else is missing.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Integer(i) => Some(*i),
            Cell::Float(v) => float_to_int(*v),
            Cell::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
            }
            Cell::Bool(_) | Cell::Null => None,
        }
    }

    /// Numeric reading for metric columns. Non-numeric text and NaN are missing.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Cell::Float(v) => *v,
            Cell::Integer(i) => *i as f64,
            Cell::String(s) => s.trim().parse::<f64>().ok()?,
            Cell::Bool(_) | Cell::Null => return None,
        };
        (!v.is_nan()).then_some(v)
    }

    /// Whether the cell holds an integer literal, as opposed to a float,
    /// non-numeric text or a missing value.
    pub fn is_integer(&self) -> bool {
        match self {
            Cell::Integer(_) => true,
            Cell::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        }
    }
}

fn float_to_int(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Column names of the source file
// ---------------------------------------------------------------------------

pub const COL_BRAND: &str = "Brand";
pub const COL_PACK_TYPE: &str = "PackType";
pub const COL_PPG: &str = "PPG";
pub const COL_CHANNEL: &str = "Channel";
pub const COL_MARKET: &str = "Market";
pub const COL_YEAR: &str = "Year";
pub const COL_MONTH: &str = "Month";
pub const COL_SALES_VALUE: &str = "SalesValue";
pub const COL_VOLUME: &str = "Volume";

/// Header columns every source file must provide. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    COL_BRAND,
    COL_PACK_TYPE,
    COL_PPG,
    COL_CHANNEL,
    COL_MARKET,
    COL_YEAR,
    COL_MONTH,
    COL_SALES_VALUE,
    COL_VOLUME,
];

// ---------------------------------------------------------------------------
// Row – one sales record
// ---------------------------------------------------------------------------

/// A single sales record. Every field may be missing in the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub brand: Option<String>,
    pub pack_type: Option<String>,
    pub ppg: Option<String>,
    pub channel: Option<String>,
    pub market: Option<String>,
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub sales_value: Option<f64>,
    pub volume: Option<f64>,
}

impl Row {
    /// Build a row from raw cells, looked up by column name.
    pub fn from_cells<'a, F>(mut cell: F) -> Self
    where
        F: FnMut(&str) -> Option<&'a Cell>,
    {
        let mut text = |col: &str| cell(col).and_then(Cell::as_text);
        let brand = text(COL_BRAND);
        let pack_type = text(COL_PACK_TYPE);
        let ppg = text(COL_PPG);
        let channel = text(COL_CHANNEL);
        let market = text(COL_MARKET);
        Row {
            brand,
            pack_type,
            ppg,
            channel,
            market,
            year: cell(COL_YEAR).and_then(Cell::as_int),
            month: cell(COL_MONTH).and_then(Cell::as_int),
            sales_value: cell(COL_SALES_VALUE).and_then(Cell::as_f64),
            volume: cell(COL_VOLUME).and_then(Cell::as_f64),
        }
    }

    /// Sales contribution; missing values count as zero.
    pub fn sales(&self) -> f64 {
        self.sales_value.unwrap_or(0.0)
    }

    /// Volume contribution; missing values count as zero.
    pub fn volume(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Which metric columns held nothing but integers in the source. Sums over
/// such a column are reported as integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegerMetrics {
    pub sales: bool,
    pub volume: bool,
}

impl IntegerMetrics {
    /// Starting point for a scan: integral until a cell says otherwise.
    pub fn unseen() -> Self {
        IntegerMetrics {
            sales: true,
            volume: true,
        }
    }

    /// Fold in one row's raw metric cells. A missing cell makes the column
    /// non-integral.
    pub fn observe(&mut self, sales: Option<&Cell>, volume: Option<&Cell>) {
        self.sales &= sales.is_some_and(Cell::is_integer);
        self.volume &= volume.is_some_and(Cell::is_integer);
    }
}

/// The full parsed dataset. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Row>,
    pub integer_metrics: IntegerMetrics,
}

impl Table {
    /// A table whose metric columns are treated as floats.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Table {
            rows,
            integer_metrics: IntegerMetrics::default(),
        }
    }

    pub fn with_integer_metrics(mut self, integer_metrics: IntegerMetrics) -> Self {
        self.integer_metrics = integer_metrics;
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// A scalar in an output record.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// One chart record: named fields in a fixed order. Serializes as a JSON object
/// whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Field names in output order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn fields(&self) -> &[(String, Scalar)] {
        &self.fields
    }

    /// Turn whole-number float values into integers.
    pub fn integral_values(&mut self) {
        for (_, value) in &mut self.fields {
            if let Scalar::Float(v) = *value {
                if let Some(i) = float_to_int(v) {
                    *value = Scalar::Int(i);
                }
            }
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
