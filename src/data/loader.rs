use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{
    COL_MONTH, COL_SALES_VALUE, COL_VOLUME, COL_YEAR, Cell, IntegerMetrics, REQUIRED_COLUMNS,
    Row, Table,
};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sales table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`           – comma-delimited with a header row
/// * `.tsv` / `.tab`  – tab-delimited with a header row
/// * `.json`          – `[{ "Brand": "...", "Year": 2023, ... }, ...]`
/// * `.parquet`       – flat columns named like the CSV header
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_delimited(path, b',')?,
        "tsv" | "tab" => load_delimited(path, b'\t')?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    log::debug!("parsed {} rows from {}", table.len(), path.display());
    Ok(table)
}

fn check_required<'a, I>(present: I, source: &str) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = present.into_iter().collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !present.contains(col))
        .collect();
    if !missing.is_empty() {
        bail!("{source} missing required column(s): {}", missing.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Delimited loader
// ---------------------------------------------------------------------------

/// Cell text read as a missing value, in addition to the empty field. These
/// are the markers spreadsheet and dataframe exports write for NA.
pub const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_na(raw: &str) -> bool {
    raw.is_empty() || NA_TOKENS.contains(&raw)
}

/// Header row with column names; every cell is read as raw text and coerced
/// per column by [`Row::from_cells`].
fn load_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    read_delimited(file, delimiter)
}

/// Parse delimited text from any reader.
pub fn read_delimited<R: std::io::Read>(input: R, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    check_required(headers.iter().map(String::as_str), "CSV")?;

    // Map each required column to its position (first occurrence wins).
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        index.entry(h.as_str()).or_insert(i);
    }

    let mut rows = Vec::new();
    let mut integers = IntegerMetrics::unseen();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cells: HashMap<&str, Cell> = REQUIRED_COLUMNS
            .iter()
            .map(|&col| {
                let raw = index.get(col).and_then(|&i| record.get(i)).unwrap_or("");
                let cell = if is_na(raw) {
                    Cell::Null
                } else {
                    Cell::String(raw.to_string())
                };
                (col, cell)
            })
            .collect();
        integers.observe(cells.get(COL_SALES_VALUE), cells.get(COL_VOLUME));
        rows.push(Row::from_cells(|col| cells.get(col)));
    }

    Ok(Table::from_rows(rows).with_integer_metrics(integers))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Brand": "Alpha", "Market": "North", "Year": 2023, "Month": 1,
///     "SalesValue": 120.5, "Volume": 12.0, ... },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_json(&text)
}

/// Parse a records-oriented JSON document.
pub fn parse_json(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());
    let mut integers = IntegerMetrics::unseen();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        if i == 0 {
            check_required(obj.keys().map(String::as_str), "JSON")?;
        }
        let cells: HashMap<&str, Cell> = obj
            .iter()
            .map(|(k, v)| (k.as_str(), json_to_cell(v)))
            .collect();
        integers.observe(cells.get(COL_SALES_VALUE), cells.get(COL_VOLUME));
        rows.push(Row::from_cells(|col| cells.get(col)));
    }

    Ok(Table::from_rows(rows).with_integer_metrics(integers))
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Cell::Bool(*b),
        JsonValue::Null => Cell::Null,
        other => Cell::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per header field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`): dictionary-encoded categoricals, narrow
/// or unsigned integers, decimals and view strings are cast to the type each
/// column is read as. A column that cannot be cast fails the load.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    check_required(
        builder.schema().fields().iter().map(|f| f.name().as_str()),
        "Parquet file",
    )?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    let mut integers = IntegerMetrics::unseen();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let mut columns: Vec<(&str, ArrayRef)> = Vec::with_capacity(REQUIRED_COLUMNS.len());
        for &col in &REQUIRED_COLUMNS {
            let idx = schema
                .index_of(col)
                .with_context(|| format!("Parquet batch missing '{col}' column"))?;
            let array = batch.column(idx);
            let integral = array.data_type().is_integer() && array.null_count() == 0;
            match col {
                COL_SALES_VALUE => integers.sales &= integral,
                COL_VOLUME => integers.volume &= integral,
                _ => {}
            }
            columns.push((col, normalize_column(col, array)?));
        }

        for row in 0..batch.num_rows() {
            let cells: HashMap<&str, Cell> = columns
                .iter()
                .map(|(col, array)| (*col, extract_cell(array, row)))
                .collect();
            rows.push(Row::from_cells(|col| cells.get(col)));
        }
    }

    Ok(Table::from_rows(rows).with_integer_metrics(integers))
}

/// Cast a column to the Arrow type it is read as: `Int64` for integer
/// `Year`/`Month` columns, `Float64` for other `Year`/`Month` columns and the
/// metrics, `Utf8` for the categoricals. Values that do not convert become
/// null.
fn normalize_column(name: &str, array: &ArrayRef) -> Result<ArrayRef> {
    let from = array.data_type();
    let target = match name {
        COL_YEAR | COL_MONTH if from.is_integer() => DataType::Int64,
        COL_YEAR | COL_MONTH | COL_SALES_VALUE | COL_VOLUME => DataType::Float64,
        _ => DataType::Utf8,
    };
    if *from == target {
        return Ok(Arc::clone(array));
    }
    if !can_cast_types(from, &target) {
        bail!("Parquet column '{name}' has unsupported type {from:?}");
    }
    cast(array, &target)
        .with_context(|| format!("casting Parquet column '{name}' from {from:?} to {target:?}"))
}

/// Extract a single cell from a normalized Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> Cell {
    if col.is_null(row) {
        return Cell::Null;
    }
    match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map_or(Cell::Null, |a| Cell::String(a.value(row).to_string())),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map_or(Cell::Null, |a| Cell::Integer(a.value(row))),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map_or(Cell::Null, |a| Cell::Float(a.value(row))),
        // normalize_column leaves only the three types above.
        _ => Cell::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Brand,PackType,PPG,Channel,Market,Year,Month,SalesValue,Volume";

    #[test]
    fn test_read_delimited_coerces_columns() {
        let text = format!(
            "{HEADER},Extra\nAlpha,Pouch,P1,Retail,North,2023,1,100.5,10,ignored\n"
        );
        let table = read_delimited(text.as_bytes(), b',').unwrap();
        assert_eq!(table.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row.brand.as_deref(), Some("Alpha"));
        assert_eq!(row.market.as_deref(), Some("North"));
        assert_eq!(row.year, Some(2023));
        assert_eq!(row.month, Some(1));
        assert_eq!(row.sales_value, Some(100.5));
        assert_eq!(row.volume, Some(10.0));
    }

    #[test]
    fn test_read_delimited_missing_values() {
        let text = format!("{HEADER}\n,Pouch,P1,Retail,North,2023.0,,oops,5\n");
        let table = read_delimited(text.as_bytes(), b',').unwrap();
        let row = &table.rows[0];
        assert_eq!(row.brand, None);
        assert_eq!(row.year, Some(2023));
        assert_eq!(row.month, None);
        assert_eq!(row.sales_value, None);
        assert_eq!(row.volume, Some(5.0));
    }

    #[test]
    fn test_read_delimited_missing_column_is_error() {
        let text = "Brand,Year\nAlpha,2023\n";
        let err = read_delimited(text.as_bytes(), b',').unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("SalesValue"), "{msg}");
        assert!(msg.contains("Market"), "{msg}");
    }

    #[test]
    fn test_read_delimited_na_markers_are_missing() {
        let text = format!(
            "{HEADER}\n\
             NA,Pouch,P1,Retail,NULL,2023,N/A,#N/A,nan\n\
             A,<NA>,P1,None,North,2023,1,5,null\n\
             n/a,Pouch,P1,Retail,North,2023,2,NaN,1\n"
        );
        let table = read_delimited(text.as_bytes(), b',').unwrap();
        let first = &table.rows[0];
        assert_eq!(first.brand, None);
        assert_eq!(first.market, None);
        assert_eq!(first.month, None);
        assert_eq!(first.sales_value, None);
        assert_eq!(first.volume, None);
        assert_eq!(table.rows[1].pack_type, None);
        assert_eq!(table.rows[1].channel, None);
        assert_eq!(table.rows[2].brand, None);

        let options = crate::data::catalog::compute_filter_options(&table);
        assert_eq!(options.brands, vec!["A"]);
        assert_eq!(options.channels, vec!["Retail"]);
    }

    #[test]
    fn test_read_delimited_na_markers_match_exactly() {
        let text = format!("{HEADER}\nNAB, NA,P1,Retail,North,2023,1,5,1\n");
        let table = read_delimited(text.as_bytes(), b',').unwrap();
        assert_eq!(table.rows[0].brand.as_deref(), Some("NAB"));
        assert_eq!(table.rows[0].pack_type.as_deref(), Some(" NA"));
    }

    #[test]
    fn test_read_delimited_tracks_integer_metrics() {
        let text = format!(
            "{HEADER}\nA,Pouch,P1,Retail,North,2023,1,100,2.5\nB,Pouch,P1,Retail,North,2023,1,50,3\n"
        );
        let table = read_delimited(text.as_bytes(), b',').unwrap();
        assert!(table.integer_metrics.sales);
        assert!(!table.integer_metrics.volume);

        let text = format!("{HEADER}\nA,Pouch,P1,Retail,North,2023,1,NA,2\n");
        let table = read_delimited(text.as_bytes(), b',').unwrap();
        assert!(!table.integer_metrics.sales);
        assert!(table.integer_metrics.volume);
    }

    #[test]
    fn test_normalize_column_casts_dictionary_and_narrow_ints() {
        use arrow::array::{DictionaryArray, Int8Array, UInt16Array};
        use arrow::datatypes::Int32Type;

        let brands: DictionaryArray<Int32Type> = vec!["Aurora", "Brisk", "Aurora"]
            .into_iter()
            .collect();
        let brands: ArrayRef = Arc::new(brands);
        let brands = normalize_column("Brand", &brands).unwrap();
        assert_eq!(extract_cell(&brands, 1), Cell::String("Brisk".into()));
        assert_eq!(extract_cell(&brands, 2), Cell::String("Aurora".into()));

        let months: ArrayRef = Arc::new(Int8Array::from(vec![Some(3), None]));
        let months = normalize_column("Month", &months).unwrap();
        assert_eq!(extract_cell(&months, 0), Cell::Integer(3));
        assert_eq!(extract_cell(&months, 1), Cell::Null);

        let volume: ArrayRef = Arc::new(UInt16Array::from(vec![7]));
        let volume = normalize_column("Volume", &volume).unwrap();
        assert_eq!(extract_cell(&volume, 0), Cell::Float(7.0));
    }

    #[test]
    fn test_normalize_column_rejects_uncastable_type() {
        use arrow::array::ListArray;
        use arrow::datatypes::Int32Type;

        let nested: ArrayRef = Arc::new(ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
            Some(vec![Some(1), Some(2)]),
        ]));
        let err = normalize_column("SalesValue", &nested).unwrap_err();
        assert!(err.to_string().contains("SalesValue"), "{err}");
    }

    #[test]
    fn test_read_tab_delimited() {
        let text = format!(
            "{}\nAlpha\tCan\tP2\tOnline\tSouth\t2022\t12\t7\t0.5\n",
            HEADER.replace(',', "\t")
        );
        let table = read_delimited(text.as_bytes(), b'\t').unwrap();
        assert_eq!(table.rows[0].channel.as_deref(), Some("Online"));
        assert_eq!(table.rows[0].month, Some(12));
    }

    #[test]
    fn test_parse_json_records() {
        let text = r#"[
            {"Brand":"Alpha","PackType":"Pouch","PPG":"P1","Channel":"Retail",
             "Market":"North","Year":2023,"Month":2,"SalesValue":10,"Volume":1.5},
            {"Brand":null,"PackType":"Pouch","PPG":"P1","Channel":"Retail",
             "Market":"North","Year":2023.0,"Month":3,"SalesValue":"bad","Volume":2}
        ]"#;
        let table = parse_json(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].sales_value, Some(10.0));
        assert_eq!(table.rows[1].brand, None);
        assert_eq!(table.rows[1].year, Some(2023));
        assert_eq!(table.rows[1].sales_value, None);
    }

    #[test]
    fn test_parse_json_rejects_non_array() {
        assert!(parse_json(r#"{"Brand":"Alpha"}"#).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("sales.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }
}
