/// Data layer: core types, loading, filter options and filtering.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table   (source: per-request or cached once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  Vec<Row>, read-only
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │ catalog   │   │  filter   │  apply selection → filtered rows
///   └──────────┘   └──────────┘
/// ```

pub mod catalog;
pub mod filter;
pub mod loader;
pub mod model;
pub mod source;
