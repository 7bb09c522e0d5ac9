//! Filter-and-aggregate query engine for an FMCG sales dashboard.
//!
//! A [`Dashboard`] answers the two requests the charts front end makes:
//! the filter options for its pickers, and the chart data for a filter
//! selection. Both read a [`Table`] through a [`TableSource`].

pub mod aggregate;
pub mod dashboard;
pub mod data;
pub mod error;

pub use aggregate::{ChartData, Metric, MonthlyCharts};
pub use dashboard::{ApiResponse, Dashboard, run_query};
pub use data::catalog::{FilterOptions, compute_filter_options};
pub use data::filter::{FilterSelection, apply_filters};
pub use data::loader::load_file;
pub use data::model::{IntegerMetrics, Record, Row, Scalar, Table};
pub use data::source::{CachedSource, FileSource, TableSource};
pub use error::DashboardError;
