use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use crate::aggregate::ChartData;
use crate::data::catalog::{FilterOptions, compute_filter_options};
use crate::data::filter::{FilterSelection, apply_filters};
use crate::data::model::Table;
use crate::data::source::TableSource;
use crate::error::DashboardError;

// ---------------------------------------------------------------------------
// Query engine
// ---------------------------------------------------------------------------

/// Filter `table` once, then run the whole aggregation pipeline over the
/// subset. A panic inside the pipeline is reported as a computation error
/// rather than a partial result.
pub fn run_query(table: &Table, selection: &FilterSelection) -> Result<ChartData, DashboardError> {
    let started = Instant::now();
    let subset = apply_filters(table, selection);
    log::debug!("filter kept {} of {} rows", subset.len(), table.len());

    let integers = table.integer_metrics;
    let data = catch_unwind(AssertUnwindSafe(|| ChartData::compute_typed(&subset, integers)))
        .map_err(|panic| DashboardError::Computation(panic_message(panic.as_ref())))?;
    log::debug!("aggregated {} rows in {:?}", subset.len(), started.elapsed());
    Ok(data)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "aggregation panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// A response ready for the serving layer: a status code and a JSON body,
/// `{"error": "..."}` on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl ApiResponse {
    fn from_result<T: Serialize>(result: Result<T, DashboardError>) -> Self {
        let failure = match result {
            Ok(payload) => match serde_json::to_value(payload) {
                Ok(body) => return ApiResponse { status: 200, body },
                Err(e) => DashboardError::Computation(format!("serializing response: {e}")),
            },
            Err(e) => e,
        };
        log::warn!("request failed: {failure}");
        ApiResponse {
            status: failure.status(),
            body: json!({ "error": failure.to_string() }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Compact JSON text of the body.
    pub fn to_json(&self) -> String {
        self.body.to_string()
    }

    /// Indented JSON text of the body.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| self.to_json())
    }
}

// ---------------------------------------------------------------------------
// Dashboard – the two logical operations
// ---------------------------------------------------------------------------

/// Serves filter options and chart data from one table source. Holds no
/// per-request state, so one instance can serve concurrent requests.
pub struct Dashboard<S> {
    source: S,
}

impl<S: TableSource> Dashboard<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Distinct values for every filter dimension.
    pub fn filter_options(&self) -> Result<FilterOptions, DashboardError> {
        let table = self.source.load()?;
        Ok(compute_filter_options(&table))
    }

    /// Chart data for `selection`.
    pub fn chart_data(&self, selection: &FilterSelection) -> Result<ChartData, DashboardError> {
        let table = self.source.load()?;
        run_query(&table, selection)
    }

    /// `GET filters/`.
    pub fn handle_filter_options(&self) -> ApiResponse {
        ApiResponse::from_result(self.filter_options())
    }

    /// `GET chart-data/?<query>`. The query is parsed before the table is
    /// loaded, so a bad filter never touches the data.
    pub fn handle_chart_data(&self, query: &str) -> ApiResponse {
        let result = FilterSelection::from_query(query)
            .and_then(|selection| self.chart_data(&selection));
        ApiResponse::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;
    use std::sync::Arc;

    fn row(brand: &str, year: i64, month: i64, sales: f64, volume: f64, market: &str) -> Row {
        Row {
            brand: Some(brand.to_string()),
            pack_type: Some("Pouch".to_string()),
            ppg: Some("P1".to_string()),
            channel: Some("Retail".to_string()),
            market: Some(market.to_string()),
            year: Some(year),
            month: Some(month),
            sales_value: Some(sales),
            volume: Some(volume),
        }
    }

    fn dashboard() -> Dashboard<Arc<Table>> {
        Dashboard::new(Arc::new(Table::from_rows(vec![
            row("A", 2023, 1, 100.0, 10.0, "X"),
            row("B", 2023, 1, 50.0, 5.0, "X"),
        ])))
    }

    struct Unavailable;

    impl TableSource for Unavailable {
        fn load(&self) -> Result<Arc<Table>, DashboardError> {
            Err(DashboardError::DataUnavailable("fmcg_dataset.csv not found".into()))
        }
    }

    #[test]
    fn test_chart_data_response() {
        let response = dashboard().handle_chart_data("");
        assert!(response.is_success());
        assert_eq!(response.body["brands_order"], json!(["A", "B"]));
        assert_eq!(
            response.body["sales_by_year"],
            json!([{"Year": 2023, "Sales Value": 150.0}])
        );
        assert_eq!(
            response.body["sales_by_year_stacked"],
            json!([{"Year": 2023, "A": 100.0, "B": 50.0}])
        );
        assert_eq!(
            response.body["market_share_sales"],
            json!([{"name": "X", "value": 150.0}])
        );
        assert_eq!(
            response.body["sales_by_month_stacked"],
            json!([{"MonthLabel": "1-Jan", "A": 100.0, "B": 50.0}])
        );
    }

    #[test]
    fn test_unmatched_year_gives_empty_lists() {
        let response = dashboard().handle_chart_data("year=2022");
        assert!(response.is_success());
        let body = response.body.as_object().unwrap();
        assert_eq!(body.len(), 10);
        for (key, value) in body {
            assert_eq!(value.as_array().map(Vec::len), Some(0), "{key}");
        }
    }

    #[test]
    fn test_bad_filter_is_400() {
        let response = dashboard().handle_chart_data("year=abc");
        assert_eq!(response.status, 400);
        assert!(response.body["error"].as_str().unwrap().contains("abc"));
    }

    #[test]
    fn test_unavailable_source_is_error_payload() {
        let dashboard = Dashboard::new(Unavailable);
        let options = dashboard.handle_filter_options();
        assert_eq!(options.status, 503);
        assert!(options.body["error"].as_str().unwrap().contains("not found"));
        let chart = dashboard.handle_chart_data("brand=A");
        assert_eq!(chart.status, 503);
        assert_eq!(chart.body.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_filter_options_response() {
        let response = dashboard().handle_filter_options();
        assert_eq!(
            response.body,
            json!({
                "brands": ["A", "B"],
                "pack_types": ["Pouch"],
                "ppgs": ["P1"],
                "channels": ["Retail"],
                "years": [2023],
                "months": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            })
        );
    }

    #[test]
    fn test_identical_requests_are_byte_identical() {
        let dashboard = dashboard();
        let first = dashboard.handle_chart_data("brand=B&brand=A&month=1").to_json();
        let second = dashboard.handle_chart_data("brand=B&brand=A&month=1").to_json();
        assert_eq!(first, second);
    }
}
