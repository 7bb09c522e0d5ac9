//! Error taxonomy reported at the operation boundary.

use thiserror::Error;

/// Failure of a dashboard operation. Each variant carries a message suitable
/// for the `{"error": ...}` payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// The source table is missing or unreadable.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// A supplied filter value cannot be parsed into its expected type.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unexpected fault while loading or aggregating.
    #[error("computation error: {0}")]
    Computation(String),
}

impl DashboardError {
    /// HTTP-style status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            DashboardError::BadRequest(_) => 400,
            DashboardError::DataUnavailable(_) => 503,
            DashboardError::Computation(_) => 500,
        }
    }

    /// Classify a loader failure: an I/O cause anywhere in the chain means the
    /// data could not be read at all, anything else is a parse/schema fault.
    pub fn from_load(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let io_cause = err
            .chain()
            .any(|cause| cause.downcast_ref::<std::io::Error>().is_some());
        if io_cause {
            DashboardError::DataUnavailable(message)
        } else {
            DashboardError::Computation(message)
        }
    }
}
