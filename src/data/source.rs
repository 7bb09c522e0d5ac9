use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;

use crate::error::DashboardError;

use super::loader::load_file;
use super::model::Table;

/// Provides the table a request operates on.
pub trait TableSource: Send + Sync {
    fn load(&self) -> Result<Arc<Table>, DashboardError>;
}

/// Reads the file on every call.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableSource for FileSource {
    fn load(&self) -> Result<Arc<Table>, DashboardError> {
        let started = Instant::now();
        let table = load_file(&self.path).map_err(|e| DashboardError::from_load(&e))?;
        log::info!(
            "loaded {} rows from {} in {:?}",
            table.len(),
            self.path.display(),
            started.elapsed()
        );
        Ok(Arc::new(table))
    }
}

/// Loads through `inner` at most once and serves the same immutable table to
/// every later caller. Concurrent first callers block on a single load; a
/// failed load is not cached.
pub struct CachedSource<S> {
    inner: S,
    table: OnceCell<Arc<Table>>,
}

impl<S: TableSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            table: OnceCell::new(),
        }
    }

    /// Whether a table has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }
}

impl<S: TableSource> TableSource for CachedSource<S> {
    fn load(&self) -> Result<Arc<Table>, DashboardError> {
        self.table
            .get_or_try_init(|| self.inner.load())
            .map(Arc::clone)
    }
}

/// A fixed in-memory table.
impl TableSource for Arc<Table> {
    fn load(&self) -> Result<Arc<Table>, DashboardError> {
        Ok(Arc::clone(self))
    }
}
