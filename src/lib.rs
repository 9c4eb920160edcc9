pub mod config;
pub mod date_util;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod model;
pub mod report;
pub mod snapshot;
pub mod source;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use config::{KeyKind, StoreConfig, DEFAULT_CACHE_TTL};
pub use error::{Error, Result};
pub use filter::{
    DateWindow, FilterOptions, FilterSpec, FilteredView, PodSelector, SelectionSummary,
    DEFAULT_EXCLUDED_USERS,
};
pub use metrics::{HeadlineMetrics, MetricCard, Rate};
pub use model::{DailyRecord, DailyTask, RowId, User, UserId};
pub use report::DashboardReport;
pub use snapshot::{LoadWarning, Snapshot};
pub use source::{Backend, CachedSource, Clock, SystemClock, Table, TableCache, TableSource};

/// Main entry point: a table source behind a time-bounded cache.
pub struct Dashboard<S, C = SystemClock> {
    source: CachedSource<S, C>,
}

impl<S: TableSource> Dashboard<S, SystemClock> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self::with_cache(source, TableCache::with_ttl(ttl))
    }
}

impl<S: TableSource, C: Clock> Dashboard<S, C> {
    pub fn with_cache(source: S, cache: TableCache<C>) -> Self {
        Self {
            source: CachedSource::new(source, cache),
        }
    }

    /// Load a snapshot, serving tables from cache while they are fresh.
    /// Fails with `EmptyDataset` when no users could be loaded.
    pub async fn load(&mut self) -> Result<Snapshot> {
        let snapshot = Snapshot::load(&mut self.source).await?;
        snapshot.ensure_not_empty()?;
        log::info!(
            "Loaded {} users, {} daily records, {} daily tasks",
            snapshot.users.len(),
            snapshot.daily_records.len(),
            snapshot.daily_tasks.len()
        );
        Ok(snapshot)
    }

    /// Drop every cached table so the next load refetches.
    pub fn refresh(&mut self) {
        self.source.invalidate();
    }

    /// Write each table's raw rows to `{dir}/{table}.json`. Unlike `load`,
    /// any fetch failure aborts.
    pub async fn export(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let rows = self.source.fetch(table).await?;
            let path = source::directory::write_table(dir, table, &rows).await?;
            log::info!("Exported {} rows of {table} to {}", rows.len(), path.display());
            written.push(path);
        }
        Ok(written)
    }

    pub fn source(&self) -> &CachedSource<S, C> {
        &self.source
    }
}
