use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{Row, Table, TableSource};
use crate::error::Result;

/// Time source for freshness checks.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Slot {
    fetched_at: Instant,
    rows: Vec<Row>,
}

/// One slot per table. A slot is fresh while its age is below the TTL, so a
/// zero TTL disables caching.
pub struct TableCache<C = SystemClock> {
    ttl: Duration,
    clock: C,
    slots: HashMap<Table, Slot>,
}

impl TableCache<SystemClock> {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(ttl, SystemClock)
    }
}

impl<C: Clock> TableCache<C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            slots: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Rows for `table` if they are still fresh.
    pub fn get(&self, table: Table) -> Option<&[Row]> {
        let slot = self.slots.get(&table)?;
        let age = self.clock.now().saturating_duration_since(slot.fetched_at);
        (age < self.ttl).then_some(slot.rows.as_slice())
    }

    /// Age of the cached copy of `table`, fresh or not.
    pub fn age(&self, table: Table) -> Option<Duration> {
        self.slots
            .get(&table)
            .map(|slot| self.clock.now().saturating_duration_since(slot.fetched_at))
    }

    pub fn insert(&mut self, table: Table, rows: Vec<Row>) {
        let fetched_at = self.clock.now();
        self.slots.insert(table, Slot { fetched_at, rows });
    }

    /// Drop every slot.
    pub fn invalidate(&mut self) {
        self.slots.clear();
    }
}

/// A `TableSource` fronted by a `TableCache`. Failed fetches are not cached.
pub struct CachedSource<S, C = SystemClock> {
    inner: S,
    cache: TableCache<C>,
}

impl<S: TableSource, C: Clock> CachedSource<S, C> {
    pub fn new(inner: S, cache: TableCache<C>) -> Self {
        Self { inner, cache }
    }

    pub async fn fetch(&mut self, table: Table) -> Result<Vec<Row>> {
        if let Some(rows) = self.cache.get(table) {
            log::debug!("Cache hit for {table} ({} rows)", rows.len());
            return Ok(rows.to_vec());
        }
        log::debug!("Cache miss for {table}");
        let rows = self.inner.fetch_table(table).await?;
        self.cache.insert(table, rows.clone());
        Ok(rows)
    }

    pub fn invalidate(&mut self) {
        log::info!("Invalidating cached tables");
        self.cache.invalidate();
    }

    pub fn cache(&self) -> &TableCache<C> {
        &self.cache
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}
