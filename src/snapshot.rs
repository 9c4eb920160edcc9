use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{DailyRecord, DailyTask, User, UserId};
use crate::source::{CachedSource, Clock, Row, Table, TableSource};

/// A table that could not be loaded and was replaced by an empty one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadWarning {
    pub table: Table,
    pub message: String,
}

/// Point-in-time copy of the three tables.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub daily_records: Vec<DailyRecord>,
    pub daily_tasks: Vec<DailyTask>,
    pub warnings: Vec<LoadWarning>,
}

impl Snapshot {
    pub fn new(users: Vec<User>, daily_records: Vec<DailyRecord>, daily_tasks: Vec<DailyTask>) -> Self {
        Self {
            users,
            daily_records,
            daily_tasks,
            warnings: Vec::new(),
        }
    }

    /// Load all three tables. A table that fails to fetch or decode becomes
    /// empty and leaves a warning; only non-fetch errors abort.
    pub async fn load<S: TableSource, C: Clock>(source: &mut CachedSource<S, C>) -> Result<Self> {
        let mut warnings = Vec::new();
        let users = load_table(source, Table::Users, &mut warnings).await?;
        let daily_records = load_table(source, Table::DailyRecords, &mut warnings).await?;
        let daily_tasks = load_table(source, Table::DailyTasks, &mut warnings).await?;

        let snapshot = Self {
            users,
            daily_records,
            daily_tasks,
            warnings,
        };

        let duplicates = snapshot.duplicate_days();
        if !duplicates.is_empty() {
            log::warn!(
                "{} user/day pairs have more than one daily record; each record is counted",
                duplicates.len()
            );
        }
        Ok(snapshot)
    }

    /// Fails with `EmptyDataset` when there are no users to report on.
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.users.is_empty() {
            return Err(Error::EmptyDataset);
        }
        Ok(())
    }

    /// Earliest and latest record date.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.daily_records.iter().map(|r| r.date).min()?;
        let max = self.daily_records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// (user, date, count) for every user/day with more than one record.
    pub fn duplicate_days(&self) -> Vec<(UserId, NaiveDate, usize)> {
        let mut counts: BTreeMap<(&UserId, NaiveDate), usize> = BTreeMap::new();
        for r in &self.daily_records {
            *counts.entry((&r.user_id, r.date)).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|((user, date), n)| (user.clone(), date, n))
            .collect()
    }
}

async fn load_table<T, S, C>(
    source: &mut CachedSource<S, C>,
    table: Table,
    warnings: &mut Vec<LoadWarning>,
) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: TableSource,
    C: Clock,
{
    let result = match source.fetch(table).await {
        Ok(rows) => decode_rows(table, rows),
        Err(e) => Err(e),
    };
    match result {
        Ok(items) => Ok(items),
        Err(e) if e.is_recoverable_fetch() => {
            log::warn!("Loading {table} failed, continuing with an empty table: {e}");
            warnings.push(LoadWarning {
                table,
                message: e.to_string(),
            });
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Decode raw rows into typed entities. The first bad row fails the table.
pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            serde_json::from_value(serde_json::Value::Object(row)).map_err(|e| Error::Decode {
                table: table.name().to_string(),
                message: format!("row {i}: {e}"),
            })
        })
        .collect()
}
