pub mod cache;
pub mod directory;
pub mod rest;

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Result;

pub use cache::{CachedSource, Clock, SystemClock, TableCache};
pub use directory::DirectorySource;
pub use rest::RestSource;

/// One fetched row: column name to raw value.
pub type Row = Map<String, Value>;

/// The three tables the dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Users,
    DailyRecords,
    DailyTasks,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Users, Table::DailyRecords, Table::DailyTasks];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::DailyRecords => "daily_records",
            Table::DailyTasks => "daily_tasks",
        }
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that can hand back every row of a table, unfiltered.
#[allow(async_fn_in_trait)]
pub trait TableSource {
    async fn fetch_table(&self, table: Table) -> Result<Vec<Row>>;
}

/// The sources the CLI can be pointed at.
pub enum Backend {
    Rest(RestSource),
    Directory(DirectorySource),
}

impl TableSource for Backend {
    async fn fetch_table(&self, table: Table) -> Result<Vec<Row>> {
        match self {
            Backend::Rest(src) => src.fetch_table(table).await,
            Backend::Directory(src) => src.fetch_table(table).await,
        }
    }
}

/// Convert a decoded JSON body into rows, rejecting anything that is not an
/// array of objects.
pub(crate) fn rows_from_value(table: Table, body: Value) -> Result<Vec<Row>> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            return Err(crate::error::Error::Fetch {
                table: table.name().to_string(),
                message: format!("expected a JSON array, got {}", kind_of(&other)),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(crate::error::Error::Fetch {
                table: table.name().to_string(),
                message: format!("row {i} is {}, not an object", kind_of(&other)),
            }),
        })
        .collect()
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
