//! Typed rows for the three store tables.
//!
//! The store hands back loosely-typed JSON. Identifiers may be integers or
//! UUID strings, booleans may be null, and `date` columns sometimes carry a
//! time component. The deserializers here absorb that so the pipeline can
//! work with plain Rust types.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::date_util::{parse_day, parse_timestamp};

/// Primary or foreign key. Equality is textual so integer and UUID keys
/// behave the same; ordering puts integer keys first, in numeric order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_int(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl Ord for RowId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_int(), other.as_int()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RowId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        RowId(id.to_string())
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        RowId(id.to_string())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        RowId(id)
    }
}

impl<'de> Deserialize<'de> for RowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Ok(RowId(n.to_string())),
            Value::String(s) => Ok(RowId(s)),
            other => Err(de::Error::custom(format!(
                "expected a numeric or string id, got {other}"
            ))),
        }
    }
}

pub type UserId = RowId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub pod_type: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub has_completed_questionnaire: bool,
}

impl User {
    /// Name shown in rankings and tables; falls back to the id.
    pub fn display_name(&self) -> String {
        match &self.full_name {
            Some(name) => name.clone(),
            None => format!("user {}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub id: RowId,
    pub user_id: UserId,
    #[serde(deserialize_with = "de_day")]
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "de_flag")]
    pub all_completed: bool,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: RowId,
    pub daily_record_id: RowId,
    pub task_id: RowId,
    #[serde(default)]
    pub task_text: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub completed: bool,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn de_day<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_day(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {raw}")))
}

fn de_opt_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_id_orders_integers_numerically() {
        let mut ids: Vec<RowId> = vec!["10".into(), "abc".into(), "9".into(), "-1".into()];
        ids.sort();
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["-1", "9", "10", "abc"]);
        assert!(RowId::from("01") < RowId::from("1"));
        assert_ne!(RowId::from("01"), RowId::from("1"));
    }

    #[test]
    fn test_row_id_accepts_numbers_and_strings() {
        let n: RowId = serde_json::from_value(json!(42)).unwrap();
        let s: RowId = serde_json::from_value(json!("42")).unwrap();
        assert_eq!(n, s);
        assert_eq!(n, RowId::from(42));

        let uuid: RowId =
            serde_json::from_value(json!("5f0c1c9e-8a43-4e0b-9d6c-2d3c6b0b1a77")).unwrap();
        assert_eq!(uuid.as_str(), "5f0c1c9e-8a43-4e0b-9d6c-2d3c6b0b1a77");

        assert!(serde_json::from_value::<RowId>(json!(null)).is_err());
    }

    #[test]
    fn test_user_nullable_columns() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "full_name": null,
            "pod_type": null,
            "has_completed_questionnaire": null,
            "email": "ignored@example.com"
        }))
        .unwrap();
        assert_eq!(user.id, RowId::from(7));
        assert!(user.full_name.is_none());
        assert!(!user.has_completed_questionnaire);
        assert_eq!(user.display_name(), "user 7");
    }

    #[test]
    fn test_daily_record_date_with_time_component() {
        let record: DailyRecord = serde_json::from_value(json!({
            "id": 10,
            "user_id": 1,
            "date": "2024-01-01T00:00:00",
            "all_completed": true,
            "created_at": "2024-01-01T21:04:11.52+00:00"
        }))
        .unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(record.all_completed);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_daily_record_rejects_bad_date() {
        let err = serde_json::from_value::<DailyRecord>(json!({
            "id": 10,
            "user_id": 1,
            "date": "soon"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_daily_task_defaults() {
        let task: DailyTask = serde_json::from_value(json!({
            "id": "t-1",
            "daily_record_id": 10,
            "task_id": "hydrate"
        }))
        .unwrap();
        assert!(!task.completed);
        assert!(task.task_text.is_none());
        assert!(task.created_at.is_none());
    }
}
