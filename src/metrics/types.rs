use chrono::NaiveDate;
use serde::Serialize;

use crate::date_util::{weekday_name, WEEKDAYS};
use crate::model::{RowId, UserId};

/// Completed items out of a total, with the rounded percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rate {
    pub completed: u64,
    pub total: u64,
    /// 0.0–100.0, one decimal place.
    pub pct: f64,
}

impl Rate {
    pub fn new(completed: u64, total: u64) -> Self {
        Self {
            completed,
            total,
            pct: super::completion_rate(completed, total),
        }
    }

    /// The `completed/total` caption shown under a headline number.
    pub fn delta(&self) -> String {
        format!("{}/{}", self.completed, self.total)
    }
}

/// The four numbers across the top of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeadlineMetrics {
    pub total_users: u64,
    pub questionnaire: Rate,
    pub daily_completion: Rate,
    pub task_completion: Rate,
}

/// A headline metric ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
    pub delta: Option<String>,
}

impl HeadlineMetrics {
    pub fn cards(&self) -> Vec<MetricCard> {
        vec![
            MetricCard {
                label: "Total Users",
                value: self.total_users.to_string(),
                delta: None,
            },
            MetricCard {
                label: "Questionnaire Rate",
                value: format!("{:.1}%", self.questionnaire.pct),
                delta: Some(self.questionnaire.delta()),
            },
            MetricCard {
                label: "Daily Completion Rate",
                value: format!("{:.1}%", self.daily_completion.pct),
                delta: Some(self.daily_completion.delta()),
            },
            MetricCard {
                label: "Task Completion Rate",
                value: format!("{:.1}%", self.task_completion.pct),
                delta: None,
            },
        ]
    }
}

/// Users per pod. `pod_type` is `None` for users without a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodCount {
    pub pod_type: Option<String>,
    pub users: u64,
}

impl PodCount {
    pub fn label(&self) -> &str {
        self.pod_type.as_deref().unwrap_or(super::UNSPECIFIED_POD)
    }
}

/// One day of the completion trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub rate: Rate,
}

/// A user's completion rate, for top/bottom rankings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRanking {
    pub user_id: UserId,
    pub name: String,
    #[serde(flatten)]
    pub rate: Rate,
}

/// Completion rate for one task type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskTypeRate {
    pub task_id: RowId,
    #[serde(flatten)]
    pub rate: Rate,
}

/// One ISO week of the heatmap. Cells run Monday to Sunday; each is the
/// share of records marked all-completed (0.0–1.0), 0.0 when empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub iso_year: i32,
    pub week: u32,
    pub cells: [f64; 7],
}

impl HeatmapRow {
    pub fn label(&self) -> String {
        format!("{}-W{:02}", self.iso_year, self.week)
    }
}

/// Week × weekday completion matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyHeatmap {
    pub weekdays: Vec<&'static str>,
    pub rows: Vec<HeatmapRow>,
}

impl Default for WeeklyHeatmap {
    fn default() -> Self {
        Self {
            weekdays: WEEKDAYS.iter().map(|d| weekday_name(*d)).collect(),
            rows: Vec::new(),
        }
    }
}
