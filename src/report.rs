use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::filter::{self, FilterSpec, FilteredView, SelectionSummary};
use crate::metrics::{
    self, HeadlineMetrics, MetricCard, PodCount, TaskTypeRate, TrendPoint, UserRanking,
    WeeklyHeatmap, TOP_N,
};
use crate::model::{RowId, User};
use crate::snapshot::{LoadWarning, Snapshot};

/// A daily record row in the detail table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDetail {
    pub full_name: Option<String>,
    pub date: NaiveDate,
    pub all_completed: bool,
    pub created_at: Option<NaiveDateTime>,
}

/// A task row in the detail table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDetail {
    pub user: Option<String>,
    pub task: Option<String>,
    pub completed: bool,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailTables {
    pub users: Vec<User>,
    pub daily_records: Vec<RecordDetail>,
    /// Newest first; rows without a timestamp last.
    pub daily_tasks: Vec<TaskDetail>,
}

/// Everything one render shows, computed from one snapshot and one filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub filter: FilterSpec,
    pub selection: SelectionSummary,
    pub headline: HeadlineMetrics,
    pub cards: Vec<MetricCard>,
    pub pod_distribution: Vec<PodCount>,
    pub daily_trend: Vec<TrendPoint>,
    pub top_performers: Vec<UserRanking>,
    pub weekly_heatmap: WeeklyHeatmap,
    pub task_completion_by_type: Vec<TaskTypeRate>,
    pub task_completion_by_user: Vec<UserRanking>,
    pub details: DetailTables,
    pub warnings: Vec<LoadWarning>,
}

/// Filter `snapshot` and compute every aggregate. Pure.
pub fn build(snapshot: &Snapshot, spec: &FilterSpec) -> DashboardReport {
    let view = filter::apply(snapshot, spec);
    let headline = metrics::headline(&view);

    DashboardReport {
        filter: spec.clone(),
        selection: SelectionSummary::new(snapshot, spec),
        cards: headline.cards(),
        headline,
        pod_distribution: metrics::pod_distribution(&view.users),
        daily_trend: metrics::daily_trend(&view.daily_records),
        top_performers: metrics::top_performers(&view, TOP_N),
        weekly_heatmap: metrics::weekly_heatmap(&view.daily_records),
        task_completion_by_type: metrics::task_completion_by_type(&view.daily_tasks),
        task_completion_by_user: metrics::task_completion_by_user(&view, TOP_N),
        details: detail_tables(&view),
        warnings: snapshot.warnings.clone(),
    }
}

pub fn detail_tables(view: &FilteredView) -> DetailTables {
    let users = view.user_index();
    let name_of = |user_id: &RowId| users.get(user_id).and_then(|u| u.full_name.clone());

    let daily_records = view
        .daily_records
        .iter()
        .map(|r| RecordDetail {
            full_name: name_of(&r.record.user_id),
            date: r.record.date,
            all_completed: r.record.all_completed,
            created_at: r.record.created_at,
        })
        .collect();

    let owner: BTreeMap<&RowId, &RowId> = view
        .daily_records
        .iter()
        .map(|r| (&r.record.id, &r.record.user_id))
        .collect();
    let mut daily_tasks: Vec<TaskDetail> = view
        .daily_tasks
        .iter()
        .map(|t| TaskDetail {
            user: owner.get(&t.daily_record_id).and_then(|uid| name_of(uid)),
            task: t.task_text.clone(),
            completed: t.completed,
            created_at: t.created_at,
        })
        .collect();
    daily_tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    DetailTables {
        users: view.users.clone(),
        daily_records,
        daily_tasks,
    }
}
