pub mod types;

pub use types::*;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::date_util::days_inclusive;
use crate::filter::{FilteredView, JoinedRecord};
use crate::model::{DailyTask, RowId, User, UserId};

/// Rankings keep this many users.
pub const TOP_N: usize = 10;

/// Group label for users without a pod.
pub const UNSPECIFIED_POD: &str = "unspecified";

/// `100 * completed / total` rounded to one decimal, half away from zero.
/// Zero when `total` is zero.
pub fn completion_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = completed as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

pub fn headline(view: &FilteredView) -> HeadlineMetrics {
    let quiz_done = view
        .users
        .iter()
        .filter(|u| u.has_completed_questionnaire)
        .count() as u64;
    let days_done = view
        .daily_records
        .iter()
        .filter(|r| r.record.all_completed)
        .count() as u64;
    let tasks_done = view.daily_tasks.iter().filter(|t| t.completed).count() as u64;

    HeadlineMetrics {
        total_users: view.users.len() as u64,
        questionnaire: Rate::new(quiz_done, view.users.len() as u64),
        daily_completion: Rate::new(days_done, view.daily_records.len() as u64),
        task_completion: Rate::new(tasks_done, view.daily_tasks.len() as u64),
    }
}

/// Users per pod, largest first; ties by pod name, users without a pod last.
pub fn pod_distribution(users: &[User]) -> Vec<PodCount> {
    let mut counts: BTreeMap<Option<&str>, u64> = BTreeMap::new();
    for user in users {
        *counts.entry(user.pod_type.as_deref()).or_default() += 1;
    }
    let mut out: Vec<PodCount> = counts
        .into_iter()
        .map(|(pod, users)| PodCount {
            pod_type: pod.map(str::to_string),
            users,
        })
        .collect();
    out.sort_by(|a, b| {
        b.users
            .cmp(&a.users)
            .then_with(|| a.pod_type.is_none().cmp(&b.pod_type.is_none()))
            .then_with(|| a.pod_type.cmp(&b.pod_type))
    });
    out
}

/// Per-day completion rate covering every date from the first to the last
/// record, with empty days at zero.
pub fn daily_trend(records: &[JoinedRecord]) -> Vec<TrendPoint> {
    let mut by_day: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for r in records {
        let entry = by_day.entry(r.record.date).or_default();
        entry.1 += 1;
        if r.record.all_completed {
            entry.0 += 1;
        }
    }

    let (Some(first), Some(last)) = (
        by_day.keys().next().copied(),
        by_day.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    days_inclusive(first, last)
        .map(|date| {
            let (completed, total) = by_day.get(&date).copied().unwrap_or((0, 0));
            TrendPoint {
                date,
                rate: Rate::new(completed, total),
            }
        })
        .collect()
}

/// Users by share of fully-completed days, best first.
pub fn top_performers(view: &FilteredView, limit: usize) -> Vec<UserRanking> {
    let mut tallies: BTreeMap<&UserId, (u64, u64)> = BTreeMap::new();
    for r in &view.daily_records {
        let entry = tallies.entry(&r.record.user_id).or_default();
        entry.1 += 1;
        if r.record.all_completed {
            entry.0 += 1;
        }
    }

    let mut ranking = rankings(view, tallies);
    ranking.sort_by(|a, b| {
        b.rate
            .pct
            .total_cmp(&a.rate.pct)
            .then_with(|| by_name_then_id(a, b))
    });
    ranking.truncate(limit);
    ranking
}

/// Week × weekday mean of `all_completed`.
pub fn weekly_heatmap(records: &[JoinedRecord]) -> WeeklyHeatmap {
    let mut cells: BTreeMap<(i32, u32), [(u64, u64); 7]> = BTreeMap::new();
    for r in records {
        let week = r.record.date.iso_week();
        let day = r.record.date.weekday().num_days_from_monday() as usize;
        let row = cells.entry((week.year(), week.week())).or_default();
        row[day].1 += 1;
        if r.record.all_completed {
            row[day].0 += 1;
        }
    }

    let rows = cells
        .into_iter()
        .map(|((iso_year, week), tallies)| HeatmapRow {
            iso_year,
            week,
            cells: tallies.map(|(done, total)| {
                if total == 0 {
                    0.0
                } else {
                    done as f64 / total as f64
                }
            }),
        })
        .collect();

    WeeklyHeatmap {
        rows,
        ..WeeklyHeatmap::default()
    }
}

/// Completion per task type, worst first; ties by task id.
pub fn task_completion_by_type(tasks: &[DailyTask]) -> Vec<TaskTypeRate> {
    let mut tallies: BTreeMap<&RowId, (u64, u64)> = BTreeMap::new();
    for t in tasks {
        let entry = tallies.entry(&t.task_id).or_default();
        entry.1 += 1;
        if t.completed {
            entry.0 += 1;
        }
    }

    let mut out: Vec<TaskTypeRate> = tallies
        .into_iter()
        .map(|(task_id, (completed, total))| TaskTypeRate {
            task_id: task_id.clone(),
            rate: Rate::new(completed, total),
        })
        .collect();
    out.sort_by(|a, b| a.rate.pct.total_cmp(&b.rate.pct));
    out
}

/// Task completion per user, worst first.
pub fn task_completion_by_user(view: &FilteredView, limit: usize) -> Vec<UserRanking> {
    let owner: BTreeMap<&RowId, &UserId> = view
        .daily_records
        .iter()
        .map(|r| (&r.record.id, &r.record.user_id))
        .collect();

    let mut tallies: BTreeMap<&UserId, (u64, u64)> = BTreeMap::new();
    for t in &view.daily_tasks {
        let Some(user_id) = owner.get(&t.daily_record_id) else {
            continue;
        };
        let entry = tallies.entry(*user_id).or_default();
        entry.1 += 1;
        if t.completed {
            entry.0 += 1;
        }
    }

    let mut ranking = rankings(view, tallies);
    ranking.sort_by(|a, b| {
        a.rate
            .pct
            .total_cmp(&b.rate.pct)
            .then_with(|| by_name_then_id(a, b))
    });
    ranking.truncate(limit);
    ranking
}

/// Display name for a user id: the filtered user's name, else the name
/// carried on the joined record, else the id.
fn name_for(users: &BTreeMap<&UserId, &User>, view: &FilteredView, user_id: &UserId) -> String {
    if let Some(user) = users.get(user_id) {
        return user.display_name();
    }
    view.daily_records
        .iter()
        .find(|r| &r.record.user_id == user_id)
        .and_then(|r| r.full_name.clone())
        .unwrap_or_else(|| format!("user {user_id}"))
}

fn rankings(view: &FilteredView, tallies: BTreeMap<&UserId, (u64, u64)>) -> Vec<UserRanking> {
    let users = view.user_index();
    tallies
        .into_iter()
        .map(|(user_id, (completed, total))| UserRanking {
            user_id: user_id.clone(),
            name: name_for(&users, view, user_id),
            rate: Rate::new(completed, total),
        })
        .collect()
}

fn by_name_then_id(a: &UserRanking, b: &UserRanking) -> Ordering {
    a.name.cmp(&b.name).then_with(|| a.user_id.cmp(&b.user_id))
}
