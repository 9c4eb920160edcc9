//! Join and filter stage.
//!
//! `apply` turns a `Snapshot` and a `FilterSpec` into three mutually
//! consistent tables. It never fails: an impossible filter just yields empty
//! tables.

pub mod window;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

pub use window::DateWindow;

use crate::error::{Error, Result};
use crate::model::{DailyRecord, DailyTask, RowId, User, UserId};
use crate::snapshot::Snapshot;

/// Users hidden from the dashboard unless explicitly selected.
pub const DEFAULT_EXCLUDED_USERS: &[&str] = &[
    "Michael P",
    "Brandon Fernandez",
    "Haris Becirovic",
    "alexandergilardi",
];

/// Cohort selector. `All` disables the pod predicate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum PodSelector {
    #[default]
    All,
    Named(String),
}

impl PodSelector {
    /// `all` (any case) selects every pod; anything else names one.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            PodSelector::All
        } else {
            PodSelector::Named(s.to_string())
        }
    }

    pub fn matches(&self, pod_type: Option<&str>) -> bool {
        match self {
            PodSelector::All => true,
            PodSelector::Named(name) => pod_type == Some(name.as_str()),
        }
    }
}

/// Everything the operator selected. Cheap to clone, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub window: DateWindow,
    pub pod: PodSelector,
    pub included_user_ids: BTreeSet<UserId>,
}

impl FilterSpec {
    pub fn new(window: DateWindow, pod: PodSelector, included_user_ids: BTreeSet<UserId>) -> Self {
        Self {
            window,
            pod,
            included_user_ids,
        }
    }

    /// Every named user, every pod, the full data window.
    pub fn select_all(snapshot: &Snapshot) -> Self {
        Self::new(
            DateWindow::from_bounds(snapshot.date_bounds()),
            PodSelector::All,
            selectable_users(snapshot).map(|(u, _)| u.id.clone()).collect(),
        )
    }

    /// Every named user except those in `excluded`, every pod, the full
    /// data window.
    pub fn reset_default<S: AsRef<str>>(snapshot: &Snapshot, excluded: &[S]) -> Self {
        let excluded: HashSet<&str> = excluded.iter().map(|s| s.as_ref()).collect();
        let included = selectable_users(snapshot)
            .filter(|(_, name)| !excluded.contains(name))
            .map(|(u, _)| u.id.clone())
            .collect();
        Self::new(
            DateWindow::from_bounds(snapshot.date_bounds()),
            PodSelector::All,
            included,
        )
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_pod(mut self, pod: PodSelector) -> Self {
        self.pod = pod;
        self
    }

    pub fn with_users(mut self, ids: BTreeSet<UserId>) -> Self {
        self.included_user_ids = ids;
        self
    }
}

/// Users the operator can pick, with their names. Users without a
/// `full_name` are never selectable.
pub fn selectable_users(snapshot: &Snapshot) -> impl Iterator<Item = (&User, &str)> {
    snapshot
        .users
        .iter()
        .filter_map(|u| u.full_name.as_deref().map(|name| (u, name)))
}

/// A daily record left-joined to its user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    #[serde(flatten)]
    pub record: DailyRecord,
    pub full_name: Option<String>,
    pub pod_type: Option<String>,
}

/// The three tables after filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilteredView {
    pub users: Vec<User>,
    pub daily_records: Vec<JoinedRecord>,
    pub daily_tasks: Vec<DailyTask>,
}

impl FilteredView {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.daily_records.is_empty() && self.daily_tasks.is_empty()
    }

    /// Users keyed by id.
    pub fn user_index(&self) -> BTreeMap<&UserId, &User> {
        self.users.iter().map(|u| (&u.id, u)).collect()
    }
}

/// Left-join records to users. Records whose user is missing keep null
/// user columns.
pub fn join_records(records: &[DailyRecord], users: &[User]) -> Vec<JoinedRecord> {
    let by_id: BTreeMap<&UserId, &User> = users.iter().map(|u| (&u.id, u)).collect();
    records
        .iter()
        .map(|r| {
            let user = by_id.get(&r.user_id);
            JoinedRecord {
                record: r.clone(),
                full_name: user.and_then(|u| u.full_name.clone()),
                pod_type: user.and_then(|u| u.pod_type.clone()),
            }
        })
        .collect()
}

/// Apply `spec` to `snapshot`. Row order from the snapshot is preserved.
pub fn apply(snapshot: &Snapshot, spec: &FilterSpec) -> FilteredView {
    let users: Vec<User> = snapshot
        .users
        .iter()
        .filter(|u| spec.pod.matches(u.pod_type.as_deref()))
        .filter(|u| spec.included_user_ids.contains(&u.id))
        .cloned()
        .collect();

    // Under a named pod, records must belong to a user that survived it.
    let pod_members: Option<HashSet<&UserId>> = match spec.pod {
        PodSelector::All => None,
        PodSelector::Named(_) => Some(users.iter().map(|u| &u.id).collect()),
    };

    let daily_records: Vec<JoinedRecord> = join_records(&snapshot.daily_records, &snapshot.users)
        .into_iter()
        .filter(|r| spec.window.contains(r.record.date))
        .filter(|r| {
            pod_members
                .as_ref()
                .map_or(true, |members| members.contains(&r.record.user_id))
        })
        .filter(|r| spec.included_user_ids.contains(&r.record.user_id))
        .collect();

    let record_ids: HashSet<&RowId> = daily_records.iter().map(|r| &r.record.id).collect();
    let daily_tasks: Vec<DailyTask> = snapshot
        .daily_tasks
        .iter()
        .filter(|t| record_ids.contains(&t.daily_record_id))
        .cloned()
        .collect();

    log::debug!(
        "Filter kept {} users, {} records, {} tasks",
        users.len(),
        daily_records.len(),
        daily_tasks.len()
    );

    FilteredView {
        users,
        daily_records,
        daily_tasks,
    }
}

/// A user the operator can pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserOption {
    pub id: UserId,
    pub full_name: String,
}

/// Choices offered to the operator for the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
    pub pod_types: Vec<String>,
    pub users: Vec<UserOption>,
}

impl FilterOptions {
    /// Pods are the distinct non-null values, sorted. Unnamed users are
    /// left out.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let pod_types: BTreeSet<String> = snapshot
            .users
            .iter()
            .filter_map(|u| u.pod_type.clone())
            .collect();
        let users = selectable_users(snapshot)
            .map(|(u, name)| UserOption {
                id: u.id.clone(),
                full_name: name.to_string(),
            })
            .collect();
        Self {
            date_bounds: snapshot.date_bounds(),
            pod_types: pod_types.into_iter().collect(),
            users,
        }
    }
}

/// "Showing N of M users" plus who is left out. Counts named users only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    pub selected: usize,
    pub total: usize,
    pub excluded_names: Vec<String>,
}

impl SelectionSummary {
    pub fn new(snapshot: &Snapshot, spec: &FilterSpec) -> Self {
        let (included, excluded): (Vec<_>, Vec<_>) = selectable_users(snapshot)
            .partition(|(u, _)| spec.included_user_ids.contains(&u.id));
        Self {
            selected: included.len(),
            total: included.len() + excluded.len(),
            excluded_names: excluded.into_iter().map(|(_, name)| name.to_string()).collect(),
        }
    }
}

/// Resolve operator-supplied user references to ids. Each value matches an
/// id first, then every user with exactly that full name. Only named users
/// resolve.
pub fn resolve_users<S: AsRef<str>>(snapshot: &Snapshot, values: &[S]) -> Result<BTreeSet<UserId>> {
    let mut ids = BTreeSet::new();
    for value in values {
        let value = value.as_ref().trim();
        if let Some((user, _)) = selectable_users(snapshot).find(|(u, _)| u.id.as_str() == value) {
            ids.insert(user.id.clone());
            continue;
        }
        let by_name: Vec<&User> = selectable_users(snapshot)
            .filter(|(_, name)| *name == value)
            .map(|(u, _)| u)
            .collect();
        if by_name.is_empty() {
            return Err(Error::Config(format!("unknown user: {value}")));
        }
        ids.extend(by_name.into_iter().map(|u| u.id.clone()));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn user(id: i64, name: &str, pod: Option<&str>) -> User {
        User {
            id: RowId::from(id),
            full_name: Some(name.to_string()),
            pod_type: pod.map(str::to_string),
            has_completed_questionnaire: false,
        }
    }

    fn record(id: i64, user_id: i64, date: NaiveDate, done: bool) -> DailyRecord {
        DailyRecord {
            id: RowId::from(id),
            user_id: RowId::from(user_id),
            date,
            all_completed: done,
            created_at: None,
        }
    }

    fn task(id: i64, record_id: i64, done: bool) -> DailyTask {
        DailyTask {
            id: RowId::from(id),
            daily_record_id: RowId::from(record_id),
            task_id: RowId::from("walk"),
            task_text: None,
            completed: done,
            created_at: None,
        }
    }

    fn fixture() -> Snapshot {
        Snapshot::new(
            vec![
                user(1, "Ada", Some("alpha")),
                user(2, "Ben", Some("beta")),
                user(3, "Michael P", Some("alpha")),
                user(4, "Cy", None),
            ],
            vec![
                record(10, 1, d(2024, 1, 1), true),
                record(11, 1, d(2024, 1, 2), false),
                record(12, 2, d(2024, 1, 2), true),
                record(13, 3, d(2024, 1, 3), true),
                record(14, 99, d(2024, 1, 3), false),
            ],
            vec![task(100, 10, true), task(101, 11, false), task(102, 12, true), task(103, 13, true)],
        )
    }

    fn ids(ids: &[i64]) -> BTreeSet<UserId> {
        ids.iter().map(|i| RowId::from(*i)).collect()
    }

    #[test]
    fn test_join_keeps_orphans_with_null_user() {
        let snap = fixture();
        let joined = join_records(&snap.daily_records, &snap.users);
        assert_eq!(joined.len(), 5);
        assert_eq!(joined[0].full_name.as_deref(), Some("Ada"));
        assert!(joined[4].full_name.is_none());
        assert!(joined[4].pod_type.is_none());
    }

    #[test]
    fn test_select_all_keeps_everything_known() {
        let snap = fixture();
        let spec = FilterSpec::select_all(&snap);
        assert_eq!(spec.window, DateWindow::new(d(2024, 1, 1), d(2024, 1, 3)));
        let view = apply(&snap, &spec);
        assert_eq!(view.users.len(), 4);
        // The orphan record's user is not selectable.
        assert_eq!(view.daily_records.len(), 4);
        assert_eq!(view.daily_tasks.len(), 4);
    }

    #[test]
    fn test_reset_default_excludes_listed_names() {
        let snap = fixture();
        let spec = FilterSpec::reset_default(&snap, DEFAULT_EXCLUDED_USERS);
        assert_eq!(spec.included_user_ids, ids(&[1, 2, 4]));

        let summary = SelectionSummary::new(&snap, &spec);
        assert_eq!(summary.selected, 3);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.excluded_names, vec!["Michael P".to_string()]);
    }

    #[test]
    fn test_empty_selection_shows_nothing() {
        let snap = fixture();
        let spec = FilterSpec::select_all(&snap).with_users(BTreeSet::new());
        let view = apply(&snap, &spec);
        assert!(view.users.is_empty());
        assert!(view.daily_records.is_empty());
        assert!(view.daily_tasks.is_empty());
        assert!(view.is_empty());
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let snap = fixture();
        let spec = FilterSpec::select_all(&snap)
            .with_window(DateWindow::new(d(2024, 1, 2), d(2024, 1, 2)));
        let view = apply(&snap, &spec);
        let kept: Vec<_> = view.daily_records.iter().map(|r| r.record.id.clone()).collect();
        assert_eq!(kept, vec![RowId::from(11), RowId::from(12)]);
        // Users are not narrowed by the window.
        assert_eq!(view.users.len(), 4);
        let tasks: Vec<_> = view.daily_tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(tasks, vec![RowId::from(101), RowId::from(102)]);
    }

    #[test]
    fn test_named_pod_restricts_users_and_records() {
        let snap = fixture();
        let spec = FilterSpec::select_all(&snap).with_pod(PodSelector::parse("alpha"));
        let view = apply(&snap, &spec);
        let users: Vec<_> = view.users.iter().map(|u| u.id.clone()).collect();
        assert_eq!(users, vec![RowId::from(1), RowId::from(3)]);
        assert!(view
            .daily_records
            .iter()
            .all(|r| r.pod_type.as_deref() == Some("alpha")));
        assert_eq!(view.daily_records.len(), 3);
    }

    #[test]
    fn test_pod_and_users_combine() {
        let snap = fixture();
        let spec = FilterSpec::select_all(&snap)
            .with_pod(PodSelector::Named("alpha".into()))
            .with_users(ids(&[1, 2]));
        let view = apply(&snap, &spec);
        assert_eq!(view.users.len(), 1);
        assert_eq!(view.daily_records.len(), 2);
        assert_eq!(view.daily_tasks.len(), 2);
    }

    #[test]
    fn test_orphan_records_survive_when_user_id_included() {
        let snap = fixture();
        let spec = FilterSpec::select_all(&snap).with_users(ids(&[99]));
        let view = apply(&snap, &spec);
        assert!(view.users.is_empty());
        assert_eq!(view.daily_records.len(), 1);
        assert!(view.daily_records[0].full_name.is_none());
    }

    #[test]
    fn test_pod_selector_parse() {
        assert_eq!(PodSelector::parse("All"), PodSelector::All);
        assert_eq!(PodSelector::parse(" all "), PodSelector::All);
        assert_eq!(PodSelector::parse("beta"), PodSelector::Named("beta".into()));
        assert!(!PodSelector::parse("beta").matches(None));
        assert!(PodSelector::All.matches(None));
    }

    #[test]
    fn test_filter_options() {
        let opts = FilterOptions::from_snapshot(&fixture());
        assert_eq!(opts.pod_types, vec!["alpha".to_string(), "beta".to_string()]);
        assert_eq!(opts.users.len(), 4);
        assert_eq!(opts.date_bounds, Some((d(2024, 1, 1), d(2024, 1, 3))));
    }

    fn with_unnamed_user() -> Snapshot {
        let mut snap = Snapshot::new(
            vec![user(1, "A", None)],
            vec![record(10, 1, d(2024, 1, 1), true), record(11, 2, d(2024, 1, 1), false)],
            Vec::new(),
        );
        snap.users[0].has_completed_questionnaire = true;
        snap.users.push(User {
            id: RowId::from(2),
            full_name: None,
            pod_type: None,
            has_completed_questionnaire: false,
        });
        snap
    }

    #[test]
    fn test_unnamed_users_are_never_selected() {
        let snap = with_unnamed_user();
        for spec in [
            FilterSpec::select_all(&snap),
            FilterSpec::reset_default(&snap, DEFAULT_EXCLUDED_USERS),
        ] {
            assert_eq!(spec.included_user_ids, ids(&[1]));
            let view = apply(&snap, &spec);
            assert_eq!(view.users.len(), 1);
            assert_eq!(view.daily_records.len(), 1);

            let summary = SelectionSummary::new(&snap, &spec);
            assert_eq!((summary.selected, summary.total), (1, 1));
            assert!(summary.excluded_names.is_empty());
        }

        let opts = FilterOptions::from_snapshot(&snap);
        let names: Vec<_> = opts.users.iter().map(|u| u.full_name.as_str()).collect();
        assert_eq!(names, vec!["A"]);
        assert!(matches!(resolve_users(&snap, &["2"]), Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_users_by_id_and_name() {
        let snap = fixture();
        let resolved = resolve_users(&snap, &["2", "Ada"]).unwrap();
        assert_eq!(resolved, ids(&[1, 2]));
        assert!(matches!(resolve_users(&snap, &["Nobody"]), Err(Error::Config(_))));
    }
}
