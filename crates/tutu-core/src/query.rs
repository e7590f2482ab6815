//! Status and directory-scope filtering for work item listings and batch selection.

use std::path::{Component, Path, PathBuf};

use crate::models::{ItemStatus, WorkItem};

/// Directory-hierarchy filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Items recorded in this directory or anywhere beneath it
    Current(PathBuf),
    Everywhere,
}

impl Scope {
    pub fn current(reference: impl AsRef<Path>) -> Self {
        Scope::Current(normalize(reference.as_ref()))
    }

    /// Whether an item recorded in `dir` falls inside this scope.
    ///
    /// Matching is lexical on normalized paths; nothing touches the
    /// filesystem. Items without a recorded directory are only visible
    /// under `Everywhere`.
    pub fn contains(&self, dir: Option<&Path>) -> bool {
        match self {
            Scope::Everywhere => true,
            Scope::Current(reference) => match dir {
                Some(dir) if !dir.as_os_str().is_empty() => {
                    // Component-wise: "/a/bc" is not under "/a/b"
                    normalize(dir).starts_with(normalize(reference))
                }
                _ => false,
            },
        }
    }
}

/// Listing filter: both parts are applied together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub include_done: bool,
    pub scope: Scope,
}

impl ItemFilter {
    pub fn new(include_done: bool, scope: Scope) -> Self {
        Self {
            include_done,
            scope,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusSet {
    /// Everything except `done`
    Open,
    All,
    /// `pending` and `in_progress`, the only statuses a batch touches
    Actionable,
}

impl StatusSet {
    fn sql(&self) -> &'static str {
        match self {
            StatusSet::Open => "(status IS NULL OR status != 'done')",
            StatusSet::All => "1 = 1",
            StatusSet::Actionable => "(status IS NULL OR status IN ('pending', 'in_progress'))",
        }
    }

    fn admits(&self, status: ItemStatus) -> bool {
        match self {
            StatusSet::Open => status != ItemStatus::Done,
            StatusSet::All => true,
            StatusSet::Actionable => matches!(status, ItemStatus::Pending | ItemStatus::InProgress),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortOrder {
    /// Freshest activity first, for listings
    RecentlyUpdated,
    /// Creation order, for batch runs
    OldestCreated,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            SortOrder::RecentlyUpdated => "updated_at DESC, id DESC",
            SortOrder::OldestCreated => "created_at ASC, id ASC",
        }
    }
}

/// A compiled selection: status and ordering run in SQL, scope runs in Rust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ItemQuery {
    pub(crate) statuses: StatusSet,
    pub(crate) scope: Scope,
    pub(crate) order: SortOrder,
}

impl ItemQuery {
    pub(crate) fn listing(filter: &ItemFilter) -> Self {
        Self {
            statuses: if filter.include_done {
                StatusSet::All
            } else {
                StatusSet::Open
            },
            scope: filter.scope.clone(),
            order: SortOrder::RecentlyUpdated,
        }
    }

    pub(crate) fn batch(scope: &Scope) -> Self {
        Self {
            statuses: StatusSet::Actionable,
            scope: scope.clone(),
            order: SortOrder::OldestCreated,
        }
    }

    /// `WHERE ... ORDER BY ...` tail for a select over the items table
    pub(crate) fn sql_tail(&self) -> String {
        format!("WHERE {} ORDER BY {}", self.statuses.sql(), self.order.sql())
    }

    pub(crate) fn retains(&self, item: &WorkItem) -> bool {
        self.statuses.admits(item.status)
            && self.scope.contains(item.working_directory.as_deref())
    }
}

/// Lexically normalize a path: drop `.` and trailing separators, fold `..`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_scope_exact_and_nested() {
        let scope = Scope::current("/a");
        assert!(scope.contains(Some(Path::new("/a"))));
        assert!(scope.contains(Some(Path::new("/a/b"))));
        assert!(scope.contains(Some(Path::new("/a/b/c/"))));
    }

    #[test]
    fn test_current_scope_rejects_sibling_prefix() {
        let scope = Scope::current("/a/b");
        assert!(!scope.contains(Some(Path::new("/a/bc"))));
        assert!(!scope.contains(Some(Path::new("/a"))));
        assert!(!scope.contains(Some(Path::new("/x/a/b"))));
    }

    #[test]
    fn test_current_scope_excludes_unrecorded_directory() {
        let scope = Scope::current("/a");
        assert!(!scope.contains(None));
        assert!(!scope.contains(Some(Path::new(""))));
        assert!(Scope::Everywhere.contains(None));
    }

    #[test]
    fn test_scope_normalizes_both_sides() {
        let scope = Scope::current("/a/./b/");
        assert!(scope.contains(Some(Path::new("/a/b/../b/c"))));
        assert_eq!(scope, Scope::Current(PathBuf::from("/a/b")));
    }

    #[test]
    fn test_root_reference_contains_everything_absolute() {
        let scope = Scope::current("/");
        assert!(scope.contains(Some(Path::new("/srv/app"))));
    }

    fn item(status: ItemStatus, dir: Option<&str>) -> WorkItem {
        let ts = crate::time::Timestamp::parse("2024-01-01 00:00:00");
        WorkItem {
            id: 1,
            title: "t".to_string(),
            description: None,
            context: None,
            status,
            working_directory: dir.map(PathBuf::from),
            created_at: ts.clone(),
            updated_at: ts,
            first_progress_at: None,
        }
    }

    #[test]
    fn test_listing_query_applies_status_and_scope() {
        let open_here = ItemQuery::listing(&ItemFilter::new(false, Scope::current("/w")));
        assert!(open_here.retains(&item(ItemStatus::Pending, Some("/w/x"))));
        assert!(open_here.retains(&item(ItemStatus::InProgress, Some("/w"))));
        assert!(!open_here.retains(&item(ItemStatus::Done, Some("/w"))));
        assert!(!open_here.retains(&item(ItemStatus::Pending, Some("/elsewhere"))));
        assert!(!open_here.retains(&item(ItemStatus::Pending, None)));

        let all = ItemQuery::listing(&ItemFilter::new(true, Scope::Everywhere));
        assert!(all.retains(&item(ItemStatus::Done, None)));
        assert_eq!(all.order, SortOrder::RecentlyUpdated);
    }

    #[test]
    fn test_batch_query_skips_done() {
        let batch = ItemQuery::batch(&Scope::Everywhere);
        assert!(batch.retains(&item(ItemStatus::Pending, None)));
        assert!(batch.retains(&item(ItemStatus::InProgress, None)));
        assert!(!batch.retains(&item(ItemStatus::Done, None)));
        assert_eq!(batch.order, SortOrder::OldestCreated);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/.")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }
}
