use std::{fmt::Display, ops::Deref};

use thiserror::Error;
use tracing::debug;

use crate::core::{
    distribute::{Distribution, distribute},
    planning::{Profile, Record},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cant save snapshot")]
    CantSaveSnapshot,
}

pub type SnapshotId = String;
pub type Cursor = String;

/// A distribution loaded back from a repository, with its storage id.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub id: SnapshotId,
    pub distribution: Distribution,
}

impl Display for StoredSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "{}", self.distribution)
    }
}

impl From<(SnapshotId, Distribution)> for StoredSnapshot {
    fn from(value: (SnapshotId, Distribution)) -> Self {
        Self {
            id: value.0,
            distribution: value.1,
        }
    }
}

/// Storage seam: where profiles come from and where snapshots go.
///
/// The engine itself persists nothing; callers keep what they need through
/// an implementation of this trait.
pub trait DistributionRepo {
    fn location(&self) -> &str;
    fn get_profile(&self) -> Option<Profile>;
    fn save_snapshot(&self, distribution: Distribution) -> Result<SnapshotId, Error>;
    fn snapshot_ids<'r>(
        &'r self,
        from: Option<Cursor>,
        limit: usize,
    ) -> Box<dyn Iterator<Item = SnapshotId> + 'r>;
    fn snapshot_by_id(&self, id: &SnapshotId) -> Option<StoredSnapshot>;
}

pub fn get_profile<R: DistributionRepo>(repo: &R) -> Option<Profile> {
    repo.get_profile()
}

/// Runs the engine for a record. The computation is total: it cannot fail.
#[must_use]
pub fn settle(record: &Record) -> Distribution {
    distribute(record)
}

pub fn save_snapshot<R: DistributionRepo>(
    distribution: Distribution,
    repo: &R,
) -> Result<SnapshotId, Error> {
    repo.save_snapshot(distribution)
}

#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> Deref for Page<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<Cursor>) -> Self {
        Self { items, next_cursor }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn snapshot_ids<R: DistributionRepo>(
    repo: &R,
    from: Option<Cursor>,
    limit: usize,
) -> Page<SnapshotId> {
    let mut iter = repo.snapshot_ids(from, limit + 1);
    let items: Vec<SnapshotId> = iter.by_ref().take(limit).collect();
    let next_cursor = iter.next();
    let page = Page::new(items, next_cursor);
    debug!(?page);
    page
}

pub fn snapshot_by_id<R: DistributionRepo>(repo: &R, id: &SnapshotId) -> Option<StoredSnapshot> {
    repo.snapshot_by_id(id)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::finance::Money;
    use crate::core::planning::Record;

    struct InMemoryRepo {
        snapshots: Vec<StoredSnapshot>,
        profile: Option<Profile>,
    }

    impl DistributionRepo for InMemoryRepo {
        fn location(&self) -> &str {
            "MemoryRepo"
        }
        fn get_profile(&self) -> Option<Profile> {
            self.profile.clone()
        }
        fn save_snapshot(&self, _distribution: Distribution) -> Result<SnapshotId, Error> {
            unimplemented!()
        }
        fn snapshot_ids<'r>(
            &'r self,
            from: Option<Cursor>,
            limit: usize,
        ) -> Box<dyn Iterator<Item = SnapshotId> + 'r> {
            let mut items: Vec<_> = self.snapshots.iter().map(|s| s.id.clone()).collect();
            items.sort();
            let start = from
                .as_ref()
                .and_then(|cursor| items.iter().position(|s| s == cursor))
                .map_or(0, |idx| idx + 1);
            Box::new(items.into_iter().skip(start).take(limit))
        }
        fn snapshot_by_id(&self, id: &SnapshotId) -> Option<StoredSnapshot> {
            self.snapshots.iter().find(|s| &s.id == id).cloned()
        }
    }

    fn make_snapshot(id: &str) -> StoredSnapshot {
        let record = Record::new(Money::from_minor(100), Money::from_minor(40), None);
        StoredSnapshot {
            id: id.to_string(),
            distribution: settle(&record),
        }
    }

    fn repo(ids: &[&str]) -> InMemoryRepo {
        InMemoryRepo {
            snapshots: ids.iter().map(|id| make_snapshot(id)).collect(),
            profile: None,
        }
    }

    #[test]
    fn settle_without_profile_reports_net() {
        let record = Record::new(Money::from_minor(100), Money::from_minor(40), None);
        let distribution = settle(&record);
        assert_eq!(distribution.final_result, Money::from_minor(60));
        assert!(distribution.items.is_empty());
    }

    #[test]
    fn empty_storage() {
        let page = snapshot_ids(&repo(&[]), None, 10);
        assert!(page.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn one_snapshot() {
        let page = snapshot_ids(&repo(&["first"]), None, 10);
        assert_eq!(page.items, ["first"]);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn from_param_skips_cursor() {
        let page = snapshot_ids(&repo(&["a", "b", "c"]), Some("a".to_string()), 10);
        assert_eq!(page.items, ["b", "c"]);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn limit_param_truncates_and_reports_cursor() {
        let page = snapshot_ids(&repo(&["a", "b", "c"]), None, 2);
        assert_eq!(page.items, ["a", "b"]);
        assert_eq!(page.next_cursor, Some("c".to_string()));
    }

    #[test]
    fn from_and_limit() {
        let page = snapshot_ids(&repo(&["a", "b", "c"]), Some("a".to_string()), 1);
        assert_eq!(page.items, ["b"]);
        assert_eq!(page.next_cursor, Some("c".to_string()));
    }

    #[test]
    fn limit_zero() {
        let page = snapshot_ids(&repo(&["a", "b"]), None, 0);
        assert!(page.is_empty());
        assert_eq!(page.next_cursor, Some("a".to_string()));
    }

    #[test]
    fn snapshot_lookup() {
        let repo = repo(&["a", "b"]);
        assert_eq!(snapshot_by_id(&repo, &"b".to_string()).map(|s| s.id), Some("b".to_string()));
        assert!(snapshot_by_id(&repo, &"missing".to_string()).is_none());
    }
}
