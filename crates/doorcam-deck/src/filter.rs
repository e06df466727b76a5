//! Pruning candidate snapshots by date, time of day and recorded state.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::filename::{parse_snapshot_path, RecordedState, SnapshotName};

/// Selection rule for a working set of snapshots.
///
/// A snapshot passes when its date lies in `start..=stop`, it was taken
/// before noon if `morning_only` is set, and its recorded state equals
/// `state` when one is given. Files whose names are not `open`/`close`
/// snapshots never pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFilter {
    pub start: NaiveDate,
    pub stop: NaiveDate,
    #[serde(default)]
    pub morning_only: bool,
    #[serde(default)]
    pub state: Option<RecordedState>,
}

impl CollectionFilter {
    /// Every snapshot between `start` and `stop`, inclusive.
    pub fn new(start: NaiveDate, stop: NaiveDate) -> Self {
        Self {
            start,
            stop,
            morning_only: false,
            state: None,
        }
    }

    pub fn morning_only(mut self, yes: bool) -> Self {
        self.morning_only = yes;
        self
    }

    pub fn with_state(mut self, state: Option<RecordedState>) -> Self {
        self.state = state;
        self
    }

    pub fn accepts(&self, name: &SnapshotName) -> bool {
        name.is_domain_file()
            && (self.start..=self.stop).contains(&name.date())
            && (!self.morning_only || name.is_morning())
            && self.state.is_none_or(|s| s == name.state)
    }

    /// [`accepts`](Self::accepts) on a path's basename; unparsable names fail.
    pub fn accepts_path(&self, path: &Path) -> bool {
        match parse_snapshot_path(path) {
            Ok(name) => self.accepts(&name),
            Err(e) => {
                log::debug!("skipping {}: {e}", path.display());
                false
            }
        }
    }

    /// Lazily keep the accepted paths of `paths`, in input order.
    pub fn filter<I>(&self, paths: I) -> FilteredPaths<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        FilteredPaths {
            filter: self,
            inner: paths.into_iter(),
        }
    }
}

/// Iterator returned by [`CollectionFilter::filter`].
pub struct FilteredPaths<'f, I> {
    filter: &'f CollectionFilter,
    inner: I,
}

impl<I> Iterator for FilteredPaths<'_, I>
where
    I: Iterator,
    I::Item: AsRef<Path>,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner.by_ref().find(|p| filter.accepts_path(p.as_ref()))
    }
}

/// A filter bound to its candidates; can be iterated any number of times.
#[derive(Clone, Debug)]
pub struct FilteredSet {
    filter: CollectionFilter,
    candidates: Vec<PathBuf>,
}

impl FilteredSet {
    pub fn new<I>(filter: CollectionFilter, candidates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        Self {
            filter,
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn filter(&self) -> &CollectionFilter {
        &self.filter
    }

    /// A fresh pass over the surviving paths.
    pub fn iter(&self) -> FilteredPaths<'_, std::slice::Iter<'_, PathBuf>> {
        self.filter.filter(self.candidates.iter())
    }

    /// Surviving paths ordered by basename.
    pub fn sorted(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self.iter().cloned().collect();
        out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        out
    }
}

impl<'a> IntoIterator for &'a FilteredSet {
    type Item = &'a PathBuf;
    type IntoIter = FilteredPaths<'a, std::slice::Iter<'a, PathBuf>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
