//! Cross-page selection state.
//!
//! Selection is described by a bulk bound `N` ("ranks `1..=N` are selected")
//! plus a map of per-record overrides holding only the rows where the user
//! disagrees with that bound. Nothing here ever needs an unloaded page: the
//! override map stores each entry's rank so counts can be derived from the
//! map and `N` alone.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::intake::BulkTarget;
use crate::loader::{Page, PageRow};
use crate::source::{Record, RecordKey};

/// How a new bulk directive treats earlier manual overrides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkPolicy {
    /// Drop every override; selection becomes exactly "first N by rank".
    #[default]
    Reset,
    /// Keep overrides and realize the bulk page by page as pages load.
    Merge,
}

impl BulkPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "reset" | "a" => Some(Self::Reset),
            "merge" | "b" => Some(Self::Merge),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BulkPolicy::Reset => "reset",
            BulkPolicy::Merge => "merge",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Override {
    pub rank: u64,
    pub selected: bool,
}

/// Serializable view of the selection for status output.
#[derive(Clone, Debug, Serialize)]
pub struct SelectionSnapshot {
    pub policy: BulkPolicy,
    pub bulk: u64,
    pub total_records: Option<u64>,
    pub total_selected: u64,
    pub selected_extras: Vec<RecordKey>,
    pub deselected: Vec<RecordKey>,
    pub pending_pages: u64,
}

#[derive(Clone, Debug)]
pub struct SelectionState {
    page_size: u64,
    policy: BulkPolicy,
    bulk: u64,
    overrides: HashMap<RecordKey, Override>,
    total_records: Option<u64>,
    // Merge policy: pages `0..owed_pages` still owe the bulk effect unless consumed.
    owed_pages: u64,
    consumed: BTreeSet<u64>,
    version: u64,
}

impl SelectionState {
    pub fn new(page_size: usize, policy: BulkPolicy) -> Self {
        Self {
            page_size: page_size.max(1) as u64,
            policy,
            bulk: 0,
            overrides: HashMap::new(),
            total_records: None,
            owed_pages: 0,
            consumed: BTreeSet::new(),
            version: 0,
        }
    }

    pub fn policy(&self) -> BulkPolicy {
        self.policy
    }

    pub fn bulk(&self) -> u64 {
        self.bulk
    }

    pub fn total_records(&self) -> Option<u64> {
        self.total_records
    }

    pub fn overrides_len(&self) -> usize {
        self.overrides.len()
    }

    pub fn override_for(&self, key: RecordKey) -> Option<Override> {
        self.overrides.get(&key).copied()
    }

    /// Bumped on every mutation; pair it with the loaded page to memoize renders.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_total_records(&mut self, total: u64) {
        if self.total_records != Some(total) {
            self.total_records = Some(total);
            self.version += 1;
        }
    }

    fn bulk_implies(&self, rank: u64) -> bool {
        rank <= self.bulk
    }

    pub fn is_selected(&self, row: &PageRow) -> bool {
        match self.overrides.get(&row.key()) {
            Some(o) => o.selected,
            None => self.bulk_implies(row.rank()),
        }
    }

    pub fn effective_selection<R: Record>(&self, page: &Page<R>) -> Vec<RecordKey> {
        page.rows()
            .filter(|row| self.is_selected(row))
            .map(|row| row.key())
            .collect()
    }

    pub fn toggle_row(&mut self, row: PageRow, selected: bool) {
        if selected == self.bulk_implies(row.rank()) {
            self.overrides.remove(&row.key());
        } else {
            self.overrides.insert(
                row.key(),
                Override {
                    rank: row.rank(),
                    selected,
                },
            );
        }
        self.version += 1;
    }

    /// Applies a table "selection changed" event: every row of `page` ends up
    /// selected exactly when its key is in `selected`.
    pub fn apply_page_selection<R: Record>(
        &mut self,
        page: &Page<R>,
        selected: &HashSet<RecordKey>,
    ) {
        debug_assert!(
            selected.iter().all(|key| page.contains(*key)),
            "selection event references a record outside the loaded page"
        );
        for row in page.rows() {
            self.toggle_row(row, selected.contains(&row.key()));
        }
    }

    pub fn apply_bulk_directive(&mut self, count: u64) {
        self.bulk = count;
        match self.policy {
            BulkPolicy::Reset => {
                self.overrides.clear();
                self.owed_pages = 0;
            }
            BulkPolicy::Merge => {
                self.overrides.retain(|_, o| o.selected != (o.rank <= count));
                self.owed_pages = count.div_ceil(self.page_size);
            }
        }
        self.consumed.clear();
        self.version += 1;
        debug!(
            bulk = count,
            policy = self.policy.label(),
            overrides = self.overrides.len(),
            "bulk directive applied"
        );
    }

    pub fn is_pending(&self, page_index: u64) -> bool {
        page_index < self.owed_pages && !self.consumed.contains(&page_index)
    }

    pub fn pending_pages(&self) -> u64 {
        let consumed = self.consumed.range(..self.owed_pages).count() as u64;
        self.owed_pages - consumed
    }

    /// Realizes the bulk bound on a freshly loaded page. Only the merge policy
    /// ever has pages pending.
    pub fn backfill_page<R: Record>(&mut self, page: &Page<R>) {
        if !self.is_pending(page.index()) {
            return;
        }
        let before = self.overrides.len();
        for row in page.rows() {
            if self.bulk_implies(row.rank()) {
                self.overrides.remove(&row.key());
            }
        }
        self.consumed.insert(page.index());
        self.version += 1;
        debug!(
            page = page.index(),
            released = before - self.overrides.len(),
            "pending bulk consumed"
        );
    }

    pub fn total_selected_count(&self) -> u64 {
        let bound = match self.total_records {
            Some(total) => self.bulk.min(total),
            None => self.bulk,
        };
        let mut count = bound;
        for o in self.overrides.values() {
            let implied = o.rank <= bound;
            if o.selected && !implied {
                count += 1;
            } else if !o.selected && implied {
                count = count.saturating_sub(1);
            }
        }
        count
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        let mut selected_extras: Vec<RecordKey> = Vec::new();
        let mut deselected: Vec<RecordKey> = Vec::new();
        for (key, o) in self.overrides.iter() {
            if o.selected {
                selected_extras.push(*key);
            } else {
                deselected.push(*key);
            }
        }
        selected_extras.sort();
        deselected.sort();
        SelectionSnapshot {
            policy: self.policy,
            bulk: self.bulk,
            total_records: self.total_records,
            total_selected: self.total_selected_count(),
            selected_extras,
            deselected,
            pending_pages: self.pending_pages(),
        }
    }
}

impl BulkTarget for SelectionState {
    fn apply_bulk_directive(&mut self, count: u64) {
        SelectionState::apply_bulk_directive(self, count);
    }
}
