use std::collections::HashSet;

use tracing::{debug, info};

use crate::intake::BulkTarget;
use crate::loader::{LoadOutcome, LoadState, Page, PageLoader, PageRow};
use crate::selection::{BulkPolicy, SelectionState};
use crate::source::{PageSource, RecordKey};

#[derive(Clone, Copy, Debug)]
pub struct BrowserOptions {
    pub page_size: usize,
    pub policy: BulkPolicy,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            page_size: crate::DEFAULT_PAGE_SIZE,
            policy: BulkPolicy::Reset,
        }
    }
}

/// One row as the view should draw it.
#[derive(Clone, Debug)]
pub struct VisibleRow<'a, R> {
    pub record: &'a R,
    pub row: PageRow,
    pub selected: bool,
}

/// Owns the browsing session: the single loaded page and the selection.
/// The view reads through this type and mutates only through its methods.
pub struct Browser<S: PageSource> {
    source: S,
    loader: PageLoader<S::Record>,
    selection: SelectionState,
}

impl<S: PageSource> Browser<S> {
    pub fn new(source: S, options: BrowserOptions) -> Self {
        Self {
            source,
            loader: PageLoader::new(options.page_size),
            selection: SelectionState::new(options.page_size, options.policy),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn page_size(&self) -> usize {
        self.loader.page_size()
    }

    pub fn page(&self) -> Option<&Page<S::Record>> {
        self.loader.page()
    }

    pub fn state(&self) -> &LoadState {
        self.loader.state()
    }

    pub fn loading(&self) -> bool {
        self.loader.loading()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn total_records(&self) -> Option<u64> {
        self.loader.total_records()
    }

    pub fn page_count(&self) -> Option<u64> {
        self.loader.page_count()
    }

    pub fn current_page_index(&self) -> Option<u64> {
        self.loader.page().map(|p| p.index())
    }

    /// Table paging event; `first` is the 0-based offset of the page's first row.
    pub async fn on_page_change(&mut self, first: u64) -> LoadOutcome {
        let page_index = first / self.loader.page_size() as u64;
        self.go_to_page(page_index).await
    }

    pub async fn go_to_page(&mut self, page_index: u64) -> LoadOutcome {
        let outcome = self.loader.load(&self.source, page_index).await;
        match &outcome {
            LoadOutcome::Installed => {
                if let Some(page) = self.loader.page() {
                    self.selection.set_total_records(page.total_records());
                    self.selection.backfill_page(page);
                    info!(
                        page = page.index(),
                        rows = page.len(),
                        total = page.total_records(),
                        "page installed"
                    );
                }
            }
            LoadOutcome::Failed(_) | LoadOutcome::Stale => {}
        }
        outcome
    }

    pub async fn next_page(&mut self) -> Option<LoadOutcome> {
        let current = self.current_page_index()?;
        if let Some(count) = self.page_count() {
            if current + 1 >= count {
                return None;
            }
        }
        Some(self.go_to_page(current + 1).await)
    }

    pub async fn prev_page(&mut self) -> Option<LoadOutcome> {
        let current = self.current_page_index()?;
        if current == 0 {
            return None;
        }
        Some(self.go_to_page(current - 1).await)
    }

    /// Retries the page that last failed, or refetches the current one.
    pub async fn reload(&mut self) -> LoadOutcome {
        let page_index = match self.loader.state() {
            LoadState::Loading { page }
            | LoadState::Loaded { page }
            | LoadState::Failed { page, .. } => *page,
            LoadState::Idle => 0,
        };
        self.go_to_page(page_index).await
    }

    pub fn visible_rows(&self) -> Vec<VisibleRow<'_, S::Record>> {
        let Some(page) = self.loader.page() else {
            return Vec::new();
        };
        page.records()
            .iter()
            .zip(page.rows())
            .map(|(record, row)| VisibleRow {
                record,
                row,
                selected: self.selection.is_selected(&row),
            })
            .collect()
    }

    pub fn effective_selection(&self) -> Vec<RecordKey> {
        match self.loader.page() {
            Some(page) => self.selection.effective_selection(page),
            None => Vec::new(),
        }
    }

    /// Sets a row handed out by the loaded page. Rows kept from a page that
    /// is no longer on screen are refused and `false` is returned.
    pub fn toggle_row(&mut self, row: PageRow, selected: bool) -> bool {
        let owned = self.loader.page().is_some_and(|page| page.owns(&row));
        if !owned {
            debug!(
                page = row.page_index(),
                key = %row.key(),
                "ignoring toggle for a row that is not on the loaded page"
            );
            return false;
        }
        self.selection.toggle_row(row, selected);
        true
    }

    /// Flips the row at `position` on the loaded page and returns its new state.
    pub fn toggle_position(&mut self, position: usize) -> Option<bool> {
        let row = self.loader.page()?.row(position)?;
        let selected = !self.selection.is_selected(&row);
        self.selection.toggle_row(row, selected);
        Some(selected)
    }

    pub fn set_page_selected(&mut self, selected: bool) {
        let Some(page) = self.loader.page() else {
            return;
        };
        let keys: HashSet<RecordKey> = if selected {
            page.rows().map(|r| r.key()).collect()
        } else {
            HashSet::new()
        };
        self.selection.apply_page_selection(page, &keys);
    }

    pub fn apply_page_selection(&mut self, keys: &HashSet<RecordKey>) {
        if let Some(page) = self.loader.page() {
            self.selection.apply_page_selection(page, keys);
        }
    }

    /// Sets the bulk bound, then realizes it on the page already on screen.
    pub fn apply_bulk_directive(&mut self, count: u64) {
        self.selection.apply_bulk_directive(count);
        if let Some(page) = self.loader.page() {
            self.selection.backfill_page(page);
        }
    }

    pub fn total_selected_count(&self) -> u64 {
        self.selection.total_selected_count()
    }
}

impl<S: PageSource> BulkTarget for Browser<S> {
    fn apply_bulk_directive(&mut self, count: u64) {
        Browser::apply_bulk_directive(self, count);
    }
}
