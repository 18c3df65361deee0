use tracing::{debug, warn};

use crate::source::{FetchError, PageResponse, PageSource, Record, RecordKey};

/// One materialized window of the remote ordering.
#[derive(Clone, Debug)]
pub struct Page<R> {
    index: u64,
    first_rank: u64,
    records: Vec<R>,
    total_records: u64,
}

/// A row of a loaded page. Only a [`Page`] hands these out, so a row that
/// was never fetched cannot be toggled. Rows remember the page they came
/// from; see [`Page::owns`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRow {
    page: u64,
    key: RecordKey,
    rank: u64,
}

impl PageRow {
    pub fn key(&self) -> RecordKey {
        self.key
    }

    pub fn page_index(&self) -> u64 {
        self.page
    }

    /// 1-based position in the full ordering.
    pub fn rank(&self) -> u64 {
        self.rank
    }
}

impl<R: Record> Page<R> {
    fn new(index: u64, first_rank: u64, records: Vec<R>, total_records: u64) -> Self {
        Self {
            index,
            first_rank,
            records,
            total_records,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn first_rank(&self) -> u64 {
        self.first_rank
    }

    /// Rank of the last row, or `first_rank - 1` for an empty page.
    pub fn last_rank(&self) -> u64 {
        self.first_rank + self.records.len() as u64 - 1
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn row(&self, position: usize) -> Option<PageRow> {
        self.records.get(position).map(|r| PageRow {
            page: self.index,
            key: r.key(),
            rank: self.first_rank + position as u64,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = PageRow> + '_ {
        self.records
            .iter()
            .enumerate()
            .map(move |(i, r)| PageRow {
                page: self.index,
                key: r.key(),
                rank: self.first_rank + i as u64,
            })
    }

    pub fn contains(&self, key: RecordKey) -> bool {
        self.records.iter().any(|r| r.key() == key)
    }

    /// True when `row` was handed out by this page (or an identical refetch).
    pub fn owns(&self, row: &PageRow) -> bool {
        if row.page != self.index || row.rank < self.first_rank {
            return false;
        }
        let position = (row.rank - self.first_rank) as usize;
        self.records
            .get(position)
            .is_some_and(|r| r.key() == row.key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading { page: u64 },
    Loaded { page: u64 },
    Failed { page: u64, reason: String },
}

/// Ticket for one issued load. Only the most recent ticket may install.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    seq: u64,
    page_index: u64,
}

impl PageRequest {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    /// The remote API numbers pages from 1.
    pub fn page_number(&self) -> u64 {
        self.page_index.saturating_add(1)
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Installed,
    Stale,
    Failed(FetchError),
}

impl LoadOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, LoadOutcome::Installed)
    }
}

/// Holds at most one page and serializes loads by sequence number.
#[derive(Debug)]
pub struct PageLoader<R> {
    page_size: usize,
    seq: u64,
    state: LoadState,
    page: Option<Page<R>>,
    total_records: Option<u64>,
}

impl<R: Record> PageLoader<R> {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            seq: 0,
            state: LoadState::Idle,
            page: None,
            total_records: None,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn loading(&self) -> bool {
        matches!(self.state, LoadState::Loading { .. })
    }

    pub fn page(&self) -> Option<&Page<R>> {
        self.page.as_ref()
    }

    pub fn total_records(&self) -> Option<u64> {
        self.total_records
    }

    pub fn page_count(&self) -> Option<u64> {
        self.total_records
            .map(|total| total.div_ceil(self.page_size as u64))
    }

    /// Rank of the first row on `page_index`, or `None` when some rank on that
    /// page would not fit in a `u64`.
    pub fn first_rank_for(&self, page_index: u64) -> Option<u64> {
        let size = self.page_size as u64;
        let end = page_index.checked_add(1)?.checked_mul(size)?;
        Some(end - size + 1)
    }

    pub fn request(&mut self, page_index: u64) -> PageRequest {
        self.seq += 1;
        self.state = LoadState::Loading { page: page_index };
        debug!(seq = self.seq, page = page_index, "page requested");
        PageRequest {
            seq: self.seq,
            page_index,
        }
    }

    pub fn apply(
        &mut self,
        request: PageRequest,
        result: Result<PageResponse<R>, FetchError>,
    ) -> LoadOutcome {
        if request.seq != self.seq {
            debug!(
                seq = request.seq,
                latest = self.seq,
                page = request.page_index,
                "dropping stale page response"
            );
            return LoadOutcome::Stale;
        }

        let first_rank = self.first_rank_for(request.page_index);
        let result = result.and_then(|response| {
            let first_rank = first_rank.ok_or_else(|| out_of_range(&request))?;
            if response.records.len() > self.page_size {
                Err(FetchError::Malformed {
                    page: request.page_number(),
                    message: format!(
                        "{} records exceed page size {}",
                        response.records.len(),
                        self.page_size
                    ),
                })
            } else {
                Ok((response, first_rank))
            }
        });

        match result {
            Ok((response, first_rank)) => {
                let total = response.pagination.total;
                self.page = Some(Page::new(
                    request.page_index,
                    first_rank,
                    response.records,
                    total,
                ));
                self.total_records = Some(total);
                self.state = LoadState::Loaded {
                    page: request.page_index,
                };
                LoadOutcome::Installed
            }
            Err(err) => {
                warn!(page = request.page_index, error = %err, "page failed to load");
                self.state = LoadState::Failed {
                    page: request.page_index,
                    reason: err.to_string(),
                };
                LoadOutcome::Failed(err)
            }
        }
    }

    pub async fn load<S>(&mut self, source: &S, page_index: u64) -> LoadOutcome
    where
        S: PageSource<Record = R>,
    {
        let request = self.request(page_index);
        let result = match self.first_rank_for(page_index) {
            Some(_) => source.fetch(request.page_number()).await,
            None => Err(out_of_range(&request)),
        };
        self.apply(request, result)
    }
}

fn out_of_range(request: &PageRequest) -> FetchError {
    FetchError::Malformed {
        page: request.page_number(),
        message: format!("page index {} is out of range", request.page_index),
    }
}
