use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{direct::NotKeyed, InMemoryState};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.artic.edu/api/v1/artworks";

const ARTWORK_FIELDS: &str =
    "id,title,place_of_origin,artist_display,inscriptions,date_start,date_end";

/// Stable identity of a record in the remote ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(pub u64);

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything the browser can page through. The core only ever looks at the key.
pub trait Record {
    fn key(&self) -> RecordKey;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub place_of_origin: Option<String>,
    #[serde(default)]
    pub artist_display: Option<String>,
    #[serde(default)]
    pub inscriptions: Option<String>,
    #[serde(default)]
    pub date_start: Option<i64>,
    #[serde(default)]
    pub date_end: Option<i64>,
}

impl Record for Artwork {
    fn key(&self) -> RecordKey {
        RecordKey(self.id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub current_page: u64,
}

/// Body of one page as the remote API returns it.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiResponse<R> {
    pub pagination: Pagination,
    pub data: Vec<R>,
}

#[derive(Clone, Debug)]
pub struct PageResponse<R> {
    pub records: Vec<R>,
    pub pagination: Pagination,
}

impl<R> From<ApiResponse<R>> for PageResponse<R> {
    fn from(value: ApiResponse<R>) -> Self {
        Self {
            records: value.data,
            pagination: value.pagination,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for page {page} failed: {source}")]
    Transport {
        page: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("page {page} returned status {status}: {url}")]
    Status { page: u64, status: u16, url: String },

    #[error("failed to decode page {page}: {source}")]
    Decode {
        page: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed page {page}: {message}")]
    Malformed { page: u64, message: String },

    #[error("page {page} is unavailable")]
    Unavailable { page: u64 },
}

#[derive(Debug, Error)]
pub enum SourceBuildError {
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("invalid rate {value}, expected a positive integer")]
    InvalidRate { value: u32 },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The remote side of the browser: fetches one page by its 1-based number.
pub trait PageSource {
    type Record: Record;

    fn fetch(
        &self,
        page_number: u64,
    ) -> impl Future<Output = Result<PageResponse<Self::Record>, FetchError>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpSourceOptions {
    pub base_url: String,
    pub page_size: usize,
    pub timeout_seconds: u64,
    pub rate: u32,
    pub proxy: Option<String>,
}

impl Default for HttpSourceOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: crate::DEFAULT_PAGE_SIZE,
            timeout_seconds: 10,
            rate: 5,
            proxy: None,
        }
    }
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paged REST source for the artwork listing endpoint.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: reqwest::Url,
    page_size: usize,
    limiter: DirectLimiter,
}

impl HttpSource {
    pub fn new(options: HttpSourceOptions) -> Result<Self, SourceBuildError> {
        let base_url =
            reqwest::Url::parse(&options.base_url).map_err(|_| SourceBuildError::InvalidBaseUrl {
                url: options.base_url.clone(),
            })?;
        let rate = NonZeroU32::new(options.rate).ok_or(SourceBuildError::InvalidRate {
            value: options.rate,
        })?;
        let client = build_client(options.proxy.as_deref(), options.timeout_seconds)?;
        Ok(Self {
            client,
            base_url,
            page_size: options.page_size,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    pub fn page_url(&self, page_number: u64) -> reqwest::Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page_number.to_string())
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("fields", ARTWORK_FIELDS);
        url
    }
}

fn build_client(
    proxy: Option<&str>,
    timeout_seconds: u64,
) -> Result<reqwest::Client, SourceBuildError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!("lazypick/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_seconds.max(1)));

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| SourceBuildError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| SourceBuildError::HttpClientBuild { source: e })
}

impl PageSource for HttpSource {
    type Record = Artwork;

    async fn fetch(&self, page_number: u64) -> Result<PageResponse<Artwork>, FetchError> {
        self.limiter.until_ready().await;

        let url = self.page_url(page_number);
        debug!(page = page_number, %url, "fetching page");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                page: page_number,
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                page: page_number,
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            page: page_number,
            source: e,
        })?;
        decode_page(page_number, &body)
    }
}

pub fn decode_page<R>(page_number: u64, body: &str) -> Result<PageResponse<R>, FetchError>
where
    R: serde::de::DeserializeOwned,
{
    serde_json::from_str::<ApiResponse<R>>(body)
        .map(PageResponse::from)
        .map_err(|e| FetchError::Decode {
            page: page_number,
            source: e,
        })
}

/// In-memory source over a fixed record list. Page numbers listed in
/// `failing` answer with `FetchError::Unavailable`.
#[derive(Clone, Debug)]
pub struct InlineSource<R> {
    records: Vec<R>,
    page_size: usize,
    failing: HashSet<u64>,
}

impl<R> InlineSource<R> {
    pub fn new(records: Vec<R>, page_size: usize) -> Self {
        Self {
            records,
            page_size: page_size.max(1),
            failing: HashSet::new(),
        }
    }

    pub fn fail_page(&mut self, page_number: u64) {
        self.failing.insert(page_number);
    }

    pub fn heal_page(&mut self, page_number: u64) {
        self.failing.remove(&page_number);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl InlineSource<Artwork> {
    /// `count` placeholder artworks with ids `1..=count`.
    pub fn synthetic(count: u64, page_size: usize) -> Self {
        let records = (1..=count)
            .map(|id| Artwork {
                id,
                title: Some(format!("Untitled #{id}")),
                artist_display: Some("Unknown artist".to_string()),
                ..Artwork::default()
            })
            .collect();
        Self::new(records, page_size)
    }
}

impl<R> PageSource for InlineSource<R>
where
    R: Record + Clone + Send + Sync,
{
    type Record = R;

    async fn fetch(&self, page_number: u64) -> Result<PageResponse<R>, FetchError> {
        if page_number == 0 || self.failing.contains(&page_number) {
            return Err(FetchError::Unavailable { page: page_number });
        }
        let total = self.records.len() as u64;
        let limit = self.page_size as u64;
        let offset = (page_number - 1).saturating_mul(limit);
        let start = offset.min(total) as usize;
        let end = offset.saturating_add(limit).min(total) as usize;
        Ok(PageResponse {
            records: self.records[start..end].to_vec(),
            pagination: Pagination {
                total,
                limit,
                offset,
                total_pages: total.div_ceil(limit),
                current_page: page_number,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_nulls_and_extra_fields() {
        let body = r#"{
            "pagination": {"total": 2, "limit": 12, "offset": 0, "total_pages": 1, "current_page": 1, "next_url": null},
            "data": [
                {"id": 7, "title": "Sunday", "place_of_origin": null, "artist_display": "Seurat", "inscriptions": null, "date_start": 1884, "date_end": 1886},
                {"id": 9, "title": null}
            ],
            "info": {"license_text": "cc0"}
        }"#;
        let page = decode_page::<Artwork>(1, body).unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].key(), RecordKey(7));
        assert_eq!(page.records[0].date_start, Some(1884));
        assert_eq!(page.records[1].title, None);
    }

    #[test]
    fn decode_rejects_missing_data() {
        let err = decode_page::<Artwork>(3, r#"{"pagination": {"total": 1}}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode { page: 3, .. }));
    }

    #[test]
    fn page_url_carries_page_and_limit() {
        let source = HttpSource::new(HttpSourceOptions::default()).unwrap();
        let url = source.page_url(4);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("page".to_string(), "4".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "12".to_string())));
    }

    #[test]
    fn zero_rate_is_rejected() {
        let err = HttpSource::new(HttpSourceOptions {
            rate: 0,
            ..HttpSourceOptions::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, SourceBuildError::InvalidRate { value: 0 }));
    }

    #[tokio::test]
    async fn inline_source_pages_are_one_based() {
        let source = InlineSource::synthetic(30, 12);
        let first = source.fetch(1).await.unwrap();
        assert_eq!(first.records.first().map(|r| r.id), Some(1));
        let last = source.fetch(3).await.unwrap();
        assert_eq!(last.records.len(), 6);
        assert_eq!(last.pagination.total_pages, 3);
        let past_end = source.fetch(9).await.unwrap();
        assert!(past_end.records.is_empty());
        assert!(source.fetch(0).await.is_err());
    }
}
