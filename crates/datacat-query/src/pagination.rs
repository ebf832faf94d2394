//! Page normalization and the count-then-fetch pagination envelope.

use serde::{Deserialize, Serialize};
use tracing::debug;

use datacat_core::{CollectionName, CoreResult, Document, DocumentStore, Filter, Window};

/// Page used when the request carries no usable `page`.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the request carries no usable `pageSize`.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Query parameter carrying the page number.
pub const PAGE_PARAM: &str = "page";

/// Query parameter carrying the page size.
pub const PAGE_SIZE_PARAM: &str = "pageSize";

/// Normalized page selection. Both values are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    /// Builds a request from raw parameter text.
    ///
    /// Absent, unparsable or non-positive values fall back to the defaults.
    #[must_use]
    pub fn from_params(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            page_size: parse_positive(page_size).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of documents skipped before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Maximum number of documents on this page.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.page_size
    }

    /// Store window for this page.
    #[must_use]
    pub fn window(&self) -> Window {
        Window::new(to_usize(self.offset()), to_usize(self.limit()))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination envelope returned with every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

/// One page of items plus its envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    /// Maps every item, keeping the envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Counts matching documents, then fetches the requested page.
///
/// The two reads are independent; `total` may be stale relative to the page
/// when the collection changes in between.
pub async fn paginate(
    store: &dyn DocumentStore,
    collection: &CollectionName,
    filter: &Filter,
    request: PageRequest,
) -> CoreResult<Paginated<Document>> {
    let total = store.count(collection, filter).await?;
    let items = store.find(collection, filter, request.window()).await?;

    debug!(
        collection = %collection,
        page = request.page(),
        page_size = request.page_size(),
        total,
        returned = items.len(),
        "Paginated query"
    );

    Ok(Paginated {
        items,
        pagination: Pagination {
            page: request.page(),
            page_size: request.page_size(),
            total,
        },
    })
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .and_then(|value| u64::try_from(value).ok())
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
