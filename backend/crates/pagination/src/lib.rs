//! Page-number pagination primitives shared by GasWatch query endpoints.
//!
//! Pages are 1-indexed. A request for page `n` with size `s` skips
//! `s * (n - 1)` rows of the already filtered and sorted result set, so
//! callers must apply filtering and ordering before slicing. Requests that
//! skip past the end of the set yield an empty page that still reports the
//! full `total_count`.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Page size used when a caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Errors raised when a page request is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// Page numbers start at one.
    #[error("page must be at least 1")]
    ZeroPage,
    /// A page must hold at least one item.
    #[error("page size must be at least 1")]
    ZeroPageSize,
}

/// Validated 1-indexed page request.
///
/// # Examples
/// ```
/// use pagination::PageRequest;
///
/// let request = PageRequest::new(3, 10).expect("valid request");
/// assert_eq!(request.offset(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "PageRequestDto", into = "PageRequestDto")]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validate and build a page request.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::ZeroPage`] when `page` is zero and
    /// [`PaginationError::ZeroPageSize`] when `page_size` is zero.
    pub const fn new(page: u32, page_size: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::ZeroPage);
        }
        if page_size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }
        Ok(Self { page, page_size })
    }

    /// First page with the given size.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::ZeroPageSize`] when `page_size` is zero.
    pub const fn first(page_size: u32) -> Result<Self, PaginationError> {
        Self::new(1, page_size)
    }

    /// Requested page number (1-indexed).
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Maximum number of items on the page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items skipped before this page starts.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page_size).saturating_mul(u64::from(self.page.saturating_sub(1)))
    }

    /// Cap the page size at `max`, keeping the page number.
    ///
    /// A `max` of zero leaves the request unchanged.
    #[must_use]
    pub fn clamp_page_size(self, max: u32) -> Self {
        if max == 0 || self.page_size <= max {
            return self;
        }
        Self {
            page: self.page,
            page_size: max,
        }
    }

    /// Index range covered by this page within a result set of `len` items.
    ///
    /// The range is empty when the page starts past the end of the set.
    ///
    /// # Examples
    /// ```
    /// use pagination::PageRequest;
    ///
    /// let request = PageRequest::new(3, 10).expect("valid request");
    /// assert_eq!(request.bounds(25), 20..25);
    /// assert_eq!(request.bounds(15), 15..15);
    /// ```
    #[must_use]
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX).min(len);
        let size = usize::try_from(self.page_size).unwrap_or(usize::MAX);
        let end = start.saturating_add(size).min(len);
        start..end
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRequestDto {
    page: u32,
    page_size: u32,
}

impl From<PageRequest> for PageRequestDto {
    fn from(value: PageRequest) -> Self {
        Self {
            page: value.page,
            page_size: value.page_size,
        }
    }
}

impl TryFrom<PageRequestDto> for PageRequest {
    type Error = PaginationError;

    fn try_from(value: PageRequestDto) -> Result<Self, Self::Error> {
        Self::new(value.page, value.page_size)
    }
}

/// One page of a filtered, ordered result set.
///
/// `total_count` always describes the whole filtered set, not the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    items: Vec<T>,
    total_count: u64,
    page: u32,
    page_size: u32,
}

impl<T> Page<T> {
    /// Wrap a slice of results produced for `request`.
    #[must_use]
    pub const fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
        }
    }

    /// Page with no items and a zero total.
    #[must_use]
    pub const fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }

    /// Items on this page, in result order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        self.items.as_slice()
    }

    /// Consume the page and return its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Size of the whole filtered result set.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Page number this envelope answers (1-indexed).
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size this envelope was produced with.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of pages needed to cover `total_count` items.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(u64::from(self.page_size.max(1)))
    }

    /// Whether a later page holds more items.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    /// Transform every item while keeping the paging metadata.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
