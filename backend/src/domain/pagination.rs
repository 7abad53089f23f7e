//! Limit/offset paging shared by every listing.

/// Default page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: u32 = 10;
/// Upper bound on the page size.
pub const MAX_LIMIT: u32 = 100;
/// Largest offset a store can address.
pub const MAX_OFFSET: u64 = i64::MAX.unsigned_abs();

/// Validation failures for paging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PageRequestError {
    /// `limit` was zero or above [`MAX_LIMIT`].
    #[error("limit must be between 1 and {max}")]
    LimitOutOfRange { max: u32 },
    /// `offset` was above [`MAX_OFFSET`].
    #[error("offset must not exceed {max}")]
    OffsetOutOfRange { max: u64 },
}

/// Window into an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: u32,
    offset: u64,
}

impl PageRequest {
    /// Validate optional limit/offset query values.
    ///
    /// # Examples
    /// ```
    /// use critique::domain::pagination::PageRequest;
    ///
    /// let page = PageRequest::new(None, Some(20)).expect("defaults apply");
    /// assert_eq!((page.limit(), page.offset()), (10, 20));
    /// assert!(PageRequest::new(Some(0), None).is_err());
    /// ```
    pub fn new(limit: Option<u32>, offset: Option<u64>) -> Result<Self, PageRequestError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(PageRequestError::LimitOutOfRange { max: MAX_LIMIT });
        }
        let offset = offset.unwrap_or(0);
        if offset > MAX_OFFSET {
            return Err(PageRequestError::OffsetOutOfRange { max: MAX_OFFSET });
        }
        Ok(Self { limit, offset })
    }

    /// Page size.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows skipped.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Slice an already ordered collection.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }

    /// Whether a page exists after this one for `count` total rows.
    pub fn has_next(&self, count: u64) -> bool {
        self.next_offset() < count
    }

    /// Whether this page starts after the first row.
    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }

    /// Offset of the following page.
    pub fn next_offset(&self) -> u64 {
        self.offset.saturating_add(u64::from(self.limit))
    }

    /// Offset of the preceding page, clamped at zero.
    pub fn previous_offset(&self) -> u64 {
        self.offset.saturating_sub(u64::from(self.limit))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows matching the query across all pages.
    pub count: u64,
    /// Rows inside the requested window.
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Convert every item, keeping the count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
