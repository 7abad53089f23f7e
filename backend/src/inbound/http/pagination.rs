//! Limit/offset query parameters and the paged response envelope.
//!
//! ```text
//! GET /api/v1/titles?genre=drama&limit=2&offset=2
//! {"count":5,"next":".../titles?genre=drama&limit=2&offset=4",
//!  "previous":".../titles?genre=drama&limit=2","results":[...]}
//! ```

use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::domain::pagination::{Page, PageRequest, PageRequestError};

const LIMIT_PARAM: &str = "limit";
const OFFSET_PARAM: &str = "offset";

/// `limit` / `offset` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page size, 1 to 100. Defaults to 10.
    pub limit: Option<u32>,
    /// Rows to skip. Defaults to 0.
    pub offset: Option<u64>,
}

impl PageQuery {
    /// Validate into a domain page request.
    pub fn to_request(self) -> Result<PageRequest, Error> {
        PageRequest::new(self.limit, self.offset).map_err(|err| match err {
            PageRequestError::LimitOutOfRange { .. } => {
                Error::invalid_field(LIMIT_PARAM, "out_of_range", err.to_string())
            }
            PageRequestError::OffsetOutOfRange { .. } => {
                Error::invalid_field(OFFSET_PARAM, "out_of_range", err.to_string())
            }
        })
    }
}

/// One page of results with links to its neighbours.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageDto<T> {
    #[schema(example = 42)]
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageDto<T> {
    /// Wrap `page`, deriving `next`/`previous` from the request URL so
    /// filters survive navigation.
    pub fn new(req: &HttpRequest, request: PageRequest, page: Page<T>) -> Self {
        let next = request
            .has_next(page.count)
            .then(|| link(req, request.limit(), Some(request.next_offset())));
        let previous = request.has_previous().then(|| {
            let offset = request.previous_offset();
            link(req, request.limit(), (offset > 0).then_some(offset))
        });
        Self {
            count: page.count,
            next,
            previous,
            results: page.results,
        }
    }

    /// Convert each item with `f`.
    pub fn from_domain<U>(
        req: &HttpRequest,
        request: PageRequest,
        page: Page<U>,
        f: impl FnMut(U) -> T,
    ) -> Self {
        Self::new(req, request, page.map(f))
    }
}

fn link(req: &HttpRequest, limit: u32, offset: Option<u64>) -> String {
    let mut url = req.full_url();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != LIMIT_PARAM && key != OFFSET_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear().extend_pairs(kept);
        pairs.append_pair(LIMIT_PARAM, &limit.to_string());
        if let Some(offset) = offset {
            pairs.append_pair(OFFSET_PARAM, &offset.to_string());
        }
    }
    url.to_string()
}
