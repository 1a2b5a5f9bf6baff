use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::web::error::AppError;

pub const MAX_PAGE_SIZE: u64 = 100;

/// Page-number pagination envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// `page`/`limit` query parameters of a paginated list.
#[derive(Debug, Deserialize, Default)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Resolved `page`/`limit` pair; `number` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, limit: Option<u64>, default_size: u64) -> Result<Self, AppError> {
        let number = page.unwrap_or(1);
        if number == 0 {
            return Err(AppError::NotFound(t!("errors.invalid_page").to_string()));
        }
        let size = limit
            .filter(|l| *l > 0)
            .unwrap_or(default_size)
            .clamp(1, MAX_PAGE_SIZE);
        Ok(Self { number, size })
    }

    /// Zero-based index for `Paginator::fetch_page`, checked against the total.
    pub fn index_within(&self, total_items: u64) -> Result<u64, AppError> {
        let pages = total_items.div_ceil(self.size).max(1);
        if self.number > pages {
            return Err(AppError::NotFound(t!("errors.invalid_page").to_string()));
        }
        Ok(self.number - 1)
    }
}

/// Builds the `next`/`previous` links from the request URI, keeping every
/// query parameter except `page`. Page 1 is linked without a `page` parameter.
pub fn page_link(base_url: &str, uri: &Uri, page: u64) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
        .map(str::to_string)
        .collect();
    if page > 1 {
        params.push(format!("page={page}"));
    }

    let base = base_url.trim_end_matches('/');
    if params.is_empty() {
        format!("{base}{}", uri.path())
    } else {
        format!("{base}{}?{}", uri.path(), params.join("&"))
    }
}

impl<T> Page<T> {
    pub fn build(
        results: Vec<T>,
        count: u64,
        request: PageRequest,
        base_url: &str,
        uri: &Uri,
    ) -> Self {
        let has_next = request.number * request.size < count;
        let next = has_next.then(|| page_link(base_url, uri, request.number + 1));
        let previous =
            (request.number > 1).then(|| page_link(base_url, uri, request.number - 1));
        Page {
            count,
            next,
            previous,
            results,
        }
    }
}
