//! Offset pagination shared by list loaders and the REST surface.

use serde::{Deserialize, Serialize};

pub const MIN_PER_PAGE: i64 = 1;
pub const MAX_PER_PAGE: i64 = 100;
pub const MIN_PAGE: i64 = 1;

/// Paging block attached to every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub page_count: i64,
    pub count: i64,
}

impl PageMeta {
    /// Derive the paging block from a zero-based item offset and a total count.
    pub fn compute(per_page: i64, offset: i64, count: i64) -> Self {
        let per_page = clamp_per_page(per_page);
        let offset = offset.max(0);
        let count = count.max(0);

        Self {
            page: (offset / per_page).saturating_add(1),
            per_page,
            page_count: count / per_page + i64::from(count % per_page != 0),
            count,
        }
    }

    /// Use the paging block reported by an upstream search verbatim.
    pub fn from_upstream(page: i64, per_page: i64, page_count: i64, count: i64) -> Self {
        Self {
            page,
            per_page,
            page_count,
            count,
        }
    }
}

pub fn clamp_per_page(per_page: i64) -> i64 {
    per_page.clamp(MIN_PER_PAGE, MAX_PER_PAGE)
}

/// One-based wire paging converted to the zero-based offset loaders consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub per_page: i64,
    pub offset: i64,
}

impl PageWindow {
    /// `page` is capped so the offset of its first item still fits in an `i64`.
    pub fn normalize(per_page: i64, page: i64) -> Self {
        let per_page = clamp_per_page(per_page);
        let page = page.clamp(MIN_PAGE, i64::MAX / per_page);
        Self {
            per_page,
            offset: (page - 1) * per_page,
        }
    }

    /// The one-based page number the upstream search endpoint expects.
    pub fn upstream_page(per_page: i64, offset: i64) -> i64 {
        (offset.max(0) / clamp_per_page(per_page)).saturating_add(1)
    }
}
