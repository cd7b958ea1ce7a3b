//! Pagination display items and the response envelope shared by all table endpoints.

use serde::{Serialize, Serializer};

/// Marker rendered in place of skipped page numbers.
pub const ELLIPSIS: &str = "...";

/// One entry of a rendered page list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u64),
    Ellipsis,
}

impl PageItem {
    pub fn page(&self) -> Option<u64> {
        match self {
            Self::Page(n) => Some(*n),
            Self::Ellipsis => None,
        }
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self, Self::Ellipsis)
    }
}

impl Serialize for PageItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Page(n) => serializer.serialize_u64(*n),
            Self::Ellipsis => serializer.serialize_str(ELLIPSIS),
        }
    }
}

/// Envelope returned by every table list endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResponse<T> {
    pub list: Vec<T>,
    pub current_page: u64,
    pub pagination: Vec<PageItem>,
}
