//! Page-number lists for table footers.
//!
//! A truncated list always has `2 * boundary + 2 * SIBLING_COUNT + 3` entries:
//! the boundary pages at each end, a window around the current page, and one
//! slot on each side of the window holding either an ellipsis or the single
//! page that closes the gap.

use crate::models::pagination::PageItem;

/// Pages shown on each side of the current page.
pub const SIBLING_COUNT: u64 = 1;

/// Inclusive ascending range; empty when `start > end`.
pub fn range(start: u64, end: u64) -> Vec<u64> {
    if start > end {
        Vec::new()
    } else {
        (start..=end).collect()
    }
}

/// Number of pages needed for `total_items`, never less than one.
pub fn total_pages(total_items: u64, per_page: u64) -> u64 {
    total_items.div_ceil(per_page.max(1)).max(1)
}

pub fn paginate(
    total_items: u64,
    per_page: u64,
    boundary_count: u64,
    current_page: u64,
) -> Vec<PageItem> {
    let count = total_pages(total_items, per_page);
    let boundary = boundary_count.max(1);
    let page = current_page.clamp(1, count);

    let full_length = boundary
        .saturating_mul(2)
        .saturating_add(2 * SIBLING_COUNT + 3);
    if count <= full_length {
        return pages(range(1, count));
    }

    // count > 2 * boundary + 2 * SIBLING_COUNT + 3 below, so none of these underflow.
    let siblings_start = page
        .saturating_sub(SIBLING_COUNT)
        .min(count - boundary - 2 * SIBLING_COUNT - 1)
        .max(boundary + 2);
    let siblings_end = page
        .saturating_add(SIBLING_COUNT)
        .max(boundary + 2 * SIBLING_COUNT + 2)
        .min(count - boundary - 1);

    let mut items = pages(range(1, boundary));
    items.push(if siblings_start > boundary + 2 {
        PageItem::Ellipsis
    } else {
        PageItem::Page(boundary + 1)
    });
    items.extend(pages(range(siblings_start, siblings_end)));
    items.push(if siblings_end < count - boundary - 1 {
        PageItem::Ellipsis
    } else {
        PageItem::Page(count - boundary)
    });
    items.extend(pages(range(count - boundary + 1, count)));
    items
}

fn pages(numbers: Vec<u64>) -> Vec<PageItem> {
    numbers.into_iter().map(PageItem::Page).collect()
}
