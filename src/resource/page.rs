//! Ordering and pagination of cached resource lists

use std::cmp::Ordering;

use serde::Serialize;

use super::{Resource, SortOrder};

/// One page of a cached resource list
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedSubset<R> {
    pub items: Vec<R>,
    pub page: usize,
    pub per_page: i64,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

fn sort_key<R: Resource>(item: &R, order_by: &str) -> Option<SortKey> {
    let value = serde_json::to_value(item).ok()?;
    match value.get(order_by) {
        Some(serde_json::Value::String(s)) => Some(SortKey::Text(s.to_lowercase())),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(SortKey::Number),
        Some(serde_json::Value::Bool(b)) => Some(SortKey::Number(if *b { 1.0 } else { 0.0 })),
        None if order_by == "name" => Some(SortKey::Text(item.name().to_lowercase())),
        _ => None,
    }
}

/// Order records by a field.
///
/// Records keep their stored order when any of them lacks `order_by`.
/// Descending is always the exact reverse of ascending, ties included.
pub fn sort_records<R: Resource>(items: Vec<R>, order_by: &str, order: SortOrder) -> Vec<R> {
    let keys: Option<Vec<SortKey>> = items.iter().map(|i| sort_key(i, order_by)).collect();
    let Some(keys) = keys else {
        log::debug!(
            "Sort field '{}' missing on {} records, keeping stored order",
            order_by,
            R::TYPE
        );
        return items;
    };

    let mut keyed: Vec<(SortKey, R)> = keys.into_iter().zip(items).collect();
    keyed.sort_by(|(a, _), (b, _)| a.compare(b));
    if order == SortOrder::Desc {
        keyed.reverse();
    }
    keyed.into_iter().map(|(_, item)| item).collect()
}

/// Slice one page out of `items`, clamping `page` into the valid range.
///
/// A non-positive `per_page` yields a single page with every item.
pub fn paginate<R: Clone>(items: &[R], page: i64, per_page: i64) -> PaginatedSubset<R> {
    let count = items.len();

    let total_pages = if per_page <= 0 {
        1
    } else {
        count.div_ceil(per_page as usize).max(1)
    };

    let page = page.clamp(1, total_pages as i64) as usize;

    let slice = if per_page <= 0 {
        items.to_vec()
    } else {
        let per_page = per_page as usize;
        let start = ((page - 1) * per_page).min(count);
        let end = (start + per_page).min(count);
        items[start..end].to_vec()
    };

    PaginatedSubset {
        items: slice,
        page,
        per_page,
        total_pages,
        has_next_page: page < total_pages,
        has_prev_page: page > 1,
    }
}
