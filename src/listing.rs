//! In-memory search and pagination applied to already-fetched collections.
//!
//! Collections here are small (one school's worth of rows), so list
//! endpoints fetch the full set and narrow it in memory instead of pushing
//! the filter into SQL.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: usize = 10;

/// Query parameters shared by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

/// One page of results, always wrapped in this envelope — a zero-match
/// search returns `items: []` with the counts, never a bare array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Keep the items whose searched fields contain `term`, case-insensitively.
/// An empty term keeps everything. Items are never mutated.
pub fn filter<T, F>(items: Vec<T>, term: &str, fields: F) -> Vec<T>
where
    F: Fn(&T) -> Vec<String>,
{
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            fields(item)
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Slice a filtered collection into one page. The requested page is clamped
/// into the valid range; `per_page` of zero falls back to the default.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = if per_page == 0 { DEFAULT_PER_PAGE } else { per_page };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

/// Filter + paginate in one call, driven by the request query.
pub fn search_page<T, F>(items: Vec<T>, query: &ListQuery, fields: F) -> Page<T>
where
    F: Fn(&T) -> Vec<String>,
{
    let filtered = filter(items, query.search.as_deref().unwrap_or(""), fields);
    paginate(
        filtered,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )
}
