//! Filtering, sorting and pagination helpers shared by every listing.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AgronomyError;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDir {
    type Err = AgronomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            _ => Err(AgronomyError::unknown("sort direction", s)),
        }
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub page: usize,
    pub pages: usize,
    pub page_size: usize,
    pub total: usize,
    pub items: Vec<T>,
}

/// Clamps a requested page size to `[1, MAX_PAGE_SIZE]`.
pub fn page_size(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

/// Slices `items` into the requested page. The page count is at least one
/// and the requested page is clamped into `[1, pages]`.
pub fn paginate<T>(items: Vec<T>, page: Option<usize>, size: usize) -> Page<T> {
    let size = size.max(1);
    let total = items.len();
    let pages = total.div_ceil(size).max(1);
    let page = page.unwrap_or(1).clamp(1, pages);
    let items = items
        .into_iter()
        .skip((page - 1) * size)
        .take(size)
        .collect();
    Page {
        page,
        pages,
        page_size: size,
        total,
        items,
    }
}

/// Case-insensitive substring match against any of `fields`. An empty needle
/// matches everything.
pub fn matches_text(fields: &[&str], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

/// Exact match for a select-style filter. `None`, `""` and `"all"` accept
/// any value.
pub fn matches_choice(value: &str, wanted: Option<&str>) -> bool {
    match wanted.map(str::trim) {
        None | Some("") | Some("all") => true,
        Some(w) => value.eq_ignore_ascii_case(w),
    }
}

/// Clamps an optional row limit into `[1, max]`.
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_clamps_page() {
        let p = paginate((1..=23).collect::<Vec<_>>(), Some(9), 10);
        assert_eq!(p.pages, 3);
        assert_eq!(p.page, 3);
        assert_eq!(p.items, vec![21, 22, 23]);

        let p = paginate((1..=23).collect::<Vec<_>>(), Some(0), 10);
        assert_eq!(p.page, 1);
        assert_eq!(p.items.len(), 10);
    }

    #[test]
    fn test_paginate_empty_has_one_page() {
        let p = paginate(Vec::<i32>::new(), Some(4), 10);
        assert_eq!(p.pages, 1);
        assert_eq!(p.page, 1);
        assert_eq!(p.total, 0);
        assert!(p.items.is_empty());
    }

    #[test]
    fn test_page_size_bounds() {
        assert_eq!(page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(5000)), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 200, 1000), 200);
        assert_eq!(clamp_limit(Some(-3), 200, 1000), 1);
        assert_eq!(clamp_limit(Some(5000), 200, 1000), 1000);
    }

    #[test]
    fn test_text_and_choice_matching() {
        assert!(matches_text(&["Humidity low", "HUM-001"], "hum-0"));
        assert!(matches_text(&["anything"], "  "));
        assert!(!matches_text(&["lot-a"], "greenhouse"));
        assert!(matches_choice("high", Some("all")));
        assert!(matches_choice("high", Some("HIGH")));
        assert!(!matches_choice("low", Some("high")));
    }
}
