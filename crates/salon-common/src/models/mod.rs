//! Core domain models shared across all salon services.
//!
//! These are the "truth" types — what the database stores and the API serializes.
//! Most entities are soft-deleted through an `is_deleted` flag.

pub mod account;
pub mod aesthetician;
pub mod analytics;
pub mod appointment;
pub mod branch;
pub mod service;
pub mod user;
pub mod voucher;
pub mod walk_in;

/// Re-export all model types for convenience.
pub use account::*;
pub use aesthetician::*;
pub use appointment::*;
pub use branch::*;
pub use service::*;
pub use user::*;
pub use voucher::*;
pub use walk_in::*;

use serde::{Deserialize, Serialize};

use crate::config::LimitsConfig;

/// Common list query: `?page=1&per_page=20&search=ana`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
}

impl PageQuery {
    /// Resolve to `(limit, offset)`, clamping to configured bounds.
    pub fn bounds(&self, limits: &LimitsConfig) -> (i64, i64) {
        let per_page = self
            .per_page
            .unwrap_or(limits.default_page_size)
            .clamp(1, limits.max_page_size);
        let page = self.page.unwrap_or(1).max(1);
        // Huge pages saturate to an offset past any table instead of overflowing.
        (per_page, (page - 1).saturating_mul(per_page))
    }

    /// `%term%` pattern for ILIKE searches, or None when no search was given.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
    }
}

/// Paginated list envelope.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, limit: i64, offset: i64, total: i64) -> Self {
        Self {
            items,
            page: offset / limit.max(1) + 1,
            per_page: limit,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> LimitsConfig {
        LimitsConfig {
            max_image_bytes: 1024,
            default_page_size: 20,
            max_page_size: 100,
        }
    }

    #[test]
    fn page_bounds_clamp() {
        let q = PageQuery { page: Some(3), per_page: Some(500), search: None };
        assert_eq!(q.bounds(&limits()), (100, 200));

        let q = PageQuery { page: Some(0), per_page: None, search: None };
        assert_eq!(q.bounds(&limits()), (20, 0));
    }

    #[test]
    fn huge_page_numbers_saturate() {
        let q = PageQuery { page: Some(i64::MAX), per_page: Some(20), search: None };
        assert_eq!(q.bounds(&limits()), (20, i64::MAX));

        let q = PageQuery { page: Some(i64::MAX / 10), per_page: Some(100), search: None };
        let (limit, offset) = q.bounds(&limits());
        assert_eq!(limit, 100);
        assert!(offset > 0);
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let q = PageQuery { search: Some(" 50%_off ".into()), ..Default::default() };
        assert_eq!(q.search_pattern().as_deref(), Some("%50\\%\\_off%"));

        let q = PageQuery { search: Some("   ".into()), ..Default::default() };
        assert!(q.search_pattern().is_none());
    }

    #[test]
    fn page_number_from_offset() {
        let page: Page<u8> = Page::new(vec![], 20, 40, 55);
        assert_eq!(page.page, 3);
    }
}
