//! FOLIO Storage - Storage Trait and In-Memory Implementation
//!
//! Defines the storage abstraction for FOLIO entities and the membership
//! check every route runs before touching tenant data. The Postgres
//! implementation lives in folio-api.

pub mod access;
pub mod memory;
pub mod wiki_store;

pub use access::{authorize, authorize_parent};
pub use memory::InMemoryStore;
pub use wiki_store::WikiStore;

use folio_core::{validate_category, validate_content, validate_title, FolioResult};
use serde::{Deserialize, Serialize};

/// Default number of pages returned by a listing.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Upper bound on the number of pages returned by a listing.
pub const MAX_PAGE_LIMIT: usize = 500;

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Partial update payload for pages. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub is_public: Option<bool>,
}

impl PageUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.is_public.is_none()
    }

    /// Apply the same field rules as page creation to the provided fields.
    pub fn validated(self) -> FolioResult<Self> {
        Ok(Self {
            title: self.title.map(validate_title).transpose()?,
            content: self.content.map(validate_content).transpose()?,
            category: match self.category {
                Some(category) => Some(validate_category(Some(category))?),
                None => None,
            },
            is_public: self.is_public,
        })
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Listing filter for pages inside one world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
    /// Whether non-public pages are included.
    pub include_private: bool,
    pub limit: usize,
    pub offset: usize,
}

impl Default for PageFilter {
    fn default() -> Self {
        Self {
            category: None,
            title_contains: None,
            include_private: false,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl PageFilter {
    /// Clamp a requested limit into `1..=MAX_PAGE_LIMIT`.
    pub fn clamp_limit(requested: Option<usize>) -> usize {
        requested
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// Whether `page` passes the category, visibility and title predicates.
    /// Pagination is applied by the store.
    pub fn matches(&self, page: &folio_core::Page) -> bool {
        if !self.include_private && !page.is_public {
            return false;
        }
        if let Some(category) = &self.category {
            if &page.category != category {
                return false;
            }
        }
        if let Some(needle) = &self.title_contains {
            if !page
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}
