//! Page API types

use folio_core::Page;
use folio_storage::PageUpdate;
use serde::{Deserialize, Serialize};

/// Request to create a page in a world. The caller becomes its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreatePageRequest {
    pub title: String,
    /// HTML fragment
    #[serde(default)]
    pub content: Option<String>,
    /// Defaults to `general`
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// Partial page edit. At least one field must be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdatePageRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl From<UpdatePageRequest> for PageUpdate {
    fn from(req: UpdatePageRequest) -> Self {
        PageUpdate {
            title: req.title,
            content: req.content,
            category: req.category,
            is_public: req.is_public,
        }
    }
}

/// Query string for `GET /api/worlds/{id}/pages/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ListPagesQuery {
    /// Exact category match
    pub category: Option<String>,
    /// Case-insensitive title substring
    pub q: Option<String>,
    /// Page size, 1-500 (default 100)
    pub limit: Option<usize>,
    /// Number of pages to skip
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListPagesResponse {
    pub pages: Vec<Page>,
    /// Matching pages before pagination
    pub total: u64,
}

/// Multipart form accepted by the `.docx` import route. Documentation only;
/// the handler reads the fields from the stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImportDocxForm {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Binary))]
    pub file: Vec<u8>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub is_public: Option<bool>,
}
