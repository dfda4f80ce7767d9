//! Request extractors that reject with the shared [`crate::error::ApiError`] body.

mod body;
mod path_id;

pub use body::{ApiJson, ApiQuery};
pub use path_id::PathId;
