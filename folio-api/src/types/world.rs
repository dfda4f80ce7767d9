//! World API types

use folio_core::{Role, UserId, World};
use serde::{Deserialize, Serialize};

/// Request to create a world inside a universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateWorldRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Game system label, e.g. "D&D 5e"
    pub ruleset: String,
    /// Must be an owner or GM of the universe when set
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub primary_gm: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorldResponse {
    #[serde(flatten)]
    pub world: World,
    /// Caller's role in the owning universe
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListWorldsResponse {
    pub worlds: Vec<World>,
}
