//! Universe and membership API types

use folio_core::{Membership, Role, Universe, UserId};
use serde::{Deserialize, Serialize};

/// Request to create a new universe. The caller becomes its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateUniverseRequest {
    /// Display name (1-200 characters)
    pub name: String,
    /// Optional free-text description
    #[serde(default)]
    pub description: Option<String>,
}

/// A universe together with the caller's role in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UniverseResponse {
    #[serde(flatten)]
    pub universe: Universe,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListUniversesResponse {
    pub universes: Vec<UniverseResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListMembersResponse {
    pub members: Vec<Membership>,
}

/// Request to add a user to a universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InviteMemberRequest {
    /// User to add (the `sub` of their tokens)
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub user_id: UserId,
    /// One of `owner`, `gm`, `viewer`
    pub role: Role,
}
