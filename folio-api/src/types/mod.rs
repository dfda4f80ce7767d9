//! Request and response bodies for the REST API.

mod page;
mod universe;
mod user;
mod world;

pub use page::{
    CreatePageRequest, ImportDocxForm, ListPagesQuery, ListPagesResponse, UpdatePageRequest,
};
pub use universe::{
    CreateUniverseRequest, InviteMemberRequest, ListMembersResponse, ListUniversesResponse,
    UniverseResponse,
};
pub use user::{DevTokenRequest, DevTokenResponse, MeResponse};
pub use world::{CreateWorldRequest, ListWorldsResponse, WorldResponse};
