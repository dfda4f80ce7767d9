//! `.docx` import route.
//!
//! Accepts a multipart upload, converts `word/document.xml` to an HTML
//! fragment and stores it as a new page in the world.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use folio_core::{Action, Page, WorldId};

use crate::access::{load_world, require};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::extractors::PathId;
use crate::importer::{convert_docx, ImportedDocument, DEFAULT_IMPORT_CATEGORY};
use crate::middleware::AuthExtractor;
use crate::state::{AppState, SharedStore};
#[cfg(feature = "openapi")]
use crate::types::ImportDocxForm;
use crate::telemetry::metrics::{record_import, ImportOutcome};
use std::sync::Arc;

/// Room for the non-file form fields and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Fields of the upload form.
#[derive(Debug, Default)]
struct ImportForm {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    title: Option<String>,
    category: Option<String>,
    is_public: bool,
}

fn parse_is_public(value: &str) -> ApiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" => Ok(false),
        "true" => Ok(true),
        _ => Err(ApiError::invalid_format("is_public", "true or false")),
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(max_bytes)
    } else {
        ApiError::invalid_input(format!("Malformed multipart body: {}", err.body_text()))
    }
}

async fn read_form(mut multipart: Multipart, max_bytes: usize) -> ApiResult<ImportForm> {
    let mut form = ImportForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?;
                if bytes.len() > max_bytes {
                    return Err(ApiError::payload_too_large(max_bytes));
                }
                form.file = Some(bytes.to_vec());
            }
            "title" | "category" | "is_public" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?;
                match name.as_str() {
                    "title" => form.title = Some(text),
                    "category" => form.category = Some(text),
                    _ => form.is_public = parse_is_public(&text)?,
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown import form field"),
        }
    }

    Ok(form)
}

async fn convert(bytes: Vec<u8>) -> ApiResult<ImportedDocument> {
    tokio::task::spawn_blocking(move || convert_docx(&bytes))
        .await
        .map_err(|e| ApiError::internal_error(format!("Import task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// POST /api/worlds/{id}/import-docx/ - Import a `.docx` file as a new page
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/worlds/{id}/import-docx/",
    tag = "Pages",
    params(("id" = String, Path, description = "World ID")),
    request_body(content = ImportDocxForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Page created from the document", body = Page),
        (status = 400, description = "Not a .docx, empty, or too large", body = ApiError),
        (status = 403, description = "Caller may not edit pages", body = ApiError),
        (status = 404, description = "World not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn import_docx(
    State(store): State<SharedStore>,
    State(config): State<Arc<ApiConfig>>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<WorldId>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let world = load_world(&*store, id).await?;
    require(&*store, auth.user_id, &world, Action::EditPages).await?;

    let result = async {
        let form = read_form(multipart, config.import_max_bytes).await?;
        let file = form.file.ok_or_else(|| ApiError::missing_field("file"))?;
        let document = convert(file).await?;

        let title = document.resolve_title(form.title.as_deref(), form.file_name.as_deref());
        let category = form
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IMPORT_CATEGORY.to_string());

        Ok::<_, ApiError>(Page::new(
            world.world_id,
            title,
            Some(document.html),
            Some(category),
            auth.user_id,
            form.is_public,
        )?)
    }
    .await;

    let page = match result {
        Ok(page) => page,
        Err(err) => {
            record_import(ImportOutcome::Rejected);
            tracing::info!(world_id = %world.world_id, error = %err, "Import rejected");
            return Err(err);
        }
    };

    if let Err(err) = store.page_create(&page).await {
        record_import(ImportOutcome::Failed);
        return Err(err.into());
    }
    record_import(ImportOutcome::Success);

    tracing::info!(
        page_id = %page.page_id,
        world_id = %world.world_id,
        bytes = page.content.len(),
        "Document imported"
    );

    Ok((StatusCode::CREATED, Json(page)))
}

/// Create the import route, bounded to `max_bytes` of file content.
pub fn create_router(max_bytes: usize) -> Router<AppState> {
    Router::new().route(
        "/:id/import-docx/",
        post(import_docx).layer(DefaultBodyLimit::max(
            max_bytes.saturating_add(FORM_OVERHEAD_BYTES),
        )),
    )
}
