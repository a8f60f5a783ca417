//! # Document Catalog API
//!
//! Listing, visibility and removal of signed documents, plus download of
//! the stored artifact. Administrators see the whole catalog; other
//! callers see their own documents and, as team leaders, their team's.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use docseal_core::{Document, DocumentView, FileKind, TeamId, UserId};
use docseal_index::{DocumentQuery, OwnerScope, Page, Visibility};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_query, parse_document_id, Validate};
use crate::state::AppState;

// -- Response types -----------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub original_name: String,
    /// Normalized original extension, e.g. `.pdf`.
    pub file_format: String,
    /// `png`, `jpeg`, `pdf` or `other`.
    pub kind: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub content_hash: String,
    pub storage_key: String,
    pub signature: String,
    pub verification_count: i64,
    pub is_hidden: bool,
    pub signed_by_user: Uuid,
    pub signed_by_team: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Document> for DocumentResponse {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.0,
            original_name: doc.original_name.clone(),
            file_format: doc.extension.clone(),
            kind: kind_name(doc.file_format).to_string(),
            content_hash: doc.content_hash.to_hex(),
            storage_key: doc.storage_key.as_str().to_string(),
            signature: doc.signature.clone(),
            verification_count: doc.verification_count,
            is_hidden: doc.is_hidden,
            signed_by_user: doc.signed_by_user.0,
            signed_by_team: doc.signed_by_team.map(|t| t.0),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignerResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamResponse {
    pub id: Uuid,
    pub name: String,
}

/// A document as shown to a verifier, with its signer resolved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationResponse {
    pub id: Uuid,
    pub original_name: String,
    pub file_format: String,
    pub kind: String,
    pub hash: String,
    pub signature: String,
    pub verification_count: i64,
    pub is_hidden: bool,
    pub signed_by_user: SignerResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_by_team: Option<TeamResponse>,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub created_at: String,
    pub updated_at: String,
}

impl From<DocumentView> for VerificationResponse {
    fn from(view: DocumentView) -> Self {
        Self {
            id: view.id.0,
            original_name: view.original_name,
            file_format: view.file_format,
            kind: kind_name(view.kind).to_string(),
            hash: view.hash.to_hex(),
            signature: view.signature,
            verification_count: view.verification_count,
            is_hidden: view.is_hidden,
            signed_by_user: SignerResponse {
                id: view.signed_by_user.id.0,
                full_name: view.signed_by_user.full_name,
                email: view.signed_by_user.email,
            },
            signed_by_team: view.signed_by_team.map(|t| TeamResponse {
                id: t.id.0,
                name: t.name,
            }),
            created_at: view.created_at,
            updated_at: view.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub items: Vec<DocumentResponse>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl From<Page<Document>> for DocumentListResponse {
    fn from(page: Page<Document>) -> Self {
        Self {
            items: page.items.iter().map(DocumentResponse::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VisibilityResponse {
    pub id: Uuid,
    pub is_hidden: bool,
}

fn kind_name(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Png => "png",
        FileKind::Jpeg => "jpeg",
        FileKind::Pdf => "pdf",
        FileKind::Other => "other",
    }
}

// -- Query parameters ---------------------------------------------------------

/// Filters for the administrative listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// `visible`, `hidden` or `all` (default `all`).
    pub visibility: Option<String>,
    /// Only documents signed by this user.
    pub user_id: Option<Uuid>,
    /// Only documents signed on behalf of this team.
    pub team_id: Option<Uuid>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, at most 100.
    pub limit: Option<u32>,
}

impl ListParams {
    fn visibility(&self) -> Result<Visibility, String> {
        match &self.visibility {
            None => Ok(Visibility::All),
            Some(v) => v.parse(),
        }
    }

    fn scope(&self) -> OwnerScope {
        match (self.user_id, self.team_id) {
            (Some(u), _) => OwnerScope::User(UserId(u)),
            (None, Some(t)) => OwnerScope::Team(TeamId(t)),
            (None, None) => OwnerScope::Any,
        }
    }
}

impl Validate for ListParams {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.is_some() && self.team_id.is_some() {
            return Err("filter by user_id or team_id, not both".into());
        }
        self.visibility().map(|_| ())
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Validate for PageParams {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

// -- Router -------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/documents", get(list_documents))
        .route("/api/documents/my", get(list_my_documents))
        .route("/api/documents/myteam", get(list_team_documents))
        .route("/api/documents/my/{id}/hide", post(hide_my_document))
        .route("/api/documents/myteam/{id}/hide", post(hide_team_document))
        .route("/api/documents/{id}", delete(delete_document))
        .route("/api/documents/{id}/hide", post(hide_document))
        .route("/api/documents/{id}/show", post(show_document))
        .route("/api/documents/{id}/artifact", get(download_artifact))
}

// -- Listing ------------------------------------------------------------------

/// GET /api/documents: the whole catalog, filtered.
#[utoipa::path(
    get,
    path = "/api/documents",
    params(ListParams),
    responses(
        (status = 200, description = "One page of documents", body = DocumentListResponse),
        (status = 401, description = "Missing caller identity", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not an administrator", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid filter", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<AppState>,
    caller: CallerIdentity,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<DocumentListResponse>, AppError> {
    require_role(&caller, Role::SuperAdmin)?;
    let params = extract_query(params)?;
    let visibility = params.visibility().map_err(AppError::Validation)?;
    let query = DocumentQuery::new(visibility, params.scope()).paged(params.page, params.limit);
    let page = state.admin.list(&query).await?;
    Ok(Json(page.into()))
}

/// GET /api/documents/my: the caller's visible documents.
#[utoipa::path(
    get,
    path = "/api/documents/my",
    params(PageParams),
    responses(
        (status = 200, description = "One page of documents", body = DocumentListResponse),
        (status = 401, description = "Missing caller identity", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn list_my_documents(
    State(state): State<AppState>,
    caller: CallerIdentity,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let params = extract_query(params)?;
    let query = DocumentQuery::new(Visibility::Visible, caller.own_scope())
        .paged(params.page, params.limit);
    let page = state.admin.list(&query).await?;
    Ok(Json(page.into()))
}

/// GET /api/documents/myteam: the caller's team's visible documents.
#[utoipa::path(
    get,
    path = "/api/documents/myteam",
    params(PageParams),
    responses(
        (status = 200, description = "One page of documents", body = DocumentListResponse),
        (status = 401, description = "Missing caller identity", body = crate::error::ErrorBody),
        (status = 403, description = "Caller does not lead a team", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn list_team_documents(
    State(state): State<AppState>,
    caller: CallerIdentity,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<DocumentListResponse>, AppError> {
    require_role(&caller, Role::TeamLeader)?;
    let team = caller.require_team()?;
    let params = extract_query(params)?;
    let query = DocumentQuery::new(Visibility::Visible, OwnerScope::Team(team))
        .paged(params.page, params.limit);
    let page = state.admin.list(&query).await?;
    Ok(Json(page.into()))
}

// -- Visibility ---------------------------------------------------------------

async fn change_visibility(
    state: &AppState,
    raw_id: &str,
    hidden: bool,
    scope: OwnerScope,
) -> Result<Json<VisibilityResponse>, AppError> {
    let id = parse_document_id(raw_id)?;
    state.admin.set_hidden(&id, hidden, scope).await?;
    Ok(Json(VisibilityResponse {
        id: id.0,
        is_hidden: hidden,
    }))
}

/// POST /api/documents/{id}/hide
#[utoipa::path(
    post,
    path = "/api/documents/{id}/hide",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Document hidden", body = VisibilityResponse),
        (status = 403, description = "Caller is not an administrator", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn hide_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<VisibilityResponse>, AppError> {
    require_role(&caller, Role::SuperAdmin)?;
    change_visibility(&state, &id, true, OwnerScope::Any).await
}

/// POST /api/documents/{id}/show
#[utoipa::path(
    post,
    path = "/api/documents/{id}/show",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Document visible again", body = VisibilityResponse),
        (status = 403, description = "Caller is not an administrator", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn show_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<VisibilityResponse>, AppError> {
    require_role(&caller, Role::SuperAdmin)?;
    change_visibility(&state, &id, false, OwnerScope::Any).await
}

/// POST /api/documents/my/{id}/hide: hide one of the caller's documents.
#[utoipa::path(
    post,
    path = "/api/documents/my/{id}/hide",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Document hidden", body = VisibilityResponse),
        (status = 404, description = "No such document signed by the caller", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn hide_my_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<VisibilityResponse>, AppError> {
    change_visibility(&state, &id, true, caller.own_scope()).await
}

/// POST /api/documents/myteam/{id}/hide: hide one of the team's documents.
#[utoipa::path(
    post,
    path = "/api/documents/myteam/{id}/hide",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Document hidden", body = VisibilityResponse),
        (status = 403, description = "Caller does not lead a team", body = crate::error::ErrorBody),
        (status = 404, description = "No such document in the caller's team", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn hide_team_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<VisibilityResponse>, AppError> {
    require_role(&caller, Role::TeamLeader)?;
    let team = caller.require_team()?;
    change_visibility(&state, &id, true, OwnerScope::Team(team)).await
}

// -- Removal and download -----------------------------------------------------

/// DELETE /api/documents/{id}: remove the record and its artifact.
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "The removed document", body = DocumentResponse),
        (status = 403, description = "Caller is not an administrator", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn delete_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    require_role(&caller, Role::SuperAdmin)?;
    let id = parse_document_id(&id)?;
    let removed = state.admin.remove(&id).await?;
    tracing::info!(id = %id, by = %caller.user, "document removed");
    Ok(Json(DocumentResponse::from(&removed)))
}

/// GET /api/documents/{id}/artifact: the signed, annotated file.
///
/// Documents the caller may not see are reported as missing.
#[utoipa::path(
    get,
    path = "/api/documents/{id}/artifact",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Artifact bytes", content_type = "application/octet-stream"),
        (status = 401, description = "Missing caller identity", body = crate::error::ErrorBody),
        (status = 404, description = "No such document", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn download_artifact(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_document_id(&id)?;
    let doc = state.admin.find(&id).await?;
    if !caller.can_view(&doc) {
        return Err(AppError::NotFound(format!("document {id}")));
    }
    let bytes = state.admin.artifact(&doc).await?;
    let disposition = format!("attachment; filename=\"{}{}\"", doc.id, doc.extension);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, doc.file_format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_default_to_everything() {
        let p = ListParams::default();
        assert_eq!(p.visibility().unwrap(), Visibility::All);
        assert_eq!(p.scope(), OwnerScope::Any);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn list_params_reject_conflicting_owners() {
        let p = ListParams {
            user_id: Some(Uuid::new_v4()),
            team_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn list_params_reject_unknown_visibility() {
        let p = ListParams {
            visibility: Some("archived".into()),
            ..Default::default()
        };
        assert!(p.validate().is_err());
        let p = ListParams {
            visibility: Some("Hidden".into()),
            ..Default::default()
        };
        assert_eq!(p.visibility().unwrap(), Visibility::Hidden);
    }
}
