//! Credential endpoint handlers for the REST API.
//!
//! Every route acts on the caller's tenant. Responses carry metadata only;
//! decrypted values never leave the service through this surface.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use credsync_core::credential::context::CredentialContext;
use credsync_types::credential::{CredentialMetadata, CredentialPayload, CredentialType};

use crate::http::error::AppError;
use crate::http::extractors::tenant::TenantContext;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Parsed store/rotate request body.
///
/// The body is the payload schema of the addressed type plus two optional
/// envelope fields, `description` and `expires_at` (RFC 3339).
#[derive(Debug)]
pub struct CredentialBody {
    pub payload: CredentialPayload,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RevokeResult {
    pub credential_type: CredentialType,
    pub revoked: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfiguredCredentials {
    pub configured: Vec<CredentialType>,
    pub missing: Vec<CredentialType>,
}

/// GET /api/v1/credentials - Metadata for every stored version.
pub async fn list_credentials(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<ApiResponse<Vec<CredentialMetadata>>>, AppError> {
    let start = Instant::now();
    let records = state.vault.list(&tenant.tenant_id).await?;

    Ok(Json(
        ApiResponse::success(records, start).with_link("self", "/api/v1/credentials"),
    ))
}

/// POST /api/v1/credentials/{slug} - Store credentials of one type.
pub async fn store_credential(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(slug): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CredentialMetadata>>), AppError> {
    let start = Instant::now();
    let credential_type = parse_type(&slug)?;
    let Json(body) = body?;
    let body = parse_body(credential_type, body)?;

    let metadata = state
        .vault
        .store(
            &tenant.tenant_id,
            &body.payload,
            body.description.as_deref().unwrap_or_default(),
            body.expires_at,
        )
        .await?;

    tracing::info!(
        tenant_id = %tenant.tenant_id,
        user_id = tenant.user_id.as_deref().unwrap_or(""),
        credential_type = %credential_type,
        "credentials saved"
    );

    let resp = ApiResponse::success(metadata, start)
        .with_link("self", &format!("/api/v1/credentials/{}", credential_type.slug()));
    Ok((StatusCode::CREATED, Json(resp)))
}

/// POST /api/v1/credentials/{slug}/rotate - Replace the active credentials.
pub async fn rotate_credential(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(slug): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<CredentialMetadata>>, AppError> {
    let start = Instant::now();
    let credential_type = parse_type(&slug)?;
    let Json(body) = body?;
    let body = parse_body(credential_type, body)?;

    let metadata = state
        .vault
        .rotate(
            &tenant.tenant_id,
            &body.payload,
            body.description.as_deref(),
            body.expires_at,
        )
        .await?;

    tracing::info!(
        tenant_id = %tenant.tenant_id,
        user_id = tenant.user_id.as_deref().unwrap_or(""),
        credential_type = %credential_type,
        "credentials rotated"
    );

    Ok(Json(ApiResponse::success(metadata, start)))
}

/// DELETE /api/v1/credentials/{slug} - Revoke the active credentials.
///
/// Succeeds whether or not anything was active.
pub async fn revoke_credential(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<RevokeResult>>, AppError> {
    let start = Instant::now();
    let credential_type = parse_type(&slug)?;
    let revoked = state.vault.revoke(&tenant.tenant_id, credential_type).await?;

    tracing::info!(
        tenant_id = %tenant.tenant_id,
        user_id = tenant.user_id.as_deref().unwrap_or(""),
        credential_type = %credential_type,
        revoked,
        "credentials revoke requested"
    );

    Ok(Json(ApiResponse::success(
        RevokeResult {
            credential_type,
            revoked,
        },
        start,
    )))
}

/// GET /api/v1/credentials/{slug}/history - Every version, newest first.
pub async fn credential_history(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<CredentialMetadata>>>, AppError> {
    let start = Instant::now();
    let credential_type = parse_type(&slug)?;
    let history = state.vault.history(&tenant.tenant_id, credential_type).await?;
    Ok(Json(ApiResponse::success(history, start)))
}

/// GET /api/v1/credentials/configured - Which types resolve for this tenant.
///
/// Reads the context published by the injection middleware.
pub async fn configured_credentials(
    _tenant: TenantContext,
    Extension(ctx): Extension<CredentialContext>,
) -> Json<ApiResponse<ConfiguredCredentials>> {
    let start = Instant::now();
    let (configured, missing): (Vec<_>, Vec<_>) = CredentialType::ALL
        .iter()
        .copied()
        .partition(|ty| ctx.contains(*ty));

    Json(ApiResponse::success(
        ConfiguredCredentials {
            configured,
            missing,
        },
        start,
    ))
}

fn parse_type(slug: &str) -> Result<CredentialType, AppError> {
    slug.parse()
        .map_err(|_| AppError::UnknownCredentialType(slug.to_string()))
}

/// Split the envelope fields off `body` and validate the payload.
pub fn parse_body(credential_type: CredentialType, body: Value) -> Result<CredentialBody, AppError> {
    let Value::Object(mut fields) = body else {
        return Err(AppError::Validation(
            "request body must be a JSON object".to_string(),
        ));
    };

    let description = match fields.remove("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            return Err(AppError::Validation(
                "description must be a string".to_string(),
            ));
        }
    };

    let expires_at = match fields.remove("expires_at") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(
            DateTime::parse_from_rfc3339(&s)
                .map_err(|_| {
                    AppError::Validation("expires_at must be an RFC 3339 timestamp".to_string())
                })?
                .with_timezone(&Utc),
        ),
        Some(_) => {
            return Err(AppError::Validation(
                "expires_at must be an RFC 3339 timestamp".to_string(),
            ));
        }
    };

    let payload = CredentialPayload::from_value(credential_type, Value::Object(fields))
        .map_err(|e| AppError::Validation(describe_payload_error(credential_type, &e)))?;
    payload.validate().map_err(AppError::Validation)?;

    Ok(CredentialBody {
        payload,
        description,
        expires_at,
    })
}

/// Error text for a payload that does not match its schema.
///
/// Type-mismatch messages from serde quote the rejected value, so only
/// missing/unknown field messages (which name fields, not values) pass
/// through.
fn describe_payload_error(credential_type: CredentialType, err: &serde_json::Error) -> String {
    let msg = err.to_string();
    if msg.starts_with("missing field") || msg.starts_with("unknown field") {
        format!("invalid {credential_type} payload: {msg}")
    } else {
        format!("invalid {credential_type} payload: a field has the wrong type")
    }
}
