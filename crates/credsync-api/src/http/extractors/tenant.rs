//! Caller identity extractor.
//!
//! Authentication happens upstream. By the time a request reaches this
//! service the auth layer has set:
//! - `X-Tenant-Id: <tenant>` (required for credential routes)
//! - `X-User-Id: <user>` (optional, recorded in logs)

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use credsync_types::error::VaultError;

use crate::http::error::AppError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// The tenant (and user) a request acts for.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub user_id: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id =
            tenant_header(&parts.headers).ok_or(AppError::Vault(VaultError::MissingTenant))?;
        Ok(Self {
            tenant_id,
            user_id: header_value(&parts.headers, USER_HEADER),
        })
    }
}

/// The tenant header, if present and non-blank.
pub fn tenant_header(headers: &HeaderMap) -> Option<String> {
    header_value(headers, TENANT_HEADER)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_tenant_header_trims_and_rejects_blank() {
        let mut headers = HeaderMap::new();
        assert_eq!(tenant_header(&headers), None);

        headers.insert(TENANT_HEADER, HeaderValue::from_static("   "));
        assert_eq!(tenant_header(&headers), None);

        headers.insert(TENANT_HEADER, HeaderValue::from_static(" t1 "));
        assert_eq!(tenant_header(&headers).as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_extractor_requires_tenant() {
        let (mut parts, _) = axum::http::Request::builder()
            .header(USER_HEADER, "u1")
            .body(())
            .unwrap()
            .into_parts();
        let err = TenantContext::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Vault(VaultError::MissingTenant)));

        let (mut parts, _) = axum::http::Request::builder()
            .header(TENANT_HEADER, "t1")
            .header(USER_HEADER, "u1")
            .body(())
            .unwrap()
            .into_parts();
        let ctx = TenantContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.tenant_id, "t1");
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
    }
}
