//! Credential injection middleware.
//!
//! Runs the injector for the request's tenant and publishes the resulting
//! [`CredentialContext`] as a request extension for downstream handlers.
//! Requests without a tenant proceed with an empty context. Only a tampered
//! credential stops the request.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use credsync_core::credential::context::CredentialContext;

use crate::http::error::AppError;
use crate::http::extractors::tenant::tenant_header;
use crate::state::AppState;

pub async fn inject_credentials(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let tenant_id = tenant_header(request.headers());
    let mut ctx = CredentialContext::new();
    let published = state.injector.inject(tenant_id.as_deref(), &mut ctx).await?;

    tracing::debug!(
        tenant_id = tenant_id.as_deref().unwrap_or(""),
        published,
        "credentials injected"
    );
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
