//! Request security filter and principal extractor.
//!
//! [`security_filter`] runs every request routed through it into the
//! [`RequestFilterChain`](warden_core::RequestFilterChain). Allowed requests
//! continue with the authenticated principal, if any, in the request
//! extensions; denied requests never reach a handler.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use warden_core::{AuthenticatedPrincipal, Decision, HttpMethod, InboundRequest, PresentedCredential};

use crate::{AppError, AppState};

/// Principal established for the current request.
///
/// Only present on routes whose rule required authentication. Use
/// `Option<CurrentPrincipal>` on routes that may be public.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub AuthenticatedPrincipal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentPrincipal>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Read the credential from the `Authorization` header.
pub fn presented_credential(headers: &HeaderMap) -> PresentedCredential {
    match headers.get(header::AUTHORIZATION) {
        None => PresentedCredential::Missing,
        Some(value) => match value.to_str() {
            Ok(value) => PresentedCredential::from_authorization(Some(value)),
            Err(_) => PresentedCredential::Malformed,
        },
    }
}

/// Axum middleware evaluating every request against the filter chain.
pub async fn security_filter(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let method = match request.method().as_str().parse::<HttpMethod>() {
        Ok(method) => method,
        Err(_) => {
            tracing::info!(method = %request.method(), path = %request.uri().path(), "unsupported method denied");
            return AppError::Forbidden.into_response();
        }
    };

    let inbound = InboundRequest::new(
        method,
        request.uri().path(),
        presented_credential(request.headers()),
    );

    match state.chain.evaluate(&inbound).await {
        Decision::Allow { principal } => {
            if let Some(principal) = principal {
                request.extensions_mut().insert(CurrentPrincipal(principal));
            }
            next.run(request).await
        }
        Decision::Deny { status, .. } => AppError::from(status).into_response(),
    }
}
