//! Demo endpoints: one public, one requiring the CREATE authority under the
//! default rules.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::{AppState, CurrentPrincipal};

/// Greeting response.
#[derive(Debug, Serialize)]
pub struct HelloResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authorities: Vec<String>,
}

/// Demo routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/hello", get(hello))
        .route("/auth/hello-secured", get(hello_secured))
}

async fn hello(principal: Option<CurrentPrincipal>) -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello World".to_string(),
        username: principal.map(|CurrentPrincipal(p)| p.username().to_string()),
        authorities: Vec::new(),
    })
}

async fn hello_secured(CurrentPrincipal(principal): CurrentPrincipal) -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello World - secured".to_string(),
        username: Some(principal.username().to_string()),
        authorities: principal.authorities().iter().map(String::from).collect(),
    })
}
