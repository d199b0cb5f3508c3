//! Health check endpoint for the API.

use actix_web::{HttpResponse, Responder};
use serde::Serialize;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health` - liveness only; does not touch the database or providers.
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
