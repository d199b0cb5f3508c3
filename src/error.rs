//! Unified error handling for the cloudprov-api application.
//!
//! This module provides a centralized error type (`AppError`) that handles
//! all errors throughout the application and maps them to appropriate HTTP responses.

use std::collections::BTreeMap;

use actix_web::{http::header, http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::services::provider::ProviderError;

/// Per-field validation messages, keyed by request field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error set holding a single message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Errors raised by the durable stores (credentials, keys, servers).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Credential is still referenced by {0} server(s)")]
    CredentialInUse(i64),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Unified application error type.
///
/// All errors in the application are converted to this type, which implements
/// `actix_web::ResponseError` for automatic HTTP response generation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Schema, allow-list and quota violations
    #[error("Validation failed: {0}")]
    InputValidation(FieldErrors),

    /// Team-scoped lookup misses
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider refused the request (business rule, credential rejected)
    #[error("Provider rejected the request: {0}")]
    ProviderRejected(String),

    /// The provider rate-limited us; retry hint in seconds when known
    #[error("Rate limited by provider")]
    RateLimited { retry_after: Option<u64> },

    /// Transport failures and anything unclassified
    #[error("Unexpected failure: {0}")]
    Unexpected(String),

    /// Store errors (database, reference guards)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(err))
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Auth => {
                AppError::ProviderRejected("provider rejected the credential token".to_string())
            }
            ProviderError::Validation(message) => AppError::ProviderRejected(message),
            ProviderError::RateLimited { retry_after } => AppError::RateLimited { retry_after },
            ProviderError::Unreachable(message) => {
                AppError::Unexpected(format!("provider unreachable: {}", message))
            }
            ProviderError::Unexpected(message) => AppError::Unexpected(message),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InputValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderRejected(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(StoreError::CredentialInUse(_)) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        if let AppError::InputValidation(errors) = self {
            return builder.json(serde_json::json!({
                "message": "Validation failed.",
                "errors": errors,
            }));
        }

        if let AppError::RateLimited {
            retry_after: Some(seconds),
        } = self
        {
            builder.insert_header((header::RETRY_AFTER, seconds.to_string()));
        }

        let error_message = match self {
            // Don't expose database internals
            AppError::Store(StoreError::CredentialInUse(_)) => self.to_string(),
            AppError::Store(_) => "Internal server error".to_string(),
            AppError::RateLimited { .. } => {
                "Provider rate limit exceeded, retry later".to_string()
            }
            // Provider messages are passed through
            AppError::ProviderRejected(msg)
            | AppError::Unexpected(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::InputValidation(errors) => errors.to_string(),
        };

        builder.json(serde_json::json!({ "error": error_message }))
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
