//! HTTP adapter rendering domain failures.
//!
//! Purpose: keep the failure model HTTP-agnostic while giving every Actix
//! response the same JSON envelope. Development output carries the raw
//! failure and its trace; production output never leaks internals.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::{Classification, ErrorStatus, Failure, OperationalError, classify};

/// Message sent for every non-operational failure in production.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went very wrong!";

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Failure>;

/// How much detail failure responses carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Full diagnostics: raw failure and trace.
    Development,
    /// Client-safe output only.
    #[default]
    Production,
}

impl ErrorMode {
    /// Resolve the mode from the configured environment name.
    ///
    /// Unknown or missing names select [`ErrorMode::Production`].
    ///
    /// # Examples
    /// ```
    /// use faultline::inbound::http::error::ErrorMode;
    ///
    /// assert_eq!(ErrorMode::from_environment(Some("development")), ErrorMode::Development);
    /// assert_eq!(ErrorMode::from_environment(Some("staging")), ErrorMode::Production);
    /// assert_eq!(ErrorMode::from_environment(None), ErrorMode::Production);
    /// ```
    #[must_use]
    pub fn from_environment(environment: Option<&str>) -> Self {
        match environment {
            Some("development") => Self::Development,
            Some("production") => Self::Production,
            Some(other) => {
                warn!(environment = other, "unrecognised environment; using production error output");
                Self::Production
            }
            None => {
                warn!("no environment configured; using production error output");
                Self::Production
            }
        }
    }
}

/// Client-facing failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// `fail` for client errors, `error` otherwise.
    pub status: ErrorStatus,
    /// Human-readable message.
    pub message: String,
}

#[derive(Serialize)]
struct DevelopmentBody<'a> {
    status: ErrorStatus,
    message: String,
    error: &'a Failure,
    stack: String,
}

fn status_for(status_code: u16) -> StatusCode {
    StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn render_development(failure: &Failure) -> HttpResponse {
    HttpResponse::build(status_for(failure.status_code())).json(DevelopmentBody {
        status: failure.status(),
        message: failure.message(),
        error: failure,
        stack: failure.stack(),
    })
}

fn client_response(err: &OperationalError) -> HttpResponse {
    HttpResponse::build(status_for(err.status_code())).json(ErrorBody {
        status: err.status(),
        message: err.message().to_owned(),
    })
}

fn generic_response() -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorBody {
        status: ErrorStatus::Error,
        message: GENERIC_FAILURE_MESSAGE.to_owned(),
    })
}

fn render_production(failure: Failure) -> HttpResponse {
    match classify(failure) {
        Classification::Operational(err) => client_response(&err),
        Classification::NonOperational(failure) => {
            error!(
                name = failure.name(),
                error = %failure,
                origin = %failure.trace().origin(),
                "unexpected failure"
            );
            generic_response()
        }
    }
}

/// Render `failure` for `mode`.
///
/// # Examples
/// ```
/// use actix_web::http::StatusCode;
/// use faultline::domain::{Failure, OperationalError};
/// use faultline::inbound::http::error::{ErrorMode, render_failure};
///
/// let failure = Failure::from(OperationalError::not_found("missing"));
/// let response = render_failure(failure, ErrorMode::Production);
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// ```
#[must_use]
pub fn render_failure(failure: Failure, mode: ErrorMode) -> HttpResponse {
    match mode {
        ErrorMode::Development => render_development(&failure),
        ErrorMode::Production => render_production(failure),
    }
}

fn client_safe(failure: &Failure) -> Option<OperationalError> {
    match classify(failure.clone()) {
        Classification::Operational(err) => Some(err),
        Classification::NonOperational(_) => None,
    }
}

impl ResponseError for Failure {
    fn status_code(&self) -> StatusCode {
        client_safe(self).map_or(StatusCode::INTERNAL_SERVER_ERROR, |err| {
            status_for(err.status_code())
        })
    }

    // Production output without the diagnostic record; the normalising
    // middleware renders again and owns the single log write.
    fn error_response(&self) -> HttpResponse {
        client_safe(self).map_or_else(generic_response, |err| client_response(&err))
    }
}
