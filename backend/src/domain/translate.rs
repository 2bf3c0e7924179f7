//! Translation of tagged failures into client-safe operational errors.
//!
//! Each translator is a pure function. [`classify`] picks exactly one
//! translator per failure; variants never fall through to a second one.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use super::error::{Failure, FailureKind, FieldFailure, OperationalError};

/// Fixed client message for tokens that fail verification.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token. Please login again.";
/// Fixed client message for expired tokens.
pub const EXPIRED_TOKEN_MESSAGE: &str = "Token already expired. Please login again.";

/// Errors raised by translators that depend on the shape of driver messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    /// The duplicate-key message did not quote the duplicated value.
    #[error("duplicate key message carries no quoted value: {errmsg}")]
    MissingQuotedValue {
        /// Driver message as received.
        errmsg: String,
    },
}

/// Outcome of classifying a failure for production output.
#[derive(Debug)]
pub enum Classification {
    /// Safe to show to the client as-is.
    Operational(OperationalError),
    /// Must be logged and hidden behind a generic message.
    NonOperational(Failure),
}

static QUOTED_VALUE_RE: OnceLock<Regex> = OnceLock::new();

fn quoted_value_regex() -> &'static Regex {
    QUOTED_VALUE_RE.get_or_init(|| {
        // First double- or single-quoted span, honouring backslash escapes.
        let pattern = r#""(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'"#;
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("quoted value regex failed to compile: {error}"))
    })
}

/// Translate a cast failure on `path`.
///
/// # Examples
/// ```
/// use faultline::domain::translate::cast_error;
///
/// let err = cast_error("age", "abc");
/// assert_eq!(err.message(), "Invalid age: abc.");
/// assert_eq!(err.status_code(), 400);
/// ```
#[track_caller]
pub fn cast_error(path: &str, value: &str) -> OperationalError {
    OperationalError::new(format!("Invalid {path}: {value}."), 400)
}

/// Extract the first quoted span of a duplicate-key driver message.
///
/// The returned slice keeps its delimiting quotes.
///
/// # Errors
/// Returns [`TranslationError::MissingQuotedValue`] when nothing is quoted.
pub fn duplicate_value(errmsg: &str) -> Result<&str, TranslationError> {
    quoted_value_regex()
        .find(errmsg)
        .map(|found| found.as_str())
        .ok_or_else(|| TranslationError::MissingQuotedValue {
            errmsg: errmsg.to_owned(),
        })
}

/// Translate a duplicate-key failure.
///
/// # Errors
/// Returns [`TranslationError::MissingQuotedValue`] when the driver message
/// does not quote the duplicated value.
///
/// # Examples
/// ```
/// use faultline::domain::translate::duplicate_key_error;
///
/// let err = duplicate_key_error(r#"E11000 duplicate key error index: email_1 dup key: { : "a@b.io" }"#)
///     .expect("message quotes the value");
/// assert_eq!(err.message(), r#"Duplicate field value: "a@b.io"."#);
/// ```
#[track_caller]
pub fn duplicate_key_error(errmsg: &str) -> Result<OperationalError, TranslationError> {
    let value = duplicate_value(errmsg)?;
    Ok(OperationalError::new(
        format!("Duplicate field value: {value}."),
        400,
    ))
}

/// Translate per-field validation failures.
#[track_caller]
pub fn validation_error(errors: &BTreeMap<String, FieldFailure>) -> OperationalError {
    let messages: Vec<&str> = errors.values().map(|f| f.message.as_str()).collect();
    let plural = if messages.len() > 1 { "s" } else { "" };
    OperationalError::new(
        format!("Validation Error{plural}: {}", messages.join(". ")),
        400,
    )
}

/// Translate a token that failed verification. The cause is ignored.
#[track_caller]
pub fn invalid_token_error() -> OperationalError {
    OperationalError::unauthorized(INVALID_TOKEN_MESSAGE)
}

/// Translate an expired token. The cause is ignored.
#[track_caller]
pub fn expired_token_error() -> OperationalError {
    OperationalError::unauthorized(EXPIRED_TOKEN_MESSAGE)
}

/// Decide what a production client may see for `failure`.
///
/// A duplicate-key message without a quoted value cannot be translated; it
/// is downgraded to a non-operational failure so it gets logged.
pub fn classify(failure: Failure) -> Classification {
    let translated = match failure.kind() {
        FailureKind::Cast { path, value } => Some(Ok(cast_error(path, value))),
        FailureKind::DuplicateKey { errmsg } => Some(duplicate_key_error(errmsg)),
        FailureKind::Validation { errors } => Some(Ok(validation_error(errors))),
        FailureKind::InvalidToken { .. } => Some(Ok(invalid_token_error())),
        FailureKind::ExpiredToken { .. } => Some(Ok(expired_token_error())),
        FailureKind::Operational(error) => Some(Ok(error.clone())),
        FailureKind::Unexpected(_) => None,
    };
    let Some(translated) = translated else {
        return Classification::NonOperational(failure);
    };
    match translated {
        Ok(error) => Classification::Operational(error),
        Err(error) => Classification::NonOperational(
            Failure::unexpected(&error).with_trace(failure.trace().clone()),
        ),
    }
}
