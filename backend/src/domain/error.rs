//! Domain-level failure types.
//!
//! Failures are transport agnostic. The HTTP adapter classifies them and
//! decides how much of each one a client is allowed to see.
//!
//! A [`Failure`] is tagged once, where the problem is detected, so the
//! responder never has to sniff marker fields to work out what it holds.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

/// Status code reported when a failure does not carry one.
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// Coarse outcome label sent to clients alongside every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    /// The client sent something the server refuses (4xx).
    Fail,
    /// The server could not complete the request.
    Error,
}

impl ErrorStatus {
    /// Derive the label from an HTTP status code.
    ///
    /// # Examples
    /// ```
    /// use faultline::domain::ErrorStatus;
    ///
    /// assert_eq!(ErrorStatus::from_status_code(404), ErrorStatus::Fail);
    /// assert_eq!(ErrorStatus::from_status_code(503), ErrorStatus::Error);
    /// ```
    #[must_use]
    pub fn from_status_code(status_code: u16) -> Self {
        if (400..=499).contains(&status_code) {
            Self::Fail
        } else {
            Self::Error
        }
    }

    /// Wire representation of the label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic trace recorded when a failure is constructed.
///
/// The origin is the caller of the constructor, not the constructor itself.
#[derive(Clone)]
pub struct Trace {
    origin: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

impl Trace {
    /// Capture the caller's location and the current backtrace.
    #[track_caller]
    #[must_use]
    pub fn capture() -> Self {
        Self {
            origin: Location::caller(),
            backtrace: Arc::new(Backtrace::force_capture()),
        }
    }

    /// Source location the failure is attributed to.
    #[must_use]
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace").field("origin", &self.origin).finish()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "    at {}\n{}", self.origin, self.backtrace)
    }
}

/// Expected, client-safe failure.
///
/// ## Invariants
/// - `is_operational` is always `true`.
/// - `status` is derived from `status_code` and never set independently.
///
/// # Examples
/// ```
/// use faultline::domain::{ErrorStatus, OperationalError};
///
/// let err = OperationalError::new("No tour found with that ID", 404);
/// assert_eq!(err.status(), ErrorStatus::Fail);
/// assert!(err.is_operational());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalError {
    message: String,
    status_code: u16,
    status: ErrorStatus,
    is_operational: bool,
    #[serde(skip)]
    trace: Trace,
}

impl OperationalError {
    /// Create an operational error attributed to the caller.
    ///
    /// The status code is not range-checked.
    #[track_caller]
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
            status: ErrorStatus::from_status_code(status_code),
            is_operational: true,
            trace: Trace::capture(),
        }
    }

    /// Convenience constructor for a 404.
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, 404)
    }

    /// Convenience constructor for a 401.
    #[track_caller]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message, 401)
    }

    /// Human-readable message safe to show to clients.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Derived outcome label.
    #[must_use]
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Always `true`; present so serialised payloads carry the flag.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        self.is_operational
    }

    /// Trace captured at construction.
    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }
}

impl fmt::Display for OperationalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for OperationalError {}

/// One rejected field reported by a validating store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    /// Message produced by the validator for this field.
    pub message: String,
}

impl FieldFailure {
    /// Wrap a validator message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure nobody classified; treated as a programming or infrastructure bug.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnexpectedFailure {
    /// Type-ish name of the source error.
    pub name: String,
    /// Raw message of the source error. Never shown in production.
    pub message: String,
    /// Status code suggested by the source, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Status label suggested by the source, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ErrorStatus>,
}

/// What went wrong, as known at the point of detection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "name")]
pub enum FailureKind {
    /// A value could not be converted to the type a field expects.
    #[serde(rename = "CastError")]
    Cast {
        /// Field path.
        path: String,
        /// Offending raw value.
        value: String,
    },
    /// A unique index rejected a write.
    #[serde(rename = "DuplicateKeyError")]
    DuplicateKey {
        /// Driver-formatted message naming the duplicated value.
        errmsg: String,
    },
    /// A store rejected one or more fields.
    #[serde(rename = "ValidationError")]
    Validation {
        /// Per-field failures keyed by field name.
        errors: BTreeMap<String, FieldFailure>,
    },
    /// A bearer token could not be verified.
    #[serde(rename = "JsonWebTokenError")]
    InvalidToken {
        /// Library message.
        message: String,
    },
    /// A bearer token was valid but has expired.
    #[serde(rename = "TokenExpiredError")]
    ExpiredToken {
        /// Library message.
        message: String,
    },
    /// Already classified and client-safe.
    #[serde(rename = "OperationalError")]
    Operational(OperationalError),
    /// Anything else. Serialised under the source's own name.
    #[serde(untagged)]
    Unexpected(UnexpectedFailure),
}

/// A failure travelling through the error pipeline.
///
/// # Examples
/// ```
/// use faultline::domain::{Failure, OperationalError};
///
/// let failure = Failure::from(OperationalError::not_found("missing"));
/// assert_eq!(failure.status_code(), 404);
/// assert!(failure.is_operational());
/// ```
#[derive(Debug, Clone)]
pub struct Failure {
    kind: FailureKind,
    trace: Trace,
}

impl Failure {
    #[track_caller]
    fn tagged(kind: FailureKind) -> Self {
        Self {
            kind,
            trace: Trace::capture(),
        }
    }

    /// A value failed to convert to the type of `path`.
    #[track_caller]
    pub fn cast(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::tagged(FailureKind::Cast {
            path: path.into(),
            value: value.into(),
        })
    }

    /// A unique index rejected a write; `errmsg` is the driver's message.
    #[track_caller]
    pub fn duplicate_key(errmsg: impl Into<String>) -> Self {
        Self::tagged(FailureKind::DuplicateKey {
            errmsg: errmsg.into(),
        })
    }

    /// A store rejected the listed fields.
    #[track_caller]
    pub fn validation(errors: BTreeMap<String, FieldFailure>) -> Self {
        Self::tagged(FailureKind::Validation { errors })
    }

    /// A bearer token failed verification.
    #[track_caller]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::tagged(FailureKind::InvalidToken {
            message: message.into(),
        })
    }

    /// A bearer token has expired.
    #[track_caller]
    pub fn expired_token(message: impl Into<String>) -> Self {
        Self::tagged(FailureKind::ExpiredToken {
            message: message.into(),
        })
    }

    /// Wrap an arbitrary error as an unclassified, non-operational failure.
    #[track_caller]
    pub fn unexpected<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::tagged(FailureKind::Unexpected(UnexpectedFailure {
            name: short_type_name::<E>(),
            message: error.to_string(),
            status_code: None,
            status: None,
        }))
    }

    /// Build an unclassified failure from its parts.
    #[track_caller]
    pub fn unexpected_with(
        name: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::tagged(FailureKind::Unexpected(UnexpectedFailure {
            name: name.into(),
            message: message.into(),
            status_code,
            status: None,
        }))
    }

    /// Re-attribute the failure to an earlier trace.
    #[must_use]
    pub(crate) fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = trace;
        self
    }

    /// Variant describing the failure.
    #[must_use]
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Consume the failure, keeping only its variant.
    #[must_use]
    pub fn into_kind(self) -> FailureKind {
        self.kind
    }

    /// Trace captured where the failure was detected.
    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Name of the variant as exposed in diagnostic payloads.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.kind {
            FailureKind::Cast { .. } => "CastError",
            FailureKind::DuplicateKey { .. } => "DuplicateKeyError",
            FailureKind::Validation { .. } => "ValidationError",
            FailureKind::InvalidToken { .. } => "JsonWebTokenError",
            FailureKind::ExpiredToken { .. } => "TokenExpiredError",
            FailureKind::Operational(_) => "OperationalError",
            FailureKind::Unexpected(inner) => inner.name.as_str(),
        }
    }

    /// Raw message, before any translation.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.kind {
            FailureKind::Cast { path, value } => {
                format!("Cast failed for value \"{value}\" at path \"{path}\"")
            }
            FailureKind::DuplicateKey { errmsg } => errmsg.clone(),
            FailureKind::Validation { errors } => {
                let fields = errors
                    .iter()
                    .map(|(field, failure)| format!("{field}: {}", failure.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Validation failed: {fields}")
            }
            FailureKind::InvalidToken { message } | FailureKind::ExpiredToken { message } => {
                message.clone()
            }
            FailureKind::Operational(inner) => inner.message.clone(),
            FailureKind::Unexpected(inner) => inner.message.clone(),
        }
    }

    /// Status code, defaulting to [`DEFAULT_STATUS_CODE`] when none is carried.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            FailureKind::Operational(inner) => inner.status_code,
            FailureKind::Unexpected(inner) => inner.status_code.unwrap_or(DEFAULT_STATUS_CODE),
            _ => DEFAULT_STATUS_CODE,
        }
    }

    /// Status label, defaulting to [`ErrorStatus::Error`] when none is carried.
    #[must_use]
    pub fn status(&self) -> ErrorStatus {
        match &self.kind {
            FailureKind::Operational(inner) => inner.status,
            FailureKind::Unexpected(inner) => inner.status.unwrap_or(ErrorStatus::Error),
            _ => ErrorStatus::Error,
        }
    }

    /// Whether the failure is already client-safe without translation.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        matches!(self.kind, FailureKind::Operational(_))
    }

    /// Multi-line diagnostic trace in `Name: message` form.
    #[must_use]
    pub fn stack(&self) -> String {
        format!("{}: {}\n{}", self.name(), self.message(), self.trace)
    }
}

impl From<OperationalError> for Failure {
    fn from(error: OperationalError) -> Self {
        let trace = error.trace.clone();
        Self {
            kind: FailureKind::Operational(error),
            trace,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Failure {
    #[track_caller]
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match error.kind() {
            ErrorKind::ExpiredSignature => Self::expired_token(error.to_string()),
            _ => Self::invalid_token(error.to_string()),
        }
    }
}

impl Serialize for Failure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.kind.serialize(serializer)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.message())
    }
}

impl std::error::Error for Failure {}

/// Last path segment of `E`'s type name, without generic arguments.
pub(crate) fn short_type_name<E: ?Sized>() -> String {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_owned()
}
