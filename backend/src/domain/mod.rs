//! Domain failure model.
//!
//! Purpose: describe what went wrong without committing to a transport.
//! Inbound adapters decide how much of a [`Failure`] a client may see.
//!
//! Public surface:
//! - Failure / FailureKind: tagged failure travelling through the pipeline.
//! - OperationalError: expected, client-safe failure with an HTTP status.
//! - ErrorStatus: `fail`/`error` label derived from the status code.
//! - translate: per-kind translators and the production classification.

pub mod error;
pub mod translate;

pub use self::error::{
    DEFAULT_STATUS_CODE, ErrorStatus, Failure, FailureKind, FieldFailure, OperationalError, Trace,
    UnexpectedFailure,
};
pub use self::translate::{Classification, TranslationError, classify};
