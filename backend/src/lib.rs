//! Error normalisation for Actix services.
//!
//! Failures raised anywhere in a request (database, token verification or
//! plain programming errors) are classified once and rendered through a
//! single JSON envelope. Development output exposes the raw failure and its
//! trace; production output only ever shows client-safe messages.
//!
//! - [`domain`] holds the failure model and the translators.
//! - [`inbound::http`] renders failures and provides the catch-all handlers.
//! - [`middleware`] funnels every Actix error through the renderer.
//! - [`fatal`] terminates the process on failures nothing else caught.

pub mod config;
pub mod domain;
pub mod fatal;
pub mod inbound;
pub mod middleware;

pub use config::AppSettings;
pub use middleware::NormalizeErrors;
