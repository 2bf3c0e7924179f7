//! HTTP inbound adapter: failure rendering and the handlers that feed it.

pub mod catch;
pub mod error;
pub mod not_found;
pub mod tokens;

pub use catch::{CatchAsync, catch_async};
pub use error::{ApiResult, ErrorBody, ErrorMode, render_failure};
pub use not_found::unmatched_route;
