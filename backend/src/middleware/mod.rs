//! Request middleware.
//!
//! Purpose: define middleware components for request lifecycle concerns,
//! here the single funnel every failure passes through before it reaches a
//! client.

pub mod normalize;

pub use normalize::{NormalizeErrors, failure_from_actix};
