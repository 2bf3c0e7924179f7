//! Inbound adapters that translate framework requests and failures into the
//! domain failure model while keeping Actix details at the edge.

pub mod http;
