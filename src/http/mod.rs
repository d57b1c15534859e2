//! HTTP convenience layer: status-code classification.

mod status;

pub use status::HttpStatusCode;
