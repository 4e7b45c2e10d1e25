//! HTTP API.
//!
//! A small JSON surface over the assessment service. Handlers share an
//! immutable `ApiContext`; inference runs synchronously inside the handler.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::serve;
pub use types::ApiContext;
