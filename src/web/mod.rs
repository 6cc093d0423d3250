//! HTTP surface for filedrop.
//!
//! Thin glue over the file core: a listing page, a multipart upload
//! endpoint and a download endpoint.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::{bind_ascending, FileServer};
