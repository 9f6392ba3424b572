//! REST API access for the ShortURL server.
//!
//! All traffic goes through `RequestPipeline`, which attaches the bearer
//! token from the shared `Session` and tears the session down when the
//! server rejects it. `ApiClient` layers the typed endpoints on top.

pub mod client;
pub mod error;
pub mod pipeline;

pub use client::ApiClient;
pub use error::ApiError;
pub use pipeline::RequestPipeline;
