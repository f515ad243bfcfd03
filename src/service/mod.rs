//! Image service interaction
//!
//! Metadata resolution and tile export against an ArcGIS-style ImageServer
//! endpoint, behind an HTTP client abstraction so the pipeline can be
//! exercised without a live service.

mod http;
mod descriptor;
mod export;

pub use self::http::{HttpClient, ReqwestClient};
pub use self::descriptor::{ServiceDescriptor, DEFAULT_PIXEL_SIZE};
pub use self::export::TileFetcher;

#[cfg(test)]
pub use self::http::MockHttpClient;
