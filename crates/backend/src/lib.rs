mod http;
mod service;

pub use http::{BackendConfig, BackendError, HttpBackend};
pub use service::Backend;
