pub mod client;
pub mod envelope;
pub mod transport;
pub mod voice;

pub use client::{ApiClient, Session};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, ReqwestTransport};
