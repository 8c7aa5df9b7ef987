// assetctl-api: Async Rust client for the SDA asset service and object storage

pub mod auth;
pub mod client;
pub mod error;
pub mod storage;
pub mod transport;
pub mod types;

pub use auth::{IdToken, RequestSigner, Unsigned};
pub use client::AssetClient;
pub use error::Error;
pub use storage::StorageClient;
pub use transport::{TlsMode, TransportConfig};
