// netpulse-api: Async Rust client for the netpulse monitoring backend (REST + Socket.IO)

pub mod auth;
pub mod client;
pub mod error;
pub mod network;
pub mod socketio;
pub mod stream;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::Error;
pub use stream::{ReconnectConfig, StreamEvent, StreamHandle, StreamStatus};
pub use transport::{TlsMode, TransportConfig};
