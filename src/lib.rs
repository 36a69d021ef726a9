#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the authgate library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cache;
pub mod fingerprint;
pub mod handshake;
pub mod models;
pub mod overlay;
pub mod poll;
pub mod serial;
pub mod settings;
pub mod transport;
pub mod utils;

/// Re-export commonly used items
pub use cache::{CacheLayer, FileStore, IdentityStore, Provider};
pub use fingerprint::request_fingerprint;
pub use handshake::{AuthgateClient, HandshakeError};
pub use models::{AuthResult, AuthType, HandshakeOutcome, HandshakeRequest};
pub use overlay::{OverlayChrome, OverlayHandle, OverlayLayout, SurfaceSpec};
pub use settings::AuthgateSettings;
pub use transport::{ApiClient, HttpApiClient};
