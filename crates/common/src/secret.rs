//! Secret types for protecting sensitive values from accidental logging.
//!
//! The session credential handed to the provider on connect is an access
//! token. It is carried as a [`SecretString`] from the moment it is loaded so
//! that `Debug` output and tracing fields never contain it; reading the value
//! requires an explicit `expose_secret()` at the provider boundary.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct JoinRequest {
//!     room_name: String,
//!     credential: SecretString,
//! }
//!
//! let req = JoinRequest {
//!     room_name: "standup".to_string(),
//!     credential: SecretString::from("eyJhbGciOi..."),
//! };
//!
//! // Safe: the credential is redacted
//! println!("{:?}", req);
//!
//! let token: &str = req.credential.expose_secret();
//! assert!(token.starts_with("eyJ"));
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretString};
