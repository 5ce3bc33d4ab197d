//! # Session Test Utilities
//!
//! Mock implementations of every collaborator the session synchronizer
//! consumes, plus participant fixtures.
//!
//! ## Modules
//!
//! - `mock_render` - Render target that records nodes, elements and indicators
//! - `mock_provider` - Session provider and session control driven by the test
//! - `mock_media` - Local tracks, media devices and the side channel
//! - `fixtures` - Pre-configured participants and tracks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let render = MockRenderTarget::new();
//!     let provider = MockSessionProvider::builder()
//!         .local(TestParticipant::new("alice").with_audio().with_data())
//!         .participant(TestParticipant::new("bob").with_video())
//!         .build();
//!
//!     // Connect a synchronizer against `provider`, then drive it with
//!     // `provider.event_sender()` and assert on `render`.
//! }
//! ```

pub mod fixtures;
pub mod mock_media;
pub mod mock_provider;
pub mod mock_render;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_media::*;
pub use mock_provider::*;
pub use mock_render::*;
