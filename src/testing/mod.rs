//! Testing utilities for authgate
//!
//! Available to unit tests and, with the `testing` feature, to the
//! integration tests under `tests/`.
//!
//! - [`fixtures`] - Pre-built sessions, users, settings and cookie factories
//! - [`mock`] - A scripted in-memory identity provider
//! - [`assertions`] - Response assertion helpers
//!
//! ```rust,ignore
//! use authgate::testing::{MockIdentityProvider, TestFixtures};
//!
//! let provider = MockIdentityProvider::new().with_code("valid-code");
//! let settings = TestFixtures::settings();
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock;

pub use assertions::*;
pub use fixtures::TestFixtures;
pub use mock::{MockIdentityProvider, ProviderCall};

/// Common test constants
pub mod constants {
    pub const TEST_EMAIL: &str = "test@example.com";

    pub const TEST_PASSWORD: &str = "correct-horse";

    pub const TEST_USER_NAME: &str = "Test User";

    /// Access token carried by [`super::TestFixtures::session`]
    pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

    pub const TEST_STORAGE_KEY: &str = "sb-test-auth-token";
}
