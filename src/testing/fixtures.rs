//! Pre-built test objects shared by unit and integration tests

use crate::models::{AuthSession, AuthUser};
use crate::session::{CookieOptions, SessionCookieFactory};
use crate::settings::AuthGateSettings;
use chrono::{TimeZone, Utc};

use super::constants::{TEST_ACCESS_TOKEN, TEST_EMAIL, TEST_STORAGE_KEY, TEST_USER_NAME};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    #[must_use]
    pub fn user() -> AuthUser {
        AuthUser {
            id: "00000000-0000-0000-0000-000000000001".to_string(),
            email: Some(TEST_EMAIL.to_string()),
            user_metadata: serde_json::json!({ "name": TEST_USER_NAME }),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single(),
        }
    }

    /// A live session for [`Self::user`] using [`TEST_ACCESS_TOKEN`]
    #[must_use]
    pub fn session() -> AuthSession {
        AuthSession {
            access_token: TEST_ACCESS_TOKEN.to_string(),
            refresh_token: "test-refresh-token".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: Some(Utc::now().timestamp() + 3600),
            user: Some(Self::user()),
        }
    }

    /// Cookie factory for [`TEST_STORAGE_KEY`] with insecure cookies
    #[must_use]
    pub fn cookie_factory() -> SessionCookieFactory {
        SessionCookieFactory::new(
            TEST_STORAGE_KEY,
            CookieOptions {
                secure: false,
                ..Default::default()
            },
        )
    }

    /// Settings matching [`Self::cookie_factory`], with a fixed site URL
    #[must_use]
    pub fn settings() -> AuthGateSettings {
        let mut settings = AuthGateSettings::default();
        settings.application.site_url = Some("https://app.example.com".to_string());
        settings.identity.storage_key = Some(TEST_STORAGE_KEY.to_string());
        settings.cookies.secure = false;
        settings
    }
}
