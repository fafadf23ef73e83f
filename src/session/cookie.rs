use crate::models::AuthSession;
use crate::settings::AuthGateSettings;
use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};

/// Largest value a single cookie may carry before the session is chunked
pub const MAX_CHUNK_SIZE: usize = 3180;

/// Marker prefix of base64url-encoded cookie values
pub const BASE64_PREFIX: &str = "base64-";

/// Suffix appended to the storage key for the PKCE verifier cookie
pub const CODE_VERIFIER_SUFFIX: &str = "-code-verifier";

/// Attributes shared by every cookie this service writes
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age: Duration::days(400),
        }
    }
}

/// Builds and reads the session cookies for one storage key.
///
/// The session document is stored as `base64-` followed by the base64url
/// encoding of its JSON. When that value is longer than [`MAX_CHUNK_SIZE`]
/// it is split across `<key>.0`, `<key>.1`, ... and reassembled on read.
#[derive(Debug, Clone)]
pub struct SessionCookieFactory {
    storage_key: String,
    options: CookieOptions,
}

impl SessionCookieFactory {
    #[must_use]
    pub fn new(storage_key: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            storage_key: storage_key.into(),
            options,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &AuthGateSettings) -> Self {
        Self::new(
            settings.identity.get_storage_key(),
            CookieOptions {
                http_only: settings.cookies.http_only,
                secure: settings.cookies.secure,
                max_age: Duration::days(settings.cookies.max_age_days),
                ..Default::default()
            },
        )
    }

    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    #[must_use]
    pub fn code_verifier_cookie_name(&self) -> String {
        format!("{}{CODE_VERIFIER_SUFFIX}", self.storage_key)
    }

    fn chunk_name(&self, index: usize) -> String {
        format!("{}.{index}", self.storage_key)
    }

    /// Encode a value as `base64-<base64url(json)>`
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized
    pub fn encode_value<T: Serialize>(value: &T) -> Result<String> {
        let json = serde_json::to_vec(value).context("Failed to serialize cookie value")?;
        Ok(format!("{BASE64_PREFIX}{}", URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decode a cookie value written by [`Self::encode_value`].
    ///
    /// Plain JSON without the prefix is accepted as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not valid base64 or JSON
    pub fn decode_value<T: DeserializeOwned>(raw: &str) -> Result<T> {
        let json = match raw.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => URL_SAFE_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .context("Cookie value is not valid base64url")?,
            None => raw.as_bytes().to_vec(),
        };
        serde_json::from_slice(&json).context("Cookie value is not a valid session document")
    }

    fn build_cookie(&self, name: String, value: String) -> Cookie<'static> {
        Cookie::build(name, value)
            .http_only(self.options.http_only)
            .secure(self.options.secure)
            .same_site(self.options.same_site)
            .path(self.options.path.clone())
            .max_age(self.options.max_age)
            .finish()
    }

    fn removal_cookie(&self, name: String) -> Cookie<'static> {
        let mut cookie = Cookie::build(name, "")
            .http_only(self.options.http_only)
            .secure(self.options.secure)
            .same_site(self.options.same_site)
            .path(self.options.path.clone())
            .finish();
        cookie.make_removal();
        cookie
    }

    /// Cookies persisting `session`, chunked when necessary.
    ///
    /// A chunked session also clears the unchunked cookie and vice versa,
    /// so a browser never holds both shapes at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be serialized
    pub fn create_session_cookies(&self, session: &AuthSession) -> Result<Vec<Cookie<'static>>> {
        let value = Self::encode_value(session)?;

        if value.len() <= MAX_CHUNK_SIZE {
            return Ok(vec![
                self.build_cookie(self.storage_key.clone(), value),
                self.removal_cookie(self.chunk_name(0)),
            ]);
        }

        // The encoded value is pure ASCII, so byte offsets are char boundaries.
        let mut cookies: Vec<Cookie<'static>> = value
            .as_bytes()
            .chunks(MAX_CHUNK_SIZE)
            .enumerate()
            .map(|(index, chunk)| {
                let chunk = String::from_utf8_lossy(chunk).into_owned();
                self.build_cookie(self.chunk_name(index), chunk)
            })
            .collect();
        log::debug!(
            "Session cookie split into {} chunks under '{}'",
            cookies.len(),
            self.storage_key
        );
        cookies.push(self.removal_cookie(self.storage_key.clone()));
        Ok(cookies)
    }

    /// Raw (still encoded) session value from the request, reassembling chunks
    #[must_use]
    pub fn read_raw_session(&self, req: &HttpRequest) -> Option<String> {
        if let Some(cookie) = req.cookie(&self.storage_key) {
            if !cookie.value().is_empty() {
                return Some(cookie.value().to_string());
            }
        }

        let mut value = String::new();
        let mut index = 0;
        while let Some(chunk) = req.cookie(&self.chunk_name(index)) {
            value.push_str(chunk.value());
            index += 1;
        }

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Session stored in the request cookies, if any
    ///
    /// # Errors
    ///
    /// Returns an error if a session cookie is present but cannot be decoded
    pub fn read_session(&self, req: &HttpRequest) -> Result<Option<AuthSession>> {
        self.read_raw_session(req)
            .map(|raw| Self::decode_value::<AuthSession>(&raw))
            .transpose()
    }

    /// Names of the session chunks present on the request, in order
    fn chunk_names_on(&self, req: &HttpRequest) -> Vec<String> {
        (0..)
            .map(|index| self.chunk_name(index))
            .take_while(|name| req.cookie(name).is_some())
            .collect()
    }

    /// Removal cookies for the session and every chunk present on the request
    #[must_use]
    pub fn clear_session_cookies(&self, req: &HttpRequest) -> Vec<Cookie<'static>> {
        std::iter::once(self.storage_key.clone())
            .chain(self.chunk_names_on(req))
            .map(|name| self.removal_cookie(name))
            .collect()
    }

    /// `session_cookies` plus removals for every session cookie the request
    /// holds that they do not overwrite.
    ///
    /// A session that now needs fewer chunks than the one in the browser
    /// would otherwise be read back with the old trailing chunks appended.
    /// An empty set leaves the request's session alone.
    #[must_use]
    pub fn replace_session_cookies(
        &self,
        req: &HttpRequest,
        mut session_cookies: Vec<Cookie<'static>>,
    ) -> Vec<Cookie<'static>> {
        if session_cookies.is_empty() {
            return session_cookies;
        }

        let mut present = self.chunk_names_on(req);
        if req.cookie(&self.storage_key).is_some() {
            present.push(self.storage_key.clone());
        }
        let stale: Vec<String> = present
            .into_iter()
            .filter(|name| !session_cookies.iter().any(|c| c.name() == name.as_str()))
            .collect();
        if !stale.is_empty() {
            log::debug!("Removing {} stale session cookie(s)", stale.len());
        }
        session_cookies.extend(stale.into_iter().map(|name| self.removal_cookie(name)));
        session_cookies
    }

    /// Cookie holding the PKCE code verifier for an OAuth round trip
    ///
    /// # Errors
    ///
    /// Returns an error if the verifier cannot be encoded
    pub fn create_code_verifier_cookie(&self, verifier: &str) -> Result<Cookie<'static>> {
        let value = Self::encode_value(&verifier)?;
        Ok(self.build_cookie(self.code_verifier_cookie_name(), value))
    }

    /// PKCE code verifier stored on the request, if any.
    ///
    /// Undecodable values are logged and ignored; the exchange then proceeds
    /// without a verifier and the backend decides.
    #[must_use]
    pub fn read_code_verifier(&self, req: &HttpRequest) -> Option<String> {
        let cookie = req.cookie(&self.code_verifier_cookie_name())?;
        match Self::decode_value::<String>(cookie.value()) {
            Ok(verifier) if !verifier.is_empty() => Some(verifier),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Ignoring unreadable code verifier cookie: {e}");
                None
            }
        }
    }

    #[must_use]
    pub fn clear_code_verifier_cookie(&self) -> Cookie<'static> {
        self.removal_cookie(self.code_verifier_cookie_name())
    }
}
