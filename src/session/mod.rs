//! Session cookie handling
//!
//! The identity backend owns the session; this module only moves it between
//! the backend's JSON document and the browser's cookie jar.

pub mod cookie;

pub use cookie::{
    CookieOptions, SessionCookieFactory, BASE64_PREFIX, MAX_CHUNK_SIZE,
};
