use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthGateSettings {
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub routes: RouteSettings,
    #[serde(default)]
    pub cookies: CookieSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Public origin of the site. When empty it is derived from the request
    /// `Host` and `X-Forwarded-Proto` headers.
    pub site_url: Option<String>,
    pub cors_origins: String,
}

/// Connection settings for the GoTrue-compatible identity backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySettings {
    /// Project URL, e.g. `https://abcd.supabase.co`
    pub url: String,
    pub anon_key: Option<String>,
    /// Environment variable holding the anon key; takes precedence over `anon_key`
    pub anon_key_env: Option<String>,
    /// Cookie storage key override. Defaults to `sb-<project-ref>-auth-token`.
    pub storage_key: Option<String>,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSettings {
    /// Where failed callbacks are sent, with an `error` query parameter
    pub error_path: String,
    /// Sign-in entry point offered after a failed verification
    pub sign_in_path: String,
    pub callback_path: String,
    pub reset_password_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieSettings {
    pub secure: bool,
    pub http_only: bool,
    pub max_age_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            site_url: None,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: None,
            anon_key_env: None,
            storage_key: None,
            request_timeout_seconds: 10,
        }
    }
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            error_path: "/auth".to_string(),
            sign_in_path: "/auth".to_string(),
            callback_path: "/auth/callback".to_string(),
            reset_password_path: "/auth/reset-password".to_string(),
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true, // Default to secure cookies
            http_only: true,
            max_age_days: 400,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Logger filtered by `level`, which takes `RUST_LOG` syntax
    #[must_use]
    pub fn logger_builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&self.level);
        builder
    }

    /// Install the global logger
    ///
    /// # Errors
    ///
    /// Returns an error if a logger is already installed
    pub fn init_logger(&self) -> Result<(), log::SetLoggerError> {
        self.logger_builder().try_init()
    }
}

impl AuthGateSettings {
    /// Load settings from configuration files and environment variables,
    /// then install the logger at the configured level
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - Logger initialization fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        let (mut settings, notes) = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        settings.logging.init_logger()?;
        for note in notes {
            log::info!("{note}");
        }

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `AUTHGATE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// The logger is not installed yet, so what happened is returned as notes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<(Self, Vec<String>), Box<dyn std::error::Error>> {
        let mut settings = Self::default();
        let mut notes = Vec::new();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            notes.push(format!(
                "Loaded base settings from {}",
                default_config_path.display()
            ));
        }

        if let Ok(secrets_dir) = std::env::var("AUTHGATE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                notes.push(format!("Overriding settings from {}", secrets_path.display()));
            } else {
                notes.push(format!(
                    "AUTHGATE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                ));
            }
        }

        Ok((settings, notes))
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_identity_env_overrides(&mut settings.identity);
        Self::apply_route_env_overrides(&mut settings.routes);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(site_url) = std::env::var("SITE_URL") {
            if !site_url.is_empty() {
                app_settings.site_url = Some(site_url);
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    fn apply_identity_env_overrides(identity: &mut IdentitySettings) {
        if let Ok(url) = std::env::var("IDENTITY_URL") {
            identity.url = url;
        }
        if let Ok(anon_key) = std::env::var("IDENTITY_ANON_KEY") {
            identity.anon_key = Some(anon_key);
        }
        if let Ok(storage_key) = std::env::var("IDENTITY_STORAGE_KEY") {
            identity.storage_key = Some(storage_key);
        }
    }

    fn apply_route_env_overrides(routes: &mut RouteSettings) {
        if let Ok(error_path) = std::env::var("ERROR_PATH") {
            routes.error_path = error_path;
        }
        if let Ok(sign_in_path) = std::env::var("SIGN_IN_PATH") {
            routes.sign_in_path = sign_in_path;
        }
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(cookie_secure_str) = std::env::var("COOKIE_SECURE") {
            if let Ok(cookie_secure) = cookie_secure_str.parse::<bool>() {
                cookie_settings.secure = cookie_secure;
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if line.trim_start().starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl IdentitySettings {
    /// Get the anon key, checking the environment variable first, then falling back to the direct value
    #[must_use]
    pub fn get_anon_key(&self) -> Option<String> {
        if let Some(env_var) = &self.anon_key_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value);
            }
        }
        self.anon_key.clone()
    }

    /// Project reference: the first DNS label of the project URL host
    #[must_use]
    pub fn project_ref(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(ToString::to_string))
            .and_then(|host| host.split('.').next().map(ToString::to_string))
            .unwrap_or_else(|| "local".to_string())
    }

    /// Cookie name under which the session is stored
    #[must_use]
    pub fn get_storage_key(&self) -> String {
        self.storage_key
            .clone()
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| format!("sb-{}-auth-token", self.project_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clean_env_vars() {
        for var in [
            "HOST",
            "PORT",
            "SITE_URL",
            "IDENTITY_URL",
            "IDENTITY_ANON_KEY",
            "IDENTITY_STORAGE_KEY",
            "ERROR_PATH",
            "SIGN_IN_PATH",
            "COOKIE_SECURE",
            "AUTHGATE_SECRETS_DIR",
            "TEST_AUTHGATE_ANON_KEY",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_routes() {
        let settings = AuthGateSettings::default();
        assert_eq!(settings.routes.error_path, "/auth");
        assert_eq!(settings.routes.sign_in_path, "/auth");
        assert_eq!(settings.routes.callback_path, "/auth/callback");
        assert!(settings.cookies.secure);
    }

    #[test]
    fn test_storage_key_from_project_url() {
        let identity = IdentitySettings {
            url: "https://abcdefgh.supabase.co".to_string(),
            ..Default::default()
        };
        assert_eq!(identity.project_ref(), "abcdefgh");
        assert_eq!(identity.get_storage_key(), "sb-abcdefgh-auth-token");

        let local = IdentitySettings::default();
        assert_eq!(local.get_storage_key(), "sb-localhost-auth-token");
    }

    #[test]
    fn test_storage_key_override() {
        let identity = IdentitySettings {
            storage_key: Some("custom-auth".to_string()),
            ..Default::default()
        };
        assert_eq!(identity.get_storage_key(), "custom-auth");
    }

    #[test]
    #[serial]
    fn test_anon_key_env_precedence() {
        clean_env_vars();
        let identity = IdentitySettings {
            anon_key: Some("direct-key".to_string()),
            anon_key_env: Some("TEST_AUTHGATE_ANON_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(identity.get_anon_key(), Some("direct-key".to_string()));

        std::env::set_var("TEST_AUTHGATE_ANON_KEY", "env-key");
        assert_eq!(identity.get_anon_key(), Some("env-key".to_string()));

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clean_env_vars();
        std::env::set_var("PORT", "9090");
        std::env::set_var("SITE_URL", "https://app.example.com");
        std::env::set_var("IDENTITY_URL", "https://proj.supabase.co");
        std::env::set_var("COOKIE_SECURE", "false");
        std::env::set_var("ERROR_PATH", "/login");

        let mut settings = AuthGateSettings::default();
        AuthGateSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.port, 9090);
        assert_eq!(
            settings.application.site_url.as_deref(),
            Some("https://app.example.com")
        );
        assert_eq!(settings.identity.url, "https://proj.supabase.co");
        assert!(!settings.cookies.secure);
        assert_eq!(settings.routes.error_path, "/login");
        assert_eq!(settings.get_bind_address(), "0.0.0.0:9090");

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_ignored() {
        clean_env_vars();
        std::env::set_var("PORT", "not-a-port");

        let mut settings = AuthGateSettings::default();
        AuthGateSettings::apply_env_overrides(&mut settings);
        assert_eq!(settings.application.port, 8080);

        clean_env_vars();
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[application]
host = "127.0.0.1"
port = 3001
cors_origins = "https://app.example.com"

[identity]
url = "https://xyz.supabase.co"
anon_key = "anon"
request_timeout_seconds = 5
"#
        )
        .expect("write settings");

        let settings = AuthGateSettings::from_file(file.path()).expect("parse settings");
        assert_eq!(settings.application.port, 3001);
        assert_eq!(settings.identity.get_storage_key(), "sb-xyz-auth-token");
        // Sections missing from the file fall back to defaults
        assert_eq!(settings.routes.error_path, "/auth");
        assert_eq!(settings.get_cors_origins(), vec!["https://app.example.com"]);
    }

    #[test]
    fn test_logging_level_drives_logger_filter() {
        let logging = LoggingSettings {
            level: "warn".to_string(),
        };
        assert_eq!(
            logging.logger_builder().build().filter(),
            log::LevelFilter::Warn
        );

        // Module directives count too; the widest one wins
        let logging = LoggingSettings {
            level: "info,authgate=debug".to_string(),
        };
        assert_eq!(
            logging.logger_builder().build().filter(),
            log::LevelFilter::Debug
        );

        assert_eq!(
            LoggingSettings::default().logger_builder().build().filter(),
            log::LevelFilter::Info
        );
    }
}
