//! # dj-config
//!
//! Layered settings: built-in defaults, then an optional
//! `digital-journal.toml`, then `DJ__`-prefixed environment variables
//! (`DJ__SERVER__PORT=9000`). A `.env` file is loaded first when present.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "digital-journal.toml";
pub const ENV_PREFIX: &str = "DJ";
/// Cookie signing keys must be at least this long.
pub const MIN_SECRET_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("session.secret must be at least {MIN_SECRET_LEN} bytes, got {0}")]
    WeakSecret(usize),
    #[error("server.port must not be 0")]
    InvalidPort,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub session: SessionSettings,
    pub templates: TemplateSettings,
    pub reminder: ReminderSettings,
    #[serde(default)]
    pub pdf: PdfSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub root: PathBuf,
    /// Public path the media directory is served under, e.g. `/media`.
    pub url_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    #[serde(deserialize_with = "secret_string")]
    pub secret: SecretString,
    /// Marks the cookie `Secure`. Leave off only for plain-HTTP development.
    pub cookie_secure: bool,
}

impl SessionSettings {
    pub fn key_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

#[derive(Debug, Deserialize)]
pub struct TemplateSettings {
    pub seed_path: PathBuf,
    /// Account that owns the system templates.
    pub owner_username: String,
    pub custom_template_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReminderSettings {
    pub interval_secs: u64,
    /// Without a webhook, reminders are only logged.
    pub webhook_url: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PdfSettings {
    pub library_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub json: bool,
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl Settings {
    /// Reads `.env`, the default config file and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE), environment())
    }

    pub fn load_from(file: &Path, env: Environment) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("database.url", "sqlite://digital-journal.db")?
            .set_default("media.root", "./media")?
            .set_default("media.url_prefix", "/media")?
            .set_default("session.cookie_secure", false)?
            .set_default("templates.seed_path", "./data/templates.json")?
            .set_default("templates.owner_username", "@all")?
            .set_default("templates.custom_template_name", "Custom")?
            .set_default("reminder.interval_secs", 86_400)?
            .set_default("reminder.from_address", "noreply@journalsapp.com")?
            .set_default("log.json", false)?
            .add_source(File::from(file).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let secret_len = self.session.key_bytes().len();
        if secret_len < MIN_SECRET_LEN {
            return Err(SettingsError::WeakSecret(secret_len));
        }
        if self.server.port == 0 {
            return Err(SettingsError::InvalidPort);
        }
        Ok(())
    }
}

/// `DJ__SECTION__KEY` variables, with numbers and booleans parsed.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    fn long_secret() -> String {
        "s".repeat(MIN_SECRET_LEN)
    }

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        let secret = long_secret();
        let settings = Settings::load_from(
            Path::new("does-not-exist.toml"),
            env(&[("DJ__SESSION__SECRET", &secret)]),
        )
        .unwrap();

        assert_eq!(settings.server.bind_address(), ("127.0.0.1".to_string(), 8000));
        assert_eq!(settings.templates.custom_template_name, "Custom");
        assert_eq!(settings.reminder.interval_secs, 86_400);
        assert!(settings.reminder.webhook_url.is_none());
        assert!(settings.pdf.library_path.is_none());
        assert!(!settings.log.json);
        assert!(!settings.session.cookie_secure);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9000\nhost = \"0.0.0.0\"\n[session]\nsecret = \"{}\"",
            long_secret()
        )
        .unwrap();

        let settings = Settings::load_from(
            file.path(),
            env(&[("DJ__SERVER__PORT", "9100"), ("DJ__LOG__JSON", "true")]),
        )
        .unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9100);
        assert!(settings.log.json);
    }

    #[test]
    fn short_or_missing_secret_is_rejected() {
        let short = Settings::load_from(
            Path::new("does-not-exist.toml"),
            env(&[("DJ__SESSION__SECRET", "too-short")]),
        );
        assert!(matches!(short, Err(SettingsError::WeakSecret(9))));

        let missing = Settings::load_from(Path::new("does-not-exist.toml"), env(&[]));
        assert!(matches!(missing, Err(SettingsError::Load(_))));
    }
}
