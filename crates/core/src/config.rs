use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub mailer: MailerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Outbound email goes through an HTTP relay owned by the wider platform.
/// When disabled, the effect dispatcher drops email effects on the floor
/// (and says so at debug level).
#[derive(Clone, Debug)]
pub struct MailerConfig {
    pub enabled: bool,
    pub relay_url: Option<String>,
    pub auth_token: Option<SecretString>,
    pub from_address: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub mailer_enabled: Option<bool>,
    pub mailer_relay_url: Option<String>,
    pub mailer_auth_token: Option<String>,
    pub mailer_from_address: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://furlough.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            mailer: MailerConfig {
                enabled: false,
                relay_url: None,
                auth_token: None,
                from_address: "no-reply@furlough.local".to_string(),
                timeout_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("furlough.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(mailer) = patch.mailer {
            if let Some(enabled) = mailer.enabled {
                self.mailer.enabled = enabled;
            }
            if let Some(relay_url) = mailer.relay_url {
                self.mailer.relay_url = Some(relay_url);
            }
            if let Some(auth_token_value) = mailer.auth_token {
                self.mailer.auth_token = Some(secret_value(auth_token_value));
            }
            if let Some(from_address) = mailer.from_address {
                self.mailer.from_address = from_address;
            }
            if let Some(timeout_secs) = mailer.timeout_secs {
                self.mailer.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FURLOUGH_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("FURLOUGH_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("FURLOUGH_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("FURLOUGH_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("FURLOUGH_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FURLOUGH_MAILER_ENABLED") {
            self.mailer.enabled = parse_bool("FURLOUGH_MAILER_ENABLED", &value)?;
        }
        if let Some(value) = read_env("FURLOUGH_MAILER_RELAY_URL") {
            self.mailer.relay_url = Some(value);
        }
        if let Some(value) = read_env("FURLOUGH_MAILER_AUTH_TOKEN") {
            self.mailer.auth_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("FURLOUGH_MAILER_FROM_ADDRESS") {
            self.mailer.from_address = value;
        }
        if let Some(value) = read_env("FURLOUGH_MAILER_TIMEOUT_SECS") {
            self.mailer.timeout_secs = parse_u64("FURLOUGH_MAILER_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("FURLOUGH_LOGGING_LEVEL").or_else(|| read_env("FURLOUGH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FURLOUGH_LOGGING_FORMAT").or_else(|| read_env("FURLOUGH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.mailer_enabled {
            self.mailer.enabled = enabled;
        }
        if let Some(relay_url) = overrides.mailer_relay_url {
            self.mailer.relay_url = Some(relay_url);
        }
        if let Some(auth_token) = overrides.mailer_auth_token {
            self.mailer.auth_token = Some(secret_value(auth_token));
        }
        if let Some(from_address) = overrides.mailer_from_address {
            self.mailer.from_address = from_address;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_mailer(&self.mailer)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("furlough.toml"), PathBuf::from("config/furlough.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_mailer(mailer: &MailerConfig) -> Result<(), ConfigError> {
    if !mailer.enabled {
        return Ok(());
    }

    let relay_url = mailer.relay_url.as_deref().unwrap_or_default().trim().to_string();
    if relay_url.is_empty() {
        return Err(ConfigError::Validation(
            "mailer.relay_url is required when mailer.enabled is true".to_string(),
        ));
    }
    if !relay_url.starts_with("http://") && !relay_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "mailer.relay_url must start with http:// or https://".to_string(),
        ));
    }

    let token_missing = mailer
        .auth_token
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if token_missing {
        return Err(ConfigError::Validation(
            "mailer.auth_token is required when mailer.enabled is true".to_string(),
        ));
    }

    if mailer.from_address.trim().is_empty() || !mailer.from_address.contains('@') {
        return Err(ConfigError::Validation(
            "mailer.from_address must be a plausible email address".to_string(),
        ));
    }

    if mailer.timeout_secs == 0 || mailer.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "mailer.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    mailer: Option<MailerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MailerPatch {
    enabled: Option<bool>,
    relay_url: Option<String>,
    auth_token: Option<String>,
    from_address: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
