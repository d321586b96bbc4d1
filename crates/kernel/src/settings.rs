use std::num::NonZeroU64;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSEARCH_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSEARCH_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSEARCH";
const PORT_ENV: &str = "PORT";
const SERVER_PORT_ENV: &str = "BOOKSEARCH_SERVER__PORT";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub reviews: ReviewSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .context("unable to resolve current directory")?,
        };

        let mut settings = Self::load_from(&config_dir, &environment)?;
        settings.apply_port_env();
        Ok(settings)
    }

    /// Honour the conventional `PORT` variable unless `BOOKSEARCH_SERVER__PORT` is set.
    pub fn apply_port_env(&mut self) {
        if std::env::var_os(SERVER_PORT_ENV).is_some() {
            return;
        }
        self.apply_platform_port(std::env::var(PORT_ENV).ok().as_deref());
    }

    fn apply_platform_port(&mut self, port: Option<&str>) {
        let Some(raw) = port.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return;
        };
        match raw.parse::<u16>() {
            Ok(port) => self.server.port = port,
            Err(_) => tracing::warn!(value = raw, "ignoring unparsable PORT"),
        }
    }

    /// Load configuration from an explicit config directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment = Environment::parse(environment)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;
        settings.server.base_path = normalize_base_path(&settings.server.base_path);

        Ok(settings)
    }
}

/// Strips trailing slashes and ensures a leading one; `""` means the site root.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Prefix under which the catalog is mounted, e.g. `/main`.
    #[serde(default)]
    pub base_path: String,
    /// Directory of static assets served ahead of the redirect fallback.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    /// Root URL of the catalog, used for links and redirects.
    pub fn root(&self) -> &str {
        if self.base_path.is_empty() {
            "/"
        } else {
            &self.base_path
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            base_path: String::new(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Full connection URL; takes precedence over the individual parts.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "DatabaseSettings::default_host")]
    pub host: String,
    #[serde(default = "DatabaseSettings::default_port")]
    pub port: u16,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Session time zone applied to each new MySQL connection; empty disables it.
    #[serde(default = "DatabaseSettings::default_timezone")]
    pub timezone: Option<String>,
}

impl DatabaseSettings {
    fn default_host() -> String {
        "localhost".to_string()
    }

    fn default_port() -> u16 {
        3306
    }

    fn default_name() -> String {
        "goodreads".to_string()
    }

    fn default_max_connections() -> u32 {
        4
    }

    fn default_acquire_timeout_ms() -> u64 {
        5000
    }

    fn default_timezone() -> Option<String> {
        Some("+08:00".to_string())
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: Self::default_host(),
            port: Self::default_port(),
            name: Self::default_name(),
            user: None,
            password: None,
            max_connections: Self::default_max_connections(),
            acquire_timeout_ms: Self::default_acquire_timeout_ms(),
            timezone: Self::default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "CatalogSettings::default_page_size")]
    pub page_size: NonZeroU64,
    #[serde(default = "CatalogSettings::default_table")]
    pub table: String,
    /// Columns read from the book table, each cast to its kind so every
    /// store type decodes. Empty selects every column as-is.
    #[serde(default = "CatalogSettings::default_columns")]
    pub columns: Vec<CatalogColumn>,
}

impl CatalogSettings {
    fn default_page_size() -> NonZeroU64 {
        NonZeroU64::new(10).unwrap_or(NonZeroU64::MIN)
    }

    fn default_table() -> String {
        "book2018".to_string()
    }

    fn default_columns() -> Vec<CatalogColumn> {
        use ColumnKind::{Integer, Real, Text};

        [
            ("book_id", Text),
            ("title", Text),
            ("authors", Text),
            ("description", Text),
            ("edition", Text),
            ("format", Text),
            ("pages", Integer),
            ("rating", Real),
            ("rating_count", Integer),
            ("review_count", Integer),
            ("genres", Text),
            ("image_url", Text),
        ]
        .into_iter()
        .map(|(name, kind)| CatalogColumn {
            name: name.to_string(),
            kind,
        })
        .collect()
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
            table: Self::default_table(),
            columns: Self::default_columns(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// JSON shape a catalog column is read as.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSettings {
    #[serde(default = "ReviewSettings::default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "ReviewSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ReviewSettings {
    fn default_endpoint() -> String {
        "https://api.nytimes.com/svc/books/v3/reviews.json".to_string()
    }

    fn default_timeout_ms() -> u64 {
        5000
    }
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            api_key: None,
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
