//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddr,
    num::NonZeroUsize,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::types::CountryCode;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides, SyncArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "helpgate";
const ENV_PREFIX: &str = "HELPGATE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_BATCH_WAIT_MS: u64 = 1;
const DEFAULT_MAX_BATCH_SIZE: usize = 100;
const DEFAULT_CATEGORIES_LIMIT: usize = 1024;
const DEFAULT_SECTIONS_LIMIT: usize = 1024;
const DEFAULT_ARTICLES_LIMIT: usize = 1024;
const DEFAULT_TICKET_LIMIT: usize = 256;
const DEFAULT_EXAMINER_MAX_WORKER_SIZE: usize = 100;
const DEFAULT_EXAMINER_MAX_POOL_SIZE: usize = 200;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub loader: LoaderSettings,
    pub cache: CacheSettings,
    pub examiner: ExaminerSettings,
    pub upstream: UpstreamSettings,
    pub admin: AdminSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    /// Deadline attached to every request context.
    pub request_timeout: Duration,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub batch_wait: Duration,
    pub max_batch_size: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub categories_limit: usize,
    pub sections_limit: usize,
    pub articles_limit: usize,
    pub ticket_limit: usize,
}

#[derive(Debug, Clone)]
pub struct ExaminerSettings {
    pub max_worker_size: NonZeroUsize,
    pub max_pool_size: NonZeroUsize,
    pub categories_refresh_limit: i64,
    pub sections_refresh_limit: i64,
    pub articles_refresh_limit: i64,
    pub ticket_forms_refresh_limit: i64,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub request_timeout: Duration,
    pub auth_token: Option<String>,
    pub base_urls: BTreeMap<CountryCode, Url>,
}

#[derive(Debug, Clone, Default)]
pub struct AdminSettings {
    /// `None` unless both user and password are configured.
    pub credentials: Option<BasicCredentials>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Sync(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    loader: RawLoaderSettings,
    cache: RawCacheSettings,
    examiner: RawExaminerSettings,
    upstream: RawUpstreamSettings,
    admin: RawAdminSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_request_timeout_seconds {
            self.server.request_timeout_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(wait) = overrides.loader_batch_wait_ms {
            self.loader.batch_wait_ms = Some(wait);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            loader,
            cache,
            examiner,
            upstream,
            admin,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            loader: build_loader_settings(loader)?,
            cache: build_cache_settings(cache),
            examiner: build_examiner_settings(examiner)?,
            upstream: build_upstream_settings(upstream)?,
            admin: build_admin_settings(admin),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let request_timeout = positive_seconds(
        server
            .request_timeout_seconds
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        "server.request_timeout_seconds",
    )?;
    let graceful_shutdown = positive_seconds(
        server
            .graceful_shutdown_seconds
            .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS),
        "server.graceful_shutdown_seconds",
    )?;

    Ok(ServerSettings {
        addr,
        request_timeout,
        graceful_shutdown,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_loader_settings(loader: RawLoaderSettings) -> Result<LoaderSettings, LoadError> {
    let batch_wait = Duration::from_millis(loader.batch_wait_ms.unwrap_or(DEFAULT_BATCH_WAIT_MS));
    let max_batch_size = non_zero_usize(
        loader.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE),
        "loader.max_batch_size",
    )?;

    Ok(LoaderSettings {
        batch_wait,
        max_batch_size,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        categories_limit: cache.categories_limit.unwrap_or(DEFAULT_CATEGORIES_LIMIT),
        sections_limit: cache.sections_limit.unwrap_or(DEFAULT_SECTIONS_LIMIT),
        articles_limit: cache.articles_limit.unwrap_or(DEFAULT_ARTICLES_LIMIT),
        ticket_limit: cache.ticket_limit.unwrap_or(DEFAULT_TICKET_LIMIT),
    }
}

fn build_examiner_settings(examiner: RawExaminerSettings) -> Result<ExaminerSettings, LoadError> {
    Ok(ExaminerSettings {
        max_worker_size: non_zero_usize(
            examiner
                .max_worker_size
                .unwrap_or(DEFAULT_EXAMINER_MAX_WORKER_SIZE),
            "examiner.max_worker_size",
        )?,
        max_pool_size: non_zero_usize(
            examiner
                .max_pool_size
                .unwrap_or(DEFAULT_EXAMINER_MAX_POOL_SIZE),
            "examiner.max_pool_size",
        )?,
        categories_refresh_limit: examiner.categories_refresh_limit.unwrap_or(0),
        sections_refresh_limit: examiner.sections_refresh_limit.unwrap_or(0),
        articles_refresh_limit: examiner.articles_refresh_limit.unwrap_or(0),
        ticket_forms_refresh_limit: examiner.ticket_forms_refresh_limit.unwrap_or(0),
    })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let request_timeout = positive_seconds(
        upstream
            .request_timeout_seconds
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        "upstream.request_timeout_seconds",
    )?;

    let auth_token = upstream.auth_token.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let mut base_urls = BTreeMap::new();
    for (country, raw_url) in upstream.base_urls {
        let country = CountryCode::from_str(&country)
            .map_err(|err| LoadError::invalid("upstream.base_urls", err.to_string()))?;
        let url = Url::parse(raw_url.trim()).map_err(|err| {
            LoadError::invalid(
                "upstream.base_urls",
                format!("invalid url for `{country}`: {err}"),
            )
        })?;
        if url.cannot_be_a_base() {
            return Err(LoadError::invalid(
                "upstream.base_urls",
                format!("url for `{country}` cannot be used as a base"),
            ));
        }
        base_urls.insert(country, url);
    }

    Ok(UpstreamSettings {
        request_timeout,
        auth_token,
        base_urls,
    })
}

fn build_admin_settings(admin: RawAdminSettings) -> AdminSettings {
    let non_empty = |value: Option<String>| value.filter(|value| !value.trim().is_empty());
    let credentials = match (
        non_empty(admin.basic_auth_user),
        non_empty(admin.basic_auth_password),
    ) {
        (Some(user), Some(password)) => Some(BasicCredentials { user, password }),
        _ => None,
    };
    AdminSettings { credentials }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    request_timeout_seconds: Option<u64>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoaderSettings {
    batch_wait_ms: Option<u64>,
    max_batch_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    categories_limit: Option<usize>,
    sections_limit: Option<usize>,
    articles_limit: Option<usize>,
    ticket_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawExaminerSettings {
    max_worker_size: Option<usize>,
    max_pool_size: Option<usize>,
    categories_refresh_limit: Option<i64>,
    sections_refresh_limit: Option<i64>,
    articles_refresh_limit: Option<i64>,
    ticket_forms_refresh_limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    request_timeout_seconds: Option<u64>,
    auth_token: Option<String>,
    base_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAdminSettings {
    basic_auth_user: Option<String>,
    basic_auth_password: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
