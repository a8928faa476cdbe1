use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

const ENV_PREFIX: &str = "USER_MEDIA_";

/// Log output style.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Fixed root under which every media payload is stored.
    pub media_dir: PathBuf,
    /// Staging directory for incoming multipart file parts.
    pub spool_dir: PathBuf,
    pub request_timeout: Duration,
    pub max_request_bytes: usize,
    pub seed_demo_users: bool,
    pub log_format: LogFormat,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "User and media microservice")]
pub struct Args {
    /// Host to bind to (overrides USER_MEDIA_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides USER_MEDIA_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where media files are stored (overrides USER_MEDIA_MEDIA_DIR)
    #[arg(long)]
    pub media_dir: Option<PathBuf>,

    /// Directory for staging uploads (overrides USER_MEDIA_SPOOL_DIR)
    #[arg(long)]
    pub spool_dir: Option<PathBuf>,

    /// Per-request timeout in seconds (overrides USER_MEDIA_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Largest accepted request body in bytes (overrides USER_MEDIA_MAX_REQUEST_BYTES)
    #[arg(long)]
    pub max_request_bytes: Option<usize>,

    /// Seed the user store with demo accounts
    #[arg(long)]
    pub seed_demo_users: bool,

    /// Log output format (overrides USER_MEDIA_LOG_FORMAT)
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge `args` over the variables returned by `lookup` over defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let env_host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&var, "PORT")?.unwrap_or(8080);
        let env_media = var("MEDIA_DIR").unwrap_or_else(|| "./uploads".into());
        let env_spool = var("SPOOL_DIR").unwrap_or_else(|| "./data/incoming".into());
        let env_timeout = parse_var(&var, "REQUEST_TIMEOUT_SECS")?.unwrap_or(15);
        let env_max_body = parse_var(&var, "MAX_REQUEST_BYTES")?.unwrap_or(300 * 1024 * 1024);
        let env_seed = match var("SEED_DEMO_USERS") {
            Some(value) => parse_flag(&value)
                .with_context(|| format!("parsing {ENV_PREFIX}SEED_DEMO_USERS value `{value}`"))?,
            None => false,
        };
        let env_log_format = match var("LOG_FORMAT") {
            Some(value) => <LogFormat as ValueEnum>::from_str(&value, true)
                .map_err(|err| anyhow!(err))
                .with_context(|| format!("parsing {ENV_PREFIX}LOG_FORMAT value `{value}`"))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            media_dir: args.media_dir.unwrap_or_else(|| env_media.into()),
            spool_dir: args.spool_dir.unwrap_or_else(|| env_spool.into()),
            request_timeout: Duration::from_secs(args.request_timeout_secs.unwrap_or(env_timeout)),
            max_request_bytes: args.max_request_bytes.unwrap_or(env_max_body),
            seed_demo_users: args.seed_demo_users || env_seed,
            log_format: args.log_format.unwrap_or(env_log_format),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(var: impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {ENV_PREFIX}{name} value `{value}`"))
        })
        .transpose()
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("expected a boolean, got `{other}`")),
    }
}
