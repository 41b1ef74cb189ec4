use std::{collections::HashMap, time::Duration};

use config::{Config, File};
use serde::Deserialize;
use thiserror::Error;

use super::helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, parse_duration, truthy,
};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "APTOS_GUARDIAN_";

/// Errors that can occur while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The configuration was parsed but is semantically invalid.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_interval() -> Duration {
    Duration::from_secs(20)
}

fn default_store_path() -> String {
    "data/guardian.db".to_string()
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Sweep period. Integer seconds in YAML.
    #[serde(deserialize_with = "deserialize_duration_from_seconds", default = "default_interval")]
    pub interval: Duration,

    /// Read-API server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Incident engine thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Discord alerting settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Monitored RPC fullnode endpoints.
    #[serde(default)]
    pub rpc_providers: Vec<EndpointConfig>,

    /// Monitored dApp URLs.
    #[serde(default)]
    pub dapps: Vec<EndpointConfig>,

    /// Path to the SQLite database file.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Retry policy for the alert-delivery HTTP client.
    #[serde(default)]
    pub http_retry: HttpRetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            server: ServerConfig::default(),
            thresholds: Thresholds::default(),
            discord: DiscordConfig::default(),
            rpc_providers: Vec::new(),
            dapps: Vec::new(),
            store_path: default_store_path(),
            http_retry: HttpRetryConfig::default(),
        }
    }
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Read-API bind settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Path at which Prometheus metrics are served.
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl ServerConfig {
    /// The `host:port` string the server binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_latency_warn_ms() -> i64 {
    600
}

fn default_latency_crit_ms() -> i64 {
    1500
}

fn default_consecutive_failures() -> usize {
    3
}

fn default_recoveries_for_close() -> usize {
    2
}

/// Thresholds driving the incident state machine.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Thresholds {
    /// Single-sample latency at or above which a WARN incident opens.
    #[serde(default = "default_latency_warn_ms")]
    pub latency_warn_ms: i64,
    /// Single-sample latency at or above which a CRIT incident opens.
    #[serde(default = "default_latency_crit_ms")]
    pub latency_crit_ms: i64,
    /// Consecutive failures required to open an incident.
    #[serde(default = "default_consecutive_failures")]
    pub consecutive_failures_for_incident: usize,
    /// Consecutive successes required to close an open incident.
    #[serde(default = "default_recoveries_for_close")]
    pub recoveries_for_close: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            latency_warn_ms: default_latency_warn_ms(),
            latency_crit_ms: default_latency_crit_ms(),
            consecutive_failures_for_incident: default_consecutive_failures(),
            recoveries_for_close: default_recoveries_for_close(),
        }
    }
}

fn default_dm_refuse_msg() -> String {
    "Please post in the support channel so the team can help. Mods never DM first.".to_string()
}

/// Discord integration settings. When `enabled`, `bot_token`,
/// `application_id`, and `guild_id` are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    /// Whether Discord alerting is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Bot application id.
    #[serde(default)]
    pub application_id: String,
    /// Bot token used for REST authentication.
    #[serde(default)]
    pub bot_token: String,
    /// Guild the bot operates in.
    #[serde(default)]
    pub guild_id: String,
    /// Channel that receives incident alerts. Empty disables alert posts.
    #[serde(default)]
    pub alert_channel_id: String,
    /// Optional mention prepended to incident-open alerts.
    #[serde(default)]
    pub mention: String,
    /// Reply sent when users DM the bot.
    #[serde(default = "default_dm_refuse_msg")]
    pub dm_refuse_msg: String,
}

fn default_endpoint_timeout() -> Duration {
    Duration::from_millis(4000)
}

/// One monitored endpoint: an RPC provider or a dApp URL.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Unique name of the endpoint within its kind.
    pub name: String,
    /// Canonical URL.
    pub url: String,
    /// Per-request probe timeout. Integer milliseconds in YAML.
    #[serde(
        rename = "timeout_ms",
        deserialize_with = "deserialize_duration_from_ms",
        default = "default_endpoint_timeout"
    )]
    pub timeout: Duration,
    /// Free-form labels.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_for_backoff() -> u32 {
    2
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(250)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

/// Jitter applied to retry backoff delays.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
    /// No jitter.
    None,
    /// Full jitter.
    #[default]
    Full,
}

/// Retry policy for the alert-delivery HTTP client.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpRetryConfig {
    /// Maximum number of retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base for the exponential backoff.
    #[serde(default = "default_base_for_backoff")]
    pub base_for_backoff: u32,
    /// Initial backoff delay. Integer milliseconds in YAML.
    #[serde(
        rename = "initial_backoff_ms",
        deserialize_with = "deserialize_duration_from_ms",
        default = "default_initial_backoff"
    )]
    pub initial_backoff: Duration,
    /// Backoff ceiling. Integer seconds in YAML.
    #[serde(
        rename = "max_backoff_secs",
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_max_backoff"
    )]
    pub max_backoff: Duration,
    /// Jitter setting.
    #[serde(default)]
    pub jitter: JitterSetting,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_for_backoff: default_base_for_backoff(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            jitter: JitterSetting::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file, applies `APTOS_GUARDIAN_*`
    /// environment overrides, and validates the result.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let parsed = Config::builder().add_source(File::with_name(path)).build()?;
        let mut config: AppConfig = parsed.try_deserialize()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies the fixed set of environment overrides on top of file values.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}INTERVAL")) {
            if let Some(d) = parse_duration(&v) {
                self.interval = d;
            }
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}SERVER_HOST")) {
            if !v.is_empty() {
                self.server.host = v;
            }
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}SERVER_PORT")) {
            if let Ok(port) = v.parse() {
                self.server.port = port;
            }
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}DISCORD_ENABLED")) {
            if !v.is_empty() {
                self.discord.enabled = truthy(&v);
            }
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}DISCORD_BOT_TOKEN")) {
            if !v.is_empty() {
                self.discord.bot_token = v;
            }
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}DISCORD_APPLICATION_ID")) {
            if !v.is_empty() {
                self.discord.application_id = v;
            }
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}DISCORD_GUILD_ID")) {
            if !v.is_empty() {
                self.discord.guild_id = v;
            }
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}DISCORD_ALERT_CHANNEL_ID")) {
            if !v.is_empty() {
                self.discord.alert_channel_id = v;
            }
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}STORE_PATH")) {
            if !v.is_empty() {
                self.store_path = v;
            }
        }
    }

    /// Validates required fields and re-applies defaults to zero values.
    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            self.interval = default_interval();
        }
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.port == 0 {
            self.server.port = default_server_port();
        }
        if self.server.metrics_path.is_empty() {
            self.server.metrics_path = default_metrics_path();
        }
        if self.thresholds.latency_warn_ms <= 0 {
            self.thresholds.latency_warn_ms = default_latency_warn_ms();
        }
        if self.thresholds.latency_crit_ms <= 0 {
            self.thresholds.latency_crit_ms = default_latency_crit_ms();
        }
        if self.thresholds.consecutive_failures_for_incident == 0 {
            self.thresholds.consecutive_failures_for_incident = default_consecutive_failures();
        }
        if self.thresholds.recoveries_for_close == 0 {
            self.thresholds.recoveries_for_close = default_recoveries_for_close();
        }
        if self.discord.dm_refuse_msg.is_empty() {
            self.discord.dm_refuse_msg = default_dm_refuse_msg();
        }
        if self.store_path.is_empty() {
            self.store_path = default_store_path();
        }
        for (i, endpoint) in self.rpc_providers.iter_mut().enumerate() {
            validate_endpoint(endpoint, "rpc_providers", i)?;
        }
        for (i, endpoint) in self.dapps.iter_mut().enumerate() {
            validate_endpoint(endpoint, "dapps", i)?;
        }
        if self.discord.enabled {
            if self.discord.bot_token.is_empty() {
                return Err(ConfigError::Invalid(
                    "discord.enabled is true but bot_token is empty".into(),
                ));
            }
            if self.discord.application_id.is_empty() {
                return Err(ConfigError::Invalid(
                    "discord.enabled is true but application_id is empty".into(),
                ));
            }
            if self.discord.guild_id.is_empty() {
                return Err(ConfigError::Invalid(
                    "discord.enabled is true but guild_id is empty".into(),
                ));
            }
        }
        Ok(())
    }
}

fn validate_endpoint(
    endpoint: &mut EndpointConfig,
    section: &str,
    index: usize,
) -> Result<(), ConfigError> {
    if endpoint.name.is_empty() {
        return Err(ConfigError::Invalid(format!("{section}[{index}]: name required")));
    }
    if endpoint.url.is_empty() {
        return Err(ConfigError::Invalid(format!("{section}[{index}]: url required")));
    }
    if let Err(err) = url::Url::parse(&endpoint.url) {
        return Err(ConfigError::Invalid(format!("{section}[{index}]: invalid url: {err}")));
    }
    if endpoint.timeout.is_zero() {
        endpoint.timeout = default_endpoint_timeout();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    fn write_config(dir: &TempDir, content: &str) -> String {
        let path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn load_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "rpc_providers: []");
        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.interval, Duration::from_secs(20));
        assert_eq!(config.server.listen_address(), "0.0.0.0:8080");
        assert_eq!(config.server.metrics_path, "/metrics");
        assert_eq!(config.thresholds.latency_warn_ms, 600);
        assert_eq!(config.thresholds.latency_crit_ms, 1500);
        assert_eq!(config.thresholds.consecutive_failures_for_incident, 3);
        assert_eq!(config.thresholds.recoveries_for_close, 2);
        assert_eq!(config.store_path, "data/guardian.db");
        assert!(!config.discord.dm_refuse_msg.is_empty());
    }

    #[test]
    fn load_parses_endpoints_and_defaults_timeouts() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
interval: 5
rpc_providers:
  - name: "primary"
    url: "https://fullnode.mainnet.aptoslabs.com"
    timeout_ms: 2500
dapps:
  - name: "explorer"
    url: "https://explorer.aptoslabs.com"
"#,
        );
        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.rpc_providers.len(), 1);
        assert_eq!(config.rpc_providers[0].timeout, Duration::from_millis(2500));
        assert_eq!(config.dapps[0].timeout, Duration::from_millis(4000));
    }

    #[test]
    fn load_rejects_endpoint_without_name() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
rpc_providers:
  - name: ""
    url: "https://x.example"
"#,
        );
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_rejects_unparseable_endpoint_url() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
dapps:
  - name: "broken"
    url: "not a url"
"#,
        );
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_rejects_enabled_discord_without_token() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
discord:
  enabled: true
  application_id: "app"
  guild_id: "guild"
"#,
        );
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn validate_backfills_zero_thresholds() {
        let mut config = AppConfig {
            thresholds: Thresholds {
                latency_warn_ms: 0,
                latency_crit_ms: -5,
                consecutive_failures_for_incident: 0,
                recoveries_for_close: 0,
            },
            ..AppConfig::default()
        };
        config.validate().unwrap();
        assert_eq!(config.thresholds.latency_warn_ms, 600);
        assert_eq!(config.thresholds.latency_crit_ms, 1500);
        assert_eq!(config.thresholds.consecutive_failures_for_incident, 3);
        assert_eq!(config.thresholds.recoveries_for_close, 2);
    }
}
