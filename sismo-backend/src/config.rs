use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub push: PushConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Where the event listing is scraped from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Expo push service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_endpoint")]
    pub endpoint: String,

    /// Optional access token, sent as bearer auth when set
    #[serde(default)]
    pub access_token: Option<String>,

    /// Maximum messages per request accepted by the provider
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// 1 keeps chunk sends strictly sequential
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_sound")]
    pub sound: String,

    #[serde(default = "default_icon")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Run one cycle immediately instead of waiting a full interval
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_source_url() -> String {
    "https://www.inpres.gob.ar/desktop/".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 Sismos-backend/1.0".to_string()
}

fn default_push_endpoint() -> String {
    "https://exp.host/--/api/v2/push/send".to_string()
}

fn default_chunk_size() -> usize {
    100
}

fn default_max_concurrent_chunks() -> usize {
    1
}

fn default_title() -> String {
    "Nuevo sismo registrado".to_string()
}

fn default_sound() -> String {
    "default".to_string()
}

fn default_icon() -> Option<String> {
    Some("./assets/image/logoW.png".to_string())
}

fn default_interval_minutes() -> u64 {
    5
}

fn default_run_on_startup() -> bool {
    true
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: default_push_endpoint(),
            access_token: None,
            chunk_size: default_chunk_size(),
            max_concurrent_chunks: default_max_concurrent_chunks(),
            timeout_secs: default_timeout_secs(),
            title: default_title(),
            sound: default_sound(),
            icon: default_icon(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            run_on_startup: default_run_on_startup(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            source: SourceConfig::default(),
            push: PushConfig::default(),
            scheduler: SchedulerConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: BackendConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.interval_minutes == 0 {
            anyhow::bail!("scheduler.interval_minutes must be greater than 0");
        }
        if self.push.chunk_size == 0 {
            anyhow::bail!("push.chunk_size must be greater than 0");
        }
        if self.push.max_concurrent_chunks == 0 {
            anyhow::bail!("push.max_concurrent_chunks must be greater than 0");
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PushConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

pub static CONFIG: OnceLock<BackendConfig> = OnceLock::new();

/// Load the config file into [`CONFIG`]. Only the first call takes effect.
pub fn read_config(path: &str) -> anyhow::Result<&'static BackendConfig> {
    let config = BackendConfig::from_file(path)?;
    Ok(CONFIG.get_or_init(|| config))
}
