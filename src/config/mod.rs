use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub market: MarketConfig,
    pub dashboard: DashboardConfig,
    pub volume_monitor: VolumeMonitorConfig,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub token_config_path: PathBuf,
    pub alerts_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    /// Base URL of the persistence server; `None` means in-process file stores.
    pub store_url: Option<String>,
    pub poll_interval_secs: u64,
    pub history_retention: usize,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct FeatureFlags {
    pub alerts_enabled: bool,
    pub charting_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            alerts_enabled: true,
            charting_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VolumeMonitorConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub spike_ratio: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenv::dotenv().ok();

        let data_dir = PathBuf::from(env_var_or_default("DATA_DIR", ".".to_string())?);

        let store_url = std::env::var("DASHBOARD_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let telegram = match (
            std::env::var("TELEGRAM_BOT_TOKEN"),
            std::env::var("TELEGRAM_CHAT_ID"),
        ) {
            (Ok(bot_token), Ok(chat_id)) if !bot_token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramConfig { bot_token, chat_id })
            }
            _ => None,
        };

        let config = Config {
            server: ServerConfig {
                host: env_var_or_default("SERVER_HOST", "0.0.0.0".to_string())?,
                port: env_var_or_default("SERVER_PORT", 3000)?,
            },
            storage: StorageConfig {
                token_config_path: data_dir.join(env_var_or_default(
                    "TOKEN_CONFIG_FILE",
                    "config.json".to_string(),
                )?),
                alerts_path: data_dir.join(env_var_or_default(
                    "ALERTS_FILE",
                    "alerts.json".to_string(),
                )?),
            },
            market: MarketConfig {
                api_url: env_var_or_default(
                    "DEXSCREENER_API",
                    "https://api.dexscreener.com/latest/dex/tokens".to_string(),
                )?,
                request_timeout_secs: env_var_or_default("MARKET_TIMEOUT_SECS", 15)?,
            },
            dashboard: DashboardConfig {
                store_url,
                poll_interval_secs: env_var_or_default("POLL_INTERVAL_SECS", 5)?,
                history_retention: env_var_or_default("HISTORY_RETENTION", 17_280)?,
                features: FeatureFlags {
                    alerts_enabled: env_var_or_default("ALERTS_ENABLED", true)?,
                    charting_enabled: env_var_or_default("CHARTING_ENABLED", true)?,
                },
            },
            volume_monitor: VolumeMonitorConfig {
                enabled: env_var_or_default("VOLUME_MONITOR_ENABLED", true)?,
                interval_secs: env_var_or_default("VOLUME_MONITOR_INTERVAL_SECS", 300)?,
                spike_ratio: env_var_or_default("VOLUME_SPIKE_RATIO", 2.0)?,
            },
            telegram,
        };

        if config.dashboard.history_retention == 0 {
            Self::print_config_help();
            return Err(anyhow::anyhow!("HISTORY_RETENTION must be greater than zero"));
        }

        Ok(config)
    }

    pub fn print_config_help() {
        println!("\n🔧 Configuration guide");
        println!("{}", "=".repeat(50));
        println!("All settings are read from the environment (or .env):\n");

        println!("[server]");
        println!("SERVER_HOST=0.0.0.0");
        println!("SERVER_PORT=3000\n");

        println!("[storage]");
        println!("DATA_DIR=.");
        println!("TOKEN_CONFIG_FILE=config.json");
        println!("ALERTS_FILE=alerts.json\n");

        println!("[market data]");
        println!("DEXSCREENER_API=https://api.dexscreener.com/latest/dex/tokens");
        println!("MARKET_TIMEOUT_SECS=15\n");

        println!("[dashboard]");
        println!("DASHBOARD_URL=http://host:3000   (remote store; unset = local files)");
        println!("POLL_INTERVAL_SECS=5");
        println!("HISTORY_RETENTION=17280");
        println!("ALERTS_ENABLED=true");
        println!("CHARTING_ENABLED=true\n");

        println!("[volume monitor]");
        println!("VOLUME_MONITOR_ENABLED=true");
        println!("VOLUME_MONITOR_INTERVAL_SECS=300");
        println!("VOLUME_SPIKE_RATIO=2.0");
        println!("TELEGRAM_BOT_TOKEN=...  TELEGRAM_CHAT_ID=...\n");

        println!("{}", "=".repeat(50));
    }
}

fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
