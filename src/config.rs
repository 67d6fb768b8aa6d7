use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for workchat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the task API (`/search`, `/tasks`).
    pub task_base_url: String,
    /// Base URL of the financial analytics API (`/r-analytics/*`).
    pub analytics_base_url: String,
    /// Per-request HTTP timeout. Bounds a single in-flight call, not the
    /// whole poll loop.
    pub request_timeout_secs: u64,
    /// Server-side timeout sent with analytics questions.
    pub analytics_ask_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub backend: HistoryBackend,
    /// Seed the in-memory backend with demo conversations.
    pub seed_demo_data: bool,
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: u8,
    pub pool: PoolConfig,
    pub default_ttl_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_size: usize,
    pub timeout_seconds: u64,
    pub create_timeout_seconds: u64,
    pub recycle_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = [".env", "../.env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("WORKCHAT_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("WORKCHAT_TASK_BASE_URL") {
            self.api.task_base_url = url;
        }
        if let Ok(url) = env::var("WORKCHAT_ANALYTICS_BASE_URL") {
            self.api.analytics_base_url = url;
        }
        if let Ok(timeout) = env::var("WORKCHAT_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.api.request_timeout_secs = secs;
            }
        }
        if let Ok(timeout) = env::var("WORKCHAT_ANALYTICS_ASK_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.api.analytics_ask_timeout_secs = secs;
            }
        }

        if let Ok(interval) = env::var("WORKCHAT_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.polling.interval_ms = ms;
            }
        }
        if let Ok(timeout) = env::var("WORKCHAT_POLL_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.polling.timeout_ms = ms;
            }
        }

        if let Ok(backend) = env::var("WORKCHAT_HISTORY_BACKEND") {
            match backend.to_lowercase().as_str() {
                "memory" => self.history.backend = HistoryBackend::Memory,
                "redis" => self.history.backend = HistoryBackend::Redis,
                other => {
                    tracing::warn!("Unknown history backend: {}. Keeping configured value.", other)
                }
            }
        }
        if let Ok(seed) = env::var("WORKCHAT_SEED_DEMO_DATA") {
            if let Ok(flag) = seed.parse() {
                self.history.seed_demo_data = flag;
            }
        }

        if let Ok(host) = env::var("REDIS_HOST") {
            self.history.redis.host = host;
        }
        if let Ok(port) = env::var("REDIS_PORT") {
            if let Ok(port_num) = port.parse() {
                self.history.redis.port = port_num;
            }
        }
        if let Ok(db) = env::var("REDIS_DB") {
            if let Ok(db_num) = db.parse() {
                self.history.redis.database = db_num;
            }
        }
        if let Ok(pool_size) = env::var("WORKCHAT_REDIS_POOL_SIZE") {
            if let Ok(size) = pool_size.parse() {
                self.history.redis.pool.max_size = size;
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.api.task_base_url.is_empty() {
            return Err("Task API base URL cannot be empty".into());
        }
        if self.api.analytics_base_url.is_empty() {
            return Err("Analytics API base URL cannot be empty".into());
        }
        if self.api.request_timeout_secs == 0 {
            return Err("Request timeout cannot be 0".into());
        }

        if self.polling.interval_ms == 0 {
            return Err("Poll interval cannot be 0".into());
        }
        if self.polling.timeout_ms < self.polling.interval_ms {
            return Err("Poll timeout must be at least one interval".into());
        }

        if self.history.redis.port == 0 {
            return Err("Redis port cannot be 0".into());
        }
        if self.history.redis.pool.max_size == 0 {
            return Err("Redis pool max_size cannot be 0".into());
        }

        Ok(())
    }

    /// Get Redis URL with password from environment
    pub fn get_redis_url(&self) -> String {
        let password = env::var("REDIS_PASSWORD")
            .or_else(|_| env::var("REDIS_PASS"))
            .unwrap_or_else(|_| {
                tracing::debug!(
                    "REDIS_PASSWORD not set, assuming no password for local development."
                );
                "".to_string()
            });

        if password.is_empty() {
            format!(
                "redis://{}:{}/{}",
                self.history.redis.host, self.history.redis.port, self.history.redis.database
            )
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                password,
                self.history.redis.host,
                self.history.redis.port,
                self.history.redis.database
            )
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.polling.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn get_pool_timeout(&self) -> Duration {
        Duration::from_secs(self.history.redis.pool.timeout_seconds)
    }

    pub fn get_pool_create_timeout(&self) -> Duration {
        Duration::from_secs(self.history.redis.pool.create_timeout_seconds)
    }

    pub fn get_pool_recycle_timeout(&self) -> Duration {
        Duration::from_secs(self.history.redis.pool.recycle_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                task_base_url: "http://localhost:8000".to_string(),
                analytics_base_url: "http://localhost:8000".to_string(),
                request_timeout_secs: 30,
                analytics_ask_timeout_secs: 60,
            },
            polling: PollingConfig {
                interval_ms: 5000,
                timeout_ms: 300_000,
            },
            history: HistoryConfig {
                backend: HistoryBackend::Memory,
                seed_demo_data: true,
                redis: RedisConfig {
                    host: "localhost".to_string(),
                    port: 6379,
                    database: 0,
                    pool: PoolConfig {
                        max_size: 16,
                        timeout_seconds: 5,
                        create_timeout_seconds: 5,
                        recycle_timeout_seconds: 5,
                    },
                    default_ttl_seconds: 604800,
                },
            },
        }
    }
}
