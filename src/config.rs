use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::QueryKind;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub query: QueryConfig,
    pub recency: RecencyConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    pub command: String,
    pub windows_args: Vec<String>,
    pub spaces_args: Vec<String>,
    pub displays_args: Vec<String>,
    pub ttl_ms: u64,
    pub retry_delay_ms: u64,
    pub max_attempts: u32,
    pub timeout_ms: u64,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecencyConfig {
    pub focus_log_path: PathBuf,
    pub usage_store_dir: PathBuf,
    pub rotate_after_lines: usize,
    pub keep_lines: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    pub fuzzy_threshold: f64,
}

/// Параметры одного вида запроса, собранные из конфигурации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    pub ttl: Duration,
    pub retry_delay: Duration,
    pub max_attempts: u32,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(2000),
            retry_delay: Duration::from_millis(50),
            max_attempts: 2,
        }
    }
}

fn query_args(flag: &str) -> Vec<String> {
    vec!["-m".to_string(), "query".to_string(), flag.to_string()]
}

fn state_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(std::env::temp_dir).join("winpick")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
            },
            query: QueryConfig {
                command: "yabai".to_string(),
                windows_args: query_args("--windows"),
                spaces_args: query_args("--spaces"),
                displays_args: query_args("--displays"),
                ttl_ms: 2000,
                retry_delay_ms: 50,
                max_attempts: 2,
                timeout_ms: 5000,
                env: HashMap::new(),
            },
            recency: RecencyConfig {
                focus_log_path: state_dir(dirs::cache_dir()).join("focus.log"),
                usage_store_dir: state_dir(dirs::data_dir()).join("store"),
                rotate_after_lines: 1000,
                keep_lines: 500,
            },
            search: SearchConfig {
                fuzzy_threshold: 0.6,
            },
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (if it exists), then `WINPICK_*` variables.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("WINPICK_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "pretty" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация настроек запросов
        if self.query.command.trim().is_empty() {
            anyhow::bail!("query.command не может быть пустым");
        }

        if self.query.ttl_ms == 0 {
            anyhow::bail!("ttl_ms должно быть больше 0");
        }

        if self.query.max_attempts == 0 || self.query.max_attempts > 5 {
            anyhow::bail!("max_attempts должно быть от 1 до 5");
        }

        if self.query.retry_delay_ms > 100 {
            anyhow::bail!("retry_delay_ms должно быть не больше 100");
        }

        if self.query.timeout_ms == 0 {
            anyhow::bail!("timeout_ms должно быть больше 0");
        }

        // Валидация ротации журнала фокуса
        if self.recency.keep_lines == 0 {
            anyhow::bail!("keep_lines должно быть больше 0");
        }

        if self.recency.keep_lines > self.recency.rotate_after_lines {
            anyhow::bail!(
                "keep_lines ({}) не может превышать rotate_after_lines ({})",
                self.recency.keep_lines,
                self.recency.rotate_after_lines
            );
        }

        let threshold = self.search.fuzzy_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            anyhow::bail!("fuzzy_threshold должно быть в диапазоне (0, 1]: {}", threshold);
        }

        Ok(())
    }

    pub fn query_policy(&self) -> QueryPolicy {
        QueryPolicy {
            ttl: Duration::from_millis(self.query.ttl_ms),
            retry_delay: Duration::from_millis(self.query.retry_delay_ms),
            max_attempts: self.query.max_attempts,
        }
    }

    /// Аргументы команды для конкретного вида запроса
    pub fn args_for(&self, kind: QueryKind) -> &[String] {
        match kind {
            QueryKind::Windows => &self.query.windows_args,
            QueryKind::Spaces => &self.query.spaces_args,
            QueryKind::Displays => &self.query.displays_args,
        }
    }
}
