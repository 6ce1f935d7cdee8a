//! 应用配置管理
//!
//! 启动时加载一次配置：可选的 JSON 配置文件，再叠加环境变量。
//! 配置构建完成后按值传入共享状态，不再提供全局可变单例。

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AppError;

/// API 密钥环境变量
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "IDEA_RELAY_CONFIG";

/// 获取配置文件路径
fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    // 配置文件位于可执行文件同级目录
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.json")
}

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 模型服务 API 密钥（只从环境变量读取，不写回）
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// 模型服务基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 模型名称
    #[serde(default = "default_model")]
    pub model: String,

    /// 温度参数 (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// 瞬时失败时的最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 请求超时（秒），None 表示不设超时
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_retries() -> u32 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: None,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// 加载配置：配置文件 -> 环境变量覆盖 -> 校验
    pub fn load() -> Result<Self, AppError> {
        let mut config = load_config_from_file()?.unwrap_or_default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 使用环境变量覆盖配置项
    ///
    /// `lookup` 抽象了环境变量读取，便于测试。
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup(API_KEY_ENV) {
            self.api_key = api_key;
        }
        if let Some(model) = lookup("IDEA_RELAY_MODEL") {
            self.model = model;
        }
        if let Some(base_url) = lookup("IDEA_RELAY_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(host) = lookup("IDEA_RELAY_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("IDEA_RELAY_PORT") {
            self.port = port
                .parse()
                .map_err(|e| AppError::Config(format!("IDEA_RELAY_PORT 无效 ({}): {}", port, e)))?;
        }
        if let Some(timeout) = lookup("IDEA_RELAY_TIMEOUT_SECS") {
            let secs = timeout.parse().map_err(|e| {
                AppError::Config(format!("IDEA_RELAY_TIMEOUT_SECS 无效 ({}): {}", timeout, e))
            })?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "{} is missing from the environment",
                API_KEY_ENV
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::Config("model must not be empty".to_string()));
        }
        Ok(())
    }

    /// 监听地址
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("监听地址无效: {}", e)))
    }

    /// 请求超时
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// 从文件加载配置
///
/// 文件不存在时返回 `None`；文件存在但无法解析时视为启动错误。
fn load_config_from_file() -> Result<Option<AppConfig>, AppError> {
    let path = get_config_path();
    if !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| AppError::Config(format!("读取配置文件失败 ({}): {}", path.display(), e)))?;
    let config: AppConfig = serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("解析配置文件失败 ({}): {}", path.display(), e)))?;

    if content.contains("\"api_key\"") {
        warn!("api_key in {} is ignored, set {} instead", path.display(), API_KEY_ENV);
    }

    Ok(Some(AppConfig {
        api_key: String::new(),
        ..config
    }))
}
