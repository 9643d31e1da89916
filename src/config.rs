use serde::Deserialize;
use std::path::Path;

use crate::error::{AppError, AppResult, ConfigError};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "ANALYZER_CONFIG";

/// 程序配置
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 后端服务地址（不含 API 前缀）
    pub server_url: String,
    /// API 路径前缀
    pub api_prefix: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 轮询进度的间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 最大轮询次数，None 表示不设上限
    pub max_poll_attempts: Option<usize>,
    /// 是否启用设备检测
    pub include_device_detection: bool,
    /// 老师示范视频路径
    pub teacher_video_path: String,
    /// 学生实验视频路径
    pub student_video_path: String,
    /// 启动前是否检查后端健康状态
    pub check_health: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            api_prefix: "/api".to_string(),
            request_timeout_secs: 30,
            poll_interval_ms: 2000,
            max_poll_attempts: None,
            include_device_detection: true,
            teacher_video_path: "teacher.mp4".to_string(),
            student_video_path: "student.mp4".to_string(),
            check_health: true,
            verbose_logging: false,
            output_log_file: "analysis_log.txt".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：先读 `ANALYZER_CONFIG` 指向的 TOML 文件（如果有），再用环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_toml_file(path)?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺失字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AppError::Config(ConfigError::TomlParseFailed { source, .. }) => {
                AppError::Config(ConfigError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            server_url: std::env::var("SERVER_URL").unwrap_or(self.server_url),
            api_prefix: std::env::var("API_PREFIX").unwrap_or(self.api_prefix),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.request_timeout_secs),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.poll_interval_ms),
            max_poll_attempts: std::env::var("MAX_POLL_ATTEMPTS").ok().and_then(|v| v.parse().ok()).or(self.max_poll_attempts),
            include_device_detection: std::env::var("INCLUDE_DEVICE_DETECTION").ok().and_then(|v| v.parse().ok()).unwrap_or(self.include_device_detection),
            teacher_video_path: std::env::var("TEACHER_VIDEO").unwrap_or(self.teacher_video_path),
            student_video_path: std::env::var("STUDENT_VIDEO").unwrap_or(self.student_video_path),
            check_health: std::env::var("CHECK_HEALTH").ok().and_then(|v| v.parse().ok()).unwrap_or(self.check_health),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    /// API 基础地址，例如 `http://localhost:8080/api`
    pub fn api_base_url(&self) -> String {
        format!(
            "{}{}",
            self.server_url.trim_end_matches('/'),
            normalize_prefix(&self.api_prefix)
        )
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
