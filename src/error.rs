//! 错误类型
//!
//! - [`ApiError`]：传输层产生的原始错误（网络 / 服务端 / 协议）
//! - [`ApiFailure`]：归一化后的唯一对外错误形态，只携带一句可展示的消息
//! - [`AppError`]：本地文件、配置等非 API 错误

use thiserror::Error;

use crate::models::Role;

/// 没有任何可用信息时的兜底提示
pub const UNKNOWN_ERROR_MESSAGE: &str = "未知错误";

/// 响应体不符合约定时展示给用户的提示，解析细节只进日志
pub const MALFORMED_RESPONSE_MESSAGE: &str = "服务器响应格式异常";

/// 传输层原始错误
///
/// 只在传输层和 API 客户端之间流动，到达业务能力层之前必须经过 [`ApiError::normalize`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 请求没有到达服务器（连接失败、DNS、超时等）
    #[error("请求失败 ({endpoint}): {message}")]
    Transport {
        endpoint: String,
        message: String,
        timed_out: bool,
    },
    /// 服务器返回非 2xx
    #[error("服务器返回错误 ({endpoint}): status={status}, detail={detail:?}")]
    Server {
        endpoint: String,
        status: u16,
        /// 后端结构化的 `detail` 字段
        detail: Option<String>,
        /// 通用的状态码描述
        message: String,
    },
    /// 2xx 但响应体无法解析成约定的结构
    #[error("响应格式异常 ({endpoint}): {message}")]
    Protocol { endpoint: String, message: String },
}

impl ApiError {
    pub fn endpoint(&self) -> &str {
        match self {
            ApiError::Transport { endpoint, .. }
            | ApiError::Server { endpoint, .. }
            | ApiError::Protocol { endpoint, .. } => endpoint,
        }
    }

    /// 归一化为 [`ApiFailure`]
    ///
    /// 优先级：服务端 detail > 传输层消息 > [`UNKNOWN_ERROR_MESSAGE`]
    pub fn normalize(&self) -> ApiFailure {
        let (kind, detail, transport_message) = match self {
            ApiError::Transport { message, .. } => (FailureKind::Transport, None, message),
            ApiError::Server {
                status,
                detail,
                message,
                ..
            } => (
                FailureKind::Server { status: *status },
                detail.as_deref(),
                message,
            ),
            ApiError::Protocol { message, .. } => (FailureKind::Protocol, None, message),
        };

        let message = detail
            .filter(|d| !d.trim().is_empty())
            .or(Some(transport_message.as_str()).filter(|m| !m.trim().is_empty()))
            .unwrap_or(UNKNOWN_ERROR_MESSAGE)
            .to_string();

        ApiFailure { message, kind }
    }
}

/// 错误归一化入口
pub fn normalize(raw: &ApiError) -> ApiFailure {
    raw.normalize()
}

impl From<ApiError> for ApiFailure {
    fn from(err: ApiError) -> Self {
        err.normalize()
    }
}

/// 失败来源，仅用于诊断和测试；展示给用户的只有 `message`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Server { status: u16 },
    Protocol,
}

/// 归一化后的 API 失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiFailure {
    pub message: String,
    pub kind: FailureKind,
}

impl ApiFailure {
    pub fn is_server_error(&self) -> bool {
        matches!(self.kind, FailureKind::Server { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::Server { status } => Some(status),
            _ => None,
        }
    }
}

/// 启动分析失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// 已有任务在运行（仅在启用保护时出现）
    #[error("已有分析任务正在运行: {job_id}")]
    AlreadyRunning { job_id: String },
    /// 两个视频没有全部上传
    #[error("请先上传视频: {}", format_roles(.missing))]
    NotReady { missing: Vec<Role> },
    #[error(transparent)]
    Api(#[from] ApiFailure),
}

fn format_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.label())
        .collect::<Vec<_>>()
        .join("、")
}

/// 应用程序错误类型（非 API 部分）
#[derive(Debug, Error)]
pub enum AppError {
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("HTTP 客户端初始化失败: {source}")]
    ClientBuildFailed {
        #[source]
        source: reqwest::Error,
    },
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误，不存在的文件单独归类
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            AppError::File(FileError::NotFound { path })
        } else {
            AppError::File(FileError::ReadFailed { path, source })
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
