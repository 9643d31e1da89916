/// 服务信息与健康检查
use reqwest::Method;
use serde::Deserialize;

use crate::error::ApiError;
use crate::infrastructure::{HttpTransport, RequestBody, RequestOptions};

/// `GET /api` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub docs: String,
}

/// `GET /health` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

pub struct SystemApi {
    transport: HttpTransport,
}

impl SystemApi {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    pub async fn service_info(&self) -> Result<ServiceInfo, ApiError> {
        self.transport
            .request_json(Method::GET, "", RequestBody::Empty, RequestOptions::default())
            .await
    }

    /// 健康检查挂在服务根路径上，不在 API 前缀下
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.transport
            .request_json(
                Method::GET,
                "/health",
                RequestBody::Empty,
                RequestOptions::server_root(),
            )
            .await
    }
}
