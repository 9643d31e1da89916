//! HTTP 传输层 - 基础设施层
//!
//! 持有唯一的 reqwest::Client，只暴露"发请求"的能力

use reqwest::multipart::Form;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult, ConfigError, MALFORMED_RESPONSE_MESSAGE};

/// 请求体
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Form),
}

/// 请求选项
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// 查询参数
    pub query: Vec<(String, String)>,
    /// 相对服务根地址而不是 API 前缀
    pub from_server_root: bool,
}

impl RequestOptions {
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn server_root() -> Self {
        Self {
            from_server_root: true,
            ..Self::default()
        }
    }
}

/// 请求上下文，交给拦截器做诊断
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub url: String,
}

/// 已读完响应体的 2xx 响应
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    fn decode<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            warn!("⚠️ 响应解析失败 ({}): {}", endpoint, e);
            ApiError::Protocol {
                endpoint: endpoint.to_string(),
                message: MALFORMED_RESPONSE_MESSAGE.to_string(),
            }
        })
    }
}

/// 响应拦截点
///
/// 每个请求的结果（成功或失败）都经过这里一次，返回值原样交给调用方
pub trait ResponseInterceptor: Send + Sync {
    fn intercept(
        &self,
        ctx: &RequestContext,
        result: Result<RawResponse, ApiError>,
    ) -> Result<RawResponse, ApiError>;
}

/// 默认拦截器：失败时记录诊断信息，然后原样抛出
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

impl ResponseInterceptor for LoggingInterceptor {
    fn intercept(
        &self,
        ctx: &RequestContext,
        result: Result<RawResponse, ApiError>,
    ) -> Result<RawResponse, ApiError> {
        match &result {
            Ok(response) => debug!(
                "{} {} -> {} ({} 字节)",
                ctx.method,
                ctx.url,
                response.status,
                response.body.len()
            ),
            Err(e) => error!("API 请求错误: {} {}: {}", ctx.method, ctx.url, e),
        }
        result
    }
}

/// HTTP 传输层
///
/// - 基础路径、固定超时、同源 cookie 策略
/// - 把失败分类为 Transport / Server / Protocol，不做转换和重试
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    server_url: String,
    base_url: String,
    timeout: Duration,
    interceptor: Arc<dyn ResponseInterceptor>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|source| AppError::Config(ConfigError::ClientBuildFailed { source }))?;

        Ok(Self {
            client,
            server_url: config.server_url.trim_end_matches('/').to_string(),
            base_url: config.api_base_url(),
            timeout,
            interceptor: Arc::new(LoggingInterceptor),
        })
    }

    /// 替换拦截器（例如加入重试策略）
    pub fn with_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.interceptor = Arc::new(interceptor);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 拼接 API 地址，不发请求
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// 发送请求，返回读完响应体的 2xx 响应
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<RawResponse, ApiError> {
        let url = if options.from_server_root {
            join_url(&self.server_url, path)
        } else {
            self.url(path)
        };
        let ctx = RequestContext {
            method: method.clone(),
            url: url.clone(),
        };

        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, &url);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let result = match builder.send().await {
            Ok(response) => self.read_response(path, response).await,
            Err(e) => Err(self.transport_error(path, &e)),
        };

        self.interceptor.intercept(&ctx, result)
    }

    /// 发送请求并把响应体解析为指定类型
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.request(method, path, body, options).await?;
        response.decode(path)
    }

    async fn read_response(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<RawResponse, ApiError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(path, &e))?
            .to_vec();

        if status.is_success() {
            return Ok(RawResponse {
                status: status.as_u16(),
                body,
            });
        }

        Err(ApiError::Server {
            endpoint: path.to_string(),
            status: status.as_u16(),
            detail: extract_detail(&body),
            message: format!("Request failed with status code {}", status.as_u16()),
        })
    }

    fn transport_error(&self, path: &str, e: &reqwest::Error) -> ApiError {
        let timed_out = e.is_timeout();
        let message = if timed_out {
            format!("timeout of {}ms exceeded", self.timeout.as_millis())
        } else {
            e.to_string()
        };
        ApiError::Transport {
            endpoint: path.to_string(),
            message,
            timed_out,
        }
    }
}

/// 后端错误体为 `{"detail": "..."}`；校验错误时 detail 是数组，不当作结构化消息
fn extract_detail(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .map(str::to_string)
}

/// 把一个路径段做百分号编码，段内的 `/`、`?`、`#` 不会改变路由
pub fn encode_segment(segment: &str) -> String {
    let mut url = match Url::parse("http://localhost/") {
        Ok(url) => url,
        Err(_) => return segment.to_string(),
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}

fn join_url(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }
}
