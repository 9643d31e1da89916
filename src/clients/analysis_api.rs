/// 分析 API 客户端
///
/// 封装 `/analysis/*` 路由的调用，返回原始的线上结构
use reqwest::Method;
use serde_json::Value;

use crate::error::ApiError;
use crate::infrastructure::{encode_segment, HttpTransport, RequestBody, RequestOptions};
use crate::models::analysis::{
    AnalysisList, AnalysisResult, ClearResponse, ProgressResponse, StartResponse,
};

pub struct AnalysisApi {
    transport: HttpTransport,
}

impl AnalysisApi {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// 开始分析
    pub async fn start(&self, include_device_detection: bool) -> Result<StartResponse, ApiError> {
        self.transport
            .request_json(
                Method::POST,
                "/analysis/start",
                RequestBody::Empty,
                RequestOptions::default().query("include_device_detection", include_device_detection),
            )
            .await
    }

    /// 获取分析进度
    pub async fn progress(&self, analysis_id: &str) -> Result<ProgressResponse, ApiError> {
        self.get(&format!("/analysis/progress/{}", encode_segment(analysis_id))).await
    }

    /// 获取分析结果
    pub async fn results(&self, analysis_id: &str) -> Result<AnalysisResult, ApiError> {
        self.get(&format!("/analysis/results/{}", encode_segment(analysis_id))).await
    }

    /// 获取报告 JSON，结构由后端决定
    pub async fn report(&self, filename: &str) -> Result<Value, ApiError> {
        self.get(&format!("/analysis/reports/{}", encode_segment(filename))).await
    }

    /// 获取分析列表
    pub async fn list(&self) -> Result<AnalysisList, ApiError> {
        self.get("/analysis/list").await
    }

    /// 清空分析
    pub async fn clear(&self) -> Result<ClearResponse, ApiError> {
        self.transport
            .request_json(
                Method::DELETE,
                "/analysis/clear",
                RequestBody::Empty,
                RequestOptions::default(),
            )
            .await
    }

    pub fn screenshot_url(&self, filename: &str) -> String {
        self.transport
            .url(&format!("/analysis/screenshots/{}", encode_segment(filename)))
    }

    pub fn image_url(&self, filename: &str) -> String {
        self.transport.url(&format!("/analysis/images/{}", encode_segment(filename)))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.transport
            .request_json(Method::GET, path, RequestBody::Empty, RequestOptions::default())
            .await
    }
}
