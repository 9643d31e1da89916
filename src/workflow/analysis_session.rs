//! 分析会话 - 流程层
//!
//! 一个用户的一次完整使用：上传两个视频 → 开始分析 → 取结果
//!
//! 持有上传跟踪、任务客户端和结果获取三个服务，它们共享同一个传输层

use tracing::info;

use crate::clients::{HealthStatus, ServiceInfo, SystemApi};
use crate::config::Config;
use crate::error::{ApiFailure, AppResult, StartError};
use crate::infrastructure::HttpTransport;
use crate::services::{JobClient, ResultFetcher, UploadTracker};

pub struct AnalysisSession {
    uploads: UploadTracker,
    jobs: JobClient,
    results: ResultFetcher,
    system: SystemApi,
}

impl AnalysisSession {
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            uploads: UploadTracker::new(transport.clone()),
            jobs: JobClient::new(transport.clone()),
            results: ResultFetcher::new(transport.clone()),
            system: SystemApi::new(transport),
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self::new(HttpTransport::new(config)?))
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    pub fn uploads_mut(&mut self) -> &mut UploadTracker {
        &mut self.uploads
    }

    pub fn jobs(&self) -> &JobClient {
        &self.jobs
    }

    pub fn jobs_mut(&mut self) -> &mut JobClient {
        &mut self.jobs
    }

    pub fn results(&self) -> &ResultFetcher {
        &self.results
    }

    /// 两个视频都上传后才允许开始分析
    pub async fn start(&mut self, include_device_detection: bool) -> Result<String, StartError> {
        if !self.uploads.can_analyze() {
            return Err(StartError::NotReady {
                missing: self.uploads.state().missing_roles(),
            });
        }
        Ok(self.jobs.start(include_device_detection).await?)
    }

    /// 清空服务端分析记录，并把任务和上传状态都重置
    pub async fn clear(&mut self) -> Result<(), ApiFailure> {
        self.jobs.clear().await?;
        self.uploads.reset();
        info!("会话已重置");
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiFailure> {
        Ok(self.system.health().await?)
    }

    pub async fn service_info(&self) -> Result<ServiceInfo, ApiFailure> {
        Ok(self.system.service_info().await?)
    }
}
