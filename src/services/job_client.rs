//! 分析任务客户端 - 业务能力层
//!
//! 状态机：`Idle → Running → {Completed, Error}`
//!
//! 同一时间只跟踪一个任务。轮询节奏由调用方决定（见 `workflow::poll_driver`），
//! 这里每个操作都只是一次请求/响应。

use tracing::{debug, info, warn};

use crate::clients::AnalysisApi;
use crate::error::{ApiError, ApiFailure, StartError, MALFORMED_RESPONSE_MESSAGE};
use crate::infrastructure::HttpTransport;
use crate::models::analysis::{AnalysisJob, AnalysisList, JobState};
use crate::services::progress_monitor::{ProgressAnomaly, ProgressMonitor};

pub struct JobClient {
    api: AnalysisApi,
    tracked: Option<AnalysisJob>,
    monitor: ProgressMonitor,
}

impl JobClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            api: AnalysisApi::new(transport),
            tracked: None,
            monitor: ProgressMonitor::new(),
        }
    }

    pub fn state(&self) -> JobState<'_> {
        JobState::of(self.tracked.as_ref())
    }

    /// 当前跟踪的任务快照
    pub fn tracked_job(&self) -> Option<&AnalysisJob> {
        self.tracked.as_ref()
    }

    /// 跟踪任务上观察到的进度异常（倒退、终态翻转），清空后重新计数
    pub fn anomalies(&self) -> &[ProgressAnomaly] {
        self.monitor.anomalies()
    }

    pub fn tracked_id(&self) -> Option<&str> {
        self.tracked.as_ref().map(|job| job.id.as_str())
    }

    /// 开始分析，返回后端分配的任务 ID
    ///
    /// 运行中再次调用会开始跟踪新任务；旧任务不会在服务端取消，只是客户端不再观察它
    pub async fn start(&mut self, include_device_detection: bool) -> Result<String, ApiFailure> {
        let response = self.api.start(include_device_detection).await?;

        if let JobState::Running(previous) = self.state() {
            warn!(
                "⚠️ 任务 {} 仍在运行，开始跟踪新任务后将不再观察它",
                previous.id
            );
        }

        info!(
            "🚀 分析已开始: {} (设备检测: {})",
            response.analysis_id, include_device_detection
        );

        let job = AnalysisJob::started(response.analysis_id.clone(), include_device_detection);
        self.monitor.observe(&job);
        self.tracked = Some(job);
        Ok(response.analysis_id)
    }

    /// 与 [`start`](Self::start) 相同，但运行中拒绝启动新任务
    pub async fn start_guarded(
        &mut self,
        include_device_detection: bool,
    ) -> Result<String, StartError> {
        if let JobState::Running(job) = self.state() {
            return Err(StartError::AlreadyRunning {
                job_id: job.id.clone(),
            });
        }
        Ok(self.start(include_device_detection).await?)
    }

    /// 查询一次任务进度
    ///
    /// 如果是当前跟踪的任务且尚未结束，同步更新跟踪快照；已结束的快照不再改变
    pub async fn poll_progress(&mut self, job_id: &str) -> Result<AnalysisJob, ApiFailure> {
        let progress = self.api.progress(job_id).await?;
        let job = AnalysisJob::from_progress(job_id, progress).map_err(|detail| {
            warn!("⚠️ 任务 {} 进度响应异常: {}", job_id, detail);
            ApiError::Protocol {
                endpoint: format!("/analysis/progress/{}", job_id),
                message: MALFORMED_RESPONSE_MESSAGE.to_string(),
            }
            .normalize()
        })?;

        debug!(
            "任务 {} 进度: {}% [{}] {}",
            job.id,
            job.progress_percent,
            job.status.as_str(),
            job.current_step_label
        );

        if let Some(tracked) = self.tracked.as_mut().filter(|t| t.id == job_id) {
            if let Some(anomaly) = self.monitor.observe(&job) {
                warn!("⚠️ 服务端进度异常: {}", anomaly);
            }
            if !tracked.is_terminal() {
                *tracked = job.clone();
            }
        }

        Ok(job)
    }

    /// 获取分析列表
    pub async fn list(&self) -> Result<AnalysisList, ApiFailure> {
        Ok(self.api.list().await?)
    }

    /// 清空服务端所有分析记录，成功后回到 Idle
    pub async fn clear(&mut self) -> Result<(), ApiFailure> {
        let response = self.api.clear().await?;
        self.tracked = None;
        self.monitor = ProgressMonitor::new();
        info!("🧹 {}", response.message);
        Ok(())
    }
}
