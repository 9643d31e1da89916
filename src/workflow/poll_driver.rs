//! 进度轮询驱动 - 流程层
//!
//! 核心职责：决定"什么时候再问一次"
//!
//! - 立即轮询一次，之后按固定间隔轮询
//! - 遇到 completed / error 立即停止
//! - 支持调用方取消（页面关闭、用户离开），也支持可选的最大次数
//! - 轮询失败不重试，直接把 ApiFailure 交回调用方
//! - 每个快照都交给 [`ProgressMonitor`] 检查进度倒退和终态翻转，结果放进 [`PollReport`]

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ApiFailure;
use crate::models::analysis::{AnalysisJob, JobStatus};
use crate::services::{JobClient, ProgressAnomaly, ProgressMonitor};

/// 能够查询任务进度的对象
#[allow(async_fn_in_trait)]
pub trait ProgressSource {
    async fn poll_progress(&mut self, job_id: &str) -> Result<AnalysisJob, ApiFailure>;
}

impl ProgressSource for JobClient {
    async fn poll_progress(&mut self, job_id: &str) -> Result<AnalysisJob, ApiFailure> {
        JobClient::poll_progress(self, job_id).await
    }
}

/// 轮询结束的原因
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(AnalysisJob),
    Failed(AnalysisJob),
    Cancelled { last: Option<AnalysisJob> },
    GaveUp { last: Option<AnalysisJob> },
}

impl PollOutcome {
    pub fn last_job(&self) -> Option<&AnalysisJob> {
        match self {
            PollOutcome::Completed(job) | PollOutcome::Failed(job) => Some(job),
            PollOutcome::Cancelled { last } | PollOutcome::GaveUp { last } => last.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// 实际完成的轮询次数
    pub attempts: usize,
    pub anomalies: Vec<ProgressAnomaly>,
}

/// 轮询驱动
#[derive(Debug, Clone)]
pub struct PollDriver {
    interval: Duration,
    max_attempts: Option<usize>,
}

impl Default for PollDriver {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl PollDriver {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_poll_attempts,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// 轮询直到终态、取消或达到最大次数
    ///
    /// `on_update` 在每个快照到达时调用一次（UI 刷新、日志等）
    pub async fn run<S, F>(
        &self,
        source: &mut S,
        job_id: &str,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<PollReport, ApiFailure>
    where
        S: ProgressSource,
        F: FnMut(&AnalysisJob),
    {
        let mut monitor = ProgressMonitor::new();
        let mut attempts = 0usize;
        let mut last: Option<AnalysisJob> = None;

        let outcome = loop {
            if cancel.is_cancelled() {
                break PollOutcome::Cancelled { last };
            }
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                warn!("⚠️ 任务 {} 已轮询 {} 次仍未结束，停止轮询", job_id, attempts);
                break PollOutcome::GaveUp { last };
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = source.poll_progress(job_id) => Some(result),
            };
            let job = match polled {
                None => break PollOutcome::Cancelled { last },
                Some(result) => result?,
            };

            attempts += 1;
            if let Some(anomaly) = monitor.observe(&job) {
                debug!("第 {} 次轮询发现进度异常: {}", attempts, anomaly);
            }
            on_update(&job);

            match job.status {
                JobStatus::Completed => break PollOutcome::Completed(job),
                JobStatus::Error => break PollOutcome::Failed(job),
                JobStatus::Running => last = Some(job),
            }

            debug!("{} 毫秒后再次查询任务 {}", self.interval.as_millis(), job_id);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break PollOutcome::Cancelled { last },
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        if matches!(outcome, PollOutcome::Cancelled { .. }) {
            info!("⏹️ 已取消任务 {} 的轮询 (已轮询 {} 次)", job_id, attempts);
        }

        Ok(PollReport {
            outcome,
            attempts,
            anomalies: monitor.into_anomalies(),
        })
    }
}
