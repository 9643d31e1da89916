//! 进度观察器
//!
//! 检查后端返回的快照是否违反进度契约：运行中进度不应倒退，终态之后不应再变化。
//! 只记录异常，不阻止调用方继续使用快照，日志由持有者决定怎么打。

use std::fmt;

use crate::models::analysis::{AnalysisJob, JobStatus};

/// 服务端违反进度契约的情况
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressAnomaly {
    /// 运行中进度倒退
    Regressed {
        job_id: String,
        previous: u8,
        current: u8,
    },
    /// 已经结束的任务又返回了不同的状态
    LeftTerminal {
        job_id: String,
        terminal: JobStatus,
        observed: JobStatus,
    },
}

impl fmt::Display for ProgressAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressAnomaly::Regressed {
                job_id,
                previous,
                current,
            } => write!(f, "任务 {} 进度倒退: {}% -> {}%", job_id, previous, current),
            ProgressAnomaly::LeftTerminal {
                job_id,
                terminal,
                observed,
            } => write!(
                f,
                "任务 {} 已处于终态 {}，又返回了 {}",
                job_id,
                terminal.as_str(),
                observed.as_str()
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProgressMonitor {
    last: Option<AnalysisJob>,
    anomalies: Vec<ProgressAnomaly>,
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次快照，发现异常时返回它
    pub fn observe(&mut self, job: &AnalysisJob) -> Option<ProgressAnomaly> {
        let previous = self.last.as_ref().filter(|prev| prev.id == job.id);

        let anomaly = previous.and_then(|prev| {
            if prev.is_terminal() {
                (prev.status != job.status || prev.error_message != job.error_message).then(|| {
                    ProgressAnomaly::LeftTerminal {
                        job_id: job.id.clone(),
                        terminal: prev.status,
                        observed: job.status,
                    }
                })
            } else if job.status == JobStatus::Running
                && job.progress_percent < prev.progress_percent
            {
                Some(ProgressAnomaly::Regressed {
                    job_id: job.id.clone(),
                    previous: prev.progress_percent,
                    current: job.progress_percent,
                })
            } else {
                None
            }
        });

        // 终态快照一旦记录就作为后续比较的基准
        let keep_terminal = previous.map(|prev| prev.is_terminal()).unwrap_or(false);
        if !keep_terminal {
            self.last = Some(job.clone());
        }

        if let Some(anomaly) = &anomaly {
            self.anomalies.push(anomaly.clone());
        }
        anomaly
    }

    pub fn anomalies(&self) -> &[ProgressAnomaly] {
        &self.anomalies
    }

    pub fn into_anomalies(self) -> Vec<ProgressAnomaly> {
        self.anomalies
    }
}
