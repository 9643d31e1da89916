//! 命令行应用 - 编排层
//!
//! 一次运行处理一对视频，不做并发分析

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{load_video_file, Role};
use crate::utils::logging::{
    append_log_line, init_log_file, log_poll_report, log_progress, log_startup,
    print_result_summary,
};
use crate::workflow::{AnalysisSession, CancellationToken, PollDriver, PollOutcome};

/// 应用主结构
pub struct App {
    config: Config,
    session: AnalysisSession,
    driver: PollDriver,
    cancel: CancellationToken,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)
            .with_context(|| format!("无法创建日志文件: {}", config.output_log_file))?;

        log_startup(&config);

        let session = AnalysisSession::from_config(&config)?;

        if config.check_health {
            let health = session
                .health()
                .await
                .map_err(|e| anyhow!("后端不可用: {}", e))?;
            if !health.is_healthy() {
                warn!("⚠️ 后端健康检查返回: {}", health.status);
            } else {
                info!("✓ 后端服务正常");
            }
        }

        Ok(Self {
            driver: PollDriver::from_config(&config),
            config,
            session,
            cancel: CancellationToken::new(),
        })
    }

    /// 取消令牌，外部（如 Ctrl-C）可用它停止轮询
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<()> {
        self.upload_videos().await?;

        let state = self
            .session
            .uploads_mut()
            .get_status()
            .await
            .map_err(|e| anyhow!("获取上传状态失败: {}", e))?;
        info!(
            "📋 上传状态: 老师 {} / 学生 {}",
            if state.teacher.is_some() { "✓" } else { "✗" },
            if state.student.is_some() { "✓" } else { "✗" }
        );

        let job_id = self
            .session
            .start(self.config.include_device_detection)
            .await
            .map_err(|e| anyhow!("开始分析失败: {}", e))?;

        let report = self
            .driver
            .run(self.session.jobs_mut(), &job_id, &self.cancel, log_progress)
            .await
            .map_err(|e| anyhow!("查询分析进度失败: {}", e))?;
        log_poll_report(&report);

        match report.outcome {
            PollOutcome::Completed(job) => {
                let result = self
                    .session
                    .results()
                    .get_completed_result(&job)
                    .await
                    .map_err(|e| anyhow!("获取分析结果失败: {}", e))?;
                let screenshots = self.session.results().screenshots(&result);
                print_result_summary(&result, &screenshots);
                self.record(&format!("任务 {}: completed", job.id));
                info!("\n日志已保存至: {}", self.config.output_log_file);
                Ok(())
            }
            PollOutcome::Failed(job) => {
                let message = job
                    .error_message
                    .unwrap_or_else(|| crate::error::UNKNOWN_ERROR_MESSAGE.to_string());
                error!("❌ 分析失败: {}", message);
                self.record(&format!("任务 {}: error - {}", job.id, message));
                bail!("分析失败: {}", message)
            }
            PollOutcome::Cancelled { last } => {
                warn!(
                    "⏹️ 已停止等待任务 {}（最后进度: {}%），服务端任务不会被取消",
                    job_id,
                    last.map(|j| j.progress_percent).unwrap_or(0)
                );
                self.record(&format!("任务 {}: cancelled", job_id));
                Ok(())
            }
            PollOutcome::GaveUp { .. } => {
                self.record(&format!("任务 {}: gave up", job_id));
                bail!("任务 {} 在 {} 次轮询后仍未结束", job_id, report.attempts)
            }
        }
    }

    async fn upload_videos(&mut self) -> Result<()> {
        let paths = [
            (Role::Teacher, self.config.teacher_video_path.clone()),
            (Role::Student, self.config.student_video_path.clone()),
        ];

        for (role, path) in paths {
            info!("📤 正在上传{}视频: {}", role.label(), path);
            let video = load_video_file(Path::new(&path)).await?;
            self.session
                .uploads_mut()
                .upload_file(role, &video)
                .await
                .map_err(|e| anyhow!("{}视频上传失败: {}", role.label(), e))?;
        }
        Ok(())
    }

    fn record(&self, line: &str) {
        if let Err(e) = append_log_line(&self.config.output_log_file, line) {
            warn!("⚠️ 写入日志文件失败: {}", e);
        }
    }
}
