//! 结果获取服务 - 业务能力层
//!
//! 只负责"取结果"能力：不检查任务状态，调用方保证任务已完成

use serde_json::Value;
use tracing::info;

use crate::clients::AnalysisApi;
use crate::error::ApiFailure;
use crate::infrastructure::HttpTransport;
use crate::models::analysis::{AnalysisJob, AnalysisResult, JobStatus, ScreenshotExplanation};

/// 截图文件、地址及其解释
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotAsset<'a> {
    pub filename: &'a str,
    pub url: String,
    pub explanation: &'a ScreenshotExplanation,
}

pub struct ResultFetcher {
    api: AnalysisApi,
}

impl ResultFetcher {
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            api: AnalysisApi::new(transport),
        }
    }

    /// 获取分析结果
    pub async fn get_result(&self, job_id: &str) -> Result<AnalysisResult, ApiFailure> {
        let result = self.api.results(job_id).await?;
        info!(
            "✓ 已获取分析结果: 老师 {} 步 / 学生 {} 步 / 截图 {} 张",
            result.teacher_analysis.steps.len(),
            result.student_analysis.steps.len(),
            result.screenshot_explanations.len()
        );
        Ok(result)
    }

    /// 获取已完成任务的结果
    ///
    /// # Panics
    /// 任务状态不是 completed 时 panic：这是调用方的编程错误
    pub async fn get_completed_result(
        &self,
        job: &AnalysisJob,
    ) -> Result<AnalysisResult, ApiFailure> {
        assert_eq!(
            job.status,
            JobStatus::Completed,
            "任务 {} 尚未完成，不能获取结果",
            job.id
        );
        self.get_result(&job.id).await
    }

    /// 获取报告 JSON
    pub async fn get_report(&self, filename: &str) -> Result<Value, ApiFailure> {
        Ok(self.api.report(filename).await?)
    }

    pub fn screenshot_url(&self, filename: &str) -> String {
        self.api.screenshot_url(filename)
    }

    pub fn image_url(&self, filename: &str) -> String {
        self.api.image_url(filename)
    }

    /// 结果中每张截图的地址和解释，按文件名排序
    pub fn screenshots<'a>(&self, result: &'a AnalysisResult) -> Vec<ScreenshotAsset<'a>> {
        result
            .screenshot_explanations
            .iter()
            .map(|(filename, explanation)| ScreenshotAsset {
                filename,
                url: self.screenshot_url(filename),
                explanation,
            })
            .collect()
    }
}
