use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::UNKNOWN_ERROR_MESSAGE;

/// 分析任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Error,
}

impl JobStatus {
    /// completed / error 之后不会再有任何状态变化
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

/// 客户端看到的分析任务快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisJob {
    pub id: String,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub current_step_label: String,
    pub include_device_detection: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl AnalysisJob {
    /// 刚启动时的初始快照
    pub fn started(id: impl Into<String>, include_device_detection: bool) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Running,
            progress_percent: 0,
            current_step_label: String::new(),
            include_device_detection,
            created_at: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 由进度响应构建快照
    ///
    /// error 状态下一定带有错误消息：优先 `error`，其次 `current_step`
    pub fn from_progress(id: impl Into<String>, progress: ProgressResponse) -> Result<Self, String> {
        if progress.progress > 100 {
            return Err(format!("progress 超出范围: {}", progress.progress));
        }

        let error_message = match progress.status {
            JobStatus::Error => Some(
                progress
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .or_else(|| Some(progress.current_step.clone()).filter(|s| !s.trim().is_empty()))
                    .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            ),
            _ => progress.error.filter(|e| !e.trim().is_empty()),
        };

        Ok(Self {
            id: id.into(),
            status: progress.status,
            progress_percent: progress.progress as u8,
            current_step_label: progress.current_step,
            include_device_detection: progress.include_device_detection,
            created_at: progress.created_at,
            error_message,
        })
    }
}

/// 客户端状态机
#[derive(Debug, Clone, PartialEq)]
pub enum JobState<'a> {
    Idle,
    Running(&'a AnalysisJob),
    Completed(&'a AnalysisJob),
    Error(&'a AnalysisJob),
}

impl<'a> JobState<'a> {
    pub fn of(job: Option<&'a AnalysisJob>) -> Self {
        match job {
            None => JobState::Idle,
            Some(job) => match job.status {
                JobStatus::Running => JobState::Running(job),
                JobStatus::Completed => JobState::Completed(job),
                JobStatus::Error => JobState::Error(job),
            },
        }
    }

    pub fn job(&self) -> Option<&'a AnalysisJob> {
        match self {
            JobState::Idle => None,
            JobState::Running(job) | JobState::Completed(job) | JobState::Error(job) => Some(job),
        }
    }
}

// ========== 线上结构 ==========

/// `POST /analysis/start` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub success: bool,
    pub analysis_id: String,
    #[serde(default)]
    pub message: String,
}

/// `GET /analysis/progress/{id}` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressResponse {
    pub status: JobStatus,
    pub progress: u32,
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub include_device_detection: bool,
    #[serde(default, deserialize_with = "deserialize_created_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /analysis/list` 的响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisList {
    #[serde(default)]
    pub analyses: Vec<String>,
    #[serde(default)]
    pub count: usize,
}

/// `DELETE /analysis/clear` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct ClearResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// 老师步骤：契约上不带置信度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    pub step_id: u32,
    #[serde(default)]
    pub step_name: String,
    pub timestamp: f64,
    #[serde(default)]
    pub time_str: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub formatted_output: String,
}

/// 学生步骤：必须带置信度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentStep {
    #[serde(flatten)]
    pub step: StepData,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAnalysis<S> {
    #[serde(default)]
    pub video_type: String,
    #[serde(default)]
    pub total_steps_identified: usize,
    #[serde(default)]
    pub analysis_summary: String,
    #[serde(default = "Vec::new")]
    pub steps: Vec<S>,
}

pub type TeacherAnalysis = RoleAnalysis<StepData>;
pub type StudentAnalysis = RoleAnalysis<StudentStep>;

/// 截图解释
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotExplanation {
    #[serde(rename = "type")]
    pub kind: String,
    pub step_id: u32,
    #[serde(default)]
    pub step_name: String,
    pub timestamp: f64,
    #[serde(default)]
    pub time_str: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideosAnalyzed {
    pub teacher_video: String,
    pub student_video: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFormatExample {
    pub description: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDetection {
    pub enabled: bool,
    #[serde(default)]
    pub detection_rate: f64,
    #[serde(default)]
    pub components_detected: u32,
}

/// 完整分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub analysis_time: String,
    #[serde(default)]
    pub analysis_type: String,
    pub videos_analyzed: VideosAnalyzed,
    pub teacher_analysis: TeacherAnalysis,
    pub student_analysis: StudentAnalysis,
    #[serde(default)]
    pub screenshot_explanations: BTreeMap<String, ScreenshotExplanation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format_example: Option<OutputFormatExample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_detection: Option<DeviceDetection>,
    /// 后端分析失败时返回的降级结果会带上这两个字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl AnalysisResult {
    /// 是否是后端的降级结果
    pub fn is_degraded(&self) -> bool {
        self.error.is_some() || self.success == Some(false)
    }
}

/// `created_at` 可能是空字符串、RFC3339 或不带时区的时间
fn deserialize_created_at<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(None),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, fmt) {
            return Ok(Some(naive.and_utc()));
        }
    }
    Err(serde::de::Error::custom(format!(
        "无法解析 created_at: {}",
        raw
    )))
}
