//! # Video Analyzer Client
//!
//! 视频上传与分析任务的客户端：上传老师示范 / 学生操作两个视频，
//! 触发后端分析任务，轮询直到出结果（分步描述 + 截图）
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有唯一的 HTTP 客户端，只暴露"发请求"能力
//! - `HttpTransport` - 基础路径、超时、响应拦截点
//!
//! ### ② API 客户端（Clients）
//! - `clients/` - 每个后端路由一个薄封装，返回线上结构和原始 `ApiError`
//!
//! ### ③ 业务能力层（Services）
//! - `UploadTracker` - 上传视频、对齐上传状态
//! - `JobClient` - 开始 / 查询 / 清空分析任务，只跟踪一个任务
//! - `ResultFetcher` - 获取结果、截图地址
//!
//! ### ④ 流程层（Workflow）
//! - `PollDriver` - 轮询节奏、取消、进度异常检查
//! - `AnalysisSession` - 一个用户的完整会话
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator::App` - 命令行一次完整运行
//!
//! 所有对外的失败都经过 `ApiError::normalize` 变成 `ApiFailure`

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{normalize, ApiError, ApiFailure, AppError, AppResult, FailureKind, StartError};
pub use infrastructure::HttpTransport;
pub use models::{
    AnalysisJob, AnalysisResult, JobState, JobStatus, Role, UploadSlot, UploadState, VideoFile,
};
pub use orchestrator::App;
pub use services::{JobClient, ProgressAnomaly, ResultFetcher, UploadTracker};
pub use workflow::{AnalysisSession, CancellationToken, PollDriver, PollOutcome, PollReport};
