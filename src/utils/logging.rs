/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::analysis::{AnalysisJob, AnalysisResult};
use crate::services::ScreenshotAsset;
use crate::workflow::PollReport;

/// 初始化 tracing
///
/// 优先使用 `RUST_LOG`，否则根据 `verbose` 选择 debug / info；重复调用不会 panic
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> std::io::Result<()> {
    let log_header = format!(
        "{}\n视频分析日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
}

/// 向日志文件追加一行，带时间戳
pub fn append_log_line(log_file_path: &str, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        line
    )
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 视频分析客户端");
    info!("🌐 后端地址: {}", config.api_base_url());
    info!("⏱️ 轮询间隔: {} 毫秒", config.poll_interval_ms);
    info!("{}", "=".repeat(60));
}

/// 记录一次进度快照
pub fn log_progress(job: &AnalysisJob) {
    info!(
        "⏳ [{}] {:>3}% {}",
        job.status.as_str(),
        job.progress_percent,
        truncate_text(&job.current_step_label, 60)
    );
}

/// 记录轮询统计
pub fn log_poll_report(report: &PollReport) {
    info!("📊 共轮询 {} 次", report.attempts);
    for anomaly in &report.anomalies {
        warn!("⚠️ {}", anomaly);
    }
}

/// 打印分析结果摘要
///
/// # 参数
/// - `result`: 分析结果
/// - `screenshots`: 截图地址列表
pub fn print_result_summary(result: &AnalysisResult, screenshots: &[ScreenshotAsset<'_>]) {
    info!("\n{}", "=".repeat(60));
    info!("📊 分析结果");
    info!("分析时间: {}", result.analysis_time);
    info!("分析类型: {}", result.analysis_type);
    info!("{}", "=".repeat(60));

    info!(
        "👩‍🏫 {}: {} 步 - {}",
        result.teacher_analysis.video_type,
        result.teacher_analysis.steps.len(),
        truncate_text(&result.teacher_analysis.analysis_summary, 60)
    );
    for step in &result.teacher_analysis.steps {
        info!(
            "  {}. [{}] {}",
            step.step_id,
            step.time_str,
            truncate_text(&step.step_name, 40)
        );
    }

    info!(
        "🧑‍🎓 {}: {} 步 - {}",
        result.student_analysis.video_type,
        result.student_analysis.steps.len(),
        truncate_text(&result.student_analysis.analysis_summary, 60)
    );
    for step in &result.student_analysis.steps {
        info!(
            "  {}. [{}] {} (置信度: {:.2})",
            step.step.step_id,
            step.step.time_str,
            truncate_text(&step.step.step_name, 40),
            step.confidence
        );
    }

    if let Some(detection) = &result.device_detection {
        info!(
            "🔬 设备检测: {} | 检测率: {:.1}% | 组件数: {}",
            if detection.enabled { "已启用" } else { "未启用" },
            detection.detection_rate * 100.0,
            detection.components_detected
        );
    }

    info!("🖼️ 截图 {} 张", screenshots.len());
    for shot in screenshots {
        info!(
            "  {} - {}",
            shot.url,
            truncate_text(&shot.explanation.explanation, 40)
        );
    }

    if let Some(error) = &result.error {
        warn!("⚠️ 后端返回了降级结果: {}", error);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
