use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::upload::VideoFile;

/// 从本地路径读取视频文件，文件名取路径最后一段
pub async fn load_video_file(path: &Path) -> AppResult<VideoFile> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    debug!("已读取视频文件: {} ({} 字节)", filename, bytes.len());

    Ok(VideoFile::new(filename, bytes))
}
