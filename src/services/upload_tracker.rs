//! 上传跟踪服务 - 业务能力层
//!
//! 只负责"上传视频 + 对齐上传状态"能力，不关心分析流程

use tracing::{info, warn};

use crate::clients::UploadApi;
use crate::error::ApiFailure;
use crate::infrastructure::HttpTransport;
use crate::models::upload::{Role, UploadSlot, UploadState, UploadStatusResponse, VideoFile};

/// 上传跟踪服务
///
/// 职责：
/// - 上传老师 / 学生视频，成功后替换对应槽位
/// - 以后端为准同步上传状态（刷新页面、多标签页也能对齐）
/// - 失败时不修改任何槽位
pub struct UploadTracker {
    api: UploadApi,
    state: UploadState,
}

impl UploadTracker {
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            api: UploadApi::new(transport),
            state: UploadState::default(),
        }
    }

    /// 当前已知的上传状态
    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn can_analyze(&self) -> bool {
        self.state.can_analyze()
    }

    /// 上传某个角色的视频
    ///
    /// 文件大小和格式由后端校验
    pub async fn upload_file(
        &mut self,
        role: Role,
        file: &VideoFile,
    ) -> Result<UploadSlot, ApiFailure> {
        let response = self.api.upload(role, file).await.map_err(|e| {
            let failure = e.normalize();
            warn!("⚠️ {}视频上传失败: {}", role.label(), failure);
            failure
        })?;

        let slot = UploadSlot {
            role,
            filename: response.filename,
            size_bytes: response.size,
            preview_url: self.preview_url(role),
        };

        info!(
            "✓ {}视频上传成功: {} ({} 字节)",
            role.label(),
            slot.filename,
            slot.size_bytes
        );

        self.state.set_slot(slot.clone());
        Ok(slot)
    }

    /// 从后端读取上传状态并替换本地状态
    pub async fn get_status(&mut self) -> Result<UploadState, ApiFailure> {
        let status = self.api.status().await?;
        let state = self.reconcile(&status);
        self.state = state.clone();
        Ok(state)
    }

    /// 视频预览地址，不发请求
    pub fn preview_url(&self, role: Role) -> String {
        self.api.video_url(role)
    }

    /// 清空本地记录
    pub fn reset(&mut self) {
        self.state = UploadState::default();
    }

    fn reconcile(&self, status: &UploadStatusResponse) -> UploadState {
        let mut state = UploadState::default();

        for role in Role::ALL {
            if let Some(info) = status.files.get(role) {
                state.set_slot(UploadSlot {
                    role,
                    filename: info.filename.clone(),
                    size_bytes: info.size,
                    preview_url: self.preview_url(role),
                });
            }

            let reported = match role {
                Role::Teacher => status.teacher_uploaded,
                Role::Student => status.student_uploaded,
            };
            if reported != state.slot(role).is_some() {
                warn!(
                    "⚠️ 上传状态不一致: {}_uploaded={}，但文件信息{}",
                    role,
                    reported,
                    if state.slot(role).is_some() { "存在" } else { "缺失" }
                );
            }
        }

        if status.can_analyze != state.can_analyze() {
            warn!(
                "⚠️ 后端 can_analyze={} 与槽位推导结果 {} 不一致，以槽位为准",
                status.can_analyze,
                state.can_analyze()
            );
        }

        state
    }
}
