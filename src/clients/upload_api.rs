/// 上传 API 客户端
///
/// 封装 `/upload/*` 路由的调用，返回原始的线上结构
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::debug;

use crate::error::ApiError;
use crate::infrastructure::{HttpTransport, RequestBody, RequestOptions};
use crate::models::upload::{Role, UploadResponse, UploadStatusResponse, VideoFile};

pub struct UploadApi {
    transport: HttpTransport,
}

impl UploadApi {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// 上传某个角色的视频，multipart 字段名为 `file`
    pub async fn upload(&self, role: Role, file: &VideoFile) -> Result<UploadResponse, ApiError> {
        debug!("上传 {} 视频: {} ({} 字节)", role, file.filename, file.len());

        let part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
        let form = Form::new().part("file", part);

        self.transport
            .request_json(
                Method::POST,
                &format!("/upload/{}", role),
                RequestBody::Multipart(form),
                RequestOptions::default(),
            )
            .await
    }

    /// 查询上传状态
    pub async fn status(&self) -> Result<UploadStatusResponse, ApiError> {
        self.transport
            .request_json(
                Method::GET,
                "/upload/status",
                RequestBody::Empty,
                RequestOptions::default(),
            )
            .await
    }

    /// 视频预览地址
    pub fn video_url(&self, role: Role) -> String {
        self.transport.url(&format!("/upload/videos/{}", role))
    }
}
