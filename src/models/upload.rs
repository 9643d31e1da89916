use serde::{Deserialize, Serialize};
use std::fmt;

/// 视频角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Teacher, Role::Student];

    /// 路径和线上字段里使用的名字
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    /// 展示用名称
    pub fn label(&self) -> &'static str {
        match self {
            Role::Teacher => "老师示范",
            Role::Student => "学生操作",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 待上传的视频文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl VideoFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 某个角色已上传成功的文件记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSlot {
    pub role: Role,
    pub filename: String,
    pub size_bytes: u64,
    pub preview_url: String,
}

/// 上传状态
///
/// `can_analyze` 每次都从槽位推导，不单独存储
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadState {
    pub teacher: Option<UploadSlot>,
    pub student: Option<UploadSlot>,
}

impl UploadState {
    pub fn slot(&self, role: Role) -> Option<&UploadSlot> {
        match role {
            Role::Teacher => self.teacher.as_ref(),
            Role::Student => self.student.as_ref(),
        }
    }

    pub(crate) fn set_slot(&mut self, slot: UploadSlot) {
        match slot.role {
            Role::Teacher => self.teacher = Some(slot),
            Role::Student => self.student = Some(slot),
        }
    }

    pub fn can_analyze(&self) -> bool {
        self.teacher.is_some() && self.student.is_some()
    }

    /// 尚未上传的角色
    pub fn missing_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.slot(*role).is_none())
            .collect()
    }
}

// ========== 线上结构 ==========

/// `POST /upload/{role}` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub filename: String,
    pub size: u64,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// `GET /upload/status` 的响应
#[derive(Debug, Clone, Deserialize)]
pub struct UploadStatusResponse {
    pub teacher_uploaded: bool,
    pub student_uploaded: bool,
    pub can_analyze: bool,
    #[serde(default)]
    pub files: UploadedFiles,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadedFiles {
    #[serde(default)]
    pub teacher: Option<FileInfo>,
    #[serde(default)]
    pub student: Option<FileInfo>,
}

impl UploadedFiles {
    pub fn get(&self, role: Role) -> Option<&FileInfo> {
        match role {
            Role::Teacher => self.teacher.as_ref(),
            Role::Student => self.student.as_ref(),
        }
    }
}

/// 服务端记录的文件信息
#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    #[serde(default)]
    pub filepath: String,
    pub size: u64,
}
