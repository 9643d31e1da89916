//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 把一次完整的分析串起来：读取本地视频 → 上传 → 开始分析 → 轮询 → 取结果 → 输出摘要。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (命令行一次运行)
//!     ↓
//! workflow (AnalysisSession / PollDriver)
//!     ↓
//! services (能力层：upload / job / result)
//!     ↓
//! clients (每个后端路由一个薄封装)
//!     ↓
//! infrastructure (基础设施：HttpTransport)
//! ```
//!
//! 失败只向用户展示归一化后的消息，传输细节只进日志。

pub mod app;

pub use app::App;
