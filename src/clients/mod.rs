pub mod analysis_api;
pub mod system_api;
pub mod upload_api;

pub use analysis_api::AnalysisApi;
pub use system_api::{HealthStatus, ServiceInfo, SystemApi};
pub use upload_api::UploadApi;
