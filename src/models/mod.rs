pub mod analysis;
pub mod loaders;
pub mod upload;

pub use analysis::{
    AnalysisJob, AnalysisList, AnalysisResult, DeviceDetection, JobState, JobStatus,
    ScreenshotExplanation, StepData, StudentStep,
};
pub use loaders::load_video_file;
pub use upload::{Role, UploadSlot, UploadState, VideoFile};
