pub mod job_client;
pub mod progress_monitor;
pub mod result_fetcher;
pub mod upload_tracker;

pub use job_client::JobClient;
pub use progress_monitor::{ProgressAnomaly, ProgressMonitor};
pub use result_fetcher::{ResultFetcher, ScreenshotAsset};
pub use upload_tracker::UploadTracker;
