pub mod analysis_session;
pub mod poll_driver;

pub use analysis_session::AnalysisSession;
pub use poll_driver::{PollDriver, PollOutcome, PollReport, ProgressSource};
pub use tokio_util::sync::CancellationToken;
