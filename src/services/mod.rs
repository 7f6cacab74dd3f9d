pub mod polling;
pub mod report_service;

pub use polling::{
    poll_until_terminal, AiAnalysisProbe, PollFailure, PollHandle, PollOptions, PollPhase,
    Poller, ReportStatusProbe, StatusProbe,
};
pub use report_service::{AiAnalysisOutcome, ReportService, WaitResult};
