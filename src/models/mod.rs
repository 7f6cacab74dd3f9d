pub mod exam;
pub mod report;
pub mod roster;
pub mod score;

pub use exam::{Exam, ExamCreate, ExamDetail, ExamStatus, ExamSubject};
pub use report::{
    AiAnalysisStatus, AiSubmissionAccepted, AnalysisReport, AnalysisScope, AnalysisSubmission,
    ComparisonAccepted, ComparisonRequest, ReportPage, ReportQuery, ReportStatus, ReportType, ScopeLevel,
    SubmissionAccepted,
};
pub use roster::{
    Class, ClassCreate, ClassNode, ClassUpdate, Grade, GradeCreate, GradeTree, GradeUpdate,
    PerformanceHistory, PerformanceRecord, Student, StudentBatchClassUpdate,
    StudentBatchStatusUpdate, StudentCreate, StudentDetail, StudentUpdate,
};
pub use score::{MessageResponse, ScoresBatch, SingleScoreUpdate, StudentScores};
