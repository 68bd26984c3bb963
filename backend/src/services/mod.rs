pub mod attendance;
pub mod codec;
pub mod geo;
pub mod issuer;
pub mod recorder;
pub mod reports;
pub mod roll;
pub mod validator;

pub use attendance::ScanService;
pub use issuer::{IssueSession, SessionIssuer};
pub use recorder::AttendanceRecorder;
pub use reports::ReportService;
pub use roll::RollService;
pub use validator::{ScanValidator, ValidatedScan};
