pub mod id;

pub use id::{AttendanceId, SessionId};
