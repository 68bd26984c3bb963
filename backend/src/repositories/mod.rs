pub mod attendance;
pub mod memory;
pub mod session;

pub use attendance::{AttendanceRepository, PgAttendanceRepository};
pub use memory::{InMemoryAttendanceRepository, InMemorySessionRepository};
pub use session::{PgSessionRepository, SessionRepository};
