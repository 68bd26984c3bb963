//! Data models shared across storage and API handlers.

pub mod attendance;
pub mod attendance_session;
pub mod qr_payload;
pub mod scan;
pub mod session;
pub mod user;
