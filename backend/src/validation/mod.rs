//! Request body validation: `validator` derives plus the custom rules the
//! session and scan DTOs share.

pub mod rules;

pub use validator::Validate;
