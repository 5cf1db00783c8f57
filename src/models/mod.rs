//! Data models for the college records service.
//!
//! These models match the admin console's TypeScript interfaces so the same JSON
//! flows through the server, the HTTP client and the roster store.

mod filter;
mod student;

pub use filter::*;
pub use student::*;
