//! Data models for StaffPortal entities.
//!
//! - `UserIdentity` and the login/verify payloads
//! - `Job` with status classification and search
//! - `Element`, `JobElement`, `ElementUpdate` with status/phase helpers
//! - `DashboardStats`, `Activity`

pub mod dashboard;
pub mod element;
pub mod job;
pub mod user;

pub use dashboard::{Activity, Dashboard, DashboardStats, RECENT_ACTIVITY_LIMIT};
pub use element::{Element, ElementPhase, ElementStatus, ElementUpdate, JobElement};
pub use job::{filter_jobs, Job, JobStatus};
pub use user::{LoginRequest, LoginResponse, UserIdentity, VerifyResponse};
