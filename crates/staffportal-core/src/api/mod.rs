//! REST API client module for the StaffPortal backend.
//!
//! This module provides the `ApiClient` for job, element and dashboard
//! endpoints, plus the login and verify calls used by the session.
//!
//! The API uses bearer token authentication; the token is read from the
//! credential store on every request.

pub mod client;
pub mod error;

pub use client::{ApiClient, RequestOptions};
pub use error::ApiError;
