//! Core library for the StaffPortal field client.
//!
//! - `auth`: token storage and the session state machine
//! - `api`: the authenticated REST client
//! - `models`: jobs, elements, dashboard and user payloads
//! - `scan`: element label decoding
//! - `config`: configuration loading and store/client wiring

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod scan;
pub mod utils;

pub use api::{ApiClient, ApiError, RequestOptions};
pub use auth::{CredentialStore, Session, SessionController, SessionState};
pub use config::Config;
