//! HTTP request handlers for all API endpoints.
//!
//! - [`auth`]: Registration, login and logout
//! - [`accounts`]: The authenticated account resource
//! - [`analyses`]: Photo upload and analysis
//! - [`plans`]: The pricing catalog

pub mod accounts;
pub mod analyses;
pub mod auth;
pub mod plans;
