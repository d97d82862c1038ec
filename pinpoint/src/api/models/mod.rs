//! API request/response models.

pub mod accounts;
pub mod analyses;
pub mod auth;
pub mod plans;
