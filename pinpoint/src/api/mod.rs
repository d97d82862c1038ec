//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): Login, registration, logout
//! - **Account** (`/api/v1/account`): The authenticated account
//! - **Analyses** (`/api/v1/analyses`): Photo upload and analysis
//! - **Plans** (`/api/v1/plans`): Pricing catalog
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`;
//! documentation is served at `/docs` when the server is running.

pub mod handlers;
pub mod models;
