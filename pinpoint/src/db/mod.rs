//! Database layer for data persistence and access.
//!
//! Repositories in [`handlers`] encapsulate all SQL for one table each and
//! operate over a `&mut PgConnection`, so they compose with both pooled
//! connections and transactions. Record structs live in [`models`];
//! [`errors`] categorizes sqlx failures into constraint-level variants the
//! service layer can map to HTTP responses.
//!
//! Migrations are embedded from the `migrations/` directory and exposed via
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
