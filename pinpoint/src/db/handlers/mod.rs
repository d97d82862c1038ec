//! Repository implementations for database access.

pub mod accounts;
pub mod trials;

pub use accounts::Accounts;
pub use trials::Trials;
