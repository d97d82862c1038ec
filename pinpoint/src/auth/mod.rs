//! Authentication: password hashing, JWT sessions, and request extractors.

pub mod current_account;
pub mod password;
pub mod session;
