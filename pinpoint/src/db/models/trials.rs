//! Database records for anonymous trial usage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A consumed anonymous trial, keyed by client origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialUsageDBResponse {
    pub origin: String,
    pub used_at: DateTime<Utc>,
}
