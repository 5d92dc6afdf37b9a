use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single latitude/longitude sample from the device's location service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub lat: f64,
    pub lon: f64,
}

/// One attendance decision as stored by the server. The client only ever
/// holds read-only copies of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub location: GeoFix,
    /// Open set: the server may add labels beyond present/late/rejected.
    pub status: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub student_username: Option<String>,
    #[serde(default)]
    pub student_full_name: Option<String>,
}

impl AttendanceRecord {
    /// Display identity for admin views: full name when the server joined
    /// one in, otherwise the username.
    pub fn student_identity(&self) -> Option<&str> {
        self.student_full_name
            .as_deref()
            .or(self.student_username.as_deref())
    }
}

/// One page of an admin query. `total` is authoritative from the server and
/// may exceed `data.len()` when the result set is paginated.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordsPage {
    pub data: Vec<AttendanceRecord>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    pub total: u64,
}

/// Decoded 2xx body of an attendance upload.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionVerdict {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}
