pub mod record;
pub mod user;

pub use record::{AttendanceRecord, GeoFix, RecordsPage, SubmissionVerdict};
pub use user::{Role, User};
