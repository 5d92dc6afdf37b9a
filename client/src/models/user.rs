use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of roles the service knows about. The wire format uses
/// snake_case (`company_admin`), matching the auth payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    CompanyAdmin,
    FacultyAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::CompanyAdmin => "company_admin",
            Role::FacultyAdmin => "faculty_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    // older server builds omit this field
    #[serde(default)]
    pub has_face_encoding: bool,
}
