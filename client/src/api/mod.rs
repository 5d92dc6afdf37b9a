pub mod error;

pub use error::ApiError;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::admin::{FilterCriteria, Paging};
use crate::auth::session::SessionStore;
use crate::capture::camera::CapturedImage;
use crate::models::{AttendanceRecord, GeoFix, RecordsPage, Role, SubmissionVerdict, User};

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 4, message = "password must be at least 4 characters"))]
    pub password: String,
    pub role: Role,
    pub company_id: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUser {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    pub role: Role,
}

/// One HTTP client for the whole process. The bearer token is read from the
/// injected session store per request, so login/logout take effect
/// immediately for every component sharing the store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn read_ok(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(req)
            .send()
            .await?;
        Ok(Self::read_ok(resp).await?.json().await?)
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let resp = self.bearer(self.http.get(self.url("/auth/me"))).send().await?;
        Ok(Self::read_ok(resp).await?.json().await?)
    }

    /// Development helper mirroring the seed endpoint. `face` is an optional
    /// (filename, bytes) pair used to enroll a face template.
    pub async fn register(
        &self,
        req: &RegisterRequest,
        face: Option<(String, Vec<u8>)>,
    ) -> Result<RegisteredUser, ApiError> {
        let mut form = Form::new()
            .text("username", req.username.clone())
            .text("password", req.password.clone())
            .text("role", req.role.as_str());
        if let Some(company_id) = &req.company_id {
            form = form.text("company_id", company_id.clone());
        }
        if let Some(full_name) = &req.full_name {
            form = form.text("full_name", full_name.clone());
        }
        if let Some((filename, bytes)) = face {
            form = form.part("image", Part::bytes(bytes).file_name(filename));
        }
        let resp = self
            .http
            .post(self.url("/auth/register"))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::read_ok(resp).await?.json().await?)
    }

    /// Uploads one attempt's frame and fix. The image is consumed: nothing
    /// keeps a captured frame alive past its upload.
    pub async fn submit_attendance(
        &self,
        image: CapturedImage,
        fix: GeoFix,
    ) -> Result<SubmissionVerdict, ApiError> {
        let part = Part::bytes(image.into_bytes())
            .file_name("selfie.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .part("image", part)
            .text("lat", fix.lat.to_string())
            .text("lon", fix.lon.to_string());
        let resp = self
            .bearer(self.http.post(self.url("/attendance")))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::read_ok(resp).await?.json().await?)
    }

    /// The caller's own history, most recent first as served.
    pub async fn my_records(&self) -> Result<Vec<AttendanceRecord>, ApiError> {
        let resp = self
            .bearer(self.http.get(self.url("/attendance/me")))
            .send()
            .await?;
        Ok(Self::read_ok(resp).await?.json().await?)
    }

    pub async fn admin_records(
        &self,
        criteria: &FilterCriteria,
        paging: &Paging,
    ) -> Result<RecordsPage, ApiError> {
        let mut query = criteria.to_query();
        query.extend(paging.to_query());
        let resp = self
            .bearer(self.http.get(self.url("/admin/records")).query(&query))
            .send()
            .await?;
        Ok(Self::read_ok(resp).await?.json().await?)
    }

    pub async fn admin_export(&self, criteria: &FilterCriteria) -> Result<Bytes, ApiError> {
        let resp = self
            .bearer(
                self.http
                    .get(self.url("/admin/export"))
                    .query(&criteria.to_query()),
            )
            .send()
            .await?;
        Ok(Self::read_ok(resp).await?.bytes().await?)
    }
}
