pub mod filters;

pub use filters::{FilterCriteria, Paging};

use bytes::Bytes;
use std::path::Path;

use crate::api::{ApiClient, ApiError};
use crate::models::RecordsPage;

pub const EXPORT_FILE_NAME: &str = "attendance_export.xlsx";

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("could not write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only admin operations over attendance records. Both operations are
/// idempotent and safe to repeat.
pub struct AdminQueryService {
    api: ApiClient,
}

impl AdminQueryService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetches one page of records. `total` in the returned page comes from
    /// the server; callers must not derive it from the page length.
    pub async fn query(
        &self,
        criteria: &FilterCriteria,
        paging: &Paging,
    ) -> Result<RecordsPage, ApiError> {
        self.api.admin_records(criteria, paging).await
    }

    /// Same filtering, but the server renders a spreadsheet instead of
    /// structured records.
    pub async fn export(&self, criteria: &FilterCriteria) -> Result<Bytes, ApiError> {
        self.api.admin_export(criteria).await
    }

    pub async fn save_export(
        &self,
        criteria: &FilterCriteria,
        path: &Path,
    ) -> Result<(), AdminError> {
        let bytes = self.export(criteria).await?;
        tokio::fs::write(path, &bytes).await?;
        log::info!("wrote export to {}", path.display());
        Ok(())
    }
}
