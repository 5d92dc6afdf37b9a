use std::fmt;
use std::sync::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;

use crate::api::{ApiClient, ApiError};
use crate::capture::camera::{Camera, CameraError, CameraStream, CaptureError};
use crate::capture::location::{LocationError, LocationSource};
use crate::models::{AttendanceRecord, GeoFix};

/// Where the current (or last) attempt is in its lifecycle. `Succeeded` and
/// `Failed` are terminal; a new attempt starts the sequence over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    Idle,
    AcquiringLocation,
    CapturingImage,
    Uploading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub status: String,
    pub score: Option<f64>,
    pub fix: GeoFix,
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Submitted: {}", self.status)?;
        if let Some(score) = self.score {
            write!(f, " (score {score})")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("a submission is already in progress")]
    Busy,
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Runs the whole check-in workflow: one location fix, one frame from the
/// open camera stream, one multipart upload, then a history refresh. At most
/// one attempt is in flight per submitter; a second call gets `Busy` rather
/// than interleaving captures.
pub struct AttendanceSubmitter<L, C: Camera> {
    api: ApiClient,
    location: L,
    camera: C,
    stream: AsyncMutex<Option<C::Stream>>,
    busy: AsyncMutex<()>,
    phase: Mutex<SubmitPhase>,
    history: RwLock<Vec<AttendanceRecord>>,
}

impl<L: LocationSource, C: Camera> AttendanceSubmitter<L, C> {
    pub fn new(api: ApiClient, location: L, camera: C) -> Self {
        Self {
            api,
            location,
            camera,
            stream: AsyncMutex::new(None),
            busy: AsyncMutex::new(()),
            phase: Mutex::new(SubmitPhase::Idle),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Opens the camera stream. The stream stays open across submissions
    /// until [`release_camera`](Self::release_camera) or drop.
    pub async fn start_camera(&self) -> Result<(), CameraError> {
        let stream = self.camera.start().await?;
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    /// Releases the device. The owning view must call this on teardown.
    pub async fn release_camera(&self) {
        self.stream.lock().await.take();
    }

    pub fn phase(&self) -> SubmitPhase {
        *self.phase.lock().expect("phase lock")
    }

    fn set_phase(&self, phase: SubmitPhase) {
        *self.phase.lock().expect("phase lock") = phase;
    }

    /// Snapshot of the caller's history as of the last refresh.
    pub fn history(&self) -> Vec<AttendanceRecord> {
        self.history.read().expect("history lock").clone()
    }

    pub async fn refresh_history(&self) -> Result<(), ApiError> {
        let records = self.api.my_records().await?;
        *self.history.write().expect("history lock") = records;
        Ok(())
    }

    /// One coordinated attempt. Every failure is terminal for this attempt
    /// and leaves the submitter ready for a user-initiated retry; nothing is
    /// retried internally.
    pub async fn submit(&self) -> Result<SubmissionOutcome, SubmitError> {
        // the guard spans location, capture and upload, so the frame and the
        // fix always belong to the same attempt
        let Ok(_busy) = self.busy.try_lock() else {
            return Err(SubmitError::Busy);
        };

        let result = self.attempt().await;

        // history reflects every attempt, not only successful uploads
        if let Err(e) = self.refresh_history().await {
            log::warn!("history refresh failed after submission: {e}");
        }

        self.set_phase(match result {
            Ok(_) => SubmitPhase::Succeeded,
            Err(_) => SubmitPhase::Failed,
        });
        result
    }

    async fn attempt(&self) -> Result<SubmissionOutcome, SubmitError> {
        self.set_phase(SubmitPhase::AcquiringLocation);
        let fix = self.location.acquire().await?;

        self.set_phase(SubmitPhase::CapturingImage);
        let image = {
            let mut stream = self.stream.lock().await;
            let stream = stream.as_mut().ok_or(CameraError::NotStarted)?;
            stream.capture_frame().await?
        };

        self.set_phase(SubmitPhase::Uploading);
        let verdict = self.api.submit_attendance(image, fix).await?;
        log::info!(
            "attendance recorded at ({}, {}): {}",
            fix.lat,
            fix.lon,
            verdict.status
        );

        Ok(SubmissionOutcome {
            status: verdict.status,
            score: verdict.score,
            fix,
        })
    }
}
