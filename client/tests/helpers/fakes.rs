//! In-process capture devices for driving the submitter without hardware.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use client::capture::camera::{Camera, CameraError, CameraStream, CaptureError, CapturedImage};
use client::capture::location::{LocationError, LocationSource};
use client::models::GeoFix;

pub enum LocationStep {
    Fix(GeoFix),
    DelayedFix(Duration, GeoFix),
    Fail(LocationError),
}

/// Plays back a scripted sequence of acquisition results, one per call.
#[derive(Clone)]
pub struct ScriptedLocation {
    steps: Arc<Mutex<VecDeque<LocationStep>>>,
}

impl ScriptedLocation {
    pub fn new(steps: Vec<LocationStep>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
        }
    }

    pub fn fix(lat: f64, lon: f64) -> Self {
        Self::new(vec![LocationStep::Fix(GeoFix { lat, lon })])
    }
}

impl LocationSource for ScriptedLocation {
    async fn acquire(&self) -> Result<GeoFix, LocationError> {
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted location step left");
        match step {
            LocationStep::Fix(fix) => Ok(fix),
            LocationStep::DelayedFix(delay, fix) => {
                tokio::time::sleep(delay).await;
                Ok(fix)
            }
            LocationStep::Fail(e) => Err(e),
        }
    }
}

pub struct FakeCamera {
    pub captures: Arc<AtomicUsize>,
    pub fail_start: Option<CameraError>,
    pub fail_capture: bool,
}

impl FakeCamera {
    pub fn working() -> Self {
        Self {
            captures: Arc::new(AtomicUsize::new(0)),
            fail_start: None,
            fail_capture: false,
        }
    }

    pub fn failing_capture() -> Self {
        Self {
            fail_capture: true,
            ..Self::working()
        }
    }

    pub fn denied() -> Self {
        Self {
            fail_start: Some(CameraError::PermissionDenied),
            ..Self::working()
        }
    }
}

impl Camera for FakeCamera {
    type Stream = FakeStream;

    async fn start(&self) -> Result<FakeStream, CameraError> {
        if let Some(e) = &self.fail_start {
            return Err(e.clone());
        }
        Ok(FakeStream {
            captures: self.captures.clone(),
            fail: self.fail_capture,
        })
    }
}

pub struct FakeStream {
    captures: Arc<AtomicUsize>,
    fail: bool,
}

impl CameraStream for FakeStream {
    async fn capture_frame(&mut self) -> Result<CapturedImage, CaptureError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CaptureError::NoFrame);
        }
        Ok(CapturedImage::from_jpeg(vec![0xff, 0xd8, 0xff, 0xe0, 1, 2, 3]))
    }
}
