use image::ImageOutputFormat;
use std::io::Cursor;
use std::process::Stdio;
use tokio::process::Command;

/// Still frames are re-encoded at this quality before upload, whatever the
/// capture helper produced.
pub const JPEG_QUALITY: u8 = 90;

const EX_NOPERM: i32 = 77;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device available: {0}")]
    NoDevice(String),
    #[error("camera stream has not been started")]
    NotStarted,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture produced no frame")]
    NoFrame,
    #[error("frame capture failed: {0}")]
    Failed(String),
    #[error("could not decode captured frame: {0}")]
    Decode(#[from] image::ImageError),
}

/// A JPEG still frame. Owned bytes: the upload consumes the image, so it
/// cannot outlive the attempt it was captured for.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    bytes: Vec<u8>,
}

impl CapturedImage {
    pub fn from_jpeg(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Opens the device and hands out a stream. Permission and device problems
/// surface here, not mid-submission.
#[allow(async_fn_in_trait)]
pub trait Camera {
    type Stream: CameraStream;
    async fn start(&self) -> Result<Self::Stream, CameraError>;
}

/// A started stream. It stays open across captures; dropping it releases
/// the device.
#[allow(async_fn_in_trait)]
pub trait CameraStream {
    async fn capture_frame(&mut self) -> Result<CapturedImage, CaptureError>;
}

enum GrabError {
    Spawn(std::io::Error),
    Denied,
    Failed(String),
    Empty,
}

async fn grab_frame(command: &str) -> Result<Vec<u8>, GrabError> {
    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(GrabError::Spawn)?;

    let output = child.wait_with_output().await.map_err(GrabError::Spawn)?;

    if !output.status.success() {
        if output.status.code() == Some(EX_NOPERM) {
            return Err(GrabError::Denied);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GrabError::Failed(stderr.trim().to_string()));
    }
    if output.stdout.is_empty() {
        return Err(GrabError::Empty);
    }
    Ok(output.stdout)
}

fn encode_jpeg(raw: &[u8]) -> Result<CapturedImage, CaptureError> {
    let decoded = image::load_from_memory(raw)?;
    let mut out = Cursor::new(Vec::new());
    decoded.write_to(&mut out, ImageOutputFormat::Jpeg(JPEG_QUALITY))?;
    Ok(CapturedImage {
        bytes: out.into_inner(),
    })
}

/// Camera backed by an external capture command that writes one frame to
/// stdout (fswebcam, ffmpeg, a platform helper).
#[derive(Debug, Clone)]
pub struct CommandCamera {
    command: String,
}

impl CommandCamera {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Camera for CommandCamera {
    type Stream = CommandCameraStream;

    async fn start(&self) -> Result<CommandCameraStream, CameraError> {
        // probe capture, discarded: validates the device and the permission
        match grab_frame(&self.command).await {
            Ok(_) => Ok(CommandCameraStream {
                command: self.command.clone(),
            }),
            Err(GrabError::Denied) => Err(CameraError::PermissionDenied),
            Err(GrabError::Spawn(e)) => Err(CameraError::NoDevice(e.to_string())),
            Err(GrabError::Failed(msg)) => Err(CameraError::NoDevice(msg)),
            Err(GrabError::Empty) => {
                Err(CameraError::NoDevice("camera produced no frame".into()))
            }
        }
    }
}

#[derive(Debug)]
pub struct CommandCameraStream {
    command: String,
}

impl CameraStream for CommandCameraStream {
    async fn capture_frame(&mut self) -> Result<CapturedImage, CaptureError> {
        let raw = grab_frame(&self.command).await.map_err(|e| match e {
            GrabError::Empty => CaptureError::NoFrame,
            GrabError::Denied => CaptureError::Failed("camera permission revoked".into()),
            GrabError::Spawn(e) => CaptureError::Failed(e.to_string()),
            GrabError::Failed(msg) => CaptureError::Failed(msg),
        })?;
        encode_jpeg(&raw)
    }
}
