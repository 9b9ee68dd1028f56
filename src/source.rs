use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use image::{ImageBuffer, Rgb, RgbImage};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};

use crate::error::SourceError;

/// A sequential supplier of RGB frames. Implementations release their device
/// or decoder handle on drop, so replacing a source never leaves two handles
/// open on the same physical device.
pub trait FrameSource {
    fn describe(&self) -> String;

    /// Pull the next frame. Live sources report transient failures as
    /// `SourceError::Read`; finite sources report `SourceError::EndOfStream`
    /// when exhausted.
    fn read_frame(&mut self) -> Result<RgbImage, SourceError>;

    /// Live sources (cameras) keep ticking through read errors; finite
    /// sources (files) halt the pipeline at end of stream.
    fn is_live(&self) -> bool {
        true
    }
}

pub struct CameraSource {
    camera: Camera,
    label: String,
}

impl CameraSource {
    /// Open the camera at `logical_index`, shifted by the configured virtual
    /// camera offset to reach the physical device index.
    pub fn new(logical_index: usize, vcam_offset: usize) -> Result<Self, SourceError> {
        let physical = (logical_index + vcam_offset) as u32;
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera =
            Camera::new(CameraIndex::Index(physical), requested).map_err(|e| {
                SourceError::Open {
                    what: format!("camera {}", physical),
                    reason: e.to_string(),
                }
            })?;

        camera.open_stream().map_err(|e| SourceError::Open {
            what: format!("camera {} stream", physical),
            reason: e.to_string(),
        })?;

        let label = camera.info().human_name();
        log::info!("opened camera {}: {} ({})", physical, label, camera.camera_format());

        Ok(Self { camera, label })
    }
}

impl FrameSource for CameraSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn read_frame(&mut self) -> Result<RgbImage, SourceError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| SourceError::Read(e.to_string()))?;
        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

/// Video file source. Decodes through an ffmpeg child process emitting raw
/// rgb24 frames at a fixed size on stdout; one `read_exact` per frame.
pub struct FileSource {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    path: String,
}

impl FileSource {
    pub fn new(path: &Path, size: (u32, u32)) -> Result<Self, SourceError> {
        let (width, height) = size;
        let mut child = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(path)
            .arg("-vf")
            .arg(format!("scale={}:{}", width, height))
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-f")
            .arg("rawvideo")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| SourceError::Open {
                what: format!("video file {}", path.display()),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| SourceError::Open {
            what: format!("video file {}", path.display()),
            reason: "failed to capture ffmpeg stdout".to_string(),
        })?;

        log::info!("opened video file {}", path.display());

        Ok(Self {
            child,
            stdout,
            width,
            height,
            path: path.display().to_string(),
        })
    }
}

impl FrameSource for FileSource {
    fn describe(&self) -> String {
        self.path.clone()
    }

    fn read_frame(&mut self) -> Result<RgbImage, SourceError> {
        let mut buf = vec![0u8; (self.width * self.height * 3) as usize];
        match self.stdout.read_exact(&mut buf) {
            Ok(()) => ImageBuffer::from_raw(self.width, self.height, buf)
                .ok_or_else(|| SourceError::Decode("frame buffer size mismatch".to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(SourceError::EndOfStream)
            }
            Err(e) => Err(SourceError::Read(e.to_string())),
        }
    }

    fn is_live(&self) -> bool {
        false
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Available camera names. The external enumeration step writes
/// `camera_list.txt`; when it is absent we fall back to querying the capture
/// backend directly. An empty result means the driver must not attempt open.
pub fn list_cameras(list_path: &Path) -> Vec<String> {
    if list_path.exists() {
        match std::fs::read_to_string(list_path) {
            Ok(content) => {
                return content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            Err(e) => {
                log::warn!("could not read {}: {}", list_path.display(), e);
            }
        }
    }

    log::info!(
        "{} not found, falling back to backend enumeration",
        list_path.display()
    );
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(cameras) => cameras.iter().map(|c| c.human_name()).collect(),
        Err(e) => {
            log::warn!("camera enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// Best-effort run of the external camera enumeration executable. Failures
/// are logged; the fallback enumeration path covers us.
pub fn run_camera_enum(exe: &str) {
    match Command::new(exe).status() {
        Ok(status) if status.success() => {}
        Ok(status) => log::warn!("{} exited with {}", exe, status),
        Err(e) => log::warn!("could not run {}: {}", exe, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_list_file_is_parsed() {
        let dir = std::env::temp_dir().join("pose-sender-test-list");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("camera_list.txt");
        std::fs::write(&path, "Integrated Webcam\n\n  OBS Virtual Camera  \n").unwrap();

        let cameras = list_cameras(&path);
        assert_eq!(cameras, vec!["Integrated Webcam", "OBS Virtual Camera"]);

        std::fs::remove_file(&path).unwrap();
    }
}
