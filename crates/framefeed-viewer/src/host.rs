//! File-backed host.
//!
//! The render target is an image file: it "exists" once the directory it
//! lives in does. Frames are written to a temporary sibling and renamed
//! into place, so readers never see a half-written file.

use framefeed_client::{FrameImage, Host, Indicator, StatusWidgets, Surface};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Which of the connect/disconnect commands are currently allowed.
#[derive(Debug, Clone)]
pub struct Controls {
    connect: Arc<AtomicBool>,
    disconnect: Arc<AtomicBool>,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            connect: Arc::new(AtomicBool::new(true)),
            disconnect: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Controls {
    pub fn connect_enabled(&self) -> bool {
        self.connect.load(Ordering::SeqCst)
    }

    pub fn disconnect_enabled(&self) -> bool {
        self.disconnect.load(Ordering::SeqCst)
    }
}

pub struct FileHost {
    output: PathBuf,
    size: (u32, u32),
    controls: Controls,
}

impl FileHost {
    pub fn new(output: PathBuf, size: (u32, u32), controls: Controls) -> Self {
        Self {
            output,
            size,
            controls,
        }
    }

    fn target_dir(&self) -> &Path {
        match self.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl Host for FileHost {
    fn find_render_target(&mut self) -> Option<Box<dyn Surface>> {
        if !self.target_dir().is_dir() {
            return None;
        }
        Some(Box::new(FileSurface::spawn(self.output.clone(), self.size)))
    }

    fn find_status_widgets(&mut self) -> Option<Box<dyn StatusWidgets>> {
        Some(Box::new(TerminalStatus {
            controls: self.controls.clone(),
        }))
    }
}

/// Hands frames to a writer task; only the newest pending frame is written.
struct FileSurface {
    size: (u32, u32),
    frames: watch::Sender<Option<FrameImage>>,
}

impl FileSurface {
    fn spawn(output: PathBuf, size: (u32, u32)) -> Self {
        let (frames, rx) = watch::channel(None);
        tokio::spawn(write_frames(output, rx));
        Self { size, frames }
    }
}

impl Surface for FileSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw(&mut self, frame: &FrameImage) {
        self.frames.send_replace(Some(frame.clone()));
    }
}

async fn write_frames(output: PathBuf, mut frames: watch::Receiver<Option<FrameImage>>) {
    while frames.changed().await.is_ok() {
        let Some(frame) = frames.borrow_and_update().clone() else {
            continue;
        };
        let path = output.clone();
        match tokio::task::spawn_blocking(move || write_atomically(&path, &frame)).await {
            Ok(Ok(())) => tracing::debug!("Wrote {}", output.display()),
            Ok(Err(e)) => tracing::warn!("Failed to write {}: {}", output.display(), e),
            Err(e) => tracing::warn!("Frame writer panicked: {}", e),
        }
    }
}

fn write_atomically(path: &Path, frame: &FrameImage) -> Result<(), WriteError> {
    let tmp = path.with_extension("tmp");
    frame.save_with_format(&tmp, ImageFormat::Png)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error(transparent)]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Prints status changes and mirrors the affordances into [`Controls`].
struct TerminalStatus {
    controls: Controls,
}

impl StatusWidgets for TerminalStatus {
    fn set_indicator(&mut self, indicator: Indicator) {
        tracing::debug!("Indicator {:?} ({})", indicator, indicator.color());
    }

    fn set_text(&mut self, text: &str) {
        println!("status: {text}");
    }

    fn set_connect_enabled(&mut self, enabled: bool) {
        self.controls.connect.store(enabled, Ordering::SeqCst);
    }

    fn set_disconnect_enabled(&mut self, enabled: bool) {
        self.controls.disconnect.store(enabled, Ordering::SeqCst);
    }
}
