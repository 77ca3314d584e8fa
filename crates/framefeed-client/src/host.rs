//! Seams between the session and the environment embedding it.
//!
//! The host owns the actual drawing surface and status widgets; the session
//! only reaches them through these traits, and only from its own task.

use crate::render::FrameImage;
use framefeed_core::Indicator;

/// A 2D drawable surface with fixed dimensions.
pub trait Surface: Send + 'static {
    /// `(width, height)` in pixels. Frames are scaled to this size.
    fn size(&self) -> (u32, u32);

    /// Replace the displayed image. Must not block.
    fn draw(&mut self, frame: &FrameImage);
}

/// The host's status indicator, text and control affordances.
pub trait StatusWidgets: Send + 'static {
    fn set_indicator(&mut self, indicator: Indicator);
    fn set_text(&mut self, text: &str);
    fn set_connect_enabled(&mut self, enabled: bool);
    fn set_disconnect_enabled(&mut self, enabled: bool);
}

/// The environment probed by the readiness poller.
///
/// Probes must be cheap and side-effect-free until they succeed.
pub trait Host: Send + 'static {
    /// Look up the render target, if it exists yet.
    fn find_render_target(&mut self) -> Option<Box<dyn Surface>>;

    /// Look up the status widgets. Asked once, right after the render target
    /// is found; `None` means status updates are skipped.
    fn find_status_widgets(&mut self) -> Option<Box<dyn StatusWidgets>>;
}

/// Everything the poller hands over on success.
pub struct Discovery {
    pub surface: Box<dyn Surface>,
    pub widgets: Option<Box<dyn StatusWidgets>>,
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("surface_size", &self.surface.size())
            .field("widgets", &self.widgets.is_some())
            .finish()
    }
}
