use std::any::Any;

/// # UI Backend
///
/// Immediate-mode UI context. The application opens a frame before calling the layers'
/// [crate::Layer::on_ui_render] hooks and closes it afterwards.
pub trait UiBackend {
    /// Called once when the application starts, with the platform window handle.
    fn init(&mut self, _native_window: &dyn Any) {}

    /// Starts a UI frame.
    fn begin_frame(&mut self);

    /// Ends and submits the UI frame.
    fn end_frame(&mut self);

    /// Called once when the application shuts down.
    fn shutdown(&mut self) {}
}

/// # Null UI
///
/// UI backend that draws nothing and counts frames.
#[derive(Clone, Debug, Default)]
pub struct NullUi {
    frames: u64,
    in_frame: bool,
}

impl NullUi {
    /// Returns a backend with no frames recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of completed frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl UiBackend for NullUi {
    fn begin_frame(&mut self) {
        if self.in_frame {
            log::warn!("UI frame started twice");
        }
        self.in_frame = true;
    }

    fn end_frame(&mut self) {
        if self.in_frame {
            self.frames += 1;
        }
        self.in_frame = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_end_frame_frames_returns_one() {
        let mut ui = NullUi::new();

        ui.begin_frame();
        ui.end_frame();

        assert_eq!(ui.frames(), 1);
    }

    #[test]
    fn end_frame_without_begin_frames_returns_zero() {
        let mut ui = NullUi::new();

        ui.end_frame();

        assert_eq!(ui.frames(), 0);
    }
}
