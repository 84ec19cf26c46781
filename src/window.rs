//! # Window
//!
//! Platform windows feed OS events into a [ListenerRegistry] of [EventKind]s. The application
//! subscribes to that registry and never talks to the platform directly.

use std::any::Any;
use std::collections::VecDeque;
use std::time::Duration;

use bitflags::bitflags;
use winit::dpi::LogicalSize;
use winit::event::ElementState;
use winit::event::MouseScrollDelta;
use winit::event::WindowEvent;
use winit::event_loop::EventLoop;
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::platform::pump_events::PumpStatus;
use winit::window::Fullscreen;
use winit::window::Window;
use winit::window::WindowBuilder;
use winit::window::WindowLevel;

use crate::input::EventKind;
use crate::listener::ListenerRegistry;

/// # Window Error
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    /// The platform event loop could not be created.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// The OS refused to create the window.
    #[error("failed to create window: {0}")]
    Os(#[from] winit::error::OsError),
}

bitflags! {
    /// # Window Flags
    ///
    /// Creation flags derived from [WindowSettings].
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct WindowFlags: u16 {
        /// The window can be resized by the user.
        const RESIZABLE = 1 << 0;
        /// The window has a title bar and borders.
        const DECORATED = 1 << 1;
        /// The window takes input focus when created.
        const FOCUSED = 1 << 2;
        /// The window starts maximized.
        const MAXIMIZED = 1 << 3;
        /// The window stays above other windows.
        const FLOATING = 1 << 4;
        /// The window is shown when created.
        const VISIBLE = 1 << 5;
        /// The window covers the whole monitor.
        const FULLSCREEN = 1 << 6;
    }
}

/// # Window Settings
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSettings {
    /// Title bar text.
    pub title: String,
    /// Inner width in logical pixels.
    pub width: u32,
    /// Inner height in logical pixels.
    pub height: u32,
    /// See [WindowFlags::RESIZABLE].
    pub resizable: bool,
    /// See [WindowFlags::DECORATED].
    pub decorated: bool,
    /// See [WindowFlags::FOCUSED].
    pub focused: bool,
    /// See [WindowFlags::MAXIMIZED].
    pub maximized: bool,
    /// See [WindowFlags::FLOATING].
    pub floating: bool,
    /// See [WindowFlags::VISIBLE].
    pub visible: bool,
    /// See [WindowFlags::FULLSCREEN].
    pub fullscreen: bool,
    /// Synchronize buffer swaps with the display.
    pub vsync: bool,
}

impl WindowSettings {
    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the inner size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets whether the window is resizable.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Sets whether the window has decorations.
    pub fn with_decorated(mut self, decorated: bool) -> Self {
        self.decorated = decorated;
        self
    }

    /// Sets whether the window starts maximized.
    pub fn with_maximized(mut self, maximized: bool) -> Self {
        self.maximized = maximized;
        self
    }

    /// Sets whether the window starts fullscreen.
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    /// Sets whether the window starts visible.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Returns every flag whose setting is enabled.
    pub fn flags(&self) -> WindowFlags {
        [
            (self.resizable, WindowFlags::RESIZABLE),
            (self.decorated, WindowFlags::DECORATED),
            (self.focused, WindowFlags::FOCUSED),
            (self.maximized, WindowFlags::MAXIMIZED),
            (self.floating, WindowFlags::FLOATING),
            (self.visible, WindowFlags::VISIBLE),
            (self.fullscreen, WindowFlags::FULLSCREEN),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(WindowFlags::empty(), |flags, (_, flag)| flags | flag)
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Lunaria".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
            decorated: true,
            focused: true,
            maximized: false,
            floating: false,
            visible: true,
            fullscreen: false,
            vsync: true,
        }
    }
}

/// # Platform Window
///
/// OS window contract used by the application.
pub trait PlatformWindow {
    /// Pumps pending OS events and sends them to [PlatformWindow::events].
    fn on_update(&mut self);

    /// Returns the registry receiving every window event.
    fn events(&self) -> &ListenerRegistry<EventKind>;

    /// Returns the framebuffer width in pixels.
    fn width(&self) -> u32;

    /// Returns the framebuffer height in pixels.
    fn height(&self) -> u32;

    /// Enables or disables vsync.
    fn set_vsync(&mut self, enabled: bool);

    /// Returns true if vsync is enabled.
    fn is_vsync(&self) -> bool;

    /// Sets the title bar text.
    fn set_title(&mut self, title: &str);

    /// Presents the frame.
    fn swap_buffers(&mut self) {}

    /// Returns the platform handle, passed through to renderer and UI backends.
    fn native_window(&self) -> &dyn Any;
}

/// # Winit Window
///
/// [PlatformWindow] backed by winit. Events are pumped without blocking once per
/// [PlatformWindow::on_update].
pub struct WinitWindow {
    event_loop: EventLoop<()>,
    window: Window,
    events: ListenerRegistry<EventKind>,
    width: u32,
    height: u32,
    vsync: bool,
}

impl WinitWindow {
    /// Opens a window.
    pub fn new(settings: &WindowSettings) -> Result<Self, WindowError> {
        let flags = settings.flags();
        let event_loop = EventLoop::new()?;

        let window = WindowBuilder::new()
            .with_title(&settings.title)
            .with_inner_size(LogicalSize::new(settings.width, settings.height))
            .with_resizable(flags.contains(WindowFlags::RESIZABLE))
            .with_decorations(flags.contains(WindowFlags::DECORATED))
            .with_active(flags.contains(WindowFlags::FOCUSED))
            .with_maximized(flags.contains(WindowFlags::MAXIMIZED))
            .with_visible(flags.contains(WindowFlags::VISIBLE))
            .with_window_level(if flags.contains(WindowFlags::FLOATING) {
                WindowLevel::AlwaysOnTop
            } else {
                WindowLevel::Normal
            })
            .with_fullscreen(
                flags
                    .contains(WindowFlags::FULLSCREEN)
                    .then_some(Fullscreen::Borderless(None)),
            )
            .build(&event_loop)?;

        let size = window.inner_size();
        log::info!(
            "Created window {} ({}x{})",
            settings.title,
            size.width,
            size.height
        );

        Ok(Self {
            event_loop,
            window,
            events: ListenerRegistry::new(),
            width: size.width,
            height: size.height,
            vsync: settings.vsync,
        })
    }
}

impl PlatformWindow for WinitWindow {
    fn on_update(&mut self) {
        let mut pending = Vec::new();
        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _| {
                if let winit::event::Event::WindowEvent { event, .. } = event {
                    translate_window_event(event, &mut pending);
                }
            });

        if let PumpStatus::Exit(code) = status {
            log::debug!("Event loop exited with code {code}");
            pending.push(EventKind::WindowClose);
        }

        for kind in pending {
            if let EventKind::WindowResize { width, height } = kind {
                self.width = width;
                self.height = height;
            }
            self.events.invoke(&kind);
        }
    }

    fn events(&self) -> &ListenerRegistry<EventKind> {
        &self.events
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_vsync(&mut self, enabled: bool) {
        log::debug!("VSync {}", if enabled { "enabled" } else { "disabled" });
        self.vsync = enabled;
    }

    fn is_vsync(&self) -> bool {
        self.vsync
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn swap_buffers(&mut self) {
        self.window.pre_present_notify();
    }

    fn native_window(&self) -> &dyn Any {
        &self.window
    }
}

fn translate_window_event(event: WindowEvent, pending: &mut Vec<EventKind>) {
    match event {
        WindowEvent::CloseRequested => pending.push(EventKind::WindowClose),
        WindowEvent::Resized(size) => pending.push(EventKind::WindowResize {
            width: size.width,
            height: size.height,
        }),
        WindowEvent::Focused(focused) => pending.push(EventKind::WindowFocus(focused)),
        WindowEvent::Moved(position) => pending.push(EventKind::WindowMoved {
            x: position.x,
            y: position.y,
        }),
        WindowEvent::KeyboardInput { event, .. } => {
            if let PhysicalKey::Code(key) = event.physical_key {
                match event.state {
                    ElementState::Pressed => pending.push(EventKind::KeyPressed {
                        key,
                        repeat: event.repeat,
                    }),
                    ElementState::Released => pending.push(EventKind::KeyReleased { key }),
                }
            }

            if event.state == ElementState::Pressed {
                if let Some(text) = event.text {
                    pending.extend(text.chars().map(EventKind::KeyTyped));
                }
            }
        }
        WindowEvent::MouseInput { state, button, .. } => match state {
            ElementState::Pressed => pending.push(EventKind::MouseButtonPressed(button)),
            ElementState::Released => pending.push(EventKind::MouseButtonReleased(button)),
        },
        WindowEvent::CursorMoved { position, .. } => pending.push(EventKind::MouseMoved {
            x: position.x as f32,
            y: position.y as f32,
        }),
        WindowEvent::MouseWheel { delta, .. } => {
            let (x, y) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (x, y),
                MouseScrollDelta::PixelDelta(position) => (position.x as f32, position.y as f32),
            };
            pending.push(EventKind::MouseScrolled { x, y });
        }
        _ => {}
    }
}

/// # Headless Window
///
/// [PlatformWindow] without an OS window. Events pushed with [HeadlessWindow::push_event] are
/// delivered on the next [PlatformWindow::on_update].
#[derive(Debug)]
pub struct HeadlessWindow {
    title: String,
    events: ListenerRegistry<EventKind>,
    queue: VecDeque<EventKind>,
    width: u32,
    height: u32,
    vsync: bool,
    frames: u64,
}

impl HeadlessWindow {
    /// Returns a window with the size and title from the settings.
    pub fn new(settings: &WindowSettings) -> Self {
        Self {
            title: settings.title.clone(),
            events: ListenerRegistry::new(),
            queue: VecDeque::new(),
            width: settings.width,
            height: settings.height,
            vsync: settings.vsync,
            frames: 0,
        }
    }

    /// Queues an event for the next update.
    pub fn push_event(&mut self, kind: EventKind) {
        self.queue.push_back(kind);
    }

    /// Returns the current title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the number of presented frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl PlatformWindow for HeadlessWindow {
    fn on_update(&mut self) {
        while let Some(kind) = self.queue.pop_front() {
            if let EventKind::WindowResize { width, height } = kind {
                self.width = width;
                self.height = height;
            }
            self.events.invoke(&kind);
        }
    }

    fn events(&self) -> &ListenerRegistry<EventKind> {
        &self.events
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.vsync = enabled;
    }

    fn is_vsync(&self) -> bool {
        self.vsync
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn swap_buffers(&mut self) {
        self.frames += 1;
    }

    fn native_window(&self) -> &dyn Any {
        self
    }
}
