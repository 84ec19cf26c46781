//! # Input
//!
//! Application events and the input state derived from them.

use std::collections::HashSet;

use bitflags::bitflags;
use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

bitflags! {
    /// # Event Category
    ///
    /// Broad classification of an [EventKind]. A kind may belong to several categories.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct EventCategory: u8 {
        /// Window and application lifecycle.
        const APPLICATION = 1 << 0;
        /// Any user input.
        const INPUT = 1 << 1;
        /// Keyboard input.
        const KEYBOARD = 1 << 2;
        /// Mouse movement and scrolling.
        const MOUSE = 1 << 3;
        /// Mouse buttons.
        const MOUSE_BUTTON = 1 << 4;
    }
}

/// # Event Kind
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EventKind {
    /// The window was asked to close.
    WindowClose,
    /// The window framebuffer was resized. A zero dimension means the window is minimized.
    WindowResize {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// The window gained or lost focus.
    WindowFocus(bool),
    /// The window was moved.
    WindowMoved {
        /// New x position in screen pixels.
        x: i32,
        /// New y position in screen pixels.
        y: i32,
    },
    /// A key was pressed.
    KeyPressed {
        /// Physical key code.
        key: KeyCode,
        /// True if this press is an auto-repeat.
        repeat: bool,
    },
    /// A key was released.
    KeyReleased {
        /// Physical key code.
        key: KeyCode,
    },
    /// A character was typed.
    KeyTyped(char),
    /// A mouse button was pressed.
    MouseButtonPressed(MouseButton),
    /// A mouse button was released.
    MouseButtonReleased(MouseButton),
    /// The cursor moved.
    MouseMoved {
        /// Cursor x position in window pixels.
        x: f32,
        /// Cursor y position in window pixels.
        y: f32,
    },
    /// The mouse wheel scrolled.
    MouseScrolled {
        /// Horizontal offset.
        x: f32,
        /// Vertical offset.
        y: f32,
    },
}

impl EventKind {
    /// Returns the categories of the event.
    pub fn category(&self) -> EventCategory {
        match self {
            Self::WindowClose
            | Self::WindowResize { .. }
            | Self::WindowFocus(_)
            | Self::WindowMoved { .. } => EventCategory::APPLICATION,
            Self::KeyPressed { .. } | Self::KeyReleased { .. } | Self::KeyTyped(_) => {
                EventCategory::INPUT | EventCategory::KEYBOARD
            }
            Self::MouseButtonPressed(_) | Self::MouseButtonReleased(_) => {
                EventCategory::INPUT | EventCategory::MOUSE | EventCategory::MOUSE_BUTTON
            }
            Self::MouseMoved { .. } | Self::MouseScrolled { .. } => {
                EventCategory::INPUT | EventCategory::MOUSE
            }
        }
    }

    /// Returns a short name for the event kind, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WindowClose => "WindowClose",
            Self::WindowResize { .. } => "WindowResize",
            Self::WindowFocus(_) => "WindowFocus",
            Self::WindowMoved { .. } => "WindowMoved",
            Self::KeyPressed { .. } => "KeyPressed",
            Self::KeyReleased { .. } => "KeyReleased",
            Self::KeyTyped(_) => "KeyTyped",
            Self::MouseButtonPressed(_) => "MouseButtonPressed",
            Self::MouseButtonReleased(_) => "MouseButtonReleased",
            Self::MouseMoved { .. } => "MouseMoved",
            Self::MouseScrolled { .. } => "MouseScrolled",
        }
    }
}

/// # Event
///
/// An [EventKind] travelling through the layer stack. Dispatch stops at the first layer that sets
/// `handled`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// True once a handler consumed the event.
    pub handled: bool,
}

impl Event {
    /// Returns an unhandled event.
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            handled: false,
        }
    }

    /// Returns true if the event belongs to the given category.
    pub fn is_in_category(&self, category: EventCategory) -> bool {
        self.kind.category().intersects(category)
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

/// # Input
///
/// Keyboard and mouse state, updated from events before they reach the layers.
#[derive(Clone, Debug, Default)]
pub struct Input {
    pressed_keys: HashSet<KeyCode>,
    pressed_buttons: HashSet<MouseButton>,
    mouse_position: Vec2,
}

impl Input {
    /// Returns input with nothing pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the state from the event.
    pub fn handle_event(&mut self, kind: &EventKind) {
        match *kind {
            EventKind::KeyPressed { key, .. } => {
                self.pressed_keys.insert(key);
            }
            EventKind::KeyReleased { key } => {
                self.pressed_keys.remove(&key);
            }
            EventKind::MouseButtonPressed(button) => {
                self.pressed_buttons.insert(button);
            }
            EventKind::MouseButtonReleased(button) => {
                self.pressed_buttons.remove(&button);
            }
            EventKind::MouseMoved { x, y } => {
                self.mouse_position = Vec2::new(x, y);
            }
            EventKind::WindowFocus(false) => {
                self.pressed_keys.clear();
                self.pressed_buttons.clear();
            }
            _ => {}
        }
    }

    /// Returns true if the key is held down.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Returns true if the mouse button is held down.
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Returns the cursor position in window pixels.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Returns the cursor x position.
    pub fn mouse_x(&self) -> f32 {
        self.mouse_position.x
    }

    /// Returns the cursor y position.
    pub fn mouse_y(&self) -> f32 {
        self.mouse_position.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pressed_category_returns_input_and_keyboard() {
        let event = Event::new(EventKind::KeyPressed {
            key: KeyCode::KeyA,
            repeat: false,
        });

        assert!(event.is_in_category(EventCategory::KEYBOARD));
        assert!(event.is_in_category(EventCategory::INPUT));
        assert!(!event.is_in_category(EventCategory::MOUSE));
    }

    #[test]
    fn window_close_category_returns_application() {
        assert_eq!(
            EventKind::WindowClose.category(),
            EventCategory::APPLICATION
        );
    }

    #[test]
    fn key_pressed_is_key_pressed_returns_true() {
        let mut input = Input::new();

        input.handle_event(&EventKind::KeyPressed {
            key: KeyCode::Space,
            repeat: false,
        });

        assert!(input.is_key_pressed(KeyCode::Space));
    }

    #[test]
    fn key_released_is_key_pressed_returns_false() {
        let mut input = Input::new();
        input.handle_event(&EventKind::KeyPressed {
            key: KeyCode::Space,
            repeat: false,
        });

        input.handle_event(&EventKind::KeyReleased {
            key: KeyCode::Space,
        });

        assert!(!input.is_key_pressed(KeyCode::Space));
    }

    #[test]
    fn focus_lost_releases_everything() {
        let mut input = Input::new();
        input.handle_event(&EventKind::MouseButtonPressed(MouseButton::Left));

        input.handle_event(&EventKind::WindowFocus(false));

        assert!(!input.is_mouse_button_pressed(MouseButton::Left));
    }

    #[test]
    fn mouse_moved_mouse_position_returns_position() {
        let mut input = Input::new();

        input.handle_event(&EventKind::MouseMoved { x: 12.0, y: 34.0 });

        assert_eq!(input.mouse_position(), Vec2::new(12.0, 34.0));
    }
}
