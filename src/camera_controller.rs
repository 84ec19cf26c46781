//! # Camera Controller
//!
//! A 2D orthographic camera moved with WASD, optionally rotated with Q and E, and zoomed with the
//! mouse wheel. Movement speed follows the zoom level so panning feels the same at every zoom.

use glam::Mat4;
use glam::Vec3;
use winit::keyboard::KeyCode;

use crate::input::Event;
use crate::input::EventKind;
use crate::input::Input;
use crate::time::Timestep;

/// Smallest zoom level reachable with the mouse wheel.
pub const MIN_ZOOM_LEVEL: f32 = 0.25;

const ZOOM_STEP: f32 = 0.25;
const ROTATION_SPEED: f32 = 180.0;

/// # Orthographic Camera Bounds
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrthographicCameraBounds {
    /// Left edge.
    pub left: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
    /// Top edge.
    pub top: f32,
}

impl OrthographicCameraBounds {
    fn from_zoom(aspect_ratio: f32, zoom_level: f32) -> Self {
        Self {
            left: -aspect_ratio * zoom_level,
            right: aspect_ratio * zoom_level,
            bottom: -zoom_level,
            top: zoom_level,
        }
    }

    /// Returns the horizontal extent.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Returns the vertical extent.
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// # Orthographic Camera
///
/// Position and rotation in the XY plane with a cached view-projection matrix.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrthographicCamera {
    projection: Mat4,
    view: Mat4,
    view_projection: Mat4,
    position: Vec3,
    rotation: f32,
}

impl OrthographicCamera {
    /// Returns a camera at the origin with the given bounds.
    pub fn new(bounds: OrthographicCameraBounds) -> Self {
        let mut camera = Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
            rotation: 0.0,
        };
        camera.set_projection(bounds);
        camera
    }

    /// Sets the projection bounds. The depth range is -1 to 1.
    pub fn set_projection(&mut self, bounds: OrthographicCameraBounds) {
        self.projection = Mat4::orthographic_rh_gl(
            bounds.left,
            bounds.right,
            bounds.bottom,
            bounds.top,
            -1.0,
            1.0,
        );
        self.view_projection = self.projection * self.view;
    }

    /// Returns the position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Sets the position.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recalculate_view();
    }

    /// Returns the counter-clockwise rotation in degrees.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Sets the counter-clockwise rotation in degrees.
    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
        self.recalculate_view();
    }

    /// Returns the projection matrix.
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Returns the view matrix.
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Returns the projection matrix times the view matrix.
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    fn recalculate_view(&mut self) {
        // Inverse of translate * rotate_z, which is always invertible.
        self.view = Mat4::from_rotation_z(-self.rotation.to_radians())
            * Mat4::from_translation(-self.position);
        self.view_projection = self.projection * self.view;
    }
}

/// # Orthographic Camera Controller
pub struct OrthographicCameraController {
    aspect_ratio: f32,
    zoom_level: f32,
    bounds: OrthographicCameraBounds,
    camera: OrthographicCamera,
    rotation: bool,
    position: Vec3,
    angle: f32,
}

impl OrthographicCameraController {
    /// Returns a controller for the aspect ratio. Q and E rotate the camera when `rotation` is set.
    pub fn new(aspect_ratio: f32, rotation: bool) -> Self {
        let zoom_level = 1.0;
        let bounds = OrthographicCameraBounds::from_zoom(aspect_ratio, zoom_level);
        Self {
            aspect_ratio,
            zoom_level,
            bounds,
            camera: OrthographicCamera::new(bounds),
            rotation,
            position: Vec3::ZERO,
            angle: 0.0,
        }
    }

    /// Moves and rotates the camera from the held keys.
    pub fn on_update(&mut self, input: &Input, timestep: Timestep) {
        let distance = self.translation_speed() * timestep.seconds();
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let right = Vec3::new(cos, sin, 0.0);
        let up = Vec3::new(-sin, cos, 0.0);

        if input.is_key_pressed(KeyCode::KeyA) {
            self.position -= right * distance;
        } else if input.is_key_pressed(KeyCode::KeyD) {
            self.position += right * distance;
        }

        if input.is_key_pressed(KeyCode::KeyW) {
            self.position += up * distance;
        } else if input.is_key_pressed(KeyCode::KeyS) {
            self.position -= up * distance;
        }

        if self.rotation {
            if input.is_key_pressed(KeyCode::KeyQ) {
                self.angle += ROTATION_SPEED * timestep.seconds();
            }
            if input.is_key_pressed(KeyCode::KeyE) {
                self.angle -= ROTATION_SPEED * timestep.seconds();
            }

            if self.angle > 180.0 {
                self.angle -= 360.0;
            } else if self.angle <= -180.0 {
                self.angle += 360.0;
            }
            self.camera.set_rotation(self.angle);
        }

        self.camera.set_position(self.position);
    }

    /// Zooms on mouse scroll and follows window resizes. The event is left unhandled.
    pub fn on_event(&mut self, event: &mut Event) {
        match event.kind {
            EventKind::MouseScrolled { y, .. } => {
                self.set_zoom_level(self.zoom_level - y * ZOOM_STEP);
            }
            EventKind::WindowResize { width, height } => {
                self.on_resize(width as f32, height as f32);
            }
            _ => {}
        }
    }

    /// Sets the aspect ratio from a viewport size. Ignored while either dimension is zero.
    pub fn on_resize(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        self.aspect_ratio = width / height;
        self.recalculate_projection();
    }

    /// Returns the camera.
    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    /// Returns the current projection bounds.
    pub fn bounds(&self) -> OrthographicCameraBounds {
        self.bounds
    }

    /// Returns the aspect ratio.
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Returns the zoom level, the half height of the visible area.
    pub fn zoom_level(&self) -> f32 {
        self.zoom_level
    }

    /// Sets the zoom level, clamped to [MIN_ZOOM_LEVEL].
    pub fn set_zoom_level(&mut self, zoom_level: f32) {
        self.zoom_level = zoom_level.max(MIN_ZOOM_LEVEL);
        self.recalculate_projection();
    }

    /// Returns the translation speed in units per second.
    pub fn translation_speed(&self) -> f32 {
        self.zoom_level
    }

    /// Returns the camera position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Returns the camera rotation in degrees.
    pub fn rotation(&self) -> f32 {
        self.angle
    }

    /// Returns the camera's view-projection matrix.
    pub fn view_projection(&self) -> Mat4 {
        self.camera.view_projection()
    }

    fn recalculate_projection(&mut self) {
        self.bounds = OrthographicCameraBounds::from_zoom(self.aspect_ratio, self.zoom_level);
        self.camera.set_projection(self.bounds);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    const EPSILON: f32 = 1e-5;

    fn holding(keys: &[KeyCode]) -> Input {
        let mut input = Input::new();
        for key in keys {
            input.handle_event(&EventKind::KeyPressed {
                key: *key,
                repeat: false,
            });
        }
        input
    }

    #[test]
    fn new_bounds_follow_aspect_ratio() {
        let controller = OrthographicCameraController::new(2.0, false);

        let bounds = controller.bounds();

        assert_eq!(bounds.left, -2.0);
        assert_eq!(bounds.right, 2.0);
        assert_eq!(bounds.bottom, -1.0);
        assert_eq!(bounds.top, 1.0);
        assert_eq!(bounds.width(), 4.0);
        assert_eq!(bounds.height(), 2.0);
    }

    #[test]
    fn scroll_out_increases_zoom_level() {
        let mut controller = OrthographicCameraController::new(1.0, false);
        let mut event = Event::new(EventKind::MouseScrolled { x: 0.0, y: -2.0 });

        controller.on_event(&mut event);

        assert_eq!(controller.zoom_level(), 1.5);
        assert_eq!(controller.bounds().height(), 3.0);
        assert!(!event.handled);
    }

    #[test]
    fn scroll_in_clamps_zoom_level() {
        let mut controller = OrthographicCameraController::new(1.0, false);
        let mut event = Event::new(EventKind::MouseScrolled { x: 0.0, y: 10.0 });

        controller.on_event(&mut event);

        assert_eq!(controller.zoom_level(), MIN_ZOOM_LEVEL);
        assert_eq!(controller.bounds().top, MIN_ZOOM_LEVEL);
    }

    #[test]
    fn window_resize_updates_aspect_ratio() {
        let mut controller = OrthographicCameraController::new(1.0, false);
        let mut event = Event::new(EventKind::WindowResize {
            width: 1600,
            height: 800,
        });

        controller.on_event(&mut event);

        assert_eq!(controller.aspect_ratio(), 2.0);
        assert_eq!(controller.bounds().right, 2.0);
    }

    #[test]
    fn window_resize_to_zero_keeps_aspect_ratio() {
        let mut controller = OrthographicCameraController::new(1.5, false);
        let mut event = Event::new(EventKind::WindowResize {
            width: 0,
            height: 0,
        });

        controller.on_event(&mut event);

        assert_eq!(controller.aspect_ratio(), 1.5);
    }

    #[test]
    fn on_update_held_keys_move_camera() {
        let mut controller = OrthographicCameraController::new(1.0, false);
        let input = holding(&[KeyCode::KeyD, KeyCode::KeyW]);

        controller.on_update(&input, Timestep::from_seconds(0.5));

        assert!(controller
            .position()
            .abs_diff_eq(Vec3::new(0.5, 0.5, 0.0), EPSILON));
        assert_eq!(controller.camera().position(), controller.position());
    }

    #[test]
    fn on_update_movement_scales_with_zoom_level() {
        let mut controller = OrthographicCameraController::new(1.0, false);
        controller.set_zoom_level(4.0);
        let input = holding(&[KeyCode::KeyA]);

        controller.on_update(&input, Timestep::from_seconds(0.5));

        assert!(controller
            .position()
            .abs_diff_eq(Vec3::new(-2.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn on_update_rotation_disabled_ignores_rotation_keys() {
        let mut controller = OrthographicCameraController::new(1.0, false);
        let input = holding(&[KeyCode::KeyQ]);

        controller.on_update(&input, Timestep::from_seconds(0.5));

        assert_eq!(controller.rotation(), 0.0);
    }

    #[test]
    fn on_update_rotation_enabled_rotates_and_moves_along_rotated_axes() {
        let mut controller = OrthographicCameraController::new(1.0, true);

        controller.on_update(&holding(&[KeyCode::KeyQ]), Timestep::from_seconds(0.5));
        controller.on_update(&holding(&[KeyCode::KeyW]), Timestep::from_seconds(1.0));

        assert_eq!(controller.rotation(), 90.0);
        assert!(controller
            .position()
            .abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn view_projection_maps_camera_position_to_center() {
        let mut controller = OrthographicCameraController::new(1.0, false);
        controller.on_update(&holding(&[KeyCode::KeyD]), Timestep::from_seconds(2.0));

        let clip = controller.view_projection() * Vec4::new(2.0, 0.0, 0.0, 1.0);

        assert!(clip.abs_diff_eq(Vec4::new(0.0, 0.0, 0.0, 1.0), EPSILON));
    }
}
