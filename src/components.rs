use std::f32::consts::FRAC_PI_4;

use glam::EulerRot;
use glam::Mat4;
use glam::Quat;
use glam::Vec3;
use glam::Vec4;

use crate::scene::Entity;
use crate::scene::SceneError;
use crate::time::Timestep;
use crate::transform::Transform;
use crate::transform::TransformError;
use crate::Component;

/// # Tag Component
///
/// Display name of the entity.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagComponent {
    /// Entity name.
    pub tag: String,
}

impl TagComponent {
    /// Returns a tag with the given name.
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl Component for TagComponent {}

/// # Transform Component
///
/// Translation, euler rotation (radians, applied X then Y then Z), and scale of the entity relative
/// to its parent, backed by a hierarchical [Transform].
///
/// The authored values are returned as they were set for as long as nothing else changed the
/// underlying transform. Once the transform changes through another path, for example when the
/// parent entity is destroyed and the transform re-bakes its local values, the getters derive the
/// values from the transform instead.
#[derive(Debug)]
pub struct TransformComponent {
    translation: Vec3,
    rotation: Vec3,
    scale: Vec3,
    transform: Transform,
    synced_revision: u64,
}

impl TransformComponent {
    /// Returns a component with the given local values.
    pub fn new(translation: Vec3, rotation: Vec3, scale: Vec3) -> Result<Self, TransformError> {
        let transform = Transform::new(translation, euler_to_quat(rotation), scale)?;
        let synced_revision = transform.revision();

        Ok(Self {
            translation,
            rotation,
            scale,
            transform,
            synced_revision,
        })
    }

    /// Returns a component at the given translation.
    pub fn from_translation(translation: Vec3) -> Self {
        let transform = Transform::from_position(translation);
        let synced_revision = transform.revision();

        Self {
            translation,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            transform,
            synced_revision,
        }
    }

    fn is_synced(&self) -> bool {
        self.transform.revision() == self.synced_revision
    }

    fn sync_from_transform(&mut self) {
        if !self.is_synced() {
            self.translation = self.translation();
            self.rotation = self.rotation();
            self.scale = self.scale();
            self.synced_revision = self.transform.revision();
        }
    }

    /// Returns the local translation.
    pub fn translation(&self) -> Vec3 {
        if self.is_synced() {
            self.translation
        } else {
            self.transform.local_position()
        }
    }

    /// Returns the local euler rotation in radians.
    pub fn rotation(&self) -> Vec3 {
        if self.is_synced() {
            self.rotation
        } else {
            let (x, y, z) = self.transform.local_rotation().to_euler(EulerRot::XYZ);
            Vec3::new(x, y, z)
        }
    }

    /// Returns the local scale.
    pub fn scale(&self) -> Vec3 {
        if self.is_synced() {
            self.scale
        } else {
            self.transform.local_scale()
        }
    }

    /// Sets every local value at once.
    pub fn set(&mut self, translation: Vec3, rotation: Vec3, scale: Vec3) -> Result<(), TransformError> {
        self.transform
            .generate_matrices_local(translation, euler_to_quat(rotation), scale)?;
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
        self.synced_revision = self.transform.revision();
        Ok(())
    }

    /// Sets the local translation.
    pub fn set_translation(&mut self, translation: Vec3) -> Result<(), TransformError> {
        self.sync_from_transform();
        self.set(translation, self.rotation, self.scale)
    }

    /// Sets the local euler rotation in radians.
    pub fn set_rotation(&mut self, rotation: Vec3) -> Result<(), TransformError> {
        self.sync_from_transform();
        self.set(self.translation, rotation, self.scale)
    }

    /// Sets the local scale.
    pub fn set_scale(&mut self, scale: Vec3) -> Result<(), TransformError> {
        self.sync_from_transform();
        self.set(self.translation, self.rotation, scale)
    }

    /// Returns the hierarchical transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Returns the world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        self.transform.world_matrix()
    }
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

impl Component for TransformComponent {}

fn euler_to_quat(rotation: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z)
}

/// # Projection Type
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ProjectionType {
    /// Perspective projection.
    #[default]
    Perspective = 0,
    /// Orthographic projection.
    Orthographic = 1,
}

impl From<ProjectionType> for i32 {
    fn from(projection_type: ProjectionType) -> Self {
        projection_type as i32
    }
}

impl TryFrom<i32> for ProjectionType {
    type Error = SceneError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Perspective),
            1 => Ok(Self::Orthographic),
            _ => Err(SceneError::InvalidProjectionType(value)),
        }
    }
}

/// # Scene Camera
///
/// Projection parameters for both projection types. Only the active type is used to compute the
/// projection matrix, which is cached and recomputed by every setter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SceneCamera {
    projection_type: ProjectionType,
    perspective_fov: f32,
    perspective_near: f32,
    perspective_far: f32,
    orthographic_size: f32,
    orthographic_near: f32,
    orthographic_far: f32,
    aspect_ratio: f32,
    projection: Mat4,
}

impl SceneCamera {
    /// Returns a perspective camera with a 45 degree vertical field of view.
    pub fn new() -> Self {
        let mut camera = Self {
            projection_type: ProjectionType::Perspective,
            perspective_fov: FRAC_PI_4,
            perspective_near: 0.01,
            perspective_far: 1000.0,
            orthographic_size: 10.0,
            orthographic_near: -1.0,
            orthographic_far: 1.0,
            aspect_ratio: 1.0,
            projection: Mat4::IDENTITY,
        };
        camera.recalculate_projection();
        camera
    }

    /// Switches to a perspective projection.
    pub fn set_perspective(&mut self, fov: f32, near: f32, far: f32) {
        self.projection_type = ProjectionType::Perspective;
        self.perspective_fov = fov;
        self.perspective_near = near;
        self.perspective_far = far;
        self.recalculate_projection();
    }

    /// Switches to an orthographic projection.
    pub fn set_orthographic(&mut self, size: f32, near: f32, far: f32) {
        self.projection_type = ProjectionType::Orthographic;
        self.orthographic_size = size;
        self.orthographic_near = near;
        self.orthographic_far = far;
        self.recalculate_projection();
    }

    /// Sets the aspect ratio from the viewport. Zero-height viewports are ignored.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }

        self.aspect_ratio = width as f32 / height as f32;
        self.recalculate_projection();
    }

    /// Returns the active projection type.
    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    /// Sets the active projection type.
    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
        self.recalculate_projection();
    }

    /// Returns the vertical field of view in radians.
    pub fn perspective_fov(&self) -> f32 {
        self.perspective_fov
    }

    /// Sets the vertical field of view in radians.
    pub fn set_perspective_fov(&mut self, fov: f32) {
        self.perspective_fov = fov;
        self.recalculate_projection();
    }

    /// Returns the perspective near plane.
    pub fn perspective_near(&self) -> f32 {
        self.perspective_near
    }

    /// Sets the perspective near plane.
    pub fn set_perspective_near(&mut self, near: f32) {
        self.perspective_near = near;
        self.recalculate_projection();
    }

    /// Returns the perspective far plane.
    pub fn perspective_far(&self) -> f32 {
        self.perspective_far
    }

    /// Sets the perspective far plane.
    pub fn set_perspective_far(&mut self, far: f32) {
        self.perspective_far = far;
        self.recalculate_projection();
    }

    /// Returns the orthographic view height.
    pub fn orthographic_size(&self) -> f32 {
        self.orthographic_size
    }

    /// Sets the orthographic view height.
    pub fn set_orthographic_size(&mut self, size: f32) {
        self.orthographic_size = size;
        self.recalculate_projection();
    }

    /// Returns the orthographic near plane.
    pub fn orthographic_near(&self) -> f32 {
        self.orthographic_near
    }

    /// Sets the orthographic near plane.
    pub fn set_orthographic_near(&mut self, near: f32) {
        self.orthographic_near = near;
        self.recalculate_projection();
    }

    /// Returns the orthographic far plane.
    pub fn orthographic_far(&self) -> f32 {
        self.orthographic_far
    }

    /// Sets the orthographic far plane.
    pub fn set_orthographic_far(&mut self, far: f32) {
        self.orthographic_far = far;
        self.recalculate_projection();
    }

    /// Returns width divided by height.
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Returns the projection matrix.
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    fn recalculate_projection(&mut self) {
        self.projection = match self.projection_type {
            ProjectionType::Perspective => Mat4::perspective_rh_gl(
                self.perspective_fov,
                self.aspect_ratio,
                self.perspective_near,
                self.perspective_far,
            ),
            ProjectionType::Orthographic => {
                let half_height = self.orthographic_size * 0.5;
                let half_width = half_height * self.aspect_ratio;
                Mat4::orthographic_rh_gl(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.orthographic_near,
                    self.orthographic_far,
                )
            }
        };
    }
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// # Camera Component
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraComponent {
    /// Projection settings.
    pub camera: SceneCamera,
    /// The scene renders through the first primary camera.
    pub primary: bool,
    /// Keeps the aspect ratio when the viewport is resized.
    pub fixed_aspect_ratio: bool,
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self {
            camera: SceneCamera::new(),
            primary: true,
            fixed_aspect_ratio: false,
        }
    }
}

impl Component for CameraComponent {}

/// # Sprite Renderer Component
///
/// Draws the entity as a colored unit quad.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpriteRendererComponent {
    /// Linear RGBA color.
    pub color: Vec4,
}

impl SpriteRendererComponent {
    /// Returns a sprite with the given color.
    pub const fn new(color: Vec4) -> Self {
        Self { color }
    }
}

impl Default for SpriteRendererComponent {
    fn default() -> Self {
        Self { color: Vec4::ONE }
    }
}

impl Component for SpriteRendererComponent {}

/// # Scriptable Entity
///
/// Native behavior attached to an entity through a [NativeScriptComponent].
pub trait ScriptableEntity {
    /// Called before the first update.
    fn on_create(&mut self, _entity: Entity<'_>) {}

    /// Called once per scene update.
    fn on_update(&mut self, _entity: Entity<'_>, _timestep: Timestep) {}

    /// Called when the entity is destroyed.
    fn on_destroy(&mut self, _entity: Entity<'_>) {}
}

/// # Native Script Component
///
/// Holds a bound [ScriptableEntity] type. The script is instantiated on the first scene update.
#[derive(Default)]
pub struct NativeScriptComponent {
    instantiate: Option<fn() -> Box<dyn ScriptableEntity>>,
    instance: Option<Box<dyn ScriptableEntity>>,
}

impl NativeScriptComponent {
    /// Returns a component bound to the script type.
    pub fn bound<T: ScriptableEntity + Default + 'static>() -> Self {
        let mut component = Self::default();
        component.bind::<T>();
        component
    }

    /// Binds the script type, dropping any existing instance.
    pub fn bind<T: ScriptableEntity + Default + 'static>(&mut self) {
        self.instantiate = Some(instantiate::<T>);
        self.instance = None;
    }

    /// Returns true if a script type is bound.
    pub fn is_bound(&self) -> bool {
        self.instantiate.is_some()
    }

    /// Returns true if the script was instantiated.
    pub fn is_instantiated(&self) -> bool {
        self.instance.is_some()
    }

    /// Takes the script instance out of the component, creating it if needed. The flag is true when
    /// the instance was created by this call.
    pub(crate) fn take_instance(&mut self) -> Option<(Box<dyn ScriptableEntity>, bool)> {
        match self.instance.take() {
            Some(instance) => Some((instance, false)),
            None => self.instantiate.map(|instantiate| (instantiate(), true)),
        }
    }

    /// Puts an instance taken with [NativeScriptComponent::take_instance] back.
    pub(crate) fn restore_instance(&mut self, instance: Box<dyn ScriptableEntity>) {
        self.instance = Some(instance);
    }

    /// Takes the existing instance without creating one.
    pub(crate) fn take_existing_instance(&mut self) -> Option<Box<dyn ScriptableEntity>> {
        self.instance.take()
    }
}

impl std::fmt::Debug for NativeScriptComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeScriptComponent")
            .field("bound", &self.is_bound())
            .field("instantiated", &self.is_instantiated())
            .finish()
    }
}

impl Component for NativeScriptComponent {}

fn instantiate<T: ScriptableEntity + Default + 'static>() -> Box<dyn ScriptableEntity> {
    Box::new(T::default())
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn transform_component_new_returns_authored_values() {
        let rotation = Vec3::new(0.1, 0.2, 0.3);

        let component = TransformComponent::new(Vec3::X, rotation, Vec3::splat(2.0)).unwrap();

        assert_eq!(component.translation(), Vec3::X);
        assert_eq!(component.rotation(), rotation);
        assert_eq!(component.scale(), Vec3::splat(2.0));
    }

    #[test]
    fn transform_component_world_matrix_applies_euler_rotation() {
        let component =
            TransformComponent::new(Vec3::ZERO, Vec3::new(0.0, 0.0, FRAC_PI_2), Vec3::ONE)
                .unwrap();

        let point = component.world_matrix().transform_point3(Vec3::X);

        assert!(point.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn transform_component_set_translation_keeps_rotation() {
        let rotation = Vec3::new(0.5, 0.0, 0.0);
        let mut component = TransformComponent::new(Vec3::ZERO, rotation, Vec3::ONE).unwrap();

        component.set_translation(Vec3::new(1.0, 2.0, 3.0)).unwrap();

        assert_eq!(component.rotation(), rotation);
        assert!(component
            .transform()
            .local_position()
            .abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn transform_component_external_change_getters_follow_transform() {
        let component = TransformComponent::from_translation(Vec3::X);

        component
            .transform()
            .set_local_position(Vec3::new(7.0, 0.0, 0.0))
            .unwrap();

        assert!(component
            .translation()
            .abs_diff_eq(Vec3::new(7.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn projection_type_try_from_unknown_returns_error() {
        assert!(matches!(
            ProjectionType::try_from(7),
            Err(SceneError::InvalidProjectionType(7))
        ));
        assert_eq!(
            ProjectionType::try_from(1).unwrap(),
            ProjectionType::Orthographic
        );
    }

    #[test]
    fn scene_camera_default_returns_perspective() {
        let camera = SceneCamera::default();

        assert_eq!(camera.projection_type(), ProjectionType::Perspective);
        assert_eq!(camera.perspective_fov(), FRAC_PI_4);
        assert_eq!(camera.orthographic_size(), 10.0);
    }

    #[test]
    fn set_viewport_size_updates_aspect_ratio_and_projection() {
        let mut camera = SceneCamera::new();
        let projection = camera.projection();

        camera.set_viewport_size(1600, 800);

        assert_eq!(camera.aspect_ratio(), 2.0);
        assert_ne!(camera.projection(), projection);
    }

    #[test]
    fn set_viewport_size_zero_height_is_ignored() {
        let mut camera = SceneCamera::new();

        camera.set_viewport_size(100, 0);

        assert_eq!(camera.aspect_ratio(), 1.0);
    }

    #[test]
    fn set_orthographic_projection_maps_size_to_unit_cube() {
        let mut camera = SceneCamera::new();

        camera.set_orthographic(4.0, -1.0, 1.0);

        let corner = camera.projection().project_point3(Vec3::new(2.0, 2.0, 0.0));
        assert!(corner.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[derive(Default)]
    struct Idle;

    impl ScriptableEntity for Idle {}

    #[test]
    fn native_script_take_instance_creates_once() {
        let mut component = NativeScriptComponent::bound::<Idle>();

        let (instance, created) = component.take_instance().unwrap();
        component.restore_instance(instance);
        let (_, created_again) = component.take_instance().unwrap();

        assert!(created);
        assert!(!created_again);
    }

    #[test]
    fn native_script_unbound_take_instance_returns_none() {
        let mut component = NativeScriptComponent::default();

        assert!(component.take_instance().is_none());
    }
}
