//! # Systems
//!
//! Per-frame passes over a [Scene]. [Scene::on_update], [Scene::on_viewport_resize], and
//! [Scene::on_render] run them in a fixed order.

use crate::components::CameraComponent;
use crate::components::NativeScriptComponent;
use crate::components::SpriteRendererComponent;
use crate::components::TransformComponent;
use crate::math;
use crate::renderer::Renderer;
use crate::time::Timestep;
use crate::Scene;

/// Updates every native script in the order the script components were added. A script is created
/// and receives `on_create` right before its first update.
pub fn run_native_scripts(scene: &Scene, timestep: Timestep) {
    for id in scene.entities_with::<NativeScriptComponent>() {
        let Some((mut script, created)) = scene
            .get_mut::<NativeScriptComponent>(id)
            .and_then(|mut component| component.take_instance())
        else {
            continue;
        };

        let Some(entity) = scene.entity(id) else {
            continue;
        };

        if created {
            script.on_create(entity);
        }
        script.on_update(entity, timestep);

        match scene.get_mut::<NativeScriptComponent>(id) {
            Some(mut component) => component.restore_instance(script),
            // The script destroyed its own entity or removed its component.
            None => script.on_destroy(entity),
        }
    }
}

/// Sets the aspect ratio of every camera without a fixed aspect ratio from the scene viewport.
pub fn sync_camera_viewports(scene: &Scene) {
    let (width, height) = scene.viewport();
    if width == 0 || height == 0 {
        return;
    }

    for id in scene.entities_with::<CameraComponent>() {
        if let Some(mut camera) = scene.get_mut::<CameraComponent>(id) {
            if !camera.fixed_aspect_ratio {
                camera.camera.set_viewport_size(width, height);
            }
        }
    }
}

/// Draws every sprite through the primary camera. Returns false if there is no primary camera or
/// its transform cannot be inverted.
pub fn submit_sprites(scene: &Scene, renderer: &mut Renderer) -> bool {
    let Some(camera_entity) = scene.primary_camera_entity() else {
        return false;
    };

    let Some(projection) = scene
        .get::<CameraComponent>(camera_entity)
        .map(|camera| camera.camera.projection())
    else {
        return false;
    };
    let camera_transform = scene
        .get::<TransformComponent>(camera_entity)
        .map(|transform| transform.world_matrix())
        .unwrap_or_default();

    let view = match math::inverse(&camera_transform) {
        Ok(view) => view,
        Err(error) => {
            log::warn!("Cannot render through camera {camera_entity}: {error}");
            return false;
        }
    };

    renderer.begin_scene(projection * view);
    for id in scene.entities_with::<SpriteRendererComponent>() {
        let Some(color) = scene
            .get::<SpriteRendererComponent>(id)
            .map(|sprite| sprite.color)
        else {
            continue;
        };
        let transform = scene
            .get::<TransformComponent>(id)
            .map(|transform| transform.world_matrix())
            .unwrap_or_default();

        renderer.draw_quad(&transform, color);
    }
    renderer.end_scene();

    true
}
