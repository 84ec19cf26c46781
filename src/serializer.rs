//! # Scene Serializer
//!
//! Reads and writes scenes as JSON documents:
//!
//! ```json
//! {
//!   "Scene": "Untitled",
//!   "Entities": [
//!     {
//!       "Entity": 2,
//!       "Parent": 1,
//!       "TagComponent": { "Tag": "Player" },
//!       "TransformComponent": { "Translation": [0, 0, 0], "Rotation": [0, 0, 0], "Scale": [1, 1, 1] }
//!     }
//!   ]
//! }
//! ```
//!
//! Entities are written in id order and keep their ids when read back. Native scripts are not
//! persisted.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use glam::Vec3;
use glam::Vec4;
use serde::Deserialize;
use serde::Serialize;

use crate::components::CameraComponent;
use crate::components::ProjectionType;
use crate::components::SceneCamera;
use crate::components::SpriteRendererComponent;
use crate::components::TagComponent;
use crate::components::TransformComponent;
use crate::scene::EntityId;
use crate::scene::SceneError;
use crate::Scene;

#[derive(Serialize, Deserialize)]
struct SceneDocument {
    #[serde(rename = "Scene")]
    name: String,
    #[serde(rename = "Entities", default)]
    entities: Vec<EntityDocument>,
}

#[derive(Serialize, Deserialize)]
struct EntityDocument {
    #[serde(rename = "Entity")]
    id: u64,
    #[serde(rename = "Parent", default, skip_serializing_if = "Option::is_none")]
    parent: Option<u64>,
    #[serde(rename = "TagComponent", default, skip_serializing_if = "Option::is_none")]
    tag: Option<TagDocument>,
    #[serde(rename = "TransformComponent", default, skip_serializing_if = "Option::is_none")]
    transform: Option<TransformDocument>,
    #[serde(rename = "CameraComponent", default, skip_serializing_if = "Option::is_none")]
    camera: Option<CameraDocument>,
    #[serde(rename = "SpriteRendererComponent", default, skip_serializing_if = "Option::is_none")]
    sprite: Option<SpriteDocument>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TagDocument {
    tag: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TransformDocument {
    translation: Vec3,
    rotation: Vec3,
    scale: Vec3,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CameraDocument {
    camera: CameraSettingsDocument,
    primary: bool,
    #[serde(default)]
    fixed_aspect_ratio: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CameraSettingsDocument {
    projection_type: i32,
    #[serde(rename = "PerspectiveFOV")]
    perspective_fov: f32,
    perspective_near: f32,
    perspective_far: f32,
    orthographic_size: f32,
    orthographic_near: f32,
    orthographic_far: f32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SpriteDocument {
    color: Vec4,
}

impl From<&CameraComponent> for CameraDocument {
    fn from(component: &CameraComponent) -> Self {
        let camera = &component.camera;
        Self {
            camera: CameraSettingsDocument {
                projection_type: camera.projection_type().into(),
                perspective_fov: camera.perspective_fov(),
                perspective_near: camera.perspective_near(),
                perspective_far: camera.perspective_far(),
                orthographic_size: camera.orthographic_size(),
                orthographic_near: camera.orthographic_near(),
                orthographic_far: camera.orthographic_far(),
            },
            primary: component.primary,
            fixed_aspect_ratio: component.fixed_aspect_ratio,
        }
    }
}

impl TryFrom<CameraDocument> for CameraComponent {
    type Error = SceneError;

    fn try_from(document: CameraDocument) -> Result<Self, Self::Error> {
        let settings = document.camera;
        let projection_type = ProjectionType::try_from(settings.projection_type)?;

        let mut camera = SceneCamera::new();
        camera.set_perspective(
            settings.perspective_fov,
            settings.perspective_near,
            settings.perspective_far,
        );
        camera.set_orthographic(
            settings.orthographic_size,
            settings.orthographic_near,
            settings.orthographic_far,
        );
        camera.set_projection_type(projection_type);

        Ok(Self {
            camera,
            primary: document.primary,
            fixed_aspect_ratio: document.fixed_aspect_ratio,
        })
    }
}

fn entity_document(scene: &Scene, id: EntityId) -> EntityDocument {
    EntityDocument {
        id: id.raw(),
        parent: scene.parent(id).map(EntityId::raw),
        tag: scene
            .get::<TagComponent>(id)
            .map(|tag| TagDocument {
                tag: tag.tag.clone(),
            }),
        transform: scene
            .get::<TransformComponent>(id)
            .map(|transform| TransformDocument {
                translation: transform.translation(),
                rotation: transform.rotation(),
                scale: transform.scale(),
            }),
        camera: scene
            .get::<CameraComponent>(id)
            .map(|camera| CameraDocument::from(&*camera)),
        sprite: scene
            .get::<SpriteRendererComponent>(id)
            .map(|sprite| SpriteDocument {
                color: sprite.color,
            }),
    }
}

/// Returns the scene as a pretty-printed JSON document.
pub fn serialize_to_string(scene: &Scene) -> Result<String, SceneError> {
    let document = SceneDocument {
        name: scene.name().to_string(),
        entities: scene
            .entity_ids()
            .into_iter()
            .map(|id| entity_document(scene, id))
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&document)?)
}

/// Writes the scene to a JSON file.
pub fn serialize(scene: &Scene, path: impl AsRef<Path>) -> Result<(), SceneError> {
    let path = path.as_ref();
    fs::write(path, serialize_to_string(scene)?)?;

    log::info!(
        "Serialized scene '{}' ({} entities) to {}",
        scene.name(),
        scene.entity_count(),
        path.display()
    );
    Ok(())
}

fn validate(document: &SceneDocument) -> Result<(), SceneError> {
    let mut ids = BTreeSet::new();
    for entity in &document.entities {
        if !ids.insert(entity.id) {
            return Err(SceneError::DuplicateEntity(EntityId::from_raw(entity.id)));
        }
    }

    for entity in &document.entities {
        if let Some(parent) = entity.parent {
            if !ids.contains(&parent) {
                return Err(SceneError::MissingParent {
                    child: EntityId::from_raw(entity.id),
                    parent: EntityId::from_raw(parent),
                });
            }
        }
    }

    Ok(())
}

/// Builds a scene from a JSON document.
pub fn deserialize_str(json: &str) -> Result<Scene, SceneError> {
    let document: SceneDocument = serde_json::from_str(json)?;
    validate(&document)?;

    let scene = Scene::with_name(document.name);
    let mut parents = Vec::new();

    for entity in document.entities {
        let id = EntityId::from_raw(entity.id);
        let tag = entity.tag.as_ref().map(|tag| tag.tag.as_str()).unwrap_or("");
        if scene.create_entity_with_id(id, tag).is_none() {
            return Err(SceneError::DuplicateEntity(id));
        }

        match entity.tag {
            Some(tag) => scene.set(id, TagComponent::new(tag.tag)),
            None => {
                scene.remove::<TagComponent>(id);
            }
        }

        match entity.transform {
            Some(transform) => {
                if let Some(mut component) = scene.get_mut::<TransformComponent>(id) {
                    component.set(transform.translation, transform.rotation, transform.scale)?;
                }
            }
            None => {
                scene.remove::<TransformComponent>(id);
            }
        }

        if let Some(camera) = entity.camera {
            scene.add(id, CameraComponent::try_from(camera)?);
        }

        if let Some(sprite) = entity.sprite {
            scene.add(id, SpriteRendererComponent::new(sprite.color));
        }

        if let Some(parent) = entity.parent {
            parents.push((id, EntityId::from_raw(parent)));
        }
    }

    for (child, parent) in parents {
        scene.set_parent(child, parent)?;
    }

    log::info!(
        "Deserialized scene '{}' ({} entities)",
        scene.name(),
        scene.entity_count()
    );
    Ok(scene)
}

/// Reads a scene from a JSON file.
pub fn deserialize(path: impl AsRef<Path>) -> Result<Scene, SceneError> {
    let json = fs::read_to_string(path)?;
    deserialize_str(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> Scene {
        let scene = Scene::with_name("Sample");

        let camera = scene.create_entity("Camera");
        let mut component = CameraComponent::default();
        component.camera.set_orthographic(20.0, -2.0, 2.0);
        component.fixed_aspect_ratio = true;
        camera.add(component);

        let player = scene.create_entity("Player");
        player
            .get_mut::<TransformComponent>()
            .unwrap()
            .set(
                Vec3::new(1.5, -2.0, 3.25),
                Vec3::new(0.0, 0.5, 0.0),
                Vec3::new(2.0, 2.0, 1.0),
            )
            .unwrap();
        player.add(SpriteRendererComponent::new(Vec4::new(0.2, 0.3, 0.8, 1.0)));

        let weapon = scene.create_entity("Weapon");
        weapon.set_parent(player.id()).unwrap();

        scene
    }

    #[test]
    fn serialize_to_string_writes_entities_in_id_order() {
        let scene = sample_scene();

        let json = serialize_to_string(&scene).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["Scene"], "Sample");
        let ids: Vec<u64> = value["Entities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entity| entity["Entity"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(value["Entities"][2]["Parent"], 2);
        assert_eq!(value["Entities"][0]["CameraComponent"]["Camera"]["ProjectionType"], 1);
        assert!(value["Entities"][0].get("SpriteRendererComponent").is_none());
    }

    #[test]
    fn deserialize_str_round_trips_document() {
        let json = serialize_to_string(&sample_scene()).unwrap();

        let scene = deserialize_str(&json).unwrap();

        assert_eq!(serialize_to_string(&scene).unwrap(), json);
        assert_eq!(scene.name(), "Sample");
        assert_eq!(scene.parent(EntityId::from_raw(3)), Some(EntityId::from_raw(2)));
    }

    #[test]
    fn deserialize_str_after_parent_transform_removed_round_trips() {
        let scene = sample_scene();
        drop(scene.remove::<TransformComponent>(EntityId::from_raw(2)));
        let json = serialize_to_string(&scene).unwrap();

        let loaded = deserialize_str(&json).unwrap();

        assert_eq!(loaded.parent(EntityId::from_raw(3)), None);
        assert!(!loaded.has::<TransformComponent>(EntityId::from_raw(2)));
        assert_eq!(serialize_to_string(&loaded).unwrap(), json);
    }

    #[test]
    fn deserialize_str_restores_components() {
        let json = serialize_to_string(&sample_scene()).unwrap();

        let scene = deserialize_str(&json).unwrap();

        let camera = scene.get::<CameraComponent>(EntityId::from_raw(1)).unwrap();
        assert_eq!(camera.camera.projection_type(), ProjectionType::Orthographic);
        assert_eq!(camera.camera.orthographic_size(), 20.0);
        assert!(camera.fixed_aspect_ratio);
        drop(camera);

        let player = EntityId::from_raw(2);
        assert_eq!(
            scene.get::<TransformComponent>(player).unwrap().translation(),
            Vec3::new(1.5, -2.0, 3.25)
        );
        assert_eq!(
            scene.get::<SpriteRendererComponent>(player).unwrap().color,
            Vec4::new(0.2, 0.3, 0.8, 1.0)
        );
        assert_eq!(scene.entity(player).unwrap().name().as_deref(), Some("Player"));
    }

    #[test]
    fn deserialize_str_continues_entity_ids_after_loaded() {
        let json = serialize_to_string(&sample_scene()).unwrap();
        let scene = deserialize_str(&json).unwrap();

        let entity = scene.create_entity("Late");

        assert_eq!(entity.id(), EntityId::from_raw(4));
    }

    #[test]
    fn serialize_writes_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("sample.json");

        serialize(&sample_scene(), &path).unwrap();
        let scene = deserialize(&path).unwrap();

        assert_eq!(scene.entity_count(), 3);
    }

    #[test]
    fn deserialize_missing_file_returns_io_error() {
        let directory = tempfile::tempdir().unwrap();

        let result = deserialize(directory.path().join("missing.json"));

        assert!(matches!(result, Err(SceneError::Io(_))));
    }

    #[test]
    fn deserialize_str_invalid_projection_type_returns_error() {
        let json = r#"{
            "Scene": "Broken",
            "Entities": [{
                "Entity": 0,
                "CameraComponent": {
                    "Camera": {
                        "ProjectionType": 7,
                        "PerspectiveFOV": 0.78,
                        "PerspectiveNear": 0.01,
                        "PerspectiveFar": 1000.0,
                        "OrthographicSize": 10.0,
                        "OrthographicNear": -1.0,
                        "OrthographicFar": 1.0
                    },
                    "Primary": true
                }
            }]
        }"#;

        let result = deserialize_str(json);

        assert!(matches!(result, Err(SceneError::InvalidProjectionType(7))));
    }

    #[test]
    fn deserialize_str_duplicate_entity_returns_error() {
        let json = r#"{"Scene": "Twice", "Entities": [{"Entity": 4}, {"Entity": 4}]}"#;

        let result = deserialize_str(json);

        assert!(matches!(result, Err(SceneError::DuplicateEntity(id)) if id.raw() == 4));
    }

    #[test]
    fn deserialize_str_missing_parent_returns_error() {
        let json = r#"{"Scene": "Orphan", "Entities": [{"Entity": 1, "Parent": 9}]}"#;

        let result = deserialize_str(json);

        assert!(matches!(
            result,
            Err(SceneError::MissingParent { child, parent }) if child.raw() == 1 && parent.raw() == 9
        ));
    }

    #[test]
    fn deserialize_str_omitted_components_are_absent() {
        let json = r#"{"Scene": "Bare", "Entities": [{"Entity": 0}]}"#;

        let scene = deserialize_str(json).unwrap();

        let id = EntityId::from_raw(0);
        assert!(scene.contains(id));
        assert!(!scene.has::<TagComponent>(id));
        assert!(!scene.has::<TransformComponent>(id));
    }

    #[test]
    fn deserialize_str_malformed_json_returns_error() {
        let result = deserialize_str("{ not json");

        assert!(matches!(result, Err(SceneError::Json(_))));
    }
}
