use std::any::Any;
use std::any::TypeId;
use std::cell::Cell;
use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use nohash::IntMap;

use crate::components::CameraComponent;
use crate::components::NativeScriptComponent;
use crate::components::TagComponent;
use crate::components::TransformComponent;
use crate::renderer::Renderer;
use crate::systems;
use crate::time::Timestep;
use crate::transform::TransformError;

/// # Component
///
/// Marker for types stored in a [Scene].
pub trait Component: 'static {}

/// # Scene Error
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The entity is not in the scene.
    #[error("entity {0} does not exist")]
    MissingEntity(EntityId),
    /// The entity has no transform component.
    #[error("entity {0} has no transform component")]
    MissingTransform(EntityId),
    /// The transform hierarchy rejected the operation.
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// A scene document lists the same entity twice.
    #[error("entity {0} is listed more than once")]
    DuplicateEntity(EntityId),
    /// A scene document references a parent that is not in the document.
    #[error("entity {child} references missing parent {parent}")]
    MissingParent {
        /// Entity with the dangling reference.
        child: EntityId,
        /// Referenced parent.
        parent: EntityId,
    },
    /// A scene document contains an unknown camera projection type.
    #[error("invalid projection type {0}")]
    InvalidProjectionType(i32),
    /// The scene document is not valid JSON for a scene.
    #[error("invalid scene document: {0}")]
    Json(#[from] serde_json::Error),
    /// The scene file could not be read or written.
    #[error("scene file error: {0}")]
    Io(#[from] std::io::Error),
}

/// # Component Event
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ComponentEvent {
    /// Component was added to the entity.
    Added(EntityId),
    /// Component was modified for the entity.
    Modified(EntityId),
    /// Component was removed from the entity.
    Removed(EntityId),
}

/// # Entity Id
///
/// Handle of an entity, unique within its scene. Ids of destroyed entities are not reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Returns the id with the given raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl nohash::IsEnabled for EntityId {}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

trait DynamicComponentTable {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn remove_boxed(&mut self, entity: EntityId) -> Option<Box<dyn Any>>;

    fn clear_events(&mut self);
}

struct ComponentTable<T> {
    entity_indexes: IntMap<EntityId, usize>,
    entities: Vec<EntityId>,
    items: Vec<T>,
    events: Vec<ComponentEvent>,
}

impl<T: Component> ComponentTable<T> {
    fn new() -> Self {
        Self {
            entity_indexes: IntMap::default(),
            entities: Vec::new(),
            items: Vec::new(),
            events: Vec::new(),
        }
    }

    fn add(&mut self, entity: EntityId, value: T) -> bool {
        if self.entity_indexes.contains_key(&entity) {
            return false;
        }

        self.entity_indexes.insert(entity, self.items.len());
        self.entities.push(entity);
        self.items.push(value);
        self.events.push(ComponentEvent::Added(entity));
        true
    }

    fn get(&self, entity: EntityId) -> Option<&T> {
        self.entity_indexes
            .get(&entity)
            .and_then(|index| self.items.get(*index))
    }

    fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        let index = *self.entity_indexes.get(&entity)?;
        self.items.get_mut(index)
    }

    fn set(&mut self, entity: EntityId, value: T)
    where
        T: PartialEq,
    {
        if let Some(item) = self.get_mut(entity) {
            if *item != value {
                *item = value;
                self.events.push(ComponentEvent::Modified(entity));
            }
        }
    }

    fn remove(&mut self, entity: EntityId) -> Option<T> {
        let index = self.entity_indexes.remove(&entity)?;
        self.events.push(ComponentEvent::Removed(entity));
        self.entities.remove(index);

        for entity_index in self.entity_indexes.values_mut() {
            if *entity_index > index {
                *entity_index -= 1;
            }
        }

        Some(self.items.remove(index))
    }

    fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    fn events(&self) -> &[ComponentEvent] {
        &self.events
    }

    fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl<T: Component> DynamicComponentTable for ComponentTable<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_boxed(&mut self, entity: EntityId) -> Option<Box<dyn Any>> {
        self.remove(entity)
            .map(|component| Box::new(component) as Box<dyn Any>)
    }

    fn clear_events(&mut self) {
        self.clear_events();
    }
}

/// # Scene
///
/// Entities, their components, and their hierarchy.
///
/// Every method takes `&self` so that component references, entity handles, and scripts can
/// coexist. Borrowing a component with [Scene::get_mut] while another borrow of any component is
/// alive panics, as with a [RefCell].
pub struct Scene {
    name: String,
    next_entity: Cell<u64>,
    entities: RefCell<BTreeSet<EntityId>>,
    parents: RefCell<IntMap<EntityId, EntityId>>,
    children: RefCell<IntMap<EntityId, Vec<EntityId>>>,
    component_indexes: RefCell<BTreeMap<TypeId, usize>>,
    component_tables: RefCell<Vec<Box<dyn DynamicComponentTable>>>,
    viewport: Cell<(u32, u32)>,
}

impl Scene {
    /// Returns an empty scene named "Untitled".
    pub fn new() -> Self {
        Self::with_name("Untitled")
    }

    /// Returns an empty scene with the given name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_entity: Cell::new(1),
            entities: RefCell::new(BTreeSet::new()),
            parents: RefCell::new(IntMap::default()),
            children: RefCell::new(IntMap::default()),
            component_indexes: RefCell::new(BTreeMap::new()),
            component_tables: RefCell::new(Vec::new()),
            viewport: Cell::new((0, 0)),
        }
    }

    /// Returns the scene name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the scene name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns true if the scene contains the given entity.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.borrow().contains(&entity)
    }

    /// Returns the number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.borrow().len()
    }

    /// Returns every entity id in ascending order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.borrow().iter().copied().collect()
    }

    /// Returns a handle to the entity if it is in the scene.
    pub fn entity(&self, entity: EntityId) -> Option<Entity<'_>> {
        self.contains(entity).then_some(Entity {
            id: entity,
            scene: self,
        })
    }

    /// Creates an entity with a [TagComponent] and an identity [TransformComponent]. An empty name
    /// is replaced with "Entity".
    pub fn create_entity(&self, name: &str) -> Entity<'_> {
        let id = EntityId(self.next_entity.get());
        self.next_entity.set(id.0 + 1);
        self.insert_entity(id, name)
    }

    /// Creates an entity with the given id. Returns None if the id is taken.
    pub(crate) fn create_entity_with_id(&self, id: EntityId, name: &str) -> Option<Entity<'_>> {
        if self.contains(id) {
            return None;
        }

        if id.0 >= self.next_entity.get() {
            self.next_entity.set(id.0 + 1);
        }

        Some(self.insert_entity(id, name))
    }

    fn insert_entity(&self, id: EntityId, name: &str) -> Entity<'_> {
        self.entities.borrow_mut().insert(id);

        let tag = if name.is_empty() { "Entity" } else { name };
        self.add(id, TagComponent::new(tag));
        self.add(id, TransformComponent::default());

        log::trace!("Created entity {id} ({tag})");
        Entity {
            id,
            scene: self,
        }
    }

    /// Destroys the entity and all of its components. Children are detached and keep their world
    /// pose. Returns false if the entity is not in the scene.
    pub fn destroy_entity(&self, entity: EntityId) -> bool {
        if !self.contains(entity) {
            return false;
        }

        let script = self
            .get_mut::<NativeScriptComponent>(entity)
            .and_then(|mut component| component.take_existing_instance());
        if let Some(mut script) = script {
            script.on_destroy(Entity {
                id: entity,
                scene: self,
            });
        }

        let children = self.children.borrow_mut().remove(&entity).unwrap_or_default();
        for child in children {
            self.parents.borrow_mut().remove(&child);
        }
        self.unlink_parent(entity);

        let removed: Vec<Box<dyn Any>> = self
            .component_tables
            .borrow_mut()
            .iter_mut()
            .filter_map(|table| table.remove_boxed(entity))
            .collect();
        self.entities.borrow_mut().remove(&entity);

        // Dropped after the tables are released: a dropped transform notifies its children.
        drop(removed);

        log::trace!("Destroyed entity {entity}");
        true
    }

    /// Parents the child to the parent, in the scene hierarchy and in the transform hierarchy.
    /// The child's local transform is kept.
    pub fn set_parent(&self, child: EntityId, parent: EntityId) -> Result<(), SceneError> {
        for entity in [child, parent] {
            if !self.contains(entity) {
                return Err(SceneError::MissingEntity(entity));
            }
        }

        {
            let child_transform = self
                .get::<TransformComponent>(child)
                .ok_or(SceneError::MissingTransform(child))?;
            let parent_transform = self
                .get::<TransformComponent>(parent)
                .ok_or(SceneError::MissingTransform(parent))?;

            child_transform
                .transform()
                .set_parent(parent_transform.transform())?;
        }

        self.unlink_parent(child);
        self.parents.borrow_mut().insert(child, parent);
        self.children
            .borrow_mut()
            .entry(parent)
            .or_default()
            .push(child);
        Ok(())
    }

    /// Detaches the child from its parent, keeping its world pose. Returns false if the child has no
    /// parent.
    pub fn remove_parent(&self, child: EntityId) -> bool {
        if !self.unlink_parent(child) {
            return false;
        }

        if let Some(transform) = self.get::<TransformComponent>(child) {
            transform.transform().remove_parent();
        }
        true
    }

    fn unlink_parent(&self, child: EntityId) -> bool {
        let Some(parent) = self.parents.borrow_mut().remove(&child) else {
            return false;
        };

        if let Some(children) = self.children.borrow_mut().get_mut(&parent) {
            children.retain(|entity| *entity != child);
        }
        true
    }

    /// Returns the parent of the entity.
    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.parents.borrow().get(&entity).copied()
    }

    /// Returns the children of the entity in the order they were parented.
    pub fn children(&self, entity: EntityId) -> Vec<EntityId> {
        self.children
            .borrow()
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the entities without a parent, in ascending order.
    pub fn root_entities(&self) -> Vec<EntityId> {
        let parents = self.parents.borrow();
        let entities = self.entities.borrow();
        entities
            .iter()
            .copied()
            .filter(|entity| !parents.contains_key(entity))
            .collect()
    }

    /// Adds the component to the entity. Returns false and keeps the existing component if the
    /// entity already has one of this type or is not in the scene.
    pub fn add<T: Component>(&self, entity: EntityId, value: T) -> bool {
        if !self.contains(entity) {
            log::warn!("Cannot add component to missing entity {entity}");
            return false;
        }

        let component_index = match self.component_index::<T>() {
            Some(index) => index,
            None => {
                let index = self.component_tables.borrow().len();
                self.component_indexes
                    .borrow_mut()
                    .insert(TypeId::of::<T>(), index);
                self.component_tables
                    .borrow_mut()
                    .push(Box::new(ComponentTable::<T>::new()));

                index
            }
        };

        let added = self.component_tables.borrow_mut()[component_index]
            .as_any_mut()
            .downcast_mut::<ComponentTable<T>>()
            .is_some_and(|table| table.add(entity, value));

        if !added {
            log::warn!(
                "Entity {entity} already has a {} component",
                std::any::type_name::<T>()
            );
        }
        added
    }

    /// Returns the component of the entity.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.table::<T>()?, |table| table.get(entity)).ok()
    }

    /// Returns the component of the entity for modification. No event is recorded.
    pub fn get_mut<T: Component>(&self, entity: EntityId) -> Option<RefMut<'_, T>> {
        let component_index = self.component_index::<T>()?;
        RefMut::filter_map(self.component_tables.borrow_mut(), |tables| {
            tables[component_index]
                .as_any_mut()
                .downcast_mut::<ComponentTable<T>>()?
                .get_mut(entity)
        })
        .ok()
    }

    /// Replaces the component value. Records [ComponentEvent::Modified] if the value changed.
    pub fn set<T: Component + PartialEq>(&self, entity: EntityId, value: T) {
        if let Some(mut table) = self.table_mut::<T>() {
            table.set(entity, value);
        }
    }

    /// Returns true if the entity has a component of the type.
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.table::<T>()
            .is_some_and(|table| table.entity_indexes.contains_key(&entity))
    }

    /// Removes and returns the component of the entity. Removing a [TransformComponent] also
    /// removes the entity from the hierarchy: it leaves its parent and its children are detached,
    /// keeping their world pose.
    pub fn remove<T: Component>(&self, entity: EntityId) -> Option<T> {
        if TypeId::of::<T>() == TypeId::of::<TransformComponent>() && self.has::<T>(entity) {
            self.remove_parent(entity);
            for child in self.children(entity) {
                self.remove_parent(child);
            }
            self.children.borrow_mut().remove(&entity);
        }

        self.table_mut::<T>()?.remove(entity)
    }

    /// Returns the entities with a component of the type, in the order the components were added.
    pub fn entities_with<T: Component>(&self) -> Vec<EntityId> {
        self.table::<T>()
            .map(|table| table.entities().to_vec())
            .unwrap_or_default()
    }

    /// Returns the component events for the given component.
    pub fn events<T: Component>(&self) -> Ref<'_, [ComponentEvent]> {
        match self.table::<T>() {
            Some(table) => Ref::map(table, |table| table.events()),
            None => Ref::map(self.component_tables.borrow(), |_| &[]),
        }
    }

    /// Clears the component events for all the components.
    pub fn clear_events(&self) {
        for table in self.component_tables.borrow_mut().iter_mut() {
            table.clear_events();
        }
    }

    /// Returns the first entity with a primary camera.
    pub fn primary_camera_entity(&self) -> Option<EntityId> {
        let table = self.table::<CameraComponent>()?;
        let index = table.items.iter().position(|camera| camera.primary)?;
        table.entities.get(index).copied()
    }

    /// Returns the last viewport size.
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport.get()
    }

    /// Runs the native scripts, then syncs camera aspect ratios with the viewport.
    pub fn on_update(&self, timestep: Timestep) {
        systems::run_native_scripts(self, timestep);
        systems::sync_camera_viewports(self);
    }

    /// Stores the viewport size and resizes every camera without a fixed aspect ratio.
    pub fn on_viewport_resize(&self, width: u32, height: u32) {
        self.viewport.set((width, height));
        systems::sync_camera_viewports(self);
    }

    /// Draws every sprite through the primary camera. Returns false if there is no primary camera.
    pub fn on_render(&self, renderer: &mut Renderer) -> bool {
        systems::submit_sprites(self, renderer)
    }

    fn component_index<T: Component>(&self) -> Option<usize> {
        self.component_indexes
            .borrow()
            .get(&TypeId::of::<T>())
            .copied()
    }

    fn table<T: Component>(&self) -> Option<Ref<'_, ComponentTable<T>>> {
        let component_index = self.component_index::<T>()?;
        Ref::filter_map(self.component_tables.borrow(), |tables| {
            tables[component_index]
                .as_any()
                .downcast_ref::<ComponentTable<T>>()
        })
        .ok()
    }

    fn table_mut<T: Component>(&self) -> Option<RefMut<'_, ComponentTable<T>>> {
        let component_index = self.component_index::<T>()?;
        RefMut::filter_map(self.component_tables.borrow_mut(), |tables| {
            tables[component_index]
                .as_any_mut()
                .downcast_mut::<ComponentTable<T>>()
        })
        .ok()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("entities", &self.entity_count())
            .finish()
    }
}

/// # Entity
///
/// Handle to an entity together with the scene that owns it.
#[derive(Copy, Clone)]
pub struct Entity<'a> {
    id: EntityId,
    scene: &'a Scene,
}

impl<'a> Entity<'a> {
    /// Returns the entity id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the owning scene.
    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    /// Returns true while the entity is in the scene.
    pub fn is_valid(&self) -> bool {
        self.scene.contains(self.id)
    }

    /// Returns the tag of the entity.
    pub fn name(&self) -> Option<String> {
        self.get::<TagComponent>().map(|tag| tag.tag.clone())
    }

    /// See [Scene::add].
    pub fn add<T: Component>(&self, value: T) -> bool {
        self.scene.add(self.id, value)
    }

    /// See [Scene::get].
    pub fn get<T: Component>(&self) -> Option<Ref<'a, T>> {
        self.scene.get(self.id)
    }

    /// See [Scene::get_mut].
    pub fn get_mut<T: Component>(&self) -> Option<RefMut<'a, T>> {
        self.scene.get_mut(self.id)
    }

    /// See [Scene::set].
    pub fn set<T: Component + PartialEq>(&self, value: T) {
        self.scene.set(self.id, value);
    }

    /// See [Scene::has].
    pub fn has<T: Component>(&self) -> bool {
        self.scene.has::<T>(self.id)
    }

    /// See [Scene::remove].
    pub fn remove<T: Component>(&self) -> Option<T> {
        self.scene.remove(self.id)
    }

    /// See [Scene::set_parent].
    pub fn set_parent(&self, parent: EntityId) -> Result<(), SceneError> {
        self.scene.set_parent(self.id, parent)
    }

    /// See [Scene::parent].
    pub fn parent(&self) -> Option<EntityId> {
        self.scene.parent(self.id)
    }
}

impl PartialEq for Entity<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.scene, other.scene)
    }
}

impl Eq for Entity<'_> {}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entity").field(&self.id).finish()
    }
}
