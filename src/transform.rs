//! # Transform
//!
//! Hierarchical transforms with eager change propagation.
//!
//! Every [Transform] owns a [TransformNotifier]. A child subscribes to its parent's notifier when
//! it is parented, and the parent broadcasts [Notification::Changed] whenever its world matrix
//! changes, so by the time any mutator returns the whole subtree below it is up to date. A parent
//! that is dropped broadcasts [Notification::Destroyed] and every child detaches while keeping its
//! world pose.
//!
//! Parents are referenced weakly: a child never keeps its parent alive.

use std::cell::RefCell;
use std::rc::Rc;
use std::rc::Weak;

use glam::Mat4;
use glam::Quat;
use glam::Vec3;

use crate::listener::ListenerId;
use crate::listener::ListenerRegistry;
use crate::math;
use crate::math::MathError;

/// Forward direction in local space.
pub const FORWARD: Vec3 = Vec3::Z;
/// Up direction in local space.
pub const UP: Vec3 = Vec3::Y;
/// Right direction in local space.
pub const RIGHT: Vec3 = Vec3::X;

/// # Transform Error
#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// Invalid math input, e.g. a rotation that cannot be normalized or a singular parent matrix.
    #[error(transparent)]
    Math(#[from] MathError),
    /// The requested parent is the transform itself or one of its descendants.
    #[error("parenting would create a cycle")]
    Cycle,
}

/// # Notification
///
/// Structural change broadcast from a parent transform to its children.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Notification {
    /// The world matrix of the parent changed.
    Changed,
    /// The parent is being destroyed.
    Destroyed,
}

/// # Transform Notifier
///
/// Listener registry carrying [Notification]s from a transform to its children.
#[derive(Debug, Default)]
pub struct TransformNotifier {
    handlers: ListenerRegistry<Notification>,
}

impl TransformNotifier {
    /// Returns a notifier with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: ListenerRegistry::new(),
        }
    }

    /// Registers a notification handler and returns its id.
    pub fn add_notification_handler(
        &self,
        handler: impl Fn(&Notification) + 'static,
    ) -> ListenerId {
        self.handlers.add_listener(handler)
    }

    /// Removes a notification handler. Returns false if the id is unknown.
    pub fn remove_notification_handler(&self, id: ListenerId) -> bool {
        self.handlers.remove_listener(id)
    }

    /// Removes every notification handler.
    pub fn remove_all_notification_handlers(&self) {
        self.handlers.remove_all_listeners();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.listener_count()
    }

    /// Sends the notification to every registered handler.
    pub fn notify_children(&self, notification: Notification) {
        self.handlers.invoke(&notification);
    }
}

#[derive(Clone, Debug)]
struct TransformState {
    local_position: Vec3,
    local_rotation: Quat,
    local_scale: Vec3,
    world_position: Vec3,
    world_rotation: Quat,
    world_scale: Vec3,
    local_matrix: Mat4,
    world_matrix: Mat4,
    parent: Option<Weak<TransformNode>>,
    handler_id: Option<ListenerId>,
    revision: u64,
}

impl TransformState {
    fn identity() -> Self {
        Self {
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            local_scale: Vec3::ONE,
            world_position: Vec3::ZERO,
            world_rotation: Quat::IDENTITY,
            world_scale: Vec3::ONE,
            local_matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            parent: None,
            handler_id: None,
            revision: 0,
        }
    }

    fn decompose_local(&mut self) {
        let decomposed = math::decompose(&self.local_matrix);
        self.local_position = decomposed.translation;
        self.local_rotation = decomposed.rotation;
        self.local_scale = decomposed.scale;
    }

    fn decompose_world(&mut self) {
        let decomposed = math::decompose(&self.world_matrix);
        self.world_position = decomposed.translation;
        self.world_rotation = decomposed.rotation;
        self.world_scale = decomposed.scale;
    }
}

struct TransformNode {
    state: RefCell<TransformState>,
    notifier: TransformNotifier,
}

impl TransformNode {
    fn parent(&self) -> Option<Rc<TransformNode>> {
        self.state.borrow().parent.as_ref().and_then(Weak::upgrade)
    }

    fn notification_handler(&self, notification: Notification) {
        match notification {
            Notification::Changed => self.update_world_matrix(),
            // The parent is mid-teardown and iterating its handlers, so the subscription is left
            // for it to drop instead of calling remove_parent here.
            Notification::Destroyed => {
                self.detach_preserving_pose();
                self.update_world_matrix();
            }
        }
    }

    fn generate_matrices_local(
        &self,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), TransformError> {
        let rotation = math::normalize_quat(rotation)?;
        let matrix = math::trs_matrix(position, rotation, scale)?;

        {
            let mut state = self.state.borrow_mut();
            state.local_matrix = matrix;
            state.local_position = position;
            state.local_rotation = rotation;
            state.local_scale = scale;
            state.decompose_local();
            state.revision += 1;
        }

        self.update_world_matrix();
        Ok(())
    }

    fn generate_matrices_world(
        &self,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), TransformError> {
        let rotation = math::normalize_quat(rotation)?;
        let matrix = math::trs_matrix(position, rotation, scale)?;
        let parent_inverse = match self.parent() {
            Some(parent) => Some(math::inverse(&parent.state.borrow().world_matrix)?),
            None => None,
        };

        {
            let mut state = self.state.borrow_mut();
            state.world_matrix = matrix;
            state.world_position = position;
            state.world_rotation = rotation;
            state.world_scale = scale;
            state.local_matrix = match parent_inverse {
                Some(parent_inverse) => parent_inverse * matrix,
                None => matrix,
            };
            state.decompose_local();
            state.revision += 1;
        }

        self.notifier.notify_children(Notification::Changed);
        Ok(())
    }

    fn update_world_matrix(&self) {
        let parent_world = self
            .parent()
            .map(|parent| parent.state.borrow().world_matrix);

        {
            let mut state = self.state.borrow_mut();
            state.world_matrix = match parent_world {
                Some(parent_world) => parent_world * state.local_matrix,
                None => state.local_matrix,
            };
            state.decompose_world();
        }

        self.notifier.notify_children(Notification::Changed);
    }

    /// Clears the parent link and makes the last world matrix the new local matrix.
    fn detach_preserving_pose(&self) {
        let mut state = self.state.borrow_mut();
        state.parent = None;
        state.handler_id = None;
        state.local_matrix = state.world_matrix;
        state.decompose_local();
        state.revision += 1;
    }

    fn is_ancestor_or_self(self: &Rc<Self>, other: &Rc<TransformNode>) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if Rc::ptr_eq(self, &node) {
                return true;
            }
            current = node.parent();
        }
        false
    }
}

impl Drop for TransformNode {
    fn drop(&mut self) {
        self.notifier.notify_children(Notification::Destroyed);
        self.notifier.remove_all_notification_handlers();

        let state = self.state.get_mut();
        if let (Some(parent), Some(id)) = (
            state.parent.as_ref().and_then(Weak::upgrade),
            state.handler_id,
        ) {
            parent.notifier.remove_notification_handler(id);
        }
    }
}

/// # Transform
///
/// Position, rotation, and scale in local space (relative to the parent) and world space, kept
/// together with their matrix forms.
///
/// The world matrix is always `parent.world_matrix * local_matrix` when parented and
/// `local_matrix` otherwise. Rotations are stored as unit quaternions.
///
/// Mutators fail with [TransformError::Math] when a rotation cannot be normalized or when a world
/// space value is set below a parent whose world matrix is singular. A failed mutator leaves the
/// transform unchanged.
pub struct Transform {
    node: Rc<TransformNode>,
}

impl Transform {
    /// Returns an unparented transform with the given local position, rotation, and scale.
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Result<Self, TransformError> {
        let transform = Self::default();
        transform
            .node
            .generate_matrices_local(position, rotation, scale)?;
        Ok(transform)
    }

    /// Returns an unparented transform at the given local position.
    pub fn from_position(position: Vec3) -> Self {
        let mut state = TransformState::identity();
        state.local_position = position;
        state.world_position = position;
        state.local_matrix = Mat4::from_translation(position);
        state.world_matrix = state.local_matrix;

        Self::from_state(state)
    }

    fn from_state(state: TransformState) -> Self {
        Self {
            node: Rc::new(TransformNode {
                state: RefCell::new(state),
                notifier: TransformNotifier::new(),
            }),
        }
    }

    /// Returns the notifier children subscribe to.
    pub fn notifier(&self) -> &TransformNotifier {
        &self.node.notifier
    }

    /// Returns the id of this transform's subscription to its parent's notifier.
    pub fn notification_handler_id(&self) -> Option<ListenerId> {
        self.node.state.borrow().handler_id
    }

    /// Parents this transform to the given transform, detaching it from any previous parent. The
    /// local values are kept and the world values are recomputed.
    pub fn set_parent(&self, parent: &Transform) -> Result<(), TransformError> {
        if self.node.is_ancestor_or_self(&parent.node) {
            return Err(TransformError::Cycle);
        }

        self.unsubscribe();

        let child = Rc::downgrade(&self.node);
        let handler_id = parent
            .node
            .notifier
            .add_notification_handler(move |notification| {
                if let Some(child) = child.upgrade() {
                    child.notification_handler(*notification);
                }
            });

        {
            let mut state = self.node.state.borrow_mut();
            state.parent = Some(Rc::downgrade(&parent.node));
            state.handler_id = Some(handler_id);
        }

        self.node.update_world_matrix();
        Ok(())
    }

    /// Detaches this transform from its parent, keeping its world pose. Returns false if the
    /// transform has no parent.
    pub fn remove_parent(&self) -> bool {
        if !self.has_parent() {
            return false;
        }

        self.unsubscribe();
        self.node.detach_preserving_pose();
        self.node.update_world_matrix();
        true
    }

    fn unsubscribe(&self) {
        let (parent, handler_id) = {
            let state = self.node.state.borrow();
            (state.parent.as_ref().and_then(Weak::upgrade), state.handler_id)
        };

        if let (Some(parent), Some(id)) = (parent, handler_id) {
            parent.notifier.remove_notification_handler(id);
        }

        let mut state = self.node.state.borrow_mut();
        state.parent = None;
        state.handler_id = None;
    }

    /// Returns true if the transform has a parent.
    pub fn has_parent(&self) -> bool {
        self.node.parent().is_some()
    }

    /// Returns true if the given transform is this transform's parent.
    pub fn is_parent(&self, parent: &Transform) -> bool {
        self.node
            .parent()
            .is_some_and(|node| Rc::ptr_eq(&node, &parent.node))
    }

    /// Rebuilds the local matrix from the given local values and recomputes the world values.
    pub fn generate_matrices_local(
        &self,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), TransformError> {
        self.node.generate_matrices_local(position, rotation, scale)
    }

    /// Rebuilds the world matrix from the given world values and recomputes the local values.
    pub fn generate_matrices_world(
        &self,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), TransformError> {
        self.node.generate_matrices_world(position, rotation, scale)
    }

    /// Recomputes the world matrix from the parent's world matrix and the local matrix, then
    /// notifies the children.
    pub fn update_world_matrix(&self) {
        self.node.update_world_matrix();
    }

    /// Recomputes the local matrix from the parent's world matrix and the world matrix, then
    /// notifies the children.
    pub fn update_local_matrix(&self) -> Result<(), TransformError> {
        let (position, rotation, scale) = {
            let state = self.node.state.borrow();
            (state.world_position, state.world_rotation, state.world_scale)
        };
        self.node.generate_matrices_world(position, rotation, scale)
    }

    /// Sets the position in local space.
    pub fn set_local_position(&self, position: Vec3) -> Result<(), TransformError> {
        let (rotation, scale) = {
            let state = self.node.state.borrow();
            (state.local_rotation, state.local_scale)
        };
        self.node.generate_matrices_local(position, rotation, scale)
    }

    /// Sets the rotation in local space. The rotation is normalized first.
    pub fn set_local_rotation(&self, rotation: Quat) -> Result<(), TransformError> {
        let (position, scale) = {
            let state = self.node.state.borrow();
            (state.local_position, state.local_scale)
        };
        self.node.generate_matrices_local(position, rotation, scale)
    }

    /// Sets the scale in local space.
    pub fn set_local_scale(&self, scale: Vec3) -> Result<(), TransformError> {
        let (position, rotation) = {
            let state = self.node.state.borrow();
            (state.local_position, state.local_rotation)
        };
        self.node.generate_matrices_local(position, rotation, scale)
    }

    /// Sets the position in world space.
    pub fn set_world_position(&self, position: Vec3) -> Result<(), TransformError> {
        let (rotation, scale) = {
            let state = self.node.state.borrow();
            (state.world_rotation, state.world_scale)
        };
        self.node.generate_matrices_world(position, rotation, scale)
    }

    /// Sets the rotation in world space. The rotation is normalized first.
    pub fn set_world_rotation(&self, rotation: Quat) -> Result<(), TransformError> {
        let (position, scale) = {
            let state = self.node.state.borrow();
            (state.world_position, state.world_scale)
        };
        self.node.generate_matrices_world(position, rotation, scale)
    }

    /// Sets the scale in world space.
    pub fn set_world_scale(&self, scale: Vec3) -> Result<(), TransformError> {
        let (position, rotation) = {
            let state = self.node.state.borrow();
            (state.world_position, state.world_rotation)
        };
        self.node.generate_matrices_world(position, rotation, scale)
    }

    /// Moves the transform by the given offset in local space.
    pub fn translate_local(&self, translation: Vec3) -> Result<(), TransformError> {
        self.set_local_position(self.local_position() + translation)
    }

    /// Applies the given rotation after the current local rotation (`current * rotation`).
    pub fn rotate_local(&self, rotation: Quat) -> Result<(), TransformError> {
        self.set_local_rotation(self.local_rotation() * rotation)
    }

    /// Multiplies the local scale component-wise.
    pub fn scale_local(&self, scale: Vec3) -> Result<(), TransformError> {
        self.set_local_scale(self.local_scale() * scale)
    }

    /// Returns the position in local space.
    pub fn local_position(&self) -> Vec3 {
        self.node.state.borrow().local_position
    }

    /// Returns the rotation in local space.
    pub fn local_rotation(&self) -> Quat {
        self.node.state.borrow().local_rotation
    }

    /// Returns the scale in local space.
    pub fn local_scale(&self) -> Vec3 {
        self.node.state.borrow().local_scale
    }

    /// Returns the position in world space.
    pub fn world_position(&self) -> Vec3 {
        self.node.state.borrow().world_position
    }

    /// Returns the rotation in world space.
    pub fn world_rotation(&self) -> Quat {
        self.node.state.borrow().world_rotation
    }

    /// Returns the scale in world space.
    pub fn world_scale(&self) -> Vec3 {
        self.node.state.borrow().world_scale
    }

    /// Returns the local matrix.
    pub fn local_matrix(&self) -> Mat4 {
        self.node.state.borrow().local_matrix
    }

    /// Returns the world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        self.node.state.borrow().world_matrix
    }

    /// Returns the forward direction in world space.
    pub fn world_forward(&self) -> Vec3 {
        self.world_rotation() * FORWARD
    }

    /// Returns the up direction in world space.
    pub fn world_up(&self) -> Vec3 {
        self.world_rotation() * UP
    }

    /// Returns the right direction in world space.
    pub fn world_right(&self) -> Vec3 {
        self.world_rotation() * RIGHT
    }

    /// Returns the forward direction in local space.
    pub fn local_forward(&self) -> Vec3 {
        self.local_rotation() * FORWARD
    }

    /// Returns the up direction in local space.
    pub fn local_up(&self) -> Vec3 {
        self.local_rotation() * UP
    }

    /// Returns the right direction in local space.
    pub fn local_right(&self) -> Vec3 {
        self.local_rotation() * RIGHT
    }

    /// Returns a counter that changes every time the local values change, whatever the cause.
    pub fn revision(&self) -> u64 {
        self.node.state.borrow().revision
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_state(TransformState::identity())
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.node.state.borrow();
        f.debug_struct("Transform")
            .field("local_position", &state.local_position)
            .field("local_rotation", &state.local_rotation)
            .field("local_scale", &state.local_scale)
            .field("world_position", &state.world_position)
            .field("has_parent", &state.parent.is_some())
            .finish()
    }
}
