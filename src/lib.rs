#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(missing_docs)]

//! # Lunaria
//!
//! ![MIT](https://img.shields.io/badge/license-MIT-blue.svg)
//!
//! ## What is Lunaria?
//!
//! Lunaria is a small 2D/3D application engine. It provides:
//! - A layered application loop driven by a platform window
//! - Window, keyboard, and mouse events dispatched through a layer stack
//! - A scene of entities and components with a transform hierarchy
//! - Hierarchical transforms that keep world matrices in sync with their parents
//! - Batched quad rendering through a pluggable backend
//! - An orthographic camera controller for 2D scenes
//! - JSON scene files

pub use crate::app::AppContext;
pub use crate::app::Application;
pub use crate::app::ApplicationSpecification;
pub use crate::app::ApplicationState;
pub use crate::camera_controller::OrthographicCamera;
pub use crate::camera_controller::OrthographicCameraBounds;
pub use crate::camera_controller::OrthographicCameraController;
pub use crate::components::CameraComponent;
pub use crate::components::NativeScriptComponent;
pub use crate::components::ProjectionType;
pub use crate::components::SceneCamera;
pub use crate::components::ScriptableEntity;
pub use crate::components::SpriteRendererComponent;
pub use crate::components::TagComponent;
pub use crate::components::TransformComponent;
pub use crate::error::Error;
pub use crate::input::Event;
pub use crate::input::EventCategory;
pub use crate::input::EventKind;
pub use crate::input::Input;
pub use crate::layer::Layer;
pub use crate::layer::LayerId;
pub use crate::layer::LayerStack;
pub use crate::listener::ListenerId;
pub use crate::listener::ListenerRegistry;
pub use crate::logging::LogSettings;
pub use crate::math::MathError;
pub use crate::renderer::NullRendererApi;
pub use crate::renderer::QuadVertex;
pub use crate::renderer::RenderCommand;
pub use crate::renderer::RenderStats;
pub use crate::renderer::Renderer;
pub use crate::renderer::RendererApi;
pub use crate::renderer::RendererError;
pub use crate::renderer::Shader;
pub use crate::renderer::ShaderLibrary;
pub use crate::renderer::ShaderStage;
pub use crate::renderer::VertexArray;
pub use crate::scene::Component;
pub use crate::scene::ComponentEvent;
pub use crate::scene::Entity;
pub use crate::scene::EntityId;
pub use crate::scene::Scene;
pub use crate::scene::SceneError;
pub use crate::time::Clock;
pub use crate::time::Timestep;
pub use crate::transform::Notification;
pub use crate::transform::Transform;
pub use crate::transform::TransformError;
pub use crate::transform::TransformNotifier;
pub use crate::ui::NullUi;
pub use crate::ui::UiBackend;
pub use crate::window::HeadlessWindow;
pub use crate::window::PlatformWindow;
pub use crate::window::WindowError;
pub use crate::window::WindowFlags;
pub use crate::window::WindowSettings;
pub use crate::window::WinitWindow;

mod app;
mod camera_controller;
mod components;
mod error;
mod input;
mod layer;
mod listener;
pub mod logging;
pub mod math;
mod renderer;
mod scene;
pub mod serializer;
pub mod systems;
mod time;
mod transform;
mod ui;
mod window;
