use anyhow::Result;
use glam::Vec3;
use glam::Vec4;
use lunaria::logging;
use lunaria::serializer;
use lunaria::AppContext;
use lunaria::Application;
use lunaria::ApplicationSpecification;
use lunaria::CameraComponent;
use lunaria::Entity;
use lunaria::EntityId;
use lunaria::Event;
use lunaria::EventKind;
use lunaria::Layer;
use lunaria::NativeScriptComponent;
use lunaria::NullRendererApi;
use lunaria::OrthographicCameraController;
use lunaria::Scene;
use lunaria::ScriptableEntity;
use lunaria::SpriteRendererComponent;
use lunaria::Timestep;
use lunaria::TransformComponent;
use winit::keyboard::KeyCode;

const SCENE_PATH: &str = "playground.json";

#[derive(Default)]
struct Spinner;

impl ScriptableEntity for Spinner {
    fn on_create(&mut self, entity: Entity<'_>) {
        log::info!("Spinner attached to {:?}", entity.name());
    }

    fn on_update(&mut self, entity: Entity<'_>, timestep: Timestep) {
        if let Some(mut transform) = entity.get_mut::<TransformComponent>() {
            let rotation = transform.rotation() + Vec3::Z * timestep.seconds();
            if let Err(error) = transform.set_rotation(rotation) {
                log::warn!("Cannot spin {}: {error}", entity.id());
            }
        }
    }
}

struct PlaygroundLayer {
    scene: Scene,
    camera: EntityId,
    controller: OrthographicCameraController,
}

impl PlaygroundLayer {
    fn new() -> Result<Self> {
        let scene = Scene::with_name("Playground");

        let controller = OrthographicCameraController::new(16.0 / 9.0, true);
        let camera = scene.create_entity("Camera");
        let mut component = CameraComponent::default();
        component
            .camera
            .set_orthographic(controller.bounds().height(), -1.0, 1.0);
        camera.add(component);
        let camera = camera.id();

        let sun = scene.create_entity("Sun");
        sun.add(SpriteRendererComponent::new(Vec4::new(1.0, 0.8, 0.2, 1.0)));
        sun.add(NativeScriptComponent::bound::<Spinner>());

        let planet = scene.create_entity("Planet");
        planet.add(SpriteRendererComponent::new(Vec4::new(0.2, 0.4, 1.0, 1.0)));
        if let Some(mut transform) = planet.get_mut::<TransformComponent>() {
            transform.set(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO, Vec3::splat(0.5))?;
        }
        planet.set_parent(sun.id())?;

        Ok(Self {
            scene,
            camera,
            controller,
        })
    }

    fn sync_camera(&self) -> Result<()> {
        if let Some(mut component) = self.scene.get_mut::<CameraComponent>(self.camera) {
            component
                .camera
                .set_orthographic_size(self.controller.bounds().height());
        }
        if let Some(mut transform) = self.scene.get_mut::<TransformComponent>(self.camera) {
            transform.set_translation(self.controller.position())?;
            transform.set_rotation(Vec3::Z * self.controller.rotation().to_radians())?;
        }
        Ok(())
    }
}

impl Layer for PlaygroundLayer {
    fn name(&self) -> &str {
        "Playground"
    }

    fn on_attach(&mut self) {
        log::info!("Playground scene has {} entities", self.scene.entity_count());
    }

    fn on_detach(&mut self) {
        match serializer::serialize(&self.scene, SCENE_PATH) {
            Ok(()) => log::info!("Saved scene to {SCENE_PATH}"),
            Err(error) => log::error!("Cannot save scene: {error}"),
        }
    }

    fn on_update(&mut self, ctx: &mut AppContext, timestep: Timestep) {
        ctx.renderer.set_clear_color(Vec4::new(0.1, 0.1, 0.1, 1.0));
        ctx.renderer.clear();

        self.controller.on_update(&ctx.input, timestep);
        if let Err(error) = self.sync_camera() {
            log::warn!("Cannot move the camera: {error}");
        }

        self.scene.on_update(timestep);
        self.scene.on_render(&mut ctx.renderer);
    }

    fn on_event(&mut self, ctx: &mut AppContext, event: &mut Event) {
        self.controller.on_event(event);

        match event.kind {
            EventKind::WindowResize { width, height } => {
                self.scene.on_viewport_resize(width, height);
            }
            EventKind::KeyPressed {
                key: KeyCode::Escape,
                ..
            } => {
                ctx.shutdown();
                event.handled = true;
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let specification = ApplicationSpecification::new("Lunaria Playground");
    logging::init(&specification.log)?;

    let mut app = Application::with_winit(specification, Box::new(NullRendererApi::new()))?;
    let (width, height) = app.context().window_size();

    let mut layer = PlaygroundLayer::new()?;
    layer.controller.on_resize(width as f32, height as f32);
    layer.scene.on_viewport_resize(width, height);
    app.push_layer(Box::new(layer));

    app.run();
    Ok(())
}
