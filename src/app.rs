use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::input::Event;
use crate::input::EventKind;
use crate::input::Input;
use crate::layer::Layer;
use crate::layer::LayerId;
use crate::layer::LayerStack;
use crate::logging::LogSettings;
use crate::renderer::NullRendererApi;
use crate::renderer::Renderer;
use crate::renderer::RendererApi;
use crate::renderer::ShaderLibrary;
use crate::time::Clock;
use crate::ui::NullUi;
use crate::ui::UiBackend;
use crate::window::PlatformWindow;
use crate::window::WindowSettings;
use crate::window::WinitWindow;
use crate::Error;

/// # Application State
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ApplicationState {
    /// Application is being set up and has not run a frame yet.
    Initializing,
    /// Application is running frames.
    Running,
    /// Shutdown was requested. Layers are detached before the application terminates.
    ShuttingDown,
    /// Application has finished running.
    Terminated,
}

/// # Application Specification
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicationSpecification {
    /// Application name, used in logs.
    pub name: String,
    /// Settings of the main window.
    pub window: WindowSettings,
    /// Settings of the global logger.
    pub log: LogSettings,
}

impl ApplicationSpecification {
    /// Returns a specification with the given name, also used as the window title.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            window: WindowSettings::default().with_title(name.clone()),
            name,
            log: LogSettings::default(),
        }
    }

    /// Sets the window settings.
    pub fn with_window(mut self, window: WindowSettings) -> Self {
        self.window = window;
        self
    }

    /// Sets the log settings.
    pub fn with_log(mut self, log: LogSettings) -> Self {
        self.log = log;
        self
    }
}

impl Default for ApplicationSpecification {
    fn default() -> Self {
        Self::new("Lunaria")
    }
}

/// # Application Context
///
/// State shared with every layer hook. Layers request shutdown through [AppContext::shutdown]
/// instead of reaching for a global application.
pub struct AppContext {
    state: ApplicationState,
    minimized: bool,
    window_size: (u32, u32),
    /// Renderer used by the layers.
    pub renderer: Renderer,
    /// Shaders loaded by the layers.
    pub shaders: ShaderLibrary,
    /// Keyboard and mouse state.
    pub input: Input,
}

impl AppContext {
    fn new(renderer: Renderer, window_size: (u32, u32)) -> Self {
        Self {
            state: ApplicationState::Initializing,
            minimized: window_size.0 == 0 || window_size.1 == 0,
            window_size,
            renderer,
            shaders: ShaderLibrary::new(),
            input: Input::new(),
        }
    }

    /// Returns a running context without a window, drawing through a [NullRendererApi].
    pub fn headless() -> Self {
        let mut ctx = Self::new(Renderer::new(Box::new(NullRendererApi::new())), (0, 0));
        ctx.state = ApplicationState::Running;
        ctx.minimized = false;
        ctx
    }

    /// Returns the application state.
    pub fn state(&self) -> ApplicationState {
        self.state
    }

    /// Returns true while the application is running frames.
    pub fn is_running(&self) -> bool {
        self.state == ApplicationState::Running
    }

    /// Returns true while the window has a zero dimension.
    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Returns the last window size.
    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    /// Requests shutdown. The current frame completes, then the layers are detached.
    pub fn shutdown(&mut self) {
        if matches!(
            self.state,
            ApplicationState::Initializing | ApplicationState::Running
        ) {
            log::info!("Shutdown requested");
            self.state = ApplicationState::ShuttingDown;
        }
    }
}

/// # Application
///
/// Owns the platform window, the UI backend, and the layer stack, and drives them frame by frame:
/// window events are dispatched top to bottom, layers are updated bottom to top unless the window
/// is minimized, and the UI hooks run inside a UI frame before the buffers are swapped.
pub struct Application {
    specification: ApplicationSpecification,
    ctx: AppContext,
    window: Box<dyn PlatformWindow>,
    ui: Box<dyn UiBackend>,
    layers: LayerStack,
    clock: Clock,
    pending_events: Rc<RefCell<VecDeque<EventKind>>>,
}

impl Application {
    /// Returns an application over the given window and renderer backend.
    pub fn new(
        specification: ApplicationSpecification,
        window: Box<dyn PlatformWindow>,
        renderer_api: Box<dyn RendererApi>,
    ) -> Self {
        let pending_events = Rc::new(RefCell::new(VecDeque::new()));
        let queue = Rc::clone(&pending_events);
        window
            .events()
            .add_listener(move |kind: &EventKind| queue.borrow_mut().push_back(*kind));

        let window_size = (window.width(), window.height());
        let mut renderer = Renderer::new(renderer_api);
        renderer.init();
        if window_size.0 != 0 && window_size.1 != 0 {
            renderer.on_window_resize(window_size.0, window_size.1);
        }

        let mut ui: Box<dyn UiBackend> = Box::new(NullUi::new());
        ui.init(window.native_window());

        log::info!(
            "Created application '{}' ({}x{})",
            specification.name,
            window_size.0,
            window_size.1
        );

        Self {
            specification,
            ctx: AppContext::new(renderer, window_size),
            window,
            ui,
            layers: LayerStack::new(),
            clock: Clock::new(),
            pending_events,
        }
    }

    /// Returns an application with a winit window created from the specification.
    pub fn with_winit(
        specification: ApplicationSpecification,
        renderer_api: Box<dyn RendererApi>,
    ) -> Result<Self, Error> {
        let window = WinitWindow::new(&specification.window)?;
        Ok(Self::new(specification, Box::new(window), renderer_api))
    }

    /// Replaces the UI backend.
    pub fn with_ui(mut self, mut ui: Box<dyn UiBackend>) -> Self {
        self.ui.shutdown();
        ui.init(self.window.native_window());
        self.ui = ui;
        self
    }

    /// Returns the specification the application was created with.
    pub fn specification(&self) -> &ApplicationSpecification {
        &self.specification
    }

    /// Returns the application state.
    pub fn state(&self) -> ApplicationState {
        self.ctx.state
    }

    /// Returns the context shared with the layers.
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Returns the context shared with the layers.
    pub fn context_mut(&mut self) -> &mut AppContext {
        &mut self.ctx
    }

    /// Returns the platform window.
    pub fn window(&self) -> &dyn PlatformWindow {
        self.window.as_ref()
    }

    /// Returns the layer stack.
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Pushes a layer below the overlays. The application starts running once a layer is attached.
    pub fn push_layer(&mut self, layer: Box<dyn Layer>) -> LayerId {
        log::debug!("Pushing layer {}", layer.name());
        let id = self.layers.push_layer(layer);
        self.start();
        id
    }

    /// Pushes an overlay on top of the stack.
    pub fn push_overlay(&mut self, overlay: Box<dyn Layer>) -> LayerId {
        log::debug!("Pushing overlay {}", overlay.name());
        let id = self.layers.push_overlay(overlay);
        self.start();
        id
    }

    /// Requests shutdown.
    pub fn shutdown(&mut self) {
        self.ctx.shutdown();
    }

    fn start(&mut self) {
        if self.ctx.state == ApplicationState::Initializing {
            self.ctx.state = ApplicationState::Running;
        }
    }

    /// Handles the event, then dispatches it through the layer stack from top to bottom.
    pub fn on_event(&mut self, kind: EventKind) {
        let mut event = Event::new(kind);
        log::trace!("{}: {:?}", kind.name(), kind);

        self.ctx.input.handle_event(&kind);
        match kind {
            EventKind::WindowClose => {
                self.ctx.shutdown();
                event.handled = true;
            }
            EventKind::WindowResize { width, height } => self.on_window_resize(width, height),
            _ => {}
        }

        self.layers.dispatch_event(&mut self.ctx, &mut event);
    }

    fn on_window_resize(&mut self, width: u32, height: u32) {
        self.ctx.window_size = (width, height);
        if width == 0 || height == 0 {
            self.ctx.minimized = true;
            return;
        }

        self.ctx.minimized = false;
        self.ctx.renderer.on_window_resize(width, height);
    }

    /// Runs a single frame. Does nothing unless the application is running.
    pub fn run_frame(&mut self) {
        if !self.ctx.is_running() {
            return;
        }

        self.window.on_update();
        loop {
            let next = self.pending_events.borrow_mut().pop_front();
            let Some(kind) = next else {
                break;
            };
            self.on_event(kind);
        }

        if !self.ctx.is_running() {
            return;
        }

        let timestep = self.clock.update();
        if !self.ctx.minimized {
            self.layers.update(&mut self.ctx, timestep);
        }

        self.ui.begin_frame();
        self.layers.ui_render(&mut self.ctx);
        self.ui.end_frame();

        self.window.swap_buffers();
    }

    /// Runs frames until shutdown is requested, then detaches every layer.
    pub fn run(&mut self) {
        self.start();
        log::info!("Running application '{}'", self.specification.name);

        while self.ctx.is_running() {
            self.run_frame();
        }

        self.terminate();
    }

    /// Detaches every layer and shuts the UI backend down. [Application::run] calls this once
    /// shutdown is requested; hosts driving [Application::run_frame] themselves call it when done.
    pub fn terminate(&mut self) {
        if self.ctx.state == ApplicationState::Terminated {
            return;
        }

        self.ctx.state = ApplicationState::ShuttingDown;
        self.layers.clear();
        self.ui.shutdown();
        self.ctx.state = ApplicationState::Terminated;
        log::info!("Application '{}' terminated", self.specification.name);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::time::Timestep;
    use crate::window::HeadlessWindow;

    type Log = Rc<RefCell<Vec<String>>>;

    struct ProbeLayer {
        name: &'static str,
        log: Log,
        updates: Rc<Cell<u32>>,
        quit_after: Option<u32>,
    }

    impl ProbeLayer {
        fn boxed(name: &'static str, log: &Log, updates: &Rc<Cell<u32>>) -> Box<dyn Layer> {
            Box::new(Self {
                name,
                log: log.clone(),
                updates: updates.clone(),
                quit_after: None,
            })
        }
    }

    impl Layer for ProbeLayer {
        fn name(&self) -> &str {
            self.name
        }

        fn on_detach(&mut self) {
            self.log.borrow_mut().push(format!("{}:detach", self.name));
        }

        fn on_update(&mut self, ctx: &mut AppContext, _timestep: Timestep) {
            self.updates.set(self.updates.get() + 1);
            if self.quit_after == Some(self.updates.get()) {
                ctx.shutdown();
            }
        }

        fn on_event(&mut self, _ctx: &mut AppContext, event: &mut Event) {
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.name, event.kind.name()));
        }
    }

    fn application(events: &[EventKind]) -> Application {
        let mut window = HeadlessWindow::new(&WindowSettings::default());
        for kind in events {
            window.push_event(*kind);
        }

        Application::new(
            ApplicationSpecification::new("Test"),
            Box::new(window),
            Box::new(NullRendererApi::new()),
        )
    }

    #[test]
    fn new_state_returns_initializing() {
        let app = application(&[]);

        assert_eq!(app.state(), ApplicationState::Initializing);
        assert_eq!(app.context().window_size(), (1280, 720));
        assert_eq!(app.context().renderer.viewport(), (1280, 720));
    }

    #[test]
    fn push_layer_state_returns_running() {
        let mut app = application(&[]);
        let log = Log::default();
        let updates = Rc::new(Cell::new(0));

        app.push_layer(ProbeLayer::boxed("Base", &log, &updates));

        assert_eq!(app.state(), ApplicationState::Running);
    }

    #[test]
    fn run_frame_before_start_does_nothing() {
        let mut app = application(&[]);

        app.run_frame();

        assert_eq!(app.state(), ApplicationState::Initializing);
    }

    #[test]
    fn run_frame_dispatches_events_top_to_bottom() {
        let mut app = application(&[EventKind::KeyTyped('a')]);
        let log = Log::default();
        let updates = Rc::new(Cell::new(0));
        app.push_layer(ProbeLayer::boxed("Base", &log, &updates));
        app.push_overlay(ProbeLayer::boxed("Overlay", &log, &updates));

        app.run_frame();

        assert_eq!(
            *log.borrow(),
            vec!["Overlay:KeyTyped".to_string(), "Base:KeyTyped".to_string()]
        );
        assert_eq!(updates.get(), 2);
    }

    #[test]
    fn window_close_event_skips_layers_and_shuts_down() {
        let mut app = application(&[EventKind::WindowClose]);
        let log = Log::default();
        let updates = Rc::new(Cell::new(0));
        app.push_layer(ProbeLayer::boxed("Base", &log, &updates));

        app.run_frame();

        assert_eq!(app.state(), ApplicationState::ShuttingDown);
        assert!(log.borrow().is_empty());
        assert_eq!(updates.get(), 0);
    }

    #[test]
    fn zero_size_resize_skips_updates_until_restored() {
        let mut app = application(&[EventKind::WindowResize {
            width: 0,
            height: 0,
        }]);
        let log = Log::default();
        let updates = Rc::new(Cell::new(0));
        app.push_layer(ProbeLayer::boxed("Base", &log, &updates));

        app.run_frame();
        assert!(app.context().is_minimized());
        assert_eq!(updates.get(), 0);

        app.on_event(EventKind::WindowResize {
            width: 800,
            height: 600,
        });
        app.run_frame();

        assert!(!app.context().is_minimized());
        assert_eq!(updates.get(), 1);
        assert_eq!(app.context().renderer.viewport(), (800, 600));
    }

    #[test]
    fn key_event_updates_input_before_layers() {
        let key = winit::keyboard::KeyCode::Space;
        let mut app = application(&[EventKind::KeyPressed { key, repeat: false }]);
        let log = Log::default();
        let updates = Rc::new(Cell::new(0));
        app.push_layer(ProbeLayer::boxed("Base", &log, &updates));

        app.run_frame();

        assert!(app.context().input.is_key_pressed(key));
    }

    #[test]
    fn run_until_layer_shuts_down_detaches_layers() {
        let mut app = application(&[]);
        let log = Log::default();
        let updates = Rc::new(Cell::new(0));
        app.push_layer(ProbeLayer::boxed("Base", &log, &updates));
        app.push_overlay(Box::new(ProbeLayer {
            name: "Quitter",
            log: log.clone(),
            updates: Rc::new(Cell::new(0)),
            quit_after: Some(3),
        }));

        app.run();

        assert_eq!(app.state(), ApplicationState::Terminated);
        assert_eq!(updates.get(), 3);
        assert_eq!(
            *log.borrow(),
            vec!["Quitter:detach".to_string(), "Base:detach".to_string()]
        );
        assert!(app.layers().is_empty());
    }

    #[test]
    fn terminate_after_run_frame_returns_terminated() {
        let mut app = application(&[EventKind::WindowClose]);
        let log = Log::default();
        let updates = Rc::new(Cell::new(0));
        app.push_layer(ProbeLayer::boxed("Base", &log, &updates));
        while app.state() == ApplicationState::Running {
            app.run_frame();
        }

        app.terminate();

        assert_eq!(app.state(), ApplicationState::Terminated);
        assert_eq!(*log.borrow(), vec!["Base:detach".to_string()]);
    }

    #[test]
    fn zero_size_window_starts_minimized() {
        let window = HeadlessWindow::new(&WindowSettings::default().with_size(0, 0));
        let mut app = Application::new(
            ApplicationSpecification::new("Test"),
            Box::new(window),
            Box::new(NullRendererApi::new()),
        );
        let log = Log::default();
        let updates = Rc::new(Cell::new(0));
        app.push_layer(ProbeLayer::boxed("Base", &log, &updates));

        app.run_frame();

        assert!(app.context().is_minimized());
        assert_eq!(updates.get(), 0);
    }

    #[test]
    fn shutdown_on_context_returns_shutting_down() {
        let mut ctx = AppContext::headless();

        ctx.shutdown();

        assert_eq!(ctx.state(), ApplicationState::ShuttingDown);
        assert!(!ctx.is_running());
    }
}
