use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::backend::{Backend, ShaderId, TextureId};
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::mesh_pass::MeshPass;
use crate::scene::Scene;
use crate::shader::ShaderSource;
use crate::texture::{TextureImage, TextureOptions};

/// Context provided during app setup.
pub struct SetupContext<'a> {
    pub gpu: &'a GpuContext,
    pub backend: &'a mut MeshPass,
    config: &'a AppConfig,
}

impl SetupContext<'_> {
    /// Compiles a vertex/fragment WGSL pair read from disk.
    pub fn load_shader(&mut self, vertex: impl AsRef<Path>, fragment: impl AsRef<Path>) -> Result<ShaderId> {
        let source = ShaderSource::from_files(vertex, fragment)?;
        self.backend.create_shader(&source)
    }

    /// Compiles the shader pair named in the [`AppConfig`].
    pub fn load_default_shader(&mut self) -> Result<ShaderId> {
        let config = self.config;
        self.load_shader(&config.vertex_shader, &config.fragment_shader)
    }

    pub fn load_texture(&mut self, path: impl AsRef<Path>, options: TextureOptions) -> Result<TextureId> {
        let image = TextureImage::open(path)?;
        self.backend.upload_texture(&image, options)
    }

    /// Width over height of the window surface.
    pub fn aspect(&self) -> f32 {
        self.gpu.aspect()
    }
}

/// Window and renderer settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: wgpu::Color,
    pub vsync: bool,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Orrery".to_string(),
            width: 1280,
            height: 720,
            clear_color: wgpu::Color {
                r: 0.01,
                g: 0.01,
                b: 0.02,
                a: 1.0,
            },
            vsync: true,
            vertex_shader: PathBuf::from("shaders/planet.vert.wgsl"),
            fragment_shader: PathBuf::from("shaders/planet.frag.wgsl"),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn clear_color(mut self, r: f64, g: f64, b: f64) -> Self {
        self.clear_color = wgpu::Color { r, g, b, a: 1.0 };
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn shaders(mut self, vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        self.vertex_shader = vertex.into();
        self.fragment_shader = fragment.into();
        self
    }
}

/// Opens a window, builds the scene with `setup` and animates it until the
/// window closes or `Q`/`Escape` is pressed.
///
/// # Example
/// ```ignore
/// orrery::run(AppConfig::default(), |ctx| {
///     let shader = ctx.load_default_shader()?;
///     let mut scene = Scene::new(Camera::new().at(0.0, 10.0, 30.0));
///     // add planets...
///     Ok(scene)
/// })?;
/// ```
pub fn run<S>(config: AppConfig, setup: S) -> Result<()>
where
    S: FnOnce(&mut SetupContext) -> Result<Scene> + 'static,
{
    let event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = OrreryApp {
        state: AppState::Pending {
            config,
            setup: Some(Box::new(setup)),
        },
        error: None,
    };

    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::Window(e.to_string()))?;

    match app.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

type SetupFn = Box<dyn FnOnce(&mut SetupContext) -> Result<Scene>>;

struct OrreryApp {
    state: AppState,
    error: Option<Error>,
}

enum AppState {
    Pending {
        config: AppConfig,
        setup: Option<SetupFn>,
    },
    Running(Box<Running>),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    pass: MeshPass,
    scene: Scene,
    input: Input,
    clear_color: wgpu::Color,
    start_time: Instant,
    last_frame: Instant,
}

impl OrreryApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }
}

fn start(event_loop: &ActiveEventLoop, config: &AppConfig, setup: SetupFn) -> Result<Running> {
    let window_attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
    let window = Arc::new(
        event_loop
            .create_window(window_attrs)
            .map_err(|e| Error::Window(e.to_string()))?,
    );

    let gpu = GpuContext::new(window.clone(), config.vsync)?;
    let mut pass = MeshPass::new(&gpu);

    let mut ctx = SetupContext {
        gpu: &gpu,
        backend: &mut pass,
        config,
    };
    let mut scene = setup(&mut ctx)?;
    scene.camera_mut().set_ratio(gpu.aspect());
    scene.initialize_all(&mut pass)?;
    log::debug!("{}", scene.describe());

    let now = Instant::now();
    Ok(Running {
        window,
        gpu,
        pass,
        scene,
        input: Input::new(),
        clear_color: config.clear_color,
        start_time: now,
        last_frame: now,
    })
}

impl Running {
    /// Runs one tick. Returns `false` once the user asked to quit.
    fn redraw(&mut self) -> Result<bool> {
        if self.input.key_pressed(KeyCode::KeyQ) || self.input.key_pressed(KeyCode::Escape) {
            return Ok(false);
        }
        if self.input.key_pressed(KeyCode::KeyW) {
            let wanted = !self.pass.wireframe();
            if self.pass.set_wireframe(wanted) != wanted {
                log::warn!("wireframe needs line polygon mode, which this adapter lacks");
            }
        }

        let now = Instant::now();
        let time = self.start_time.elapsed().as_secs_f32();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let camera = self.scene.camera_mut();
        for movement in self.input.camera_movements() {
            camera.travel(movement, dt);
        }
        if self.input.scroll() != 0.0 {
            camera.zoom(self.input.scroll());
        }

        self.scene.update(time)?;
        self.scene.render_frame(&mut self.pass)?;
        self.pass.finish_frame(&self.gpu, self.clear_color)?;

        self.input.begin_frame();
        self.window.request_redraw();
        Ok(true)
    }
}

impl ApplicationHandler for OrreryApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending { config, setup } = &mut self.state else {
            return;
        };
        let Some(setup) = setup.take() else {
            return;
        };

        match start(event_loop, config, setup) {
            Ok(running) => {
                running.window.request_redraw();
                self.state = AppState::Running(Box::new(running));
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
                if size.height > 0 {
                    running.scene.camera_mut().set_ratio(running.gpu.aspect());
                }
            }
            WindowEvent::RedrawRequested => match running.redraw() {
                Ok(true) => {}
                Ok(false) => event_loop.exit(),
                Err(error) => self.fail(event_loop, error),
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = AppConfig::new()
            .title("Solar System")
            .size(640, 480)
            .vsync(false)
            .shaders("a.wgsl", "b.wgsl");
        assert_eq!(config.title, "Solar System");
        assert_eq!((config.width, config.height), (640, 480));
        assert!(!config.vsync);
        assert_eq!(config.vertex_shader, PathBuf::from("a.wgsl"));
        assert_eq!(config.fragment_shader, PathBuf::from("b.wgsl"));
    }

    #[test]
    fn default_config_points_at_planet_shaders() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Orrery");
        assert!(config.vertex_shader.ends_with("planet.vert.wgsl"));
        assert!(config.fragment_shader.ends_with("planet.frag.wgsl"));
    }
}
