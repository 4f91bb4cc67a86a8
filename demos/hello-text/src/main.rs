use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use atlas_asset::{Loader, SearchPaths, DEFAULT_ENV_VAR};
use atlas_text::{
    camera::{Camera, ProjectionType},
    render::{Render, RenderSettings},
    shader::{ShaderLibrary, TEXT_FRAGMENT, TEXT_VERTEX},
    text::{Font, StandardTechnique, TechniqueBinding, Text, TextDraw, TextMesh},
};
use clap::Parser;
use nalgebra::{point, vector, Matrix4, Vector2};
use wgpu::{
    Color, CommandEncoderDescriptor, DeviceDescriptor, Extent3d, Instance, InstanceDescriptor,
    InstanceFlags, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, RequestAdapterOptions, StoreOp,
    Surface, SurfaceConfiguration, TextureDescriptor, TextureDimension, TextureUsages,
    TextureView, TextureViewDescriptor,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

#[derive(Parser, Debug)]
#[command(name = "hello-text", about = "Draw a string with a bitmap font")]
struct Args {
    /// Font name, resolved as fonts/<name>.txt plus its atlas image
    #[arg(long, default_value = "roboto")]
    font: String,

    /// Extra search directory, tried before those in the environment
    #[arg(long = "path", value_name = "DIR")]
    paths: Vec<PathBuf>,

    #[arg(long, default_value = "hello world")]
    text: String,

    #[arg(long, num_args = 2, value_names = ["W", "H"], default_values_t = [800, 600])]
    window: Vec<u32>,

    /// Enable wgpu validation and debug labels
    #[arg(long)]
    debug: bool,
}

fn depth_view(render: &Render, config: &SurfaceConfiguration) -> Option<TextureView> {
    let format = render.depth_format()?;
    let texture = render.device().create_texture(&TextureDescriptor {
        label: Some("depth"),
        size: Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: render.sample_count(),
        dimension: TextureDimension::D2,
        format,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&TextureViewDescriptor::default()))
}

/// An orthographic camera centred on `bounds` with some margin around it.
fn fit_camera(bounds: Option<(Vector2<f32>, Vector2<f32>)>, aspect: f32) -> Camera {
    let (min, max) = bounds.unwrap_or((vector![0.0, 0.0], vector![1.0, 1.0]));
    let center = (min + max) / 2.0;
    let half = (max - min) * 0.6;
    let half_height = half.y.max(half.x / aspect).max(0.5);
    let half_width = half_height * aspect;

    Camera::new(
        point![center.x, center.y, 10.0],
        point![center.x, center.y, 0.0],
        ProjectionType::Orthographic {
            left: -half_width,
            right: half_width,
            top: half_height,
            bottom: -half_height,
            near: 0.1,
            far: 100.0,
        },
    )
}

struct Scene {
    window: Arc<Window>,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    render: Render,
    depth: Option<TextureView>,
    font: Font,
    mesh: TextMesh,
    draw: TextDraw,
}

impl Scene {
    fn new(
        event_loop: &ActiveEventLoop,
        args: &Args,
        search_paths: &SearchPaths,
        mut font: Font,
    ) -> Result<Self> {
        let (width, height) = (args.window[0], args.window[1]);
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title("hello-text")
                    .with_inner_size(PhysicalSize::new(width, height)),
            )?,
        );

        let instance = Instance::new(InstanceDescriptor {
            flags: if args.debug {
                InstanceFlags::debugging()
            } else {
                InstanceFlags::default()
            },
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            compatible_surface: Some(&surface),
            ..Default::default()
        }))
        .ok_or(anyhow!("No suitable adapter found."))?;
        let (device, queue) =
            pollster::block_on(adapter.request_device(&DeviceDescriptor::default(), None))?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let size = window.inner_size();
        let config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or(anyhow!("Surface is not supported by the adapter."))?;
        surface.configure(&device, &config);

        let mut shaders = ShaderLibrary::builtin();
        shaders.load_available(
            &mut Loader::new(search_paths.clone()),
            &[TEXT_VERTEX, TEXT_FRAGMENT],
        )?;
        let settings = RenderSettings {
            color_format: config.format,
            ..Default::default()
        };
        let mut render = Render::new(device, queue, settings, shaders);

        let name = font.name().to_string();
        font.technique::<StandardTechnique>(&mut render)
            .with_context(|| format!("failed to build text technique for '{}'", name))?;

        let mesh = Text::new(args.text.as_str(), point![0.0, 0.0, 0.0], vector![1.0, 1.0, 1.0])
            .layout(font.face())?;
        let draw = TextDraw::new(&render, &mesh);

        let scene = Self {
            depth: depth_view(&render, &config),
            window,
            surface,
            config,
            render,
            font,
            mesh,
            draw,
        };
        scene.update_camera()?;
        Ok(scene)
    }

    fn technique(&self) -> Result<&StandardTechnique> {
        self.font
            .existing_technique::<StandardTechnique>()
            .context("text technique was not built")
    }

    fn update_camera(&self) -> Result<()> {
        let aspect = self.config.width as f32 / self.config.height as f32;
        let uniform = fit_camera(self.mesh.bounds(), aspect).uniform(Matrix4::identity());
        self.technique()?.write_uniform(&self.render, &uniform)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(self.render.device(), &self.config);
        self.depth = depth_view(&self.render, &self.config);
        self.update_camera()
    }

    fn redraw(&mut self) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(self.render.device(), &self.config);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let technique = self.technique()?;

        let mut encoder = self
            .render
            .device()
            .create_command_encoder(&CommandEncoderDescriptor::default());
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("text"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.05,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: self.depth.as_ref().map(|depth| {
                    RenderPassDepthStencilAttachment {
                        view: depth,
                        depth_ops: Some(Operations {
                            load: LoadOp::Clear(1.0),
                            store: StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            technique.apply(&self.render, &mut rpass)?;
            self.draw.draw(&mut rpass);
        }

        self.render.queue().submit([encoder.finish()]);
        frame.present();
        Ok(())
    }
}

struct App {
    args: Args,
    search_paths: SearchPaths,
    font: Option<Font>,
    scene: Option<Scene>,
    error: Option<anyhow::Error>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }
        let Some(font) = self.font.take() else {
            return;
        };
        match Scene::new(event_loop, &self.args, &self.search_paths, font) {
            Ok(scene) => self.scene = Some(scene),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let result = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => scene.resize(size),
            WindowEvent::RedrawRequested => scene.redraw(),
            _ => Ok(()),
        };
        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scene) = &self.scene {
            scene.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut search_paths: SearchPaths = args.paths.iter().cloned().collect();
    search_paths.extend(SearchPaths::from_env(DEFAULT_ENV_VAR));
    search_paths.push(".");

    let font = Font::load(&args.font, &search_paths)
        .with_context(|| format!("failed to load font '{}'", args.font))?;

    let event_loop = EventLoop::new()?;
    let mut app = App {
        args,
        search_paths,
        font: Some(font),
        scene: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
