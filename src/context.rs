use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraController, CameraResources, Projection},
    config::EngineConfig,
    data_structures::{
        instance::InstanceRaw,
        model::ModelVertex,
        texture::{self, DiffuseTexture},
    },
    pipelines::instanced::mk_instanced_pipeline,
    render::GraphicsDevice,
};

/// Everything the frame loop needs from the GPU and the window.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub clear_colour: wgpu::Color,
    pub pipeline: wgpu::RenderPipeline,
    pub texture_layout: wgpu::BindGroupLayout,
    pub(crate) capture_cursor: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>, engine: &EngineConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible graphics adapter")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    // WebGL doesn't support all of wgpu's features, so if
                    // we're building for the web we'll have to disable some.
                    required_limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default()
                    },
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("could not open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour, so prefer an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let projection = Projection::new(
            config.width,
            config.height,
            engine.fovy,
            engine.znear,
            engine.zfar,
        );
        let mut camera = Camera::new(engine.camera_position);
        camera.set_speed(engine.camera_speed);
        camera.sensitivity = engine.mouse_sensitivity;
        let camera = CameraResources::new(
            &device,
            camera,
            CameraController::new(engine.capture_cursor),
            &projection,
        );

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let texture_layout = texture::diffuse_layout(&device);
        let pipeline = mk_instanced_pipeline(
            &device,
            &config,
            &camera.bind_group_layout,
            &texture_layout,
        );

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            clear_colour: engine.clear_colour,
            pipeline,
            texture_layout,
            capture_cursor: engine.capture_cursor,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn viewport(&self) -> winit::dpi::PhysicalSize<u32> {
        winit::dpi::PhysicalSize::new(self.config.width, self.config.height)
    }

    /// Upload `img` against this context's texture layout.
    pub fn texture(&self, name: &str, img: &image::DynamicImage) -> DiffuseTexture {
        DiffuseTexture::from_image(&self.device, &self.queue, &self.texture_layout, name, img)
    }

    /// Opaque white, for meshes that come without a texture of their own.
    pub fn white_texture(&self) -> DiffuseTexture {
        DiffuseTexture::white(&self.device, &self.queue, &self.texture_layout)
    }

    /// A checkerboard texture bound to this context's texture layout.
    pub fn checkerboard(&self, cells: u32, light: [u8; 4], dark: [u8; 4]) -> DiffuseTexture {
        DiffuseTexture::checkerboard(
            &self.device,
            &self.queue,
            &self.texture_layout,
            cells,
            light,
            dark,
        )
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.projection.resize(width, height);
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
    }
}

fn create_buffer(
    device: &wgpu::Device,
    label: &str,
    contents: &[u8],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage,
    })
}

impl GraphicsDevice for Context {
    type Buffer = wgpu::Buffer;

    fn create_vertex_buffer(&self, label: &str, vertices: &[ModelVertex]) -> wgpu::Buffer {
        create_buffer(
            &self.device,
            label,
            bytemuck::cast_slice(vertices),
            wgpu::BufferUsages::VERTEX,
        )
    }

    fn create_index_buffer(&self, label: &str, indices: &[u32]) -> wgpu::Buffer {
        create_buffer(
            &self.device,
            label,
            bytemuck::cast_slice(indices),
            wgpu::BufferUsages::INDEX,
        )
    }

    fn create_instance_buffer(&self, label: &str, instances: &[InstanceRaw]) -> wgpu::Buffer {
        create_buffer(
            &self.device,
            label,
            bytemuck::cast_slice(instances),
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        )
    }

    fn write_instance_buffer(
        &self,
        buffer: &mut wgpu::Buffer,
        label: &str,
        instances: &[InstanceRaw],
    ) {
        let bytes: &[u8] = bytemuck::cast_slice(instances);
        if bytes.len() as wgpu::BufferAddress > buffer.size() {
            log::debug!("growing {} to {} bytes", label, bytes.len());
            *buffer = self.create_instance_buffer(label, instances);
        } else if !bytes.is_empty() {
            self.queue.write_buffer(buffer, 0, bytes);
        }
    }
}
