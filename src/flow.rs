//! Frame driver and application event loop.
//!
//! A "flow" is a scene: it owns instance sets, reacts to input, and says what
//! to draw each frame. The [`App`] owns the window and the [`Context`] and
//! drives every flow through the same per-frame order.
//!
//! # Lifecycle Flow
//!
//! Once at startup:
//! 1. Open the window and create the [`Context`]
//! 2. Run each [`FlowConstructor`] (CPU-side loading, may be async)
//! 3. Call `on_init` so the flow can upload its meshes to the device
//!
//! Then on every redraw:
//! 1. Apply held keys and the cursor sample to the camera, recentre the cursor
//! 2. `on_update` on every flow
//! 3. `write_to_buffer` on every flow, which synchronizes dirty instance sets
//! 4. Upload the camera uniform
//! 5. Collect every flow's [`Render`] and issue one draw per instance set
//! 6. Present frame

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window},
};

use crate::{
    camera::CameraController,
    config::EngineConfig,
    context::Context,
    render::{Instanced, Render},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once with the finished context; upload meshes here
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame with the elapsed time
/// 4. `write_to_buffer()` is called every frame after all updates
/// 5. `on_render()` is called every frame and lists what to draw
pub trait GraphicsFlow {
    fn on_init(&mut self, ctx: &mut Context) -> anyhow::Result<()>;

    fn on_window_events(&mut self, _ctx: &Context, _event: &WindowEvent) {}

    fn on_update(&mut self, ctx: &Context, dt: Duration);

    /// Push pending CPU-side changes to the device.
    fn write_to_buffer(&mut self, ctx: &Context);

    fn on_render(&self) -> Render<'_>;
}

// Dummy impl to make wasm work
impl Debug for dyn GraphicsFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Builds a flow before the context exists. Device uploads belong in
/// [`GraphicsFlow::on_init`].
pub type FlowConstructor =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow>>>>>>;

/// Box an async flow factory as a [`FlowConstructor`].
pub fn flow_constructor<F, Fut>(factory: F) -> FlowConstructor
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<Box<dyn GraphicsFlow>>> + 'static,
{
    Box::new(move || {
        Box::pin(factory())
            as Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow>>>>>
    })
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized {
        ctx: Context,
        flows: Vec<Box<dyn GraphicsFlow>>,
    },
    #[allow(dead_code)]
    Failed(anyhow::Error),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { ctx: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    config: EngineConfig,
    ctx: Option<Context>,
    graphics_flows: Vec<Box<dyn GraphicsFlow>>,
    // Taken on the first `resumed`.
    constructors: Option<Vec<FlowConstructor>>,
    is_surface_configured: bool,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        config: EngineConfig,
        constructors: Vec<FlowConstructor>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            ctx: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            is_surface_configured: false,
            last_time: Instant::now(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn initialized(&mut self, ctx: Context, flows: Vec<Box<dyn GraphicsFlow>>) {
        if ctx.capture_cursor {
            let window = ctx.window();
            window.set_cursor_visible(false);
            if let Err(e) = window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
            {
                log::warn!("could not grab the cursor: {}", e);
            }
        }
        let size = ctx.window.inner_size();
        self.ctx = Some(ctx);
        self.graphics_flows = flows;
        self.resize(size.width, size.height);
        self.last_time = Instant::now();
        if let Some(ctx) = &self.ctx {
            ctx.window.request_redraw();
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(ctx) = &mut self.ctx {
            if width > 0 && height > 0 {
                ctx.resize(width, height);
                self.is_surface_configured = true;
            }
        }
    }

    fn update(&mut self, dt: Duration) {
        let Some(ctx) = &mut self.ctx else {
            return;
        };
        let viewport = ctx.viewport();
        let sampled = ctx
            .camera
            .controller
            .update(&mut ctx.camera.camera, dt, viewport);
        if sampled && ctx.capture_cursor {
            let centre = CameraController::recenter_point(viewport);
            if let Err(e) = ctx.window.set_cursor_position(centre) {
                log::debug!("could not recentre the cursor: {}", e);
            }
        }

        self.graphics_flows
            .iter_mut()
            .for_each(|flow| flow.on_update(ctx, dt));
        self.graphics_flows
            .iter_mut()
            .for_each(|flow| flow.write_to_buffer(ctx));

        ctx.camera.write(&ctx.queue, &ctx.projection);
    }
}

fn render(ctx: &Context, graphics_flows: &[Box<dyn GraphicsFlow>]) -> Result<(), wgpu::SurfaceError> {
    let output = ctx.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let mut batch: Vec<Instanced> = Vec::new();
        graphics_flows
            .iter()
            .for_each(|flow| flow.on_render().collect(&mut batch));

        render_pass.set_pipeline(&ctx.pipeline);
        render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        for instanced in &batch {
            instanced.draw(&mut render_pass);
        }
    }

    ctx.queue.submit(iter::once(encoder.finish()));
    output.present();
    Ok(())
}

fn escape_pressed(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::KeyboardInput {
            event: KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::Escape),
                state: ElementState::Pressed,
                ..
            },
            ..
        }
    )
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let config = self.config.clone();
        let init_future = async move {
            let mut ctx = Context::new(window, &config).await?;
            let mut flows = Vec::with_capacity(constructors.len());
            for constructor in constructors {
                let mut flow = constructor().await?;
                flow.on_init(&mut ctx)?;
                flows.push(flow);
            }
            anyhow::Ok((ctx, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((ctx, flows)) => self.initialized(ctx, flows),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((ctx, flows)) => FlowEvent::Initialized { ctx, flows },
                    Err(e) => FlowEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized { ctx, flows } => self.initialized(ctx, flows),
            FlowEvent::Failed(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(ctx) = &mut self.ctx else {
            return;
        };

        if escape_pressed(&event) {
            log::info!("escape pressed, closing");
            event_loop.exit();
            return;
        }

        ctx.camera.controller.handle_window_events(&event);
        self.graphics_flows
            .iter_mut()
            .for_each(|flow| flow.on_window_events(ctx, &event));

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                ctx.window.request_redraw();
                // Rendering requires the surface to be configured
                if !self.is_surface_configured {
                    return;
                }

                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                self.update(dt);

                let Some(ctx) = &self.ctx else {
                    return;
                };
                match render(ctx, &self.graphics_flows) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = ctx.window.inner_size();
                        self.resize(size.width, size.height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        self.fail(event_loop, anyhow::anyhow!("graphics device is out of memory"))
                    }
                    Err(e) => log::error!("Unable to render {}", e),
                }
            }
            _ => {}
        }
    }
}

/// Open a window and run `constructors` until the window closes.
pub fn run(config: EngineConfig, constructors: Vec<FlowConstructor>) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, constructors)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
