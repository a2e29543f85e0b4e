//! Free-fly camera, projection and the GPU-side camera uniform.
//!
//! The [`Camera`] keeps only its position and two angles. The orientation
//! basis and the view matrix are derived on every query, so there is no
//! cached state that could drift out of sync with the angles.

use std::collections::HashSet;

use cgmath::{Matrix4, Point3, Vector3, perspective};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// The six directions a held key can push the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Movement {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    Ascend,
    Descend,
}

impl Movement {
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::KeyW => Some(Self::Forward),
            KeyCode::KeyS => Some(Self::Backward),
            KeyCode::KeyA => Some(Self::StrafeLeft),
            KeyCode::KeyD => Some(Self::StrafeRight),
            KeyCode::Space => Some(Self::Ascend),
            KeyCode::ControlLeft => Some(Self::Descend),
            _ => None,
        }
    }
}

/// Camera-relative unit vectors derived from the two angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    /// Radians around the world Y axis. π looks down -Z.
    pub horizontal_angle: f32,
    /// Radians above the horizon.
    pub vertical_angle: f32,
    /// Units per second.
    pub speed: f32,
    /// Radians per pixel of cursor offset.
    pub sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new((0.0, 0.0, 5.0))
    }
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            horizontal_angle: std::f32::consts::PI,
            vertical_angle: 0.0,
            speed: 3.0,
            sensitivity: 0.0005,
        }
    }

    pub fn set_speed(&mut self, units_per_second: f32) {
        self.speed = units_per_second;
    }

    pub fn orientation(&self) -> Orientation {
        let (sin_h, cos_h) = self.horizontal_angle.sin_cos();
        let (sin_v, cos_v) = self.vertical_angle.sin_cos();
        let forward = Vector3::new(cos_v * sin_h, sin_v, cos_v * cos_h);
        let (sin_r, cos_r) = (self.horizontal_angle - std::f32::consts::FRAC_PI_2).sin_cos();
        let right = Vector3::new(sin_r, 0.0, cos_r);
        Orientation {
            forward,
            right,
            up: right.cross(forward),
        }
    }

    /// Look-at matrix from `position` along `forward`. Recomputed per call.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let Orientation { forward, up, .. } = self.orientation();
        Matrix4::look_at_rh(self.position, self.position + forward, up)
    }

    /// Move one step in `movement`'s direction, scaled by `dt` and speed.
    ///
    /// Call once per held key; steps accumulate, which gives diagonal motion.
    pub fn process_key(&mut self, movement: Movement, dt: Duration) {
        let Orientation { forward, right, up } = self.orientation();
        let direction = match movement {
            Movement::Forward => forward,
            Movement::Backward => -forward,
            Movement::StrafeLeft => -right,
            Movement::StrafeRight => right,
            Movement::Ascend => up,
            Movement::Descend => -up,
        };
        self.position += direction * dt.as_secs_f32() * self.speed;
    }

    /// Turn by the cursor's offset from the recentering point.
    ///
    /// The viewport height is paired with the cursor X and the width with
    /// the cursor Y. The frame driver recentres to `(height / 2, width / 2)`
    /// to match, so a cursor at rest produces no turn.
    pub fn process_mouse_motion(
        &mut self,
        cursor_x: f32,
        cursor_y: f32,
        viewport_height: f32,
        viewport_width: f32,
    ) {
        self.horizontal_angle += self.sensitivity * (viewport_height / 2.0 - cursor_x);
        self.vertical_angle += self.sensitivity * (viewport_width / 2.0 - cursor_y);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projection {
    aspect: f32,
    fovy: cgmath::Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<cgmath::Rad<f32>>>(
        width: u32,
        height: u32,
        fovy: F,
        znear: f32,
        zfar: f32,
    ) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_proj = (projection.calc_matrix() * camera.view_matrix()).into();
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.view_proj.into()
    }
}

/// Per-frame input state for the camera: which movement keys are held and
/// the latest cursor sample.
#[derive(Debug, Default)]
pub struct CameraController {
    held: HashSet<Movement>,
    cursor: Option<PhysicalPosition<f64>>,
    mouse_look: bool,
}

impl CameraController {
    pub fn new(mouse_look: bool) -> Self {
        Self {
            mouse_look,
            ..Default::default()
        }
    }

    pub fn is_held(&self, movement: Movement) -> bool {
        self.held.contains(&movement)
    }

    /// Track key and cursor state. Returns true if the event was consumed.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => match Movement::from_key(*key) {
                Some(movement) => {
                    match state {
                        ElementState::Pressed => self.held.insert(movement),
                        ElementState::Released => self.held.remove(&movement),
                    };
                    true
                }
                None => false,
            },
            WindowEvent::CursorMoved { position, .. } if self.mouse_look => {
                self.cursor = Some(*position);
                true
            }
            WindowEvent::Focused(false) => {
                self.held.clear();
                self.cursor = None;
                false
            }
            _ => false,
        }
    }

    /// Apply this frame's input to `camera`.
    ///
    /// Returns true when a cursor sample was consumed and the cursor should
    /// be recentred.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration, viewport: PhysicalSize<u32>) -> bool {
        for movement in self.held.iter().copied() {
            camera.process_key(movement, dt);
        }
        match self.cursor.take() {
            Some(cursor) => {
                camera.process_mouse_motion(
                    cursor.x as f32,
                    cursor.y as f32,
                    viewport.height as f32,
                    viewport.width as f32,
                );
                true
            }
            None => false,
        }
    }

    /// Where the cursor is put back after each sample.
    pub fn recenter_point(viewport: PhysicalSize<u32>) -> PhysicalPosition<f64> {
        PhysicalPosition::new(viewport.height as f64 / 2.0, viewport.width as f64 / 2.0)
    }
}

/// The camera together with the uniform buffer and bind group it feeds.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        camera: Camera,
        controller: CameraController,
        projection: &Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Recompute the uniform and queue it for upload.
    pub fn write(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;

    #[test]
    fn projection_survives_zero_height() {
        let projection = Projection::new(800, 0, cgmath::Deg(45.0), 0.1, 100.0);
        assert_eq!(projection.aspect(), 800.0);
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let forward = Camera::default().orientation().forward;
        assert!((forward - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-6);
    }

    #[test]
    fn recenter_point_uses_swapped_pairing() {
        let p = CameraController::recenter_point(PhysicalSize::new(800, 600));
        assert_eq!((p.x, p.y), (300.0, 400.0));
    }
}
