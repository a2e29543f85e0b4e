//! instanced-fly
//!
//! A small instancing-oriented renderer with a free-fly camera. Each drawable
//! is an instance set: one mesh plus an ordered list of model matrices that
//! is uploaded to the GPU only when it changed. Native and WASM targets share
//! the same code path.
//!
//! High-level modules
//! - `camera`: free-fly camera, projection, input controller and uniforms
//! - `config`: startup configuration for window, projection and camera
//! - `context`: central GPU and window context that owns device/queue/pipeline
//! - `data_structures`: meshes, instance sets, primitives and textures
//! - `editor`: keyboard-driven live editing of instance transforms
//! - `flow`: the frame driver (scenes / update loop)
//! - `pipelines`: the instanced render pipeline
//! - `render`: the explicit device seam and per-frame render composition
//! - `resources`: helpers to load meshes and textures from `assets/`
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod editor;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use image;
pub use wgpu;
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;
