//! Device seam and render composition.
//!
//! Drawables never touch ambient GPU state. Everything they upload goes
//! through a [`GraphicsDevice`] handle passed in explicitly, and every draw
//! is submitted to a [`DrawInstanced`] target. [`Context`](crate::context::Context)
//! and `wgpu::RenderPass` are the production implementations; tests swap in
//! recording fakes.
//!
//! # Key types
//!
//! - [`GraphicsDevice`] creates buffers and replaces instance buffer contents
//! - [`DrawInstanced`] issues one instanced indexed draw
//! - [`Render<'a>`] is what a flow hands to the frame loop each frame
//! - [`Instanced<'a>`] pairs an instance set with the texture it is drawn with

use std::ops::Range;

use crate::data_structures::{
    instance::{InstanceRaw, InstanceSet},
    model::{MeshBuffers, ModelVertex},
    texture::DiffuseTexture,
};

/// Explicit handle to whatever owns GPU memory.
pub trait GraphicsDevice {
    type Buffer;

    fn create_vertex_buffer(&self, label: &str, vertices: &[ModelVertex]) -> Self::Buffer;

    fn create_index_buffer(&self, label: &str, indices: &[u32]) -> Self::Buffer;

    fn create_instance_buffer(&self, label: &str, instances: &[InstanceRaw]) -> Self::Buffer;

    /// Replace the whole content of `buffer` with `instances`.
    ///
    /// Implementations may reallocate `buffer` when it is too small.
    fn write_instance_buffer(
        &self,
        buffer: &mut Self::Buffer,
        label: &str,
        instances: &[InstanceRaw],
    );
}

/// Anything that can record an instanced indexed draw.
pub trait DrawInstanced<B> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &MeshBuffers<B>,
        instance_buffer: &B,
        instances: Range<u32>,
    );
}

impl DrawInstanced<wgpu::Buffer> for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &MeshBuffers<wgpu::Buffer>,
        instance_buffer: &wgpu::Buffer,
        instances: Range<u32>,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, instance_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

/// An instance set together with the texture bound while drawing it.
#[derive(Clone, Copy)]
pub struct Instanced<'a> {
    pub set: &'a InstanceSet<wgpu::Buffer>,
    pub texture: &'a DiffuseTexture,
}

impl<'a> Instanced<'a> {
    pub fn new(set: &'a InstanceSet<wgpu::Buffer>, texture: &'a DiffuseTexture) -> Self {
        Self { set, texture }
    }

    /// Bind the texture to group 1 and submit the set's draw.
    ///
    /// The pipeline and camera bind group must already be set on `render_pass`.
    pub(crate) fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_bind_group(1, &self.texture.bind_group, &[]);
        self.set.draw(render_pass);
    }
}

/// Specifies what a flow wants drawn this frame.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single instance set
/// - `Defaults(Vec<Instanced>)` renders a batch of instance sets
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Flatten the render tree into the frame's draw batch, preserving order.
    pub(crate) fn collect(self, batch: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Default(instanced) => batch.push(instanced),
            Render::Defaults(mut vec) => batch.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.collect(batch)),
            Render::None => (),
        }
    }
}

impl<'a> From<Instanced<'a>> for Render<'a> {
    fn from(instanced: Instanced<'a>) -> Self {
        Render::Default(instanced)
    }
}
