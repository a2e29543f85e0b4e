//! Static mesh geometry shared by every instance of a drawable.
//!
//! A [`Mesh`] is the CPU-side vertex/index list produced either by the
//! procedural [`primitives`](crate::data_structures::primitives) or by the
//! OBJ loader in [`resources`](crate::resources). It is immutable once
//! built; [`Mesh::upload`] copies it into device buffers exactly once.

use thiserror::Error;

use crate::render::GraphicsDevice;

/// Vertex buffer layout description for types uploaded as vertex data.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// A single mesh vertex as laid out in the vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Structural problems that make a vertex/index list unusable as a mesh.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("mesh '{name}' has {count} indices, which is not a whole number of triangles")]
    NotTriangles { name: String, count: usize },
    #[error("mesh '{name}' references vertex {index} but only has {vertices} vertices")]
    IndexOutOfBounds {
        name: String,
        index: u32,
        vertices: usize,
    },
}

/// Triangle-list geometry: ordered vertices plus indices into them.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    name: String,
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Build a mesh, rejecting index lists that are not whole triangles or
    /// that point past the end of `vertices`.
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
    ) -> Result<Self, MeshError> {
        let name = name.into();
        if indices.len() % 3 != 0 {
            return Err(MeshError::NotTriangles {
                name,
                count: indices.len(),
            });
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfBounds {
                name,
                index,
                vertices: vertices.len(),
            });
        }
        Ok(Self {
            name,
            vertices,
            indices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[ModelVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices the draw call walks through.
    pub fn num_elements(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Copy the geometry into device-resident vertex and index buffers.
    pub fn upload<D: GraphicsDevice>(&self, device: &D) -> MeshBuffers<D::Buffer> {
        MeshBuffers {
            vertex_buffer: device
                .create_vertex_buffer(&format!("{} Vertex Buffer", self.name), &self.vertices),
            index_buffer: device
                .create_index_buffer(&format!("{} Index Buffer", self.name), &self.indices),
            num_elements: self.num_elements(),
        }
    }
}

/// Device-resident copy of a [`Mesh`]. Never rewritten after upload.
#[derive(Debug)]
pub struct MeshBuffers<B> {
    pub vertex_buffer: B,
    pub index_buffer: B,
    pub num_elements: u32,
}
