#![allow(dead_code)]

use std::{cell::Cell, ops::Range};

use cgmath::Matrix4;
use instanced_fly::{
    data_structures::{
        instance::{InstanceRaw, InstanceSet},
        model::{Mesh, MeshBuffers, ModelVertex},
        primitives,
    },
    render::{DrawInstanced, GraphicsDevice},
};

/// What a [`MockDevice`] hands out instead of GPU memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MockBuffer {
    pub label: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub instances: Vec<InstanceRaw>,
}

impl MockBuffer {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            vertices: Vec::new(),
            indices: Vec::new(),
            instances: Vec::new(),
        }
    }

    pub fn matrices(&self) -> Vec<Matrix4<f32>> {
        self.instances.iter().map(InstanceRaw::matrix).collect()
    }
}

/// A device without a GPU. Counts every call that would touch GPU memory.
#[derive(Debug, Default)]
pub struct MockDevice {
    pub buffers_created: Cell<usize>,
    pub instance_writes: Cell<usize>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphicsDevice for MockDevice {
    type Buffer = MockBuffer;

    fn create_vertex_buffer(&self, label: &str, vertices: &[ModelVertex]) -> MockBuffer {
        self.buffers_created.set(self.buffers_created.get() + 1);
        MockBuffer {
            vertices: vertices.to_vec(),
            ..MockBuffer::new(label)
        }
    }

    fn create_index_buffer(&self, label: &str, indices: &[u32]) -> MockBuffer {
        self.buffers_created.set(self.buffers_created.get() + 1);
        MockBuffer {
            indices: indices.to_vec(),
            ..MockBuffer::new(label)
        }
    }

    fn create_instance_buffer(&self, label: &str, instances: &[InstanceRaw]) -> MockBuffer {
        self.buffers_created.set(self.buffers_created.get() + 1);
        MockBuffer {
            instances: instances.to_vec(),
            ..MockBuffer::new(label)
        }
    }

    fn write_instance_buffer(&self, buffer: &mut MockBuffer, _label: &str, instances: &[InstanceRaw]) {
        self.instance_writes.set(self.instance_writes.get() + 1);
        buffer.instances = instances.to_vec();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub mesh_label: String,
    pub num_elements: u32,
    pub instances: Range<u32>,
}

/// Records draws instead of submitting them.
#[derive(Debug, Default)]
pub struct DrawRecorder {
    pub calls: Vec<DrawCall>,
}

impl DrawInstanced<MockBuffer> for DrawRecorder {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &MeshBuffers<MockBuffer>,
        _instance_buffer: &MockBuffer,
        instances: Range<u32>,
    ) {
        self.calls.push(DrawCall {
            mesh_label: mesh.vertex_buffer.label.clone(),
            num_elements: mesh.num_elements,
            instances,
        });
    }
}

/// The 4-vertex, 6-index unit quad.
pub fn unit_quad() -> Mesh {
    primitives::square()
}

/// An empty quad set on a fresh mock device.
pub fn quad_set(device: &MockDevice) -> InstanceSet<MockBuffer> {
    InstanceSet::new(device, "quad", unit_quad(), 0)
}

pub fn assert_vec3_near(actual: cgmath::Vector3<f32>, expected: cgmath::Vector3<f32>, eps: f32) {
    use cgmath::InnerSpace;
    assert!(
        (actual - expected).magnitude() <= eps,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}
