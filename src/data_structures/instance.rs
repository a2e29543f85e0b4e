//! Per-instance transforms with lazy GPU upload.
//!
//! An [`InstanceSet`] owns one [`Mesh`] and an ordered list of 4×4 model
//! matrices, one per rendered copy. Edits only touch the CPU-side list and
//! raise a dirty flag; [`InstanceSet::synchronize`] is the single place the
//! matrices are pushed to the device, and it does nothing while the set is
//! clean. Between synchronizations the device copy is allowed to lag behind.
//!
//! Index identity is positional: removing instance `i` shifts every later
//! instance down by one.

use cgmath::{AbsDiffEq, Deg, InnerSpace, Matrix3, Matrix4, RelativeEq, SquareMatrix, Vector3, Vector4};
use thiserror::Error;

use crate::{
    data_structures::model::{Mesh, MeshBuffers, Vertex},
    render::{DrawInstanced, GraphicsDevice},
};

// Decomposing a composed matrix drifts by a few ulps. Requested rotations and
// scales this close to the decomposed ones count as unchanged.
const DECOMPOSE_EPSILON: f32 = 1e-6;

/// Failure of an operation addressed to a single instance.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InstanceError {
    #[error("invalid instance index {index} (set holds {len} instances)")]
    OutOfRange { index: usize, len: usize },
}

/// Log-and-ignore adapter for callers that treat a bad index as a no-op,
/// such as live editing where a selection can go stale.
pub trait BestEffort<T> {
    fn best_effort(self) -> Option<T>;
}

impl<T> BestEffort<T> for Result<T, InstanceError> {
    fn best_effort(self) -> Option<T> {
        self.map_err(|e| log::warn!("{e}")).ok()
    }
}

/// The matrix layout stored in the instance buffer (column-major mat4).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
}

impl InstanceRaw {
    pub fn matrix(&self) -> Matrix4<f32> {
        self.model.into()
    }
}

impl From<&Matrix4<f32>> for InstanceRaw {
    fn from(matrix: &Matrix4<f32>) -> Self {
        Self {
            model: (*matrix).into(),
        }
    }
}

/**
 * A mat4 occupies four vertex slots, one vec4 column each. The step mode is
 * `Instance` so the shader only advances to the next matrix per instance.
 */
impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// One mesh drawn many times, each copy with its own model matrix.
///
/// `B` is the buffer type of the [`GraphicsDevice`] the set was created on.
pub struct InstanceSet<B> {
    mesh: Mesh,
    mesh_buffers: MeshBuffers<B>,
    instances: Vec<Matrix4<f32>>,
    instance_buffer: B,
    instance_label: String,
    // Matrices held by `instance_buffer` as of the last synchronization.
    uploaded: usize,
    dirty: bool,
    generation: u64,
}

impl<B> InstanceSet<B> {
    /// Upload `mesh` and `count` identity instances.
    ///
    /// The initial upload is part of construction: the new set is clean and
    /// its generation is 0.
    pub fn new<D>(device: &D, label: &str, mesh: Mesh, count: usize) -> Self
    where
        D: GraphicsDevice<Buffer = B>,
    {
        let instances = vec![Matrix4::identity(); count];
        let mesh_buffers = mesh.upload(device);
        let instance_label = format!("{} Instance Buffer", label);
        let instance_buffer =
            device.create_instance_buffer(&instance_label, &to_raw(&instances));
        log::debug!(
            "created instance set '{}' ({} vertices, {} instances)",
            label,
            mesh.vertices().len(),
            count
        );
        Self {
            mesh,
            mesh_buffers,
            instances,
            instance_buffer,
            instance_label,
            uploaded: count,
            dirty: false,
            generation: 0,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_buffers(&self) -> &MeshBuffers<B> {
        &self.mesh_buffers
    }

    pub fn instance_buffer(&self) -> &B {
        &self.instance_buffer
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// True iff the matrices changed since the last synchronization.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of synchronizations that actually uploaded.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// CPU-side matrices in rendering order.
    pub fn transforms(&self) -> &[Matrix4<f32>] {
        &self.instances
    }

    /// Append an instance and return its index.
    pub fn add_instance(&mut self, transform: Matrix4<f32>) -> usize {
        self.instances.push(transform);
        self.dirty = true;
        self.instances.len() - 1
    }

    /// Append an instance that is a pure translation.
    pub fn add_instance_at(&mut self, position: Vector3<f32>) -> usize {
        self.add_instance(Matrix4::from_translation(position))
    }

    /// Remove instance `index`; later instances move down by one.
    pub fn remove_instance(&mut self, index: usize) -> Result<Matrix4<f32>, InstanceError> {
        self.check(index)?;
        self.dirty = true;
        Ok(self.instances.remove(index))
    }

    pub fn set_transform(
        &mut self,
        index: usize,
        transform: Matrix4<f32>,
    ) -> Result<(), InstanceError> {
        self.replace(index, transform)
    }

    /// Overwrite the translation column, keeping rotation and scale.
    ///
    /// Unlike a plain `translate(I, p)` this does not reset an instance that
    /// was rotated or scaled earlier.
    pub fn set_position(
        &mut self,
        index: usize,
        position: Vector3<f32>,
    ) -> Result<(), InstanceError> {
        let mut transform = self.transform(index)?;
        transform.w = Vector4::new(position.x, position.y, position.z, transform.w.w);
        self.replace(index, transform)
    }

    /// Rescale each basis column to the given length, keeping position and
    /// rotation.
    pub fn set_scale(&mut self, index: usize, scale: Vector3<f32>) -> Result<(), InstanceError> {
        let transform = self.transform(index)?;
        self.recompose(index, &transform, rotation_basis(&transform), scale)
    }

    pub fn set_uniform_scale(&mut self, index: usize, scale: f32) -> Result<(), InstanceError> {
        self.set_scale(index, Vector3::new(scale, scale, scale))
    }

    /// Replace the rotation with Euler angles in degrees, composed as
    /// Rz·Ry·Rx so that [`rotation`](Self::rotation) reads them back.
    pub fn set_rotation(
        &mut self,
        index: usize,
        euler_degrees: Vector3<f32>,
    ) -> Result<(), InstanceError> {
        let transform = self.transform(index)?;
        let rotation = Matrix3::from_angle_z(Deg(euler_degrees.z))
            * Matrix3::from_angle_y(Deg(euler_degrees.y))
            * Matrix3::from_angle_x(Deg(euler_degrees.x));
        self.recompose(index, &transform, rotation, scale_of(&transform))
    }

    /// Replace the rotation with `angle_degrees` about `axis`.
    ///
    /// A zero-length axis yields NaN components; it is not guarded.
    pub fn set_rotation_axis(
        &mut self,
        index: usize,
        angle_degrees: f32,
        axis: Vector3<f32>,
    ) -> Result<(), InstanceError> {
        let transform = self.transform(index)?;
        let rotation = Matrix3::from_axis_angle(axis.normalize(), Deg(angle_degrees));
        self.recompose(index, &transform, rotation, scale_of(&transform))
    }

    /// Post-multiply a rotation of X, then Y, then Z degrees.
    pub fn rotate(&mut self, index: usize, euler_degrees: Vector3<f32>) -> Result<(), InstanceError> {
        let transform = self.transform(index)?
            * Matrix4::from_angle_x(Deg(euler_degrees.x))
            * Matrix4::from_angle_y(Deg(euler_degrees.y))
            * Matrix4::from_angle_z(Deg(euler_degrees.z));
        self.replace(index, transform)
    }

    /// Post-multiply a (possibly non-uniform) scale.
    pub fn scale_by(&mut self, index: usize, factor: Vector3<f32>) -> Result<(), InstanceError> {
        let transform = self.transform(index)?
            * Matrix4::from_nonuniform_scale(factor.x, factor.y, factor.z);
        self.replace(index, transform)
    }

    pub fn transform(&self, index: usize) -> Result<Matrix4<f32>, InstanceError> {
        self.check(index)?;
        Ok(self.instances[index])
    }

    pub fn position(&self, index: usize) -> Result<Vector3<f32>, InstanceError> {
        Ok(self.transform(index)?.w.truncate())
    }

    /// [`position`](Self::position) with the legacy error convention: an
    /// invalid index is logged and reported as `(-1, -1, -1)`.
    pub fn position_or_sentinel(&self, index: usize) -> Vector3<f32> {
        self.position(index)
            .best_effort()
            .unwrap_or(Vector3::new(-1.0, -1.0, -1.0))
    }

    /// Lengths of the three basis columns. Only meaningful while the matrix
    /// is translate·rotate·scale without shear.
    pub fn scale(&self, index: usize) -> Result<Vector3<f32>, InstanceError> {
        Ok(scale_of(&self.transform(index)?))
    }

    /// Euler angles in degrees, decomposed from the normalized basis.
    ///
    /// Near Y = ±90° the X and Z angles are not unique and the result is
    /// one arbitrary solution.
    pub fn rotation(&self, index: usize) -> Result<Vector3<f32>, InstanceError> {
        let m = rotation_basis(&self.transform(index)?);
        let x = m[1][2].atan2(m[2][2]);
        let y = (-m[0][2]).atan2(m[1][2].hypot(m[2][2]));
        let z = m[0][1].atan2(m[0][0]);
        Ok(Vector3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()))
    }

    /// Push the matrices to the device if they changed (or if `force`).
    ///
    /// Returns whether an upload happened. The upload always replaces the
    /// whole buffer.
    pub fn synchronize<D>(&mut self, device: &D, force: bool) -> bool
    where
        D: GraphicsDevice<Buffer = B>,
    {
        if !self.dirty && !force {
            return false;
        }
        self.dirty = false;
        self.generation += 1;
        let raw = to_raw(&self.instances);
        device.write_instance_buffer(&mut self.instance_buffer, &self.instance_label, &raw);
        self.uploaded = raw.len();
        true
    }

    /// Issue one instanced draw for the uploaded instances.
    ///
    /// Never draws more instances than the device buffer holds; an empty
    /// set draws nothing.
    pub fn draw<P: DrawInstanced<B>>(&self, target: &mut P) {
        let amount = self.instances.len().min(self.uploaded);
        if amount == 0 {
            log::trace!("skipping draw of '{}': no uploaded instances", self.mesh.name());
            return;
        }
        target.draw_mesh_instanced(
            &self.mesh_buffers,
            &self.instance_buffer,
            0..amount as u32,
        );
    }

    fn check(&self, index: usize) -> Result<(), InstanceError> {
        if index < self.instances.len() {
            Ok(())
        } else {
            Err(InstanceError::OutOfRange {
                index,
                len: self.instances.len(),
            })
        }
    }

    // Rebuild `transform` from `rotation` and `scale`, keeping its translation.
    // A no-op while both still match what `transform` decomposes to.
    fn recompose(
        &mut self,
        index: usize,
        transform: &Matrix4<f32>,
        rotation: Matrix3<f32>,
        scale: Vector3<f32>,
    ) -> Result<(), InstanceError> {
        let same_rotation = rotation.abs_diff_eq(&rotation_basis(transform), DECOMPOSE_EPSILON);
        let same_scale =
            scale.relative_eq(&scale_of(transform), DECOMPOSE_EPSILON, DECOMPOSE_EPSILON);
        if same_rotation && same_scale {
            return Ok(());
        }
        self.replace(index, compose(transform.w, rotation, scale))
    }

    // Leaves the set clean when the new matrix is bit-for-bit the old one.
    fn replace(&mut self, index: usize, transform: Matrix4<f32>) -> Result<(), InstanceError> {
        let len = self.instances.len();
        let current = self
            .instances
            .get_mut(index)
            .ok_or(InstanceError::OutOfRange { index, len })?;
        if !bit_identical(current, &transform) {
            *current = transform;
            self.dirty = true;
        }
        Ok(())
    }
}

fn to_raw(instances: &[Matrix4<f32>]) -> Vec<InstanceRaw> {
    instances.iter().map(InstanceRaw::from).collect()
}

fn bit_identical(a: &Matrix4<f32>, b: &Matrix4<f32>) -> bool {
    let a: [[f32; 4]; 4] = (*a).into();
    let b: [[f32; 4]; 4] = (*b).into();
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .all(|(x, y)| x.to_bits() == y.to_bits())
}

fn scale_of(transform: &Matrix4<f32>) -> Vector3<f32> {
    Vector3::new(
        transform.x.truncate().magnitude(),
        transform.y.truncate().magnitude(),
        transform.z.truncate().magnitude(),
    )
}

/// Normalized basis columns. A collapsed (zero-length) column falls back to
/// the matching unit axis so that a later rescale can recover from scale 0.
fn rotation_basis(transform: &Matrix4<f32>) -> Matrix3<f32> {
    let unit = |column: Vector4<f32>, axis: Vector3<f32>| {
        let column = column.truncate();
        if column.magnitude2() > 0.0 {
            column.normalize()
        } else {
            axis
        }
    };
    Matrix3::from_cols(
        unit(transform.x, Vector3::unit_x()),
        unit(transform.y, Vector3::unit_y()),
        unit(transform.z, Vector3::unit_z()),
    )
}

fn compose(translation: Vector4<f32>, rotation: Matrix3<f32>, scale: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_cols(
        (rotation.x * scale.x).extend(0.0),
        (rotation.y * scale.y).extend(0.0),
        (rotation.z * scale.z).extend(0.0),
        translation,
    )
}
