//! Procedurally defined unit meshes: triangle, square, cube and pyramid.
//!
//! All shapes are centred on the origin and fit in the unit cube
//! `[-0.5, 0.5]³`. Normals are flat, accumulated from triangle winding.

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::{Mesh, ModelVertex};

pub fn triangle() -> Mesh {
    build(
        "triangle",
        &[[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]],
        &[[0.5, 1.0], [1.0, 0.0], [0.0, 0.0]],
        vec![0, 1, 2],
    )
}

pub fn square() -> Mesh {
    build(
        "square",
        &[
            [-0.5, -0.5, 0.0],
            [0.5, -0.5, 0.0],
            [0.5, 0.5, 0.0],
            [-0.5, 0.5, 0.0],
        ],
        &QUAD_UV,
        vec![0, 1, 2, 2, 3, 0],
    )
}

/// 24 vertices (four per face) so every face gets its own texture square.
pub fn cube() -> Mesh {
    let positions = [
        // front
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
        // back
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        // left
        [-0.5, 0.5, 0.5],
        [-0.5, -0.5, 0.5],
        [-0.5, -0.5, -0.5],
        [-0.5, 0.5, -0.5],
        // right
        [0.5, 0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        // top
        [-0.5, 0.5, 0.5],
        [0.5, 0.5, 0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        // bottom
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, -0.5, -0.5],
        [-0.5, -0.5, -0.5],
    ];
    let tex_coords: Vec<[f32; 2]> = QUAD_UV.iter().copied().cycle().take(24).collect();
    let indices = (0..6u32)
        .flat_map(|face| [0, 1, 2, 2, 3, 0].map(|i| face * 4 + i))
        .collect();
    build("cube", &positions, &tex_coords, indices)
}

/// Four triangular sides meeting at the apex; the base is left open.
pub fn pyramid() -> Mesh {
    let apex = [0.0, 0.5, 0.0];
    let positions = [
        // front
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        apex,
        // left
        [-0.5, -0.5, 0.5],
        [-0.5, -0.5, -0.5],
        apex,
        // right
        [0.5, -0.5, 0.5],
        [0.5, -0.5, -0.5],
        apex,
        // back
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        apex,
    ];
    let tex_coords: Vec<[f32; 2]> = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]]
        .iter()
        .copied()
        .cycle()
        .take(12)
        .collect();
    build("pyramid", &positions, &tex_coords, (0..12).collect())
}

const QUAD_UV: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

fn build(name: &str, positions: &[[f32; 3]], tex_coords: &[[f32; 2]], indices: Vec<u32>) -> Mesh {
    let mut normals = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    for tri in indices.chunks(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vector3::from(positions[i as usize]));
        let face = (b - a).cross(c - a);
        for &i in tri {
            normals[i as usize] += face;
        }
    }
    let vertices = positions
        .iter()
        .zip(tex_coords)
        .zip(normals)
        .map(|((&position, &tex_coords), normal)| ModelVertex {
            position,
            tex_coords,
            normal: if normal.magnitude2() > 0.0 {
                normal.normalize().into()
            } else {
                [0.0; 3]
            },
        })
        .collect();
    // The tables above are fixed and always index in range.
    Mesh::new(name, vertices, indices).expect("primitive tables are well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_counts_match_shapes() {
        assert_eq!(triangle().num_elements(), 3);
        assert_eq!(square().vertices().len(), 4);
        assert_eq!(square().num_elements(), 6);
        assert_eq!(cube().vertices().len(), 24);
        assert_eq!(cube().num_elements(), 36);
        assert_eq!(pyramid().num_elements(), 12);
    }

    #[test]
    fn flat_quad_faces_forward() {
        for v in square().vertices() {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn everything_fits_the_unit_cube() {
        for mesh in [triangle(), square(), cube(), pyramid()] {
            for v in mesh.vertices() {
                assert!(v.position.iter().all(|c| c.abs() <= 0.5), "{}", mesh.name());
            }
        }
    }
}
