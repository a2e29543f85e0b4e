use std::io::{BufReader, Cursor};

use anyhow::{Context, bail};

use crate::data_structures::model::{Mesh, ModelVertex};

/**
 * Parse OBJ text into one triangle mesh.
 *
 * All objects in the file are merged in file order. Faces must already be
 * triangles; polygons and lines are rejected rather than fanned. Missing
 * texture coordinates or normals default to zero. Material libraries are
 * not loaded.
 */
pub fn parse_obj(name: &str, text: &str) -> anyhow::Result<Mesh> {
    let mut reader = BufReader::new(Cursor::new(text));
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: false,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .with_context(|| format!("malformed OBJ '{}'", name))?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for model in &models {
        let m = &model.mesh;
        if let Some(arity) = m.face_arities.iter().find(|&&arity| arity != 3) {
            bail!(
                "OBJ '{}' object '{}' has a face with {} vertices, only triangles are supported",
                name,
                model.name,
                arity
            );
        }
        let offset = vertices.len() as u32;
        vertices.extend((0..m.positions.len() / 3).map(|i| ModelVertex {
            position: [
                m.positions[i * 3],
                m.positions[i * 3 + 1],
                m.positions[i * 3 + 2],
            ],
            tex_coords: [
                m.texcoords.get(i * 2).map_or(0.0, |f| *f),
                m.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                m.normals.get(i * 3).map_or(0.0, |f| *f),
                m.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                m.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
        }));
        indices.extend(m.indices.iter().map(|i| i + offset));
    }

    let mesh = Mesh::new(name, vertices, indices)?;
    log::info!(
        "parsed OBJ '{}': {} objects, {} vertices, {} triangles",
        name,
        models.len(),
        mesh.vertices().len(),
        mesh.num_elements() / 3
    );
    Ok(mesh)
}
