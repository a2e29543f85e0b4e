//! Engine data structures: meshes, instance sets and textures.
//!
//! - `model` contains the vertex layout, validated meshes and their device buffers
//! - `instance` holds per-instance transforms and their dirty-tracked upload
//! - `primitives` builds the procedural triangle, square, cube and pyramid
//! - `texture` contains GPU texture wrappers and creation utilities

pub mod instance;
pub mod model;
pub mod primitives;
pub mod texture;
