//! Render pipelines. A single textured, instanced pipeline covers every
//! drawable in the scene.

pub mod instanced;
