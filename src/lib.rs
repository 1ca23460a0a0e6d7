//! Marching cubes extraction of implicit surfaces, one slice at a time.
//!
//! [`MarchingCubes`] samples a [`ScalarField`] over a cubic domain and appends the
//! resulting triangles to a flat vertex buffer, either in a single pass or one slice per
//! call so the cost can be spread over many frames. [`compute_normals`] derives
//! flat-shaded normals from that buffer, and [`MarchingCubesPlugin`] drives both inside a
//! Bevy app.

pub mod classify;
pub mod domain;
pub mod error;
pub mod generator;
pub mod mesh;
pub mod plugin;
pub mod tables;
pub mod types;

pub use generator::{GeneratorSettings, MarchingCubes};
pub use mesh::{GeneratedMesh, compute_normals};
pub use plugin::{MarchingCubesPlugin, SurfaceGenerator};
pub use types::{Comparator, GenerationMode, Point, ScalarField, Value};
