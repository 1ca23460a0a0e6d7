use rayon::prelude::*;

use crate::{
    generator::FLOATS_PER_TRIANGLE,
    types::{Value, Vector},
};

/// Computes flat-shaded normals for a flat triangle list.
///
/// For every complete triangle `(v1, v2, v3)` the unit normal of `(v2 - v1) × (v3 - v1)` is
/// written three times, once per vertex. A trailing incomplete triangle is skipped, so the
/// result has `floor(vertices.len() / 9) * 9` floats.
///
/// Degenerate triangles get the zero vector.
pub fn compute_normals(vertices: &[Value]) -> Vec<Value> {
    let (triangles, _) = vertices.as_chunks::<FLOATS_PER_TRIANGLE>();
    let mut normals = vec![0.; triangles.len() * FLOATS_PER_TRIANGLE];

    normals
        .par_chunks_exact_mut(FLOATS_PER_TRIANGLE)
        .zip(triangles.par_iter())
        .for_each(|(out, triangle)| {
            let normal = triangle_normal(triangle);
            for vertex in out.chunks_exact_mut(3) {
                vertex.copy_from_slice(normal.as_slice());
            }
        });

    normals
}

/// Unit normal of `triangle`, three vertices of `[x, y, z]`.
///
/// Returns the zero vector if the triangle is degenerate.
pub fn triangle_normal(triangle: &[Value; FLOATS_PER_TRIANGLE]) -> Vector {
    let a = Vector::new(triangle[0], triangle[1], triangle[2]);
    let b = Vector::new(triangle[3], triangle[4], triangle[5]);
    let c = Vector::new(triangle[6], triangle[7], triangle[8]);

    let cross = (b - a).cross(&(c - a));

    let norm = cross.norm();
    if norm == 0.0 {
        Vector::zeros()
    } else {
        cross / norm
    }
}

/// Positions and normals of an unindexed triangle list, ready for upload.
///
/// Every group of three consecutive vertices forms one triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedMesh {
    /// Vertex positions: `[[x, y, z], ...]`
    pub vertices: Vec<[Value; 3]>,

    /// Per-vertex face normals: `[[nx, ny, nz], ...]`
    pub normals: Vec<[Value; 3]>,
}

impl GeneratedMesh {
    /// Builds the mesh from a flat vertex buffer, deriving flat-shaded normals.
    ///
    /// A trailing incomplete triangle is dropped so both lists have the same length.
    pub fn from_vertices(vertices: &[Value]) -> Self {
        let whole = vertices.len() / FLOATS_PER_TRIANGLE * FLOATS_PER_TRIANGLE;
        let vertices = &vertices[..whole];
        let normals = compute_normals(vertices);

        Self {
            vertices: to_triples(vertices),
            normals: to_triples(&normals),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

fn to_triples(flat: &[Value]) -> Vec<[Value; 3]> {
    flat.chunks_exact(3).map(|v| [v[0], v[1], v[2]]).collect()
}
