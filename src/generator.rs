use tracing::{debug, info};

use crate::{
    classify::classify,
    domain::Domain,
    error::Result,
    tables::{EDGE_MIDPOINTS, TRI_TABLE},
    types::{Axis, Comparator, GenerationMode, Point, ScalarField, Value},
};

/// Floats appended per emitted triangle.
pub const FLOATS_PER_TRIANGLE: usize = 9;

/// Construction parameters of a [`MarchingCubes`] engine.
///
/// The defaults describe the surface viewer: the cube `[-3, 3]³` sampled every `0.02`
/// against an iso value of `0.05`.
///
/// ```rust,ignore
/// let settings = GeneratorSettings::default()
///     .with_bounds(-1., 1.)
///     .with_step(0.05)
///     .with_mode(GenerationMode::IncrementalZ);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorSettings {
    /// Iso-surface threshold.
    pub iso_value: Value,
    /// Lower bound of the domain on every axis.
    pub min: Value,
    /// Upper bound of the domain on every axis.
    pub max: Value,
    /// Edge length of each cube.
    pub step: Value,
    pub mode: GenerationMode,
    /// Test deciding whether a corner is inside.
    pub comparator: Comparator,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            iso_value: 0.05,
            min: -3.,
            max: 3.,
            step: 0.02,
            mode: GenerationMode::Full,
            comparator: Comparator::Less,
        }
    }
}

impl GeneratorSettings {
    pub fn with_iso_value(mut self, iso_value: Value) -> Self {
        self.iso_value = iso_value;
        self
    }

    pub fn with_bounds(mut self, min: Value, max: Value) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_step(mut self, step: Value) -> Self {
        self.step = step;
        self
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }
}

/// Marching cubes engine turning a [`ScalarField`] into a flat triangle list.
///
/// Each call to [`generate`](MarchingCubes::generate) performs one unit of work: the whole
/// domain in [`GenerationMode::Full`], one slice of cubes in the incremental modes.
/// Triangles are appended to a single vertex buffer that can be read between calls:
///
/// ```rust,ignore
/// let mut cubes = MarchingCubes::new(field, settings)?;
/// while !cubes.is_finished() {
///     cubes.generate()?;
///     let normals = compute_normals(cubes.vertices());
///     upload(cubes.vertices(), &normals);
/// }
/// ```
///
/// The buffer holds 3 floats per vertex and 3 vertices per triangle, and only ever grows
/// by whole triangles.
pub struct MarchingCubes {
    field: Box<dyn ScalarField>,
    settings: GeneratorSettings,
    domain: Domain,
    /// Next slice to generate in the incremental modes.
    next_slice: usize,
    finished: bool,
    vertices: Vec<Value>,
}

impl MarchingCubes {
    /// Creates an engine over `field`.
    ///
    /// Returns [`MarchingCubesError::InvalidDomain`](crate::error::MarchingCubesError::InvalidDomain)
    /// if the bounds in `settings` cannot be traversed.
    pub fn new(field: impl ScalarField + 'static, settings: GeneratorSettings) -> Result<Self> {
        let domain = Domain::new(settings.min, settings.max, settings.step)?;
        Ok(Self {
            field: Box::new(field),
            settings,
            domain,
            next_slice: 0,
            finished: false,
            vertices: Vec::new(),
        })
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn mode(&self) -> GenerationMode {
        self.settings.mode
    }

    /// `true` once the whole domain has been generated. Never reverts.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Coordinate of the next slice in the incremental modes.
    ///
    /// `None` in [`GenerationMode::Full`] and once generation has finished.
    pub fn cursor(&self) -> Option<Value> {
        match self.settings.mode.axis() {
            Some(_) if !self.finished => Some(self.domain.origin(self.next_slice)),
            _ => None,
        }
    }

    /// Fraction of the domain generated so far, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.finished {
            return 1.;
        }
        match self.settings.mode {
            GenerationMode::Full => 0.,
            _ => self.next_slice as f32 / self.domain.cells().max(1) as f32,
        }
    }

    /// Flat vertex positions generated so far, `[x0, y0, z0, x1, ...]`.
    pub fn vertices(&self) -> &[Value] {
        &self.vertices
    }

    pub fn into_vertices(self) -> Vec<Value> {
        self.vertices
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_TRIANGLE
    }

    /// Advances generation by one unit of work.
    ///
    /// Does nothing once [`is_finished`](MarchingCubes::is_finished) is `true`.
    ///
    /// If the field fails, every vertex appended during this call is discarded and the
    /// error is returned; the slice is not consumed, so calling again retries it.
    pub fn generate(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        let committed = self.vertices.len();
        let outcome = match self.settings.mode.axis() {
            None => self.generate_full(),
            Some(axis) => self.generate_slice(axis),
        };
        if let Err(err) = outcome {
            self.vertices.truncate(committed);
            return Err(err);
        }

        if self.finished {
            info!(
                triangles = self.triangle_count(),
                mode = ?self.settings.mode,
                "finished generating"
            );
        }
        Ok(())
    }

    /// Calls [`generate`](MarchingCubes::generate) until generation finishes.
    pub fn generate_all(&mut self) -> Result<()> {
        while !self.finished {
            self.generate()?;
        }
        Ok(())
    }

    fn generate_full(&mut self) -> Result<()> {
        let before = self.triangle_count();
        for x in 0..self.domain.cells() {
            self.march_slice(Axis::X, x)?;
        }
        debug!(
            cells = self.domain.total_cells(),
            triangles = self.triangle_count() - before,
            "generated full domain"
        );
        self.finished = true;
        Ok(())
    }

    fn generate_slice(&mut self, axis: Axis) -> Result<()> {
        if self.next_slice < self.domain.cells() {
            let before = self.triangle_count();
            self.march_slice(axis, self.next_slice)?;
            debug!(
                ?axis,
                slice = self.next_slice,
                at = self.domain.origin(self.next_slice),
                triangles = self.triangle_count() - before,
                "generated slice"
            );
            self.next_slice += 1;
        }
        self.finished = self.next_slice >= self.domain.cells();
        Ok(())
    }

    /// Classifies and triangulates every cube of slice `slice` perpendicular to `axis`,
    /// iterating the other two axes in ascending order.
    fn march_slice(&mut self, axis: Axis, slice: usize) -> Result<()> {
        let cells = self.domain.cells();
        let step = self.domain.step();
        let along = self.domain.origin(slice);

        for a in 0..cells {
            for b in 0..cells {
                let origin = axis.compose(along, self.domain.origin(a), self.domain.origin(b));
                let cube = classify(
                    self.field.as_ref(),
                    origin,
                    step,
                    self.settings.iso_value,
                    self.settings.comparator,
                )?;
                emit_triangles(&mut self.vertices, cube.index, origin, step);
            }
        }
        Ok(())
    }
}

/// Appends the triangles of configuration `index` for the cube at `origin`.
///
/// ```text
/// TRI_TABLE[index] = [e0, e1, e2,  e3, e4, e5,  -1, ...]
///                     \___tri0__/   \___tri1__/
/// ```
///
/// A triple is emitted when its first entry is not negative. Each vertex lands on
/// `origin + step * EDGE_MIDPOINTS[e]`, in table order.
///
/// # Panics
/// Panics if an emitted triple references an edge outside [`EDGE_MIDPOINTS`].
pub fn emit_triangles(vertices: &mut Vec<Value>, index: u8, origin: Point, step: Value) {
    for triangle in TRI_TABLE[index as usize].chunks_exact(3) {
        if triangle[0] < 0 {
            continue;
        }
        for &edge in triangle {
            let offset = usize::try_from(edge)
                .ok()
                .and_then(|edge| EDGE_MIDPOINTS.get(edge))
                .unwrap_or_else(|| {
                    panic!("triangulation of configuration {index} references edge {edge}")
                });
            vertices.extend_from_slice(&[
                origin.x + step * offset[0],
                origin.y + step * offset[1],
                origin.z + step * offset[2],
            ]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{FieldError, MarchingCubesError},
        tables::NO_EDGE,
        types::Fallible,
    };

    fn plane() -> impl ScalarField {
        |p: Point| p.y
    }

    fn settings(mode: GenerationMode) -> GeneratorSettings {
        GeneratorSettings::default()
            .with_iso_value(0.)
            .with_bounds(-1., 1.)
            .with_step(0.5)
            .with_mode(mode)
            .with_comparator(Comparator::GreaterEqual)
    }

    #[test]
    fn table_only_references_known_edges() {
        for (index, row) in TRI_TABLE.iter().enumerate() {
            for triangle in row.chunks_exact(3) {
                if triangle[0] == NO_EDGE {
                    assert!(triangle.iter().all(|&e| e == NO_EDGE), "row {index}");
                } else {
                    assert!(triangle.iter().all(|&e| (0..12).contains(&e)), "row {index}");
                }
            }
        }
        assert!(TRI_TABLE[0].iter().all(|&e| e == NO_EDGE));
        assert!(TRI_TABLE[255].iter().all(|&e| e == NO_EDGE));
    }

    #[test]
    fn emitted_vertices_sit_on_edge_midpoints() {
        let mut vertices = Vec::new();
        // Only bottom-back-left inside: edges 0, 8, 3
        emit_triangles(&mut vertices, 1, Point::new(1., 2., 3.), 2.);
        assert_eq!(vertices, vec![2., 2., 3., 1., 3., 3., 1., 2., 4.]);
    }

    #[test]
    fn empty_configurations_emit_nothing() {
        let mut vertices = Vec::new();
        emit_triangles(&mut vertices, 0, Point::origin(), 1.);
        emit_triangles(&mut vertices, 255, Point::origin(), 1.);
        assert!(vertices.is_empty());
    }

    #[test]
    fn full_mode_finishes_in_one_call() {
        let mut cubes = MarchingCubes::new(plane(), settings(GenerationMode::Full)).unwrap();
        assert!(!cubes.is_finished());
        assert_eq!(cubes.cursor(), None);

        cubes.generate().unwrap();
        assert!(cubes.is_finished());
        assert_eq!(cubes.progress(), 1.);
        // One layer of 4 x 4 cubes, two triangles each
        assert_eq!(cubes.triangle_count(), 32);
    }

    #[test]
    fn incremental_cursor_walks_the_domain() {
        let mut cubes =
            MarchingCubes::new(plane(), settings(GenerationMode::IncrementalZ)).unwrap();
        let mut cursors = Vec::new();
        while let Some(cursor) = cubes.cursor() {
            cursors.push(cursor);
            cubes.generate().unwrap();
        }
        assert_eq!(cursors, vec![-1., -0.5, 0., 0.5]);
        assert!(cubes.is_finished());
        assert_eq!(cubes.triangle_count(), 32);
    }

    #[test]
    fn each_slice_appends_whole_triangles() {
        let mut cubes =
            MarchingCubes::new(plane(), settings(GenerationMode::IncrementalX)).unwrap();
        let mut previous = 0;
        while !cubes.is_finished() {
            cubes.generate().unwrap();
            assert_eq!(cubes.vertices().len() % FLOATS_PER_TRIANGLE, 0);
            assert!(cubes.vertices().len() >= previous);
            previous = cubes.vertices().len();
        }
        assert_eq!(cubes.progress(), 1.);
    }

    #[test]
    fn generate_after_finishing_is_a_no_op() {
        let mut cubes = MarchingCubes::new(plane(), settings(GenerationMode::Full)).unwrap();
        cubes.generate_all().unwrap();
        let vertices = cubes.vertices().to_vec();
        cubes.generate().unwrap();
        assert!(cubes.is_finished());
        assert_eq!(cubes.vertices(), vertices.as_slice());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let result = MarchingCubes::new(plane(), settings(GenerationMode::Full).with_step(0.));
        assert!(matches!(
            result,
            Err(MarchingCubesError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn failed_slice_is_rolled_back_and_retried() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let broken = Arc::new(AtomicBool::new(false));
        let field = {
            let broken = Arc::clone(&broken);
            Fallible(move |p: Point| {
                // Fails partway through the surface layer of the second slice
                if broken.load(Ordering::Relaxed) && p.x >= -0.5 && p.y >= 0. && p.z >= 0.5 {
                    Err(FieldError::new("sensor offline"))
                } else {
                    Ok(p.y)
                }
            })
        };
        let mut cubes = MarchingCubes::new(field, settings(GenerationMode::IncrementalX)).unwrap();

        cubes.generate().unwrap();
        let committed = cubes.vertices().to_vec();
        assert!(!committed.is_empty());

        broken.store(true, Ordering::Relaxed);
        let err = cubes.generate().unwrap_err();
        assert!(matches!(err, MarchingCubesError::Evaluation { .. }));
        assert_eq!(cubes.vertices(), committed.as_slice());
        assert_eq!(cubes.cursor(), Some(-0.5));
        assert!(!cubes.is_finished());

        broken.store(false, Ordering::Relaxed);
        cubes.generate_all().unwrap();
        assert_eq!(cubes.triangle_count(), 32);
    }
}
