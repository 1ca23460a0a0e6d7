use crate::{
    error::{MarchingCubesError, Result},
    types::Value,
};

/// Relative slack under which a span is treated as a whole number of steps.
const WHOLE_STEP_TOLERANCE: Value = 1e-5;

/// A cubic, axis-aligned sampling region split into cubes of edge `step`.
///
/// Cubes are addressed by integer index along each axis. Cube `i` has its origin at
/// `min + i * step`, and there are `ceil((max - min) / step)` cubes per axis, so the
/// cubes cover the whole closed interval `[min, max]`. When the span is not a multiple
/// of `step` the last cube reaches past `max`.
///
/// ```text
/// min                              max
///  |-------|-------|-------|-------|
///  0       1       2       3          cells = 4
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    min: Value,
    max: Value,
    step: Value,
    cells: usize,
    total_cells: usize,
}

impl Domain {
    /// Validates the bounds and precomputes the cell count.
    ///
    /// `min == max` is accepted and yields an empty grid. Bounds whose cube count does not
    /// fit in a `usize` are rejected along with non-finite or inverted ones.
    pub fn new(min: Value, max: Value, step: Value) -> Result<Self> {
        let invalid = MarchingCubesError::InvalidDomain { min, max, step };

        let finite = min.is_finite() && max.is_finite() && step.is_finite();
        if !finite || step <= 0. || min > max {
            return Err(invalid);
        }

        let cells = cell_count(max - min, step).ok_or_else(|| invalid.clone())?;
        let total_cells = cells.checked_pow(3).ok_or(invalid)?;

        Ok(Self {
            min,
            max,
            step,
            cells,
            total_cells,
        })
    }

    pub fn min(&self) -> Value {
        self.min
    }

    pub fn max(&self) -> Value {
        self.max
    }

    pub fn step(&self) -> Value {
        self.step
    }

    /// Number of cubes along each axis.
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Total number of cubes in the grid.
    pub fn total_cells(&self) -> usize {
        self.total_cells
    }

    /// Coordinate of the origin of cube `index` along any axis.
    #[inline]
    pub fn origin(&self, index: usize) -> Value {
        self.min + index as Value * self.step
    }
}

/// `None` if the span overflows or holds more steps than a `usize` can count.
fn cell_count(span: Value, step: Value) -> Option<usize> {
    let steps = span / step;
    if !steps.is_finite() || steps >= usize::MAX as Value {
        return None;
    }

    let whole = steps.round();
    if (steps - whole).abs() <= steps.max(1.) * WHOLE_STEP_TOLERANCE {
        Some(whole as usize)
    } else {
        Some(steps.ceil() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_spans_ignore_float_noise() {
        assert_eq!(Domain::new(-1., 1., 0.5).unwrap().cells(), 4);
        // 6 / 0.02 is not exactly 300 in f32
        assert_eq!(Domain::new(-3., 3., 0.02).unwrap().cells(), 300);
        assert_eq!(Domain::new(0., 1., 0.1).unwrap().cells(), 10);
    }

    #[test]
    fn partial_spans_round_up() {
        let domain = Domain::new(0., 1., 0.3).unwrap();
        assert_eq!(domain.cells(), 4);
        assert!(domain.origin(3) < domain.max());
        assert!(domain.origin(3) + domain.step() > domain.max());
    }

    #[test]
    fn empty_span_has_no_cells() {
        let domain = Domain::new(2., 2., 0.5).unwrap();
        assert_eq!(domain.cells(), 0);
        assert_eq!(domain.total_cells(), 0);
    }

    #[test]
    fn total_cells_counts_the_whole_grid() {
        assert_eq!(Domain::new(-1., 1., 0.5).unwrap().total_cells(), 64);
        assert_eq!(Domain::new(-3., 3., 0.02).unwrap().total_cells(), 27_000_000);
    }

    #[test]
    fn rejects_untraversable_bounds() {
        for (min, max, step) in [
            (0., 1., 0.),
            (0., 1., -0.1),
            (1., 0., 0.1),
            (Value::NAN, 1., 0.1),
            (0., Value::INFINITY, 0.1),
            (0., 1., Value::NAN),
            // Span or step count overflows
            (0., 1., 1e-40),
            (-3e38, 3e38, 1.),
            // Per-axis count fits, the cube of it does not
            (0., 1., 1e-7),
        ] {
            let err = Domain::new(min, max, step).unwrap_err();
            assert!(
                matches!(err, MarchingCubesError::InvalidDomain { .. }),
                "{min} {max} {step} gave {err:?}"
            );
        }
    }

    #[test]
    fn origins_are_computed_from_the_index() {
        let domain = Domain::new(-3., 3., 0.02).unwrap();
        assert_eq!(domain.origin(0), -3.);
        assert!((domain.origin(150) - 0.).abs() < 1e-4);
        assert!((domain.origin(299) - 2.98).abs() < 1e-4);
    }
}
