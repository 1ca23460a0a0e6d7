use nalgebra::{Point3, Vector3};

use crate::error::FieldError;

/// Scalar field value at a point in space.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// A scalar field sampled by the marching cubes engine.
///
/// Implemented for every `Fn(Point) -> Value`, so most callers pass a closure:
///
/// ```rust,ignore
/// let field = |p: Point| p.y - p.x.sin() * p.z.cos();
/// ```
///
/// Fields that can fail are wrapped in [`Fallible`].
///
/// The field is called up to eight times per cube and must return the same value for the
/// same point for the lifetime of a generation run.
pub trait ScalarField: Send + Sync {
    fn sample(&self, point: Point) -> Result<Value, FieldError>;
}

impl<F> ScalarField for F
where
    F: Fn(Point) -> Value + Send + Sync,
{
    #[inline]
    fn sample(&self, point: Point) -> Result<Value, FieldError> {
        Ok(self(point))
    }
}

/// Adapts a fallible `Fn(Point) -> Result<Value, FieldError>` into a [`ScalarField`].
pub struct Fallible<F>(pub F);

impl<F> ScalarField for Fallible<F>
where
    F: Fn(Point) -> Result<Value, FieldError> + Send + Sync,
{
    #[inline]
    fn sample(&self, point: Point) -> Result<Value, FieldError> {
        (self.0)(point)
    }
}

/// How a sampled corner value is compared against the iso value.
///
/// A corner is "inside" the surface when `sample <op> iso_value` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Comparator {
    #[default]
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparator {
    /// Returns `true` if `sample` is inside the surface.
    ///
    /// Plain IEEE comparisons: a NaN sample is never inside.
    #[inline]
    pub fn test(self, sample: Value, iso_value: Value) -> bool {
        match self {
            Comparator::Less => sample < iso_value,
            Comparator::LessEqual => sample <= iso_value,
            Comparator::Greater => sample > iso_value,
            Comparator::GreaterEqual => sample >= iso_value,
        }
    }
}

/// Grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Builds a point from the coordinate along `self` and the two remaining
    /// coordinates, given in ascending axis order.
    ///
    /// ```text
    /// X: (along, a, b)
    /// Y: (a, along, b)
    /// Z: (a, b, along)
    /// ```
    #[inline]
    pub fn compose(self, along: Value, a: Value, b: Value) -> Point {
        match self {
            Axis::X => Point::new(along, a, b),
            Axis::Y => Point::new(a, along, b),
            Axis::Z => Point::new(a, b, along),
        }
    }
}

/// How much work one call to [`MarchingCubes::generate`](crate::generator::MarchingCubes::generate) does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GenerationMode {
    /// The whole domain in a single call.
    #[default]
    Full,
    /// One slice of cubes perpendicular to X per call.
    IncrementalX,
    /// One slice of cubes perpendicular to Y per call.
    IncrementalY,
    /// One slice of cubes perpendicular to Z per call.
    IncrementalZ,
}

impl GenerationMode {
    /// Slicing axis, or `None` for [`GenerationMode::Full`].
    pub fn axis(self) -> Option<Axis> {
        match self {
            GenerationMode::Full => None,
            GenerationMode::IncrementalX => Some(Axis::X),
            GenerationMode::IncrementalY => Some(Axis::Y),
            GenerationMode::IncrementalZ => Some(Axis::Z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparators_follow_ieee_semantics() {
        assert!(Comparator::Less.test(-1., 0.));
        assert!(!Comparator::Less.test(0., 0.));
        assert!(Comparator::LessEqual.test(0., 0.));
        assert!(Comparator::Greater.test(1., 0.));
        assert!(!Comparator::Greater.test(0., 0.));
        assert!(Comparator::GreaterEqual.test(0., 0.));

        for comparator in [
            Comparator::Less,
            Comparator::LessEqual,
            Comparator::Greater,
            Comparator::GreaterEqual,
        ] {
            assert!(!comparator.test(Value::NAN, 0.), "{comparator:?} accepted NaN");
        }
    }

    #[test]
    fn compose_places_the_slice_coordinate_on_its_axis() {
        assert_eq!(Axis::X.compose(1., 2., 3.), Point::new(1., 2., 3.));
        assert_eq!(Axis::Y.compose(1., 2., 3.), Point::new(2., 1., 3.));
        assert_eq!(Axis::Z.compose(1., 2., 3.), Point::new(2., 3., 1.));
    }

    #[test]
    fn closures_and_fallible_closures_are_fields() {
        let plain = |p: Point| p.x + p.y + p.z;
        assert_eq!(plain.sample(Point::new(1., 2., 3.)), Ok(6.));

        let failing = Fallible(|_: Point| -> Result<Value, FieldError> {
            Err(FieldError::new("unavailable"))
        });
        assert!(failing.sample(Point::origin()).is_err());
    }
}
