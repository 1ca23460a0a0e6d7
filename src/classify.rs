use crate::{
    error::{MarchingCubesError, Result},
    tables::{CORNER_BITS, CORNER_OFFSETS},
    types::{Comparator, Point, ScalarField, Value},
};

/// Corner samples of one cube and the configuration they produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeSample {
    /// Configuration index into [`TRI_TABLE`](crate::tables::TRI_TABLE).
    pub index: u8,
    /// Field values in corner order, see [`tables`](crate::tables).
    pub values: [Value; 8],
}

/// Samples `field` at the 8 corners of the cube anchored at `origin` with edge `step`.
///
/// Corners are visited in the order of [`CORNER_OFFSETS`]. The first failing corner
/// aborts the cube.
#[inline]
pub fn sample_corners(field: &dyn ScalarField, origin: Point, step: Value) -> Result<[Value; 8]> {
    let mut values = [0.; 8];
    for (value, offset) in values.iter_mut().zip(CORNER_OFFSETS.iter()) {
        let point = Point::new(
            origin.x + step * offset[0],
            origin.y + step * offset[1],
            origin.z + step * offset[2],
        );
        *value = field
            .sample(point)
            .map_err(|source| MarchingCubesError::Evaluation { point, source })?;
    }
    Ok(values)
}

/// Computes the configuration index of a cube from its corner samples.
///
/// Bit `i` is set when corner `i` passes the `comparator` test against `iso_value`:
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// state bits:   [_][_][_][_][_][_][_][_]
///                                      ^-- bottom-back-left inside?
/// ```
#[inline]
pub fn config_index(values: &[Value; 8], iso_value: Value, comparator: Comparator) -> u8 {
    values
        .iter()
        .zip(CORNER_BITS)
        .filter(|(value, _)| comparator.test(**value, iso_value))
        .fold(0, |index, (_, bit)| index | bit)
}

/// Samples and classifies the cube anchored at `origin`.
#[inline]
pub fn classify(
    field: &dyn ScalarField,
    origin: Point,
    step: Value,
    iso_value: Value,
    comparator: Comparator,
) -> Result<CubeSample> {
    let values = sample_corners(field, origin, step)?;
    Ok(CubeSample {
        index: config_index(&values, iso_value, comparator),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::FieldError, tables::*, types::Fallible};

    /// Corner values that are inside exactly where `index` has a bit set.
    fn values_for(index: u8, inside: Value, outside: Value) -> [Value; 8] {
        let mut values = [outside; 8];
        for (corner, value) in values.iter_mut().enumerate() {
            if index & (1 << corner) != 0 {
                *value = inside;
            }
        }
        values
    }

    #[test]
    fn every_configuration_round_trips() {
        for index in 0..=u8::MAX {
            let values = values_for(index, -1., 1.);
            assert_eq!(config_index(&values, 0., Comparator::Less), index);
            assert_eq!(config_index(&values, 0., Comparator::LessEqual), index);

            let values = values_for(index, 1., -1.);
            assert_eq!(config_index(&values, 0., Comparator::Greater), index);
            assert_eq!(config_index(&values, 0., Comparator::GreaterEqual), index);
        }
    }

    #[test]
    fn equality_with_iso_depends_on_comparator() {
        let values = [0.5; 8];
        assert_eq!(config_index(&values, 0.5, Comparator::Less), 0);
        assert_eq!(config_index(&values, 0.5, Comparator::LessEqual), 255);
        assert_eq!(config_index(&values, 0.5, Comparator::Greater), 0);
        assert_eq!(config_index(&values, 0.5, Comparator::GreaterEqual), 255);
    }

    #[test]
    fn nan_corners_are_outside() {
        let mut values = [-1.; 8];
        values[3] = Value::NAN;
        assert_eq!(
            config_index(&values, 0., Comparator::Less),
            255 & !BOTTOM_FRONT_LEFT
        );
    }

    #[test]
    fn corners_are_sampled_in_table_order() {
        // Encode each corner's offset as a distinct value: x + 2y + 4z
        let field = |p: Point| p.x + 2. * p.y + 4. * p.z;
        let values = sample_corners(&field, Point::origin(), 1.).unwrap();
        assert_eq!(values, [0., 1., 5., 4., 2., 3., 7., 6.]);
    }

    #[test]
    fn classify_uses_cube_origin_and_step() {
        // Only the top four corners of the cube at y = 1 with step 0.5 reach y >= 1.5
        let field = |p: Point| p.y;
        let cube = classify(&field, Point::new(0., 1., 0.), 0.5, 1.5, Comparator::GreaterEqual)
            .unwrap();
        assert_eq!(
            cube.index,
            TOP_BACK_LEFT | TOP_BACK_RIGHT | TOP_FRONT_RIGHT | TOP_FRONT_LEFT
        );
        assert_eq!(cube.values[0], 1.);
        assert_eq!(cube.values[7], 1.5);
    }

    #[test]
    fn failing_corner_reports_its_position() {
        let field = Fallible(|p: Point| {
            if p.x > 0. {
                Err(FieldError::new("outside of the model"))
            } else {
                Ok(p.x)
            }
        });
        let err = classify(&field, Point::origin(), 1., 0., Comparator::Less).unwrap_err();
        assert_eq!(
            err,
            MarchingCubesError::Evaluation {
                point: Point::new(1., 0., 0.),
                source: FieldError::new("outside of the model"),
            }
        );
    }
}
