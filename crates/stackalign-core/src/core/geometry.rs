use nalgebra::{Matrix3, Point3, Vector3};

/// A rigid-body transform: a rotation followed by a translation.
///
/// Coordinates are treated as row vectors, so a point `x` maps to
/// `x · Rᵗ + t`. For a single point this is the same as `R · x + t` with
/// `x` as a column vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        (self.rotation - Matrix3::identity()).abs().max() <= tolerance
            && self.translation.abs().max() <= tolerance
    }

    pub fn apply_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * point.coords + self.translation)
    }

    pub fn apply_coords(&self, coords: &[Point3<f64>]) -> Vec<Point3<f64>> {
        transform_coords(coords, &self.rotation, &self.translation)
    }

    /// The inverse transform, assuming `rotation` is orthonormal.
    ///
    /// The rotation is not re-orthonormalized, so the inverse is only as exact
    /// as the matrix reported by the engine.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        let translation = -(rotation * self.translation);
        Self::new(rotation, translation)
    }

    /// The transform equivalent to applying `self` and then `next`.
    pub fn then(&self, next: &Transform) -> Self {
        Self::new(
            next.rotation * self.rotation,
            next.rotation * self.translation + next.translation,
        )
    }
}

/// Applies `coords · rotationᵗ + translation` to an N×3 coordinate array.
///
/// Pure floating-point arithmetic: no clamping and no re-normalization of the
/// rotation.
pub fn transform_coords(
    coords: &[Point3<f64>],
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
) -> Vec<Point3<f64>> {
    coords
        .iter()
        .map(|p| Point3::from(rotation * p.coords + translation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Unit};

    const EPS: f64 = 1e-9;

    fn sample_coords() -> Vec<Point3<f64>> {
        vec![
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(-4.5, 0.25, 8.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(12.125, -7.5, 3.375),
        ]
    }

    fn sample_transform() -> Transform {
        let axis = Unit::new_normalize(Vector3::new(1.0, 1.0, 0.5));
        let rotation = Rotation3::from_axis_angle(&axis, 37.0f64.to_radians());
        Transform::new(*rotation.matrix(), Vector3::new(3.0, -2.0, 10.0))
    }

    #[test]
    fn identity_leaves_coordinates_unchanged() {
        let coords = sample_coords();
        let out = Transform::identity().apply_coords(&coords);
        assert_eq!(out, coords);
    }

    #[test]
    fn transform_uses_row_vector_convention() {
        // A quarter turn about z maps x onto y.
        let rotation = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let translation = Vector3::new(0.0, 0.0, 1.0);
        let out = transform_coords(&[Point3::new(1.0, 0.0, 0.0)], &rotation, &translation);

        // Row form: [1 0 0] · Rᵗ = first row of Rᵗ = first column of R.
        assert!((out[0] - Point3::new(0.0, 1.0, 1.0)).norm() < EPS);
    }

    #[test]
    fn transform_preserves_row_count() {
        let coords = sample_coords();
        let t = sample_transform();
        assert_eq!(t.apply_coords(&coords).len(), coords.len());
        assert!(t.apply_coords(&[]).is_empty());
    }

    #[test]
    fn inverse_round_trip_restores_coordinates() {
        let coords = sample_coords();
        let t = sample_transform();
        let back = t.inverse().apply_coords(&t.apply_coords(&coords));
        for (a, b) in coords.iter().zip(&back) {
            assert!((a - b).norm() < EPS, "{a} != {b}");
        }
        assert!(t.then(&t.inverse()).is_identity(EPS));
    }

    #[test]
    fn apply_point_agrees_with_apply_coords() {
        let t = sample_transform();
        let p = Point3::new(2.0, -3.0, 4.0);
        assert!((t.apply_point(&p) - t.apply_coords(&[p])[0]).norm() < EPS);
    }

    #[test]
    fn rotation_is_not_renormalized() {
        let scale = Matrix3::identity() * 2.0;
        let out = transform_coords(&[Point3::new(1.0, 1.0, 1.0)], &scale, &Vector3::zeros());
        assert_eq!(out[0], Point3::new(2.0, 2.0, 2.0));
    }
}
