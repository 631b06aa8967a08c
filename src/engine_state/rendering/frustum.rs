//! View-frustum culling.
//!
//! The six clip planes are read straight off the rows of the combined view-projection
//! matrix (Gribb and Hartmann), then normalised so plane distances are in world units.

use cgmath::{InnerSpace, Matrix, Matrix4, Point3, Vector3, Vector4};

use crate::engine_state::voxels::chunk::BoundingBox;

/// A plane `normal · p + d = 0` whose normal points into the frustum.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vector3<f32>,
    /// Offset along the normal.
    pub d: f32,
}

impl Plane {
    fn from_row(row: Vector4<f32>) -> Self {
        let normal = Vector3::new(row.x, row.y, row.z);
        let length = normal.magnitude();
        if length == 0.0 {
            return Plane { normal, d: row.w };
        }
        Plane {
            normal: normal / length,
            d: row.w / length,
        }
    }

    /// Signed distance from the plane, positive on the inside.
    #[inline]
    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.x * point.x + self.normal.y * point.y + self.normal.z * point.z + self.d
    }
}

/// The six clip planes of a view volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    /// Left, right, top, bottom, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the frustum of a combined `projection * view` matrix.
    pub fn from_matrix(view_projection: &Matrix4<f32>) -> Self {
        let zero = Plane {
            normal: Vector3::new(0.0, 0.0, 0.0),
            d: 0.0,
        };
        let mut frustum = Frustum { planes: [zero; 6] };
        frustum.update(view_projection);
        frustum
    }

    /// Recomputes the planes from a combined `projection * view` matrix.
    pub fn update(&mut self, view_projection: &Matrix4<f32>) {
        let m = view_projection;
        let (row0, row1, row2, row3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        self.planes = [
            Plane::from_row(row3 + row0),
            Plane::from_row(row3 - row0),
            Plane::from_row(row3 - row1),
            Plane::from_row(row3 + row1),
            Plane::from_row(row3 + row2),
            Plane::from_row(row3 - row2),
        ];
    }

    /// Conservative box test: the box passes if, for every plane, at least one corner is on
    /// or inside it. Boxes straddling a frustum corner can pass while being outside.
    pub fn test_box(&self, bounding_box: &BoundingBox) -> bool {
        let corners = bounding_box.corners();
        self.planes.iter().all(|plane| {
            corners
                .iter()
                .any(|corner| plane.signed_distance(*corner) >= 0.0)
        })
    }

    /// Whether a point is on or inside every plane.
    pub fn test_point(&self, point: Point3<f32>) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{perspective, Deg};

    /// Camera at `eye` looking down -z.
    fn frustum_at(eye: Point3<f32>) -> Frustum {
        let view = Matrix4::look_to_rh(eye, Vector3::new(0.0, 0.0, -1.0), Vector3::unit_y());
        let projection = perspective(Deg(60.0), 1.0, 0.1, 100.0);
        Frustum::from_matrix(&(projection * view))
    }

    fn cube(center: Point3<f32>, half: f32) -> BoundingBox {
        BoundingBox::new(
            Point3::new(center.x - half, center.y - half, center.z - half),
            Point3::new(center.x + half, center.y + half, center.z + half),
        )
    }

    #[test]
    fn test_planes_are_normalised() {
        let frustum = frustum_at(Point3::new(0.0, 0.0, 0.0));
        for plane in frustum.planes {
            assert!((plane.normal.magnitude() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_box_around_camera_is_visible() {
        let eye = Point3::new(5.0, 70.0, -3.0);
        let frustum = frustum_at(eye);
        assert!(frustum.test_box(&cube(eye, 2.0)));
    }

    #[test]
    fn test_box_ahead_is_visible() {
        let frustum = frustum_at(Point3::new(0.0, 0.0, 0.0));
        assert!(frustum.test_box(&cube(Point3::new(0.0, 0.0, -10.0), 1.0)));
    }

    #[test]
    fn test_box_beyond_far_plane_is_not_visible() {
        let frustum = frustum_at(Point3::new(0.0, 0.0, 0.0));
        assert!(!frustum.test_box(&cube(Point3::new(0.0, 0.0, -500.0), 1.0)));
    }

    #[test]
    fn test_box_behind_camera_is_not_visible() {
        let frustum = frustum_at(Point3::new(0.0, 0.0, 0.0));
        assert!(!frustum.test_box(&cube(Point3::new(0.0, 0.0, 10.0), 1.0)));
    }

    #[test]
    fn test_box_off_to_the_side_is_not_visible() {
        let frustum = frustum_at(Point3::new(0.0, 0.0, 0.0));
        assert!(!frustum.test_box(&cube(Point3::new(50.0, 0.0, -10.0), 1.0)));
    }

    #[test]
    fn test_points() {
        let frustum = frustum_at(Point3::new(0.0, 0.0, 0.0));
        assert!(frustum.test_point(Point3::new(0.0, 0.0, -5.0)));
        assert!(!frustum.test_point(Point3::new(0.0, 0.0, 5.0)));
        assert!(!frustum.test_point(Point3::new(0.0, 0.0, -150.0)));
    }
}
