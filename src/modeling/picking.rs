//! Ray picking against editable meshes.
//!
//! Faces are picked in the mesh's local space; vertices and edges are picked in
//! world space so pick radii stay meaningful under non-uniform scale.

use bevy::prelude::*;

use super::edit_mesh::{EditMesh, FaceIndex};

/// Result of a face pick operation (local space).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceHit {
    pub face: FaceIndex,
    pub triangle: [u32; 3],
    pub point: Vec3,
    pub distance: f32,
}

/// Result of a vertex pick operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexHit {
    pub vertex: u32,
    /// Distance along the ray to the vertex's closest approach.
    pub along: f32,
}

/// Closest approach between a ray and a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentApproach {
    /// Distance along the ray (never negative).
    pub along: f32,
    pub on_ray: Vec3,
    pub on_segment: Vec3,
}

impl SegmentApproach {
    pub fn gap(&self) -> f32 {
        self.on_ray.distance(self.on_segment)
    }
}

/// Moller-Trumbore ray-triangle intersection.
///
/// Returns the distance along the ray if the ray hits the triangle.
fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray_dir.cross(edge2);
    let a = edge1.dot(h);

    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray_origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray_dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

/// Pick the closest face hit by a ray against the mesh (in local space).
///
/// When `xray` is false, only front-facing triangles are picked.
pub fn pick_face(mesh: &EditMesh, ray: Ray3d, xray: bool) -> Option<FaceHit> {
    let positions = mesh.positions();
    let dir = *ray.direction;
    let mut closest: Option<FaceHit> = None;

    for (fi, tri) in mesh.triangles().iter().enumerate() {
        let v0 = positions[tri[0] as usize];
        let v1 = positions[tri[1] as usize];
        let v2 = positions[tri[2] as usize];

        if !xray {
            let face_normal = (v1 - v0).cross(v2 - v0);
            if face_normal.dot(dir) >= 0.0 {
                continue;
            }
        }

        if let Some(t) = ray_triangle_intersection(ray.origin, dir, v0, v1, v2) {
            if closest.is_none_or(|c| t < c.distance) {
                closest = Some(FaceHit {
                    face: fi,
                    triangle: *tri,
                    point: ray.get_point(t),
                    distance: t,
                });
            }
        }
    }

    closest
}

/// Transform a world-space ray into an object's local space.
///
/// Returns `None` for transforms that cannot be inverted (zero scale).
pub fn world_to_local_ray(transform: &Transform, ray: Ray3d) -> Option<Ray3d> {
    let affine = transform.compute_affine();
    if affine.matrix3.determinant().abs() < f32::EPSILON {
        return None;
    }
    let inv = affine.inverse();
    let origin = inv.transform_point3(ray.origin);
    let direction = Dir3::new(inv.transform_vector3(*ray.direction)).ok()?;
    Some(Ray3d::new(origin, direction))
}

/// Transform a world-space point into an object's local space.
pub fn world_to_local_point(transform: &Transform, point: Vec3) -> Option<Vec3> {
    let affine = transform.compute_affine();
    if affine.matrix3.determinant().abs() < f32::EPSILON {
        return None;
    }
    Some(affine.inverse().transform_point3(point))
}

/// Transform a world-space direction into an object's local space.
///
/// Undoes rotation then scale; translation does not apply to directions.
pub fn world_to_local_direction(transform: &Transform, direction: Vec3) -> Option<Vec3> {
    if transform.scale.abs().min_element() < f32::EPSILON {
        return None;
    }
    Some((transform.rotation.inverse() * direction) / transform.scale)
}

/// Pick the vertex closest to the ray origin among those within `radius` of the ray.
pub fn pick_vertex(
    mesh: &EditMesh,
    transform: &Transform,
    ray: Ray3d,
    radius: f32,
) -> Option<VertexHit> {
    let dir = *ray.direction;
    let mut closest: Option<VertexHit> = None;

    for (vi, pos) in mesh.positions().iter().enumerate() {
        let offset = transform.transform_point(*pos) - ray.origin;
        let along = offset.dot(dir);
        if along < 0.0 {
            continue;
        }
        if (offset - dir * along).length() > radius {
            continue;
        }
        if closest.is_none_or(|c| along < c.along) {
            closest = Some(VertexHit {
                vertex: vi as u32,
                along,
            });
        }
    }

    closest
}

/// Pick the world-space point on the nearest mesh edge within `radius` of the ray.
pub fn pick_edge_point(
    mesh: &EditMesh,
    transform: &Transform,
    ray: Ray3d,
    radius: f32,
) -> Option<Vec3> {
    let positions = mesh.positions();
    let mut closest: Option<SegmentApproach> = None;

    for edge in mesh.unique_edges() {
        let a = transform.transform_point(positions[edge.0 as usize]);
        let b = transform.transform_point(positions[edge.1 as usize]);
        let approach = ray_segment_approach(ray.origin, *ray.direction, a, b);
        if approach.gap() > radius {
            continue;
        }
        if closest.is_none_or(|c| approach.along < c.along) {
            closest = Some(approach);
        }
    }

    closest.map(|c| c.on_segment)
}

/// Closest points between a ray (unit direction) and the segment `a..b`.
pub fn ray_segment_approach(ray_origin: Vec3, ray_dir: Vec3, a: Vec3, b: Vec3) -> SegmentApproach {
    let seg = b - a;
    let seg_len_sq = seg.length_squared();

    if seg_len_sq < 1e-12 {
        // Degenerate segment - closest approach to a point
        let along = (a - ray_origin).dot(ray_dir).max(0.0);
        return SegmentApproach {
            along,
            on_ray: ray_origin + ray_dir * along,
            on_segment: a,
        };
    }

    // Closest points between the ray's line and the segment's line
    let w0 = ray_origin - a;
    let b_dot = ray_dir.dot(seg);
    let d = ray_dir.dot(w0);
    let e = seg.dot(w0);
    let denom = seg_len_sq - b_dot * b_dot;

    let t = if denom.abs() < 1e-9 {
        // Nearly parallel: any segment point works, start from `a`
        0.0
    } else {
        ((e - b_dot * d) / denom).clamp(0.0, 1.0)
    };

    let on_segment = a + seg * t;
    let along = (on_segment - ray_origin).dot(ray_dir).max(0.0);
    SegmentApproach {
        along,
        on_ray: ray_origin + ray_dir * along,
        on_segment,
    }
}
