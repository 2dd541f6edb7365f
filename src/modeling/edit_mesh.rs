//! Editable vertex buffer for primitive meshes.
//!
//! `EditMesh` is an indexed triangle list with a fixed vertex count. Position
//! writes only mark the buffer dirty; [`EditMesh::recompute`] refreshes
//! normals and bounds once per logical edit.

use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use std::collections::HashSet;

/// Index of a triangle face in the mesh.
pub type FaceIndex = usize;

/// Canonical edge representation (lower vertex index first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(pub u32, pub u32);

impl Edge {
    /// Create a canonical edge with the lower index first.
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b { Edge(a, b) } else { Edge(b, a) }
    }
}

/// Indexed triangle mesh suitable for vertex-level editing.
#[derive(Debug, Clone, PartialEq)]
pub struct EditMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    min: Vec3,
    max: Vec3,
    dirty: bool,
    revision: u64,
}

impl EditMesh {
    /// Build a mesh from raw positions and triangles, computing normals and bounds.
    ///
    /// Triangles referencing missing vertices are dropped.
    pub fn new(positions: Vec<Vec3>, mut triangles: Vec<[u32; 3]>) -> Self {
        let vertex_count = positions.len() as u32;
        triangles.retain(|tri| tri.iter().all(|&i| i < vertex_count));
        let mut mesh = Self {
            normals: vec![Vec3::ZERO; positions.len()],
            positions,
            triangles,
            min: Vec3::ZERO,
            max: Vec3::ZERO,
            dirty: true,
            revision: 0,
        };
        mesh.recompute();
        mesh
    }

    /// Build an `EditMesh` from a Bevy `Mesh`.
    ///
    /// Returns `None` if the mesh lacks positions or uses a non-triangle topology.
    pub fn from_bevy_mesh(mesh: &Mesh) -> Option<Self> {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return None;
        }

        let positions: Vec<Vec3> = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(v) => v.iter().map(|p| Vec3::from(*p)).collect(),
            _ => return None,
        };

        let triangles: Vec<[u32; 3]> = match mesh.indices() {
            Some(Indices::U32(indices)) => indices
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
            Some(Indices::U16(indices)) => indices
                .chunks_exact(3)
                .map(|c| [c[0] as u32, c[1] as u32, c[2] as u32])
                .collect(),
            None => (0..positions.len() as u32)
                .collect::<Vec<_>>()
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
        };

        let vertex_count = positions.len() as u32;
        if triangles.iter().flatten().any(|&i| i >= vertex_count) {
            warn!("Mesh references vertices past the end of its position buffer");
            return None;
        }

        Some(Self::new(positions, triangles))
    }

    /// Convert to a Bevy `Mesh` for rendering.
    pub fn to_bevy_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, default());
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            self.positions.iter().map(|p| p.to_array()).collect::<Vec<_>>(),
        );
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_NORMAL,
            self.normals.iter().map(|n| n.to_array()).collect::<Vec<_>>(),
        );
        let indices: Vec<u32> = self.triangles.iter().flatten().copied().collect();
        mesh.insert_indices(Indices::U32(indices));
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn position(&self, index: u32) -> Option<Vec3> {
        self.positions.get(index as usize).copied()
    }

    /// Whether positions changed since the last [`EditMesh::recompute`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Bumped on every recompute; renderers compare it to know when to re-upload.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.min, self.max)
    }

    /// Half the largest bounding-box extent.
    pub fn radius(&self) -> f32 {
        (self.max - self.min).max_element() * 0.5
    }

    /// Overwrite one vertex position. Out-of-range indices are ignored.
    pub fn set_position(&mut self, index: u32, position: Vec3) {
        if let Some(p) = self.positions.get_mut(index as usize) {
            *p = position;
            self.dirty = true;
        }
    }

    /// Add `delta` once to each listed vertex.
    ///
    /// Callers pass deduplicated indices; out-of-range entries are skipped.
    pub fn translate_vertices(&mut self, indices: &[u32], delta: Vec3) {
        for &i in indices {
            if let Some(p) = self.positions.get_mut(i as usize) {
                *p += delta;
                self.dirty = true;
            }
        }
    }

    /// Replace every position from a snapshot of the same length.
    ///
    /// Returns `false` (and leaves the buffer untouched) on a length mismatch.
    pub fn restore_positions(&mut self, snapshot: &[Vec3]) -> bool {
        if snapshot.len() != self.positions.len() {
            warn!(
                "Refusing to restore {} positions into a buffer of {}",
                snapshot.len(),
                self.positions.len()
            );
            return false;
        }
        self.positions.copy_from_slice(snapshot);
        self.dirty = true;
        true
    }

    /// Mean of the current positions of `indices`.
    pub fn centroid(&self, indices: &[u32]) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0;
        for &i in indices {
            if let Some(p) = self.positions.get(i as usize) {
                sum += *p;
                count += 1;
            }
        }
        sum / count.max(1) as f32
    }

    /// Compute the face normal for a triangle.
    pub fn face_normal(&self, face: FaceIndex) -> Vec3 {
        let [a, b, c] = self.triangles[face];
        let v0 = self.positions[a as usize];
        let v1 = self.positions[b as usize];
        let v2 = self.positions[c as usize];
        (v1 - v0).cross(v2 - v0).normalize_or_zero()
    }

    /// All unique edges of the triangle list.
    pub fn unique_edges(&self) -> Vec<Edge> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for &[a, b, c] in &self.triangles {
            for edge in [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)] {
                if seen.insert(edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Refresh smooth normals and bounds, then clear the dirty flag.
    pub fn recompute(&mut self) {
        for n in &mut self.normals {
            *n = Vec3::ZERO;
        }

        // Accumulate area-weighted face normals to vertices
        for tri in &self.triangles {
            let v0 = self.positions[tri[0] as usize];
            let v1 = self.positions[tri[1] as usize];
            let v2 = self.positions[tri[2] as usize];
            let normal = (v1 - v0).cross(v2 - v0);
            for &i in tri {
                self.normals[i as usize] += normal;
            }
        }

        for n in &mut self.normals {
            *n = n.normalize_or_zero();
        }

        let (min, max) = self
            .positions
            .iter()
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        (self.min, self.max) = if self.positions.is_empty() {
            (Vec3::ZERO, Vec3::ZERO)
        } else {
            (min, max)
        };

        self.dirty = false;
        self.revision += 1;
    }
}
