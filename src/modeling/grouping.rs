//! Classifies picked mesh elements into selection groups with stable keys.
//!
//! Picking the same logical element twice must produce the same key, so that a
//! second pick toggles it off. In merge mode coincident vertices (hard-edge
//! seams) share one key; in explode mode every buffer index stands alone.

use bevy::prelude::*;
use std::collections::HashMap;
use std::fmt;

use super::edit_mesh::EditMesh;

/// Quantized vertex position used as a merge-mode key.
pub type QuantizedPosition = [i64; 3];

/// Sub-element kind of a selection group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vertex,
    Edge,
    Face,
}

impl ElementKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ElementKind::Vertex => "Vertex",
            ElementKind::Edge => "Edge",
            ElementKind::Face => "Face",
        }
    }
}

/// Canonical identity of a selectable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKey {
    /// Every vertex sharing a quantized position (merge mode).
    MergedVertex(QuantizedPosition),
    /// A single buffer index (explode mode).
    Vertex(u32),
    /// Sorted index pair.
    Edge([u32; 2]),
    /// Sorted index triple.
    Face([u32; 3]),
}

impl SelectionKey {
    pub fn kind(&self) -> ElementKind {
        match self {
            SelectionKey::MergedVertex(_) | SelectionKey::Vertex(_) => ElementKind::Vertex,
            SelectionKey::Edge(_) => ElementKind::Edge,
            SelectionKey::Face(_) => ElementKind::Face,
        }
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKey::MergedVertex([x, y, z]) => write!(f, "v:g:{x}_{y}_{z}"),
            SelectionKey::Vertex(i) => write!(f, "v:i:{i}"),
            SelectionKey::Edge([a, b]) => write!(f, "e:{a},{b}"),
            SelectionKey::Face([a, b, c]) => write!(f, "f:{a},{b},{c}"),
        }
    }
}

/// A classified element: its key and the vertex indices it moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementGroup {
    pub key: SelectionKey,
    /// Ascending, non-empty.
    pub indices: Vec<u32>,
}

impl ElementGroup {
    pub fn kind(&self) -> ElementKind {
        self.key.kind()
    }
}

/// Snap a position onto the merge grid.
pub fn quantize(position: Vec3, epsilon: f32) -> QuantizedPosition {
    let q = |v: f32| (v / epsilon).round() as i64;
    [q(position.x), q(position.y), q(position.z)]
}

/// Map every quantized position to the (ascending) indices that share it.
pub fn build_vertex_groups(mesh: &EditMesh, epsilon: f32) -> HashMap<QuantizedPosition, Vec<u32>> {
    let mut groups: HashMap<QuantizedPosition, Vec<u32>> = HashMap::new();
    for (i, p) in mesh.positions().iter().enumerate() {
        groups.entry(quantize(*p, epsilon)).or_default().push(i as u32);
    }
    groups
}

/// Group for a picked vertex, honoring merge/explode.
pub fn vertex_group(mesh: &EditMesh, index: u32, explode: bool, epsilon: f32) -> Option<ElementGroup> {
    let position = mesh.position(index)?;

    if explode {
        return Some(ElementGroup {
            key: SelectionKey::Vertex(index),
            indices: vec![index],
        });
    }

    let key = quantize(position, epsilon);
    let indices = mesh
        .positions()
        .iter()
        .enumerate()
        .filter(|(_, p)| quantize(**p, epsilon) == key)
        .map(|(i, _)| i as u32)
        .collect();

    Some(ElementGroup {
        key: SelectionKey::MergedVertex(key),
        indices,
    })
}

/// The nearest vertex to `local_point`, then the nearest excluding the first.
///
/// Approximates the edge under the pointer without topology lookups.
pub fn nearest_vertex_pair(mesh: &EditMesh, local_point: Vec3) -> Option<[u32; 2]> {
    let nearest_excluding = |skip: Option<usize>| {
        mesh.positions()
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .map(|(i, p)| (i, p.distance_squared(local_point)))
            .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i)
    };

    let first = nearest_excluding(None)?;
    let second = nearest_excluding(Some(first))?;
    Some([first as u32, second as u32])
}

/// Group for an edge picked at `local_point`.
pub fn edge_group(mesh: &EditMesh, local_point: Vec3) -> Option<ElementGroup> {
    let [a, b] = nearest_vertex_pair(mesh, local_point)?;
    let pair = [a.min(b), a.max(b)];
    Some(ElementGroup {
        key: SelectionKey::Edge(pair),
        indices: pair.to_vec(),
    })
}

/// Group for a picked triangle; the key is order-normalized.
pub fn face_group(triangle: [u32; 3]) -> ElementGroup {
    let mut sorted = triangle;
    sorted.sort_unstable();
    let mut indices = sorted.to_vec();
    indices.dedup();
    ElementGroup {
        key: SelectionKey::Face(sorted),
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::tolerance::GROUP_EPSILON;
    use crate::modeling::edit_mesh::tests::make_quad_with_seam;

    #[test]
    fn merge_mode_coalesces_coincident_vertices() {
        let mesh = make_quad_with_seam();
        let group = vertex_group(&mesh, 1, false, GROUP_EPSILON).unwrap();
        assert_eq!(group.indices, vec![1, 4]);
        assert_eq!(group.kind(), ElementKind::Vertex);
    }

    #[test]
    fn merge_group_is_the_same_from_any_member() {
        let mesh = make_quad_with_seam();
        let from_1 = vertex_group(&mesh, 1, false, GROUP_EPSILON).unwrap();
        let from_4 = vertex_group(&mesh, 4, false, GROUP_EPSILON).unwrap();
        assert_eq!(from_1, from_4);
    }

    #[test]
    fn near_coincident_positions_merge_within_epsilon() {
        let mesh = EditMesh::new(
            vec![Vec3::new(0.5, 0.5, 0.5), Vec3::new(0.50002, 0.5, 0.49998), Vec3::ZERO],
            vec![[0, 1, 2]],
        );
        let group = vertex_group(&mesh, 0, false, GROUP_EPSILON).unwrap();
        assert_eq!(group.indices, vec![0, 1]);
    }

    #[test]
    fn explode_mode_keeps_single_index() {
        let mesh = make_quad_with_seam();
        let group = vertex_group(&mesh, 4, true, GROUP_EPSILON).unwrap();
        assert_eq!(group.key, SelectionKey::Vertex(4));
        assert_eq!(group.indices, vec![4]);
    }

    #[test]
    fn vertex_group_rejects_missing_index() {
        let mesh = make_quad_with_seam();
        assert!(vertex_group(&mesh, 5, false, GROUP_EPSILON).is_none());
    }

    #[test]
    fn build_vertex_groups_covers_every_index_once() {
        let mesh = make_quad_with_seam();
        let groups = build_vertex_groups(&mesh, GROUP_EPSILON);
        assert_eq!(groups.len(), 4);
        let mut all: Vec<u32> = groups.values().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn edge_group_uses_two_nearest_vertices() {
        let mesh = make_quad_with_seam();
        let group = edge_group(&mesh, Vec3::new(0.3, 0.0, 0.0)).unwrap();
        assert_eq!(group.key, SelectionKey::Edge([2, 3]));
        assert_eq!(group.indices, vec![2, 3]);
    }

    #[test]
    fn face_key_ignores_winding() {
        assert_eq!(face_group([4, 2, 3]).key, face_group([3, 4, 2]).key);
        assert_eq!(face_group([4, 2, 3]).indices, vec![2, 3, 4]);
    }

    #[test]
    fn keys_render_canonical_signatures() {
        assert_eq!(SelectionKey::MergedVertex([1, -2, 3]).to_string(), "v:g:1_-2_3");
        assert_eq!(SelectionKey::Vertex(7).to_string(), "v:i:7");
        assert_eq!(SelectionKey::Edge([2, 9]).to_string(), "e:2,9");
        assert_eq!(face_group([5, 1, 3]).key.to_string(), "f:1,3,5");
    }
}
