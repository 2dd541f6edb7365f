use bevy::prelude::*;

use super::{ObjectId, SceneObject};
use crate::modeling::edit_mesh::EditMesh;

/// Available primitive shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveShape {
    #[default]
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Torus,
    Plane,
}

impl PrimitiveShape {
    pub const ALL: [PrimitiveShape; 6] = [
        PrimitiveShape::Cube,
        PrimitiveShape::Sphere,
        PrimitiveShape::Cylinder,
        PrimitiveShape::Cone,
        PrimitiveShape::Torus,
        PrimitiveShape::Plane,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            PrimitiveShape::Cube => "Box",
            PrimitiveShape::Sphere => "Sphere",
            PrimitiveShape::Cylinder => "Cylinder",
            PrimitiveShape::Cone => "Cone",
            PrimitiveShape::Torus => "Torus",
            PrimitiveShape::Plane => "Plane",
        }
    }

    /// Create the default render mesh for this primitive shape
    pub fn create_mesh(&self) -> Mesh {
        match self {
            PrimitiveShape::Cube => Mesh::from(Cuboid::new(1.0, 1.0, 1.0)),
            PrimitiveShape::Sphere => Sphere::new(0.5).mesh().uv(24, 16),
            PrimitiveShape::Cylinder => Mesh::from(Cylinder::new(0.5, 1.0)),
            PrimitiveShape::Cone => Mesh::from(Cone {
                radius: 0.5,
                height: 1.0,
            }),
            PrimitiveShape::Torus => Mesh::from(Torus::new(0.25, 0.5)),
            PrimitiveShape::Plane => Plane3d::default().mesh().size(2.0, 2.0).build(),
        }
    }
}

/// Builds scene objects with the default geometry for a shape.
pub trait PrimitiveFactory: Send + Sync {
    fn create(&self, shape: PrimitiveShape, id: ObjectId) -> SceneObject;
}

/// Factory backed by Bevy's primitive mesh builders.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshPrimitiveFactory;

impl PrimitiveFactory for MeshPrimitiveFactory {
    fn create(&self, shape: PrimitiveShape, id: ObjectId) -> SceneObject {
        let mesh = EditMesh::from_bevy_mesh(&shape.create_mesh()).unwrap_or_else(|| {
            warn!("{} mesh is not an indexed triangle list", shape.display_name());
            EditMesh::new(Vec::new(), Vec::new())
        });
        SceneObject {
            id,
            shape,
            transform: Transform::IDENTITY,
            mesh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_shape_builds_editable_geometry() {
        let factory = MeshPrimitiveFactory;
        for (i, shape) in PrimitiveShape::ALL.into_iter().enumerate() {
            let object = factory.create(shape, ObjectId(i as u32 + 1));
            assert_eq!(object.shape, shape);
            assert!(object.mesh.vertex_count() > 0, "{} has no vertices", shape.display_name());
            assert!(!object.mesh.triangles().is_empty());
            assert!(object.mesh.radius() > 0.0);
        }
    }

    #[test]
    fn cube_fits_unit_bounds() {
        let object = MeshPrimitiveFactory.create(PrimitiveShape::Cube, ObjectId(1));
        assert!((object.mesh.radius() - 0.5).abs() < 1e-6);
        assert_eq!(object.transform, Transform::IDENTITY);
    }
}
