//! Builders for single-shape links with analytic inertia.
//!
//! Each primitive knows its geometry and the inertia of a uniform solid of
//! that shape. The [`Primitive`] trait turns that into inertials, visuals,
//! collisions, links and one-link models.
//!
//! ```
//! use robot_sdf::{Primitive, SphereBuilder};
//!
//! let link = SphereBuilder::new("ball", 2.0, 0.1).link(None);
//! assert_eq!(link.name, "ball_link");
//! assert!((link.inertial.unwrap().inertia.ixx - 0.008).abs() < 1e-12);
//! ```

use nalgebra::Vector3;

use crate::types::{Collision, Geometry, Inertia, Inertial, Link, Model, Pose, Visual, WORLD_FRAME};

/// A uniform solid with a closed-form inertia tensor.
pub trait Primitive {
    /// Base name; generated elements are suffixed (`_link`, `_visual`, ...).
    fn name(&self) -> &str;

    /// Mass in kg.
    fn mass(&self) -> f64;

    /// Inertia about the center of mass.
    fn inertia(&self) -> Inertia;

    /// Shape.
    fn geometry(&self) -> Geometry;

    /// Mass properties at `pose` (the link origin when `None`).
    fn inertial(&self, pose: Option<Pose>) -> Inertial {
        Inertial {
            mass: self.mass(),
            pose,
            inertia: self.inertia(),
        }
    }

    /// Visual element named `{name}_visual`.
    fn visual(&self, pose: Option<Pose>) -> Visual {
        Visual {
            name: format!("{}_visual", self.name()),
            pose,
            geometry: self.geometry(),
            material: None,
        }
    }

    /// Collision element named `{name}_collision`.
    fn collision(&self, pose: Option<Pose>) -> Collision {
        Collision {
            name: format!("{}_collision", self.name()),
            pose,
            geometry: self.geometry(),
        }
    }

    /// Link named `{name}_link` with matching inertial, visual and collision
    /// at the link origin.
    fn link(&self, pose: Option<Pose>) -> Link {
        let mut link = Link::new(format!("{}_link", self.name()))
            .with_inertial(self.inertial(None))
            .with_visual(self.visual(None))
            .with_collision(self.collision(None));
        link.pose = pose;
        link
    }

    /// One-link model named after the primitive, placed relative to world.
    fn model(&self, pose: Option<Pose>) -> Model {
        let mut model = Model::new(self.name()).with_link(self.link(None));
        model.pose = pose.map(|p| {
            if p.reference().is_none() {
                p.with_relative_to(WORLD_FRAME)
            } else {
                p
            }
        });
        model
    }
}

/// Solid sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereBuilder {
    /// Base name.
    pub name: String,
    /// Mass in kg.
    pub mass: f64,
    /// Radius in meters.
    pub radius: f64,
}

impl SphereBuilder {
    /// Create a sphere builder.
    #[must_use]
    pub fn new(name: impl Into<String>, mass: f64, radius: f64) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
        }
    }
}

impl Primitive for SphereBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn inertia(&self) -> Inertia {
        let i = 2.0 / 5.0 * self.mass * self.radius.powi(2);
        Inertia::diagonal(i, i, i)
    }

    fn geometry(&self) -> Geometry {
        Geometry::Sphere {
            radius: self.radius,
        }
    }
}

/// Solid box with full side lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxBuilder {
    /// Base name.
    pub name: String,
    /// Mass in kg.
    pub mass: f64,
    /// Side lengths (x, y, z) in meters.
    pub size: Vector3<f64>,
}

impl BoxBuilder {
    /// Create a box builder.
    #[must_use]
    pub fn new(name: impl Into<String>, mass: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            name: name.into(),
            mass,
            size: Vector3::new(x, y, z),
        }
    }
}

impl Primitive for BoxBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn inertia(&self) -> Inertia {
        let (x2, y2, z2) = (
            self.size.x.powi(2),
            self.size.y.powi(2),
            self.size.z.powi(2),
        );
        let k = self.mass / 12.0;
        Inertia::diagonal(k * (y2 + z2), k * (x2 + z2), k * (x2 + y2))
    }

    fn geometry(&self) -> Geometry {
        Geometry::Box { size: self.size }
    }
}

/// Solid cylinder along the local z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CylinderBuilder {
    /// Base name.
    pub name: String,
    /// Mass in kg.
    pub mass: f64,
    /// Radius in meters.
    pub radius: f64,
    /// Length in meters.
    pub length: f64,
}

impl CylinderBuilder {
    /// Create a cylinder builder.
    #[must_use]
    pub fn new(name: impl Into<String>, mass: f64, radius: f64, length: f64) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
            length,
        }
    }
}

impl Primitive for CylinderBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn inertia(&self) -> Inertia {
        let r2 = self.radius.powi(2);
        let ixx = self.mass * (3.0 * r2 + self.length.powi(2)) / 12.0;
        Inertia::diagonal(ixx, ixx, 0.5 * self.mass * r2)
    }

    fn geometry(&self) -> Geometry {
        Geometry::Cylinder {
            radius: self.radius,
            length: self.length,
        }
    }
}
