//! In-memory object model for SDF documents.
//!
//! These types mirror the SDFormat element tree (`<sdf>`, `<world>`, `<model>`,
//! `<link>`, `<joint>`, `<frame>`, ...) using Rust-native types. Optional
//! elements stay `Option` so that a decoded document re-encodes to the same
//! element set.

use nalgebra::{Isometry3, Matrix3, Quaternion, Translation3, UnitQuaternion, Vector2, Vector3, Vector4};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reserved name of the world frame.
pub const WORLD_FRAME: &str = "world";

/// Reserved name of the implicit frame of the enclosing model.
pub const MODEL_FRAME: &str = "__model__";

/// Delimiter between nested scope names (`gripper::finger`).
pub const SCOPE_DELIMITER: &str = "::";

/// Version written by [`Document::default`].
pub const DEFAULT_VERSION: &str = "1.10";

// ============================================================================
// Pose
// ============================================================================

/// A rigid transform plus the frame it is expressed in.
///
/// Rotation is stored as extrinsic X-Y-Z roll/pitch/yaw in radians, the same
/// convention the text format uses, so that poses round-trip exactly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Translation in meters.
    pub xyz: Vector3<f64>,
    /// Roll, pitch, yaw in radians.
    pub rpy: Vector3<f64>,
    /// Frame the pose is expressed in. `None` means the element's default frame.
    pub relative_to: Option<String>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            xyz: Vector3::zeros(),
            rpy: Vector3::zeros(),
            relative_to: None,
        }
    }
}

impl Pose {
    /// Create a pose from translation and roll/pitch/yaw.
    #[must_use]
    pub fn new(xyz: Vector3<f64>, rpy: Vector3<f64>) -> Self {
        Self {
            xyz,
            rpy,
            relative_to: None,
        }
    }

    /// Create a pure translation.
    #[must_use]
    pub fn from_xyz(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vector3::new(x, y, z), Vector3::zeros())
    }

    /// Set the rotation.
    #[must_use]
    pub fn with_rpy(mut self, roll: f64, pitch: f64, yaw: f64) -> Self {
        self.rpy = Vector3::new(roll, pitch, yaw);
        self
    }

    /// Set the frame this pose is expressed in. An empty name clears it.
    #[must_use]
    pub fn with_relative_to(mut self, frame: impl Into<String>) -> Self {
        let frame = frame.into();
        self.relative_to = if frame.is_empty() { None } else { Some(frame) };
        self
    }

    /// The explicit reference frame, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.relative_to.as_deref().filter(|s| !s.is_empty())
    }

    /// Rotation as a unit quaternion.
    #[must_use]
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.rpy.x, self.rpy.y, self.rpy.z)
    }

    /// The transform from the pose's own frame into its reference frame.
    ///
    /// Points are rotated first, then translated.
    #[must_use]
    pub fn transform(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.xyz), self.rotation())
    }

    /// Build a pose (without reference frame) from a transform.
    #[must_use]
    pub fn from_transform(transform: &Isometry3<f64>) -> Self {
        let (roll, pitch, yaw) = transform.rotation.euler_angles();
        Self::new(
            transform.translation.vector,
            Vector3::new(roll, pitch, yaw),
        )
    }

    /// Build a pose from a translation and an `x y z w` quaternion.
    #[must_use]
    pub fn from_xyz_quat(xyz: Vector3<f64>, quat_xyzw: Vector4<f64>) -> Self {
        let q = UnitQuaternion::from_quaternion(Quaternion::new(
            quat_xyzw.w,
            quat_xyzw.x,
            quat_xyzw.y,
            quat_xyzw.z,
        ));
        Self::from_transform(&Isometry3::from_parts(Translation3::from(xyz), q))
    }

    /// True if every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.xyz.iter().chain(self.rpy.iter()).all(|v| v.is_finite())
    }
}

// ============================================================================
// Inertial Properties
// ============================================================================

/// Inertia tensor stored as its six independent components.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Inertia {
    /// Ixx component.
    pub ixx: f64,
    /// Ixy component.
    pub ixy: f64,
    /// Ixz component.
    pub ixz: f64,
    /// Iyy component.
    pub iyy: f64,
    /// Iyz component.
    pub iyz: f64,
    /// Izz component.
    pub izz: f64,
}

impl Default for Inertia {
    fn default() -> Self {
        Self::diagonal(1.0, 1.0, 1.0)
    }
}

impl Inertia {
    /// Create from all six components.
    #[must_use]
    pub fn new(ixx: f64, ixy: f64, ixz: f64, iyy: f64, iyz: f64, izz: f64) -> Self {
        Self {
            ixx,
            ixy,
            ixz,
            iyy,
            iyz,
            izz,
        }
    }

    /// Create a diagonal tensor.
    #[must_use]
    pub fn diagonal(ixx: f64, iyy: f64, izz: f64) -> Self {
        Self::new(ixx, 0.0, 0.0, iyy, 0.0, izz)
    }

    /// The zero tensor.
    #[must_use]
    pub fn zero() -> Self {
        Self::diagonal(0.0, 0.0, 0.0)
    }

    /// Full symmetric 3x3 matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.ixx, self.ixy, self.ixz, self.ixy, self.iyy, self.iyz, self.ixz, self.iyz,
            self.izz,
        )
    }

    /// Take the upper triangle of a matrix, symmetrizing it.
    #[must_use]
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self::new(
            m[(0, 0)],
            0.5 * (m[(0, 1)] + m[(1, 0)]),
            0.5 * (m[(0, 2)] + m[(2, 0)]),
            m[(1, 1)],
            0.5 * (m[(1, 2)] + m[(2, 1)]),
            m[(2, 2)],
        )
    }

    /// Diagonal entries `(ixx, iyy, izz)`.
    #[must_use]
    pub fn principal_diagonal(&self) -> Vector3<f64> {
        Vector3::new(self.ixx, self.iyy, self.izz)
    }

    /// Off-diagonal entries `(ixy, ixz, iyz)`.
    #[must_use]
    pub fn off_diagonal(&self) -> Vector3<f64> {
        Vector3::new(self.ixy, self.ixz, self.iyz)
    }

    /// True if every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.principal_diagonal()
            .iter()
            .chain(self.off_diagonal().iter())
            .all(|v| v.is_finite())
    }

    /// True if every component is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.principal_diagonal()
            .iter()
            .chain(self.off_diagonal().iter())
            .all(|v| *v == 0.0)
    }
}

/// Mass properties of a link (`<inertial>`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Inertial {
    /// Mass in kg.
    pub mass: f64,
    /// Center-of-mass frame, relative to the link frame by default.
    pub pose: Option<Pose>,
    /// Inertia about the center of mass, in the center-of-mass frame.
    pub inertia: Inertia,
}

impl Default for Inertial {
    fn default() -> Self {
        Self {
            mass: 1.0,
            pose: None,
            inertia: Inertia::default(),
        }
    }
}

impl Inertial {
    /// Create with mass and inertia at the link origin.
    #[must_use]
    pub fn new(mass: f64, inertia: Inertia) -> Self {
        Self {
            mass,
            pose: None,
            inertia,
        }
    }

    /// Set the center-of-mass pose.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }
}

// ============================================================================
// Geometry & Appearance
// ============================================================================

/// Shape attached to a visual or collision element.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Geometry {
    /// `<empty/>`: no shape.
    Empty,
    /// Axis-aligned box with full side lengths.
    Box {
        /// Side lengths (x, y, z).
        size: Vector3<f64>,
    },
    /// Capsule along the local z axis.
    Capsule {
        /// Radius.
        radius: f64,
        /// Length of the cylindrical part.
        length: f64,
    },
    /// Cylinder along the local z axis.
    Cylinder {
        /// Radius.
        radius: f64,
        /// Length.
        length: f64,
    },
    /// Ellipsoid.
    Ellipsoid {
        /// Semi-axes (x, y, z).
        radii: Vector3<f64>,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Plane with a normal and a finite extent.
    Plane {
        /// Plane normal.
        normal: Vector3<f64>,
        /// Extent along the two in-plane axes.
        size: Vector2<f64>,
    },
    /// Mesh loaded from a URI.
    Mesh {
        /// Mesh file URI.
        uri: String,
        /// Optional per-axis scale.
        scale: Option<Vector3<f64>>,
    },
    /// Heightmap loaded from an image URI.
    Heightmap {
        /// Image URI.
        uri: String,
        /// Extent in meters.
        size: Vector3<f64>,
        /// Position offset.
        pos: Vector3<f64>,
    },
}

impl Geometry {
    /// Element name of this shape.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Box { .. } => "box",
            Self::Capsule { .. } => "capsule",
            Self::Cylinder { .. } => "cylinder",
            Self::Ellipsoid { .. } => "ellipsoid",
            Self::Sphere { .. } => "sphere",
            Self::Plane { .. } => "plane",
            Self::Mesh { .. } => "mesh",
            Self::Heightmap { .. } => "heightmap",
        }
    }

    /// Scalar dimensions of the shape, for range checks.
    #[must_use]
    pub fn dimensions(&self) -> Vec<f64> {
        match self {
            Self::Empty | Self::Mesh { scale: None, .. } => Vec::new(),
            Self::Box { size } => size.iter().copied().collect(),
            Self::Capsule { radius, length } | Self::Cylinder { radius, length } => {
                vec![*radius, *length]
            }
            Self::Ellipsoid { radii } => radii.iter().copied().collect(),
            Self::Sphere { radius } => vec![*radius],
            Self::Plane { size, .. } => size.iter().copied().collect(),
            Self::Mesh {
                scale: Some(scale), ..
            } => scale.iter().copied().collect(),
            Self::Heightmap { size, .. } => size.iter().copied().collect(),
        }
    }
}

/// Script reference of a material.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialScript {
    /// Script name.
    pub name: String,
    /// Script URIs.
    pub uris: Vec<String>,
}

/// Surface appearance (`<material>`). Colors are RGBA in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Ambient color.
    pub ambient: Option<Vector4<f64>>,
    /// Diffuse color.
    pub diffuse: Option<Vector4<f64>>,
    /// Specular color.
    pub specular: Option<Vector4<f64>>,
    /// Emissive color.
    pub emissive: Option<Vector4<f64>>,
    /// Script reference.
    pub script: Option<MaterialScript>,
}

impl Material {
    /// A material with only a diffuse color.
    #[must_use]
    pub fn diffuse(rgba: Vector4<f64>) -> Self {
        Self {
            diffuse: Some(rgba),
            ..Default::default()
        }
    }
}

/// Visual element of a link.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Visual {
    /// Name, unique within the link.
    pub name: String,
    /// Pose, relative to the link frame by default.
    pub pose: Option<Pose>,
    /// Shape.
    pub geometry: Geometry,
    /// Appearance.
    pub material: Option<Material>,
}

impl Visual {
    /// Create a visual with a shape.
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            name: name.into(),
            pose: None,
            geometry,
            material: None,
        }
    }

    /// Set the pose.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Set the material.
    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }
}

/// Collision element of a link.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collision {
    /// Name, unique within the link.
    pub name: String,
    /// Pose, relative to the link frame by default.
    pub pose: Option<Pose>,
    /// Shape.
    pub geometry: Geometry,
}

impl Collision {
    /// Create a collision with a shape.
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            name: name.into(),
            pose: None,
            geometry,
        }
    }

    /// Set the pose.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }
}

// ============================================================================
// Link
// ============================================================================

/// A rigid body (`<link>`).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Link {
    /// Name, unique within the model scope.
    pub name: String,
    /// Pose, relative to the model frame by default.
    pub pose: Option<Pose>,
    /// Mass properties.
    pub inertial: Option<Inertial>,
    /// Visual elements.
    pub visuals: Vec<Visual>,
    /// Collision elements.
    pub collisions: Vec<Collision>,
    /// Whether gravity acts on the link.
    pub gravity: Option<bool>,
    /// Whether the link collides with other links of the model.
    pub self_collide: Option<bool>,
    /// Whether the link is kinematic only.
    pub kinematic: Option<bool>,
}

impl Link {
    /// Create a new link with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the pose.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Set the mass properties.
    #[must_use]
    pub fn with_inertial(mut self, inertial: Inertial) -> Self {
        self.inertial = Some(inertial);
        self
    }

    /// Add a visual.
    #[must_use]
    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visuals.push(visual);
        self
    }

    /// Add a collision.
    #[must_use]
    pub fn with_collision(mut self, collision: Collision) -> Self {
        self.collisions.push(collision);
        self
    }

    /// Mass of the link, zero without an inertial.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.inertial.as_ref().map_or(0.0, |i| i.mass)
    }
}

// ============================================================================
// Joint
// ============================================================================

/// Joint type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointType {
    /// Hinge with limits.
    #[default]
    Revolute,
    /// Hinge without limits.
    Continuous,
    /// Sliding joint.
    Prismatic,
    /// Rigid connection.
    Fixed,
    /// Ball-and-socket.
    Ball,
    /// Coupled rotation and translation.
    Screw,
    /// Universal joint.
    Universal,
    /// Two hinges in series.
    Revolute2,
    /// Geared coupling of two joints.
    Gearbox,
}

impl JointType {
    /// Parse joint type from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "revolute" => Some(Self::Revolute),
            "continuous" => Some(Self::Continuous),
            "prismatic" => Some(Self::Prismatic),
            "fixed" => Some(Self::Fixed),
            "ball" => Some(Self::Ball),
            "screw" => Some(Self::Screw),
            "universal" => Some(Self::Universal),
            "revolute2" => Some(Self::Revolute2),
            "gearbox" => Some(Self::Gearbox),
            _ => None,
        }
    }

    /// The name used in the `type` attribute.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revolute => "revolute",
            Self::Continuous => "continuous",
            Self::Prismatic => "prismatic",
            Self::Fixed => "fixed",
            Self::Ball => "ball",
            Self::Screw => "screw",
            Self::Universal => "universal",
            Self::Revolute2 => "revolute2",
            Self::Gearbox => "gearbox",
        }
    }

    /// Whether an `<axis>` must be present.
    #[must_use]
    pub fn requires_axis(&self) -> bool {
        !matches!(self, Self::Fixed | Self::Ball)
    }

    /// Whether the type allows no relative motion.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed)
    }
}

/// Joint limits. Missing values are left to the consumer's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Limit {
    /// Lower position limit (rad or m).
    pub lower: Option<f64>,
    /// Upper position limit (rad or m).
    pub upper: Option<f64>,
    /// Maximum effort (N or Nm).
    pub effort: Option<f64>,
    /// Maximum velocity (rad/s or m/s).
    pub velocity: Option<f64>,
}

impl Limit {
    /// Position limits only.
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
            ..Default::default()
        }
    }

    /// Set the effort limit.
    #[must_use]
    pub fn with_effort(mut self, effort: f64) -> Self {
        self.effort = Some(effort);
        self
    }

    /// Set the velocity limit.
    #[must_use]
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }
}

/// Joint dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dynamics {
    /// Viscous damping.
    pub damping: Option<f64>,
    /// Static friction.
    pub friction: Option<f64>,
    /// Spring rest position.
    pub spring_reference: Option<f64>,
    /// Spring stiffness.
    pub spring_stiffness: Option<f64>,
}

/// Joint axis (`<axis>`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Axis {
    /// Direction, expressed in the joint frame unless `expressed_in` is set.
    pub xyz: Vector3<f64>,
    /// Frame the direction is expressed in.
    pub expressed_in: Option<String>,
    /// Limits.
    pub limit: Option<Limit>,
    /// Dynamics.
    pub dynamics: Option<Dynamics>,
}

impl Default for Axis {
    fn default() -> Self {
        Self::new(Vector3::z())
    }
}

impl Axis {
    /// Create an axis with a direction.
    #[must_use]
    pub fn new(xyz: Vector3<f64>) -> Self {
        Self {
            xyz,
            expressed_in: None,
            limit: None,
            dynamics: None,
        }
    }

    /// Set the frame the direction is expressed in.
    #[must_use]
    pub fn with_expressed_in(mut self, frame: impl Into<String>) -> Self {
        self.expressed_in = Some(frame.into());
        self
    }

    /// Set the limits.
    #[must_use]
    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the dynamics.
    #[must_use]
    pub fn with_dynamics(mut self, dynamics: Dynamics) -> Self {
        self.dynamics = Some(dynamics);
        self
    }
}

/// A connection between two links (`<joint>`).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Joint {
    /// Name, unique within the model scope.
    pub name: String,
    /// Joint type.
    pub joint_type: JointType,
    /// Parent link name, or `world`.
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Pose of the joint frame, relative to the child link by default.
    pub pose: Option<Pose>,
    /// Axis.
    pub axis: Option<Axis>,
}

impl Joint {
    /// Create a joint between two links.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        joint_type: JointType,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type,
            parent: parent.into(),
            child: child.into(),
            pose: None,
            axis: None,
        }
    }

    /// Set the pose.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Set the axis.
    #[must_use]
    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }
}

// ============================================================================
// Frame
// ============================================================================

/// An explicit named frame (`<frame>`).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Name, unique within the scope.
    pub name: String,
    /// Entity the frame is attached to. `None` means the model frame.
    pub attached_to: Option<String>,
    /// Pose, relative to `attached_to` by default.
    pub pose: Option<Pose>,
}

impl Frame {
    /// Create a frame.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach the frame to a named entity.
    #[must_use]
    pub fn with_attached_to(mut self, entity: impl Into<String>) -> Self {
        self.attached_to = Some(entity.into());
        self
    }

    /// Set the pose.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// The attachment target, with an empty string treated as unset.
    #[must_use]
    pub fn attachment(&self) -> Option<&str> {
        self.attached_to.as_deref().filter(|s| !s.is_empty())
    }
}

// ============================================================================
// Model
// ============================================================================

/// A model (`<model>`): links, joints, frames and nested models.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Model {
    /// Model name.
    pub name: String,
    /// Link whose frame defines the model frame.
    pub canonical_link: Option<String>,
    /// Frame used when placing the model.
    pub placement_frame: Option<String>,
    /// `<static>` flag.
    pub is_static: Option<bool>,
    /// `<self_collide>` flag.
    pub self_collide: Option<bool>,
    /// Pose of the model frame.
    pub pose: Option<Pose>,
    /// Links.
    pub links: Vec<Link>,
    /// Joints.
    pub joints: Vec<Joint>,
    /// Explicit frames.
    pub frames: Vec<Frame>,
    /// Nested models.
    pub models: Vec<Model>,
}

impl Model {
    /// Create an empty model.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a link.
    #[must_use]
    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Add a joint.
    #[must_use]
    pub fn with_joint(mut self, joint: Joint) -> Self {
        self.joints.push(joint);
        self
    }

    /// Add a frame.
    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Add a nested model.
    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    /// Set the pose.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Set the canonical link.
    #[must_use]
    pub fn with_canonical_link(mut self, link: impl Into<String>) -> Self {
        self.canonical_link = Some(link.into());
        self
    }

    /// Get a link by name.
    #[must_use]
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    /// Get a joint by name.
    #[must_use]
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Get a frame by name.
    #[must_use]
    pub fn frame(&self, name: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.name == name)
    }

    /// Get a nested model by name.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// True if any joint of this model or a nested model attaches to `world`.
    #[must_use]
    pub fn is_fixed_base(&self) -> bool {
        self.joints.iter().any(|j| j.parent == WORLD_FRAME)
            || self.models.iter().any(Model::is_fixed_base)
    }

    /// Total mass of all links, nested models included.
    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.links.iter().map(Link::mass).sum::<f64>()
            + self.models.iter().map(Model::total_mass).sum::<f64>()
    }

    /// Number of links, nested models included.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len() + self.models.iter().map(Model::link_count).sum::<usize>()
    }
}

// ============================================================================
// World & Document
// ============================================================================

/// A world (`<world>`): models placed in a shared world frame.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct World {
    /// World name.
    pub name: String,
    /// Gravity vector.
    pub gravity: Option<Vector3<f64>>,
    /// World-level frames.
    pub frames: Vec<Frame>,
    /// Models.
    pub models: Vec<Model>,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a model.
    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    /// Add a frame.
    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }
}

/// Root of an SDF document (`<sdf>`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Document {
    /// Format version string, e.g. `1.10`.
    pub version: String,
    /// Worlds.
    pub worlds: Vec<World>,
    /// Top-level models.
    pub models: Vec<Model>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            worlds: Vec::new(),
            models: Vec::new(),
        }
    }
}

impl Document {
    /// Create an empty document with the given version.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Add a top-level model.
    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    /// Add a world.
    #[must_use]
    pub fn with_world(mut self, world: World) -> Self {
        self.worlds.push(world);
        self
    }

    /// Every model that is not nested in another model: top-level models
    /// first, then the models of each world.
    pub fn all_models(&self) -> impl Iterator<Item = &Model> {
        self.models
            .iter()
            .chain(self.worlds.iter().flat_map(|w| w.models.iter()))
    }

    /// Find a top-level or world model by name.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.all_models().find(|m| m.name == name)
    }
}

/// Join a scope prefix and a name with [`SCOPE_DELIMITER`].
#[must_use]
pub fn scoped_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{SCOPE_DELIMITER}{name}")
    }
}
