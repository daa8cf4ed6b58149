//! Export of a canonical kinematic tree to URDF.
//!
//! The tree already fixes the root and the direction of every joint. Export
//! turns it into URDF's parent-relative form:
//!
//! | Source | URDF |
//! |--------|------|
//! | tree link | `<link>` with contents in the link's target frame |
//! | tree joint | `<joint>` with origin relative to the parent link |
//! | explicit frame | massless `<link>` + fixed `<joint>` |
//! | visual diffuse color | named `<material>` |
//! | preserved fixed joint | `<gazebo><preserveFixedJoint>` |
//!
//! ## Lumping
//!
//! Unless preserved, a fixed joint is removed and its child link is merged
//! into the parent. The child's inertial is combined with the parent's
//! (mass-weighted center of mass, parallel-axis theorem), its visuals and
//! collisions are re-expressed in the parent's frame, and its child joints
//! are re-parented with recomputed origins. Joints attached to `world` are
//! never lumped.
//!
//! Export reads the tree and builds a new [`UrdfRobot`]; nothing is
//! returned on failure.

use nalgebra::{Isometry3, Vector3, Vector4};
use robot_kinematics::{
    KinematicTree, MassProperties, PoseResolver, TreeJoint, canonicalize, check_inertial, check_pose,
};
use robot_sdf::{Document, Geometry, Inertial, JointType, Material, Model, Visual};
use tracing::{debug, info, warn};

use crate::error::{Result, UrdfError};
use crate::types::{
    UrdfCollision, UrdfGazebo, UrdfGeometry, UrdfInertia, UrdfInertial, UrdfJoint, UrdfJointDynamics,
    UrdfJointLimit, UrdfJointType, UrdfLink, UrdfMaterial, UrdfOrigin, UrdfRobot, UrdfVisual,
};

/// Effort and velocity written when the source leaves them unset.
pub const DEFAULT_EFFORT_VELOCITY: f64 = f32::MAX as f64;

/// Position limit magnitude written for revolute and prismatic joints whose
/// source limit leaves a bound unset.
pub const DEFAULT_POSITION_LIMIT: f64 = 1e16;

/// Material used for visuals with a script or without a diffuse color.
pub const DEFAULT_MATERIAL: &str = "default_white";

/// Options controlling URDF export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Keep every fixed joint instead of lumping.
    pub preserve_fixed_joints: bool,
    /// Fixed joints to keep, by model-relative name.
    pub preserved_joints: Vec<String>,
    /// Round poses, axes and inertias to this many decimal places.
    pub pose_precision: Option<u32>,
    /// Emit explicit frames as massless links.
    pub frames_as_links: bool,
    /// Root link to use instead of the model's structural root.
    pub root_hint: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            preserve_fixed_joints: false,
            preserved_joints: Vec::new(),
            pose_precision: None,
            frames_as_links: true,
            root_hint: None,
        }
    }
}

impl ExportOptions {
    /// Keep (or lump) every fixed joint.
    #[must_use]
    pub fn with_preserve_fixed_joints(mut self, preserve: bool) -> Self {
        self.preserve_fixed_joints = preserve;
        self
    }

    /// Keep one fixed joint.
    #[must_use]
    pub fn with_preserved_joint(mut self, joint: impl Into<String>) -> Self {
        self.preserved_joints.push(joint.into());
        self
    }

    /// Round output poses to `digits` decimal places.
    #[must_use]
    pub fn with_pose_precision(mut self, digits: u32) -> Self {
        self.pose_precision = Some(digits);
        self
    }

    /// Emit (or drop) explicit frames.
    #[must_use]
    pub fn with_frames_as_links(mut self, enabled: bool) -> Self {
        self.frames_as_links = enabled;
        self
    }

    /// Root the tree at `link`.
    #[must_use]
    pub fn with_root_hint(mut self, link: impl Into<String>) -> Self {
        self.root_hint = Some(link.into());
        self
    }

    fn keeps(&self, joint: &str) -> bool {
        self.preserve_fixed_joints || self.preserved_joints.iter().any(|j| j == joint)
    }
}

/// Canonicalize `model` of `doc` with the options' root hint, then export.
///
/// # Errors
///
/// Returns an error if canonicalization or export fails.
pub fn export_model(doc: &Document, model: &Model, options: &ExportOptions) -> Result<UrdfRobot> {
    let tree = canonicalize(doc, model, options.root_hint.as_deref())?;
    export(&tree, options)
}

/// Export a canonical tree.
///
/// # Errors
///
/// - [`UrdfError::UnknownJoint`] if a preserved joint does not exist
/// - [`UrdfError::UnsupportedJoint`] for joint types URDF cannot express
/// - [`UrdfError::Kinematics`] if a pose references an unknown frame, or an
///   inertial or attachment carries NaN, infinite or negative-mass values
pub fn export(tree: &KinematicTree<'_>, options: &ExportOptions) -> Result<UrdfRobot> {
    Exporter::new(tree, options)?.run()
}

/// Internal exporter state.
struct Exporter<'t, 'a> {
    tree: &'t KinematicTree<'a>,
    options: &'t ExportOptions,
    resolver: PoseResolver<'t>,
    /// Per joint: merged into its parent.
    lumped: Vec<bool>,
    /// Per link: the link it ends up in.
    survivor: Vec<usize>,
    materials: Vec<UrdfMaterial>,
}

impl<'t, 'a> Exporter<'t, 'a> {
    fn new(tree: &'t KinematicTree<'a>, options: &'t ExportOptions) -> Result<Self> {
        let model = &tree.model().name;
        for name in &options.preserved_joints {
            if tree.joint_index(name).is_none() {
                return Err(UrdfError::unknown_joint(name, model));
            }
        }
        for tj in tree.joints() {
            urdf_joint_type(tj)?;
        }

        let lumped: Vec<bool> = tree
            .joints()
            .iter()
            .map(|tj| {
                tj.joint.joint_type.is_fixed()
                    && !options.keeps(&tj.name)
                    && !tree.links()[tj.parent].is_world()
            })
            .collect();

        let mut survivor: Vec<usize> = (0..tree.links().len()).collect();
        for &index in tree.order() {
            if let Some(joint) = tree.links()[index].parent_joint {
                if lumped[joint] {
                    survivor[index] = survivor[tree.joints()[joint].parent];
                }
            }
        }

        Ok(Self {
            tree,
            options,
            resolver: tree.resolver(),
            lumped,
            survivor,
            materials: Vec::new(),
        })
    }

    fn run(mut self) -> Result<UrdfRobot> {
        let tree = self.tree;
        let model = tree.model();
        if !tree.is_fixed_base() {
            if let Some(pose) = &model.pose {
                if pose.xyz != Vector3::zeros() || pose.rpy != Vector3::zeros() {
                    warn!(model = %model.name, "model pose has no URDF equivalent; dropped");
                }
            }
        }

        let mut robot = UrdfRobot::new(model.name.as_str());

        let order = tree.order();
        for &index in order {
            if self.survivor[index] == index {
                let link = self.link(index)?;
                robot.links.push(link);
            }
        }
        for &index in order {
            let Some(joint) = tree.links()[index].parent_joint else {
                continue;
            };
            let tj = &tree.joints()[joint];
            if self.lumped[joint] {
                debug!(joint = %tj.name, into = %tree.links()[self.survivor[index]].name, "lumped fixed joint");
                continue;
            }
            robot.joints.push(self.joint(joint)?);
            if tj.joint.joint_type.is_fixed() && !tree.links()[tj.parent].is_world() {
                robot.gazebo.push(UrdfGazebo {
                    reference: tj.name.clone(),
                    preserve_fixed_joint: true,
                });
            }
        }

        if self.options.frames_as_links {
            self.frames(&mut robot)?;
        }

        robot.materials = std::mem::take(&mut self.materials);
        if let Some(digits) = self.options.pose_precision {
            round_robot(&mut robot, digits);
        }
        debug!(
            robot = %robot.name,
            links = robot.links.len(),
            joints = robot.joints.len(),
            "exported URDF"
        );
        Ok(robot)
    }

    /// Build surviving link `index` from itself and every link lumped into it.
    fn link(&mut self, index: usize) -> Result<UrdfLink> {
        let tree = self.tree;
        let target = tree.target_frame(index);
        let mut out = UrdfLink::new(tree.links()[index].name.as_str());

        let mut parts: Vec<(&Inertial, Isometry3<f64>)> = Vec::new();
        for &member in tree.order() {
            if self.survivor[member] != index {
                continue;
            }
            let tl = &tree.links()[member];
            let Some(link) = tl.link else {
                continue;
            };

            if let Some(inertial) = &link.inertial {
                check_inertial(inertial, &format!("{}/inertial", tl.name))?;
                let pose =
                    self.resolver
                        .pose_in(inertial.pose.as_ref(), tl.frame, &tl.scope, target)?;
                parts.push((inertial, pose));
            }

            for visual in &link.visuals {
                if let Some(pose) = &visual.pose {
                    check_pose(pose, &format!("{}/visual[{}]", tl.name, visual.name))?;
                }
                let Some(geometry) = self.geometry(&visual.geometry, &tl.name, &visual.name) else {
                    continue;
                };
                let pose = self
                    .resolver
                    .pose_in(visual.pose.as_ref(), tl.frame, &tl.scope, target)?;
                let material = self.material(&tl.name, visual);
                out.visuals.push(UrdfVisual {
                    name: Some(visual.name.clone()),
                    origin: UrdfOrigin::from_isometry(&pose),
                    geometry,
                    material,
                });
            }

            for collision in &link.collisions {
                if let Some(pose) = &collision.pose {
                    check_pose(pose, &format!("{}/collision[{}]", tl.name, collision.name))?;
                }
                let Some(geometry) = self.geometry(&collision.geometry, &tl.name, &collision.name)
                else {
                    continue;
                };
                let pose =
                    self.resolver
                        .pose_in(collision.pose.as_ref(), tl.frame, &tl.scope, target)?;
                out.collisions.push(UrdfCollision {
                    name: Some(collision.name.clone()),
                    origin: UrdfOrigin::from_isometry(&pose),
                    geometry,
                });
            }
        }

        out.inertial = match parts.as_slice() {
            [] => None,
            [(inertial, pose)] => Some(UrdfInertial {
                origin: UrdfOrigin::from_isometry(pose),
                mass: inertial.mass,
                inertia: UrdfInertia::from_matrix(&inertial.inertia.to_matrix()),
            }),
            [(first, first_pose), rest @ ..] => {
                let combined = rest.iter().fold(
                    MassProperties::from_inertial(first, first_pose),
                    |acc, (inertial, pose)| {
                        acc.combine(&MassProperties::from_inertial(inertial, pose))
                    },
                );
                Some(UrdfInertial {
                    origin: UrdfOrigin::new(combined.com, Vector3::zeros()),
                    mass: combined.mass,
                    inertia: UrdfInertia::from_matrix(&combined.inertia),
                })
            }
        };
        Ok(out)
    }

    fn joint(&self, index: usize) -> Result<UrdfJoint> {
        let tree = self.tree;
        let tj = &tree.joints()[index];
        let parent = self.survivor[tj.parent];
        let origin = self
            .resolver
            .resolve(tree.target_frame(tj.child), tree.target_frame(parent))?;
        let joint_type = urdf_joint_type(tj)?;

        let mut joint = UrdfJoint::new(
            tj.name.as_str(),
            joint_type,
            tree.links()[parent].name.as_str(),
            tree.links()[tj.child].name.as_str(),
        )
        .with_origin(UrdfOrigin::from_isometry(&origin));

        if joint_type != UrdfJointType::Fixed {
            if let Some(axis) = tree.joint_axis(index, &self.resolver)? {
                joint = joint.with_axis(axis);
            }
        }

        let axis = tj.joint.axis.as_ref();
        let limit = axis.and_then(|a| a.limit);
        let effort = limit
            .and_then(|l| l.effort)
            .unwrap_or(DEFAULT_EFFORT_VELOCITY);
        let velocity = limit
            .and_then(|l| l.velocity)
            .unwrap_or(DEFAULT_EFFORT_VELOCITY);
        joint.limit = match joint_type {
            UrdfJointType::Revolute | UrdfJointType::Prismatic => Some(UrdfJointLimit {
                lower: limit
                    .and_then(|l| l.lower)
                    .unwrap_or(-DEFAULT_POSITION_LIMIT),
                upper: limit.and_then(|l| l.upper).unwrap_or(DEFAULT_POSITION_LIMIT),
                effort,
                velocity,
            }),
            UrdfJointType::Continuous if limit.is_some() => Some(UrdfJointLimit {
                lower: 0.0,
                upper: 0.0,
                effort,
                velocity,
            }),
            _ => None,
        };

        joint.dynamics = axis
            .and_then(|a| a.dynamics.as_ref())
            .filter(|d| d.damping.is_some() || d.friction.is_some())
            .map(|d| UrdfJointDynamics {
                damping: d.damping.unwrap_or(0.0),
                friction: d.friction.unwrap_or(0.0),
            });
        Ok(joint)
    }

    fn frames(&self, robot: &mut UrdfRobot) -> Result<()> {
        let tree = self.tree;
        for frame in tree.frames() {
            let Some(body) = frame.body else {
                warn!(frame = %frame.name, "frame is not attached to any link; dropped");
                continue;
            };
            let parent = self.survivor[body];
            let parent_name = &tree.links()[parent].name;
            let origin = self.resolver.resolve(frame.id, tree.target_frame(parent))?;
            let name = unique_joint_name(robot, format!("{parent_name}_to_{}", frame.name));
            robot.links.push(UrdfLink::new(frame.name.as_str()));
            robot.joints.push(
                UrdfJoint::new(
                    name,
                    UrdfJointType::Fixed,
                    parent_name.as_str(),
                    frame.name.as_str(),
                )
                .with_origin(UrdfOrigin::from_isometry(&origin)),
            );
        }
        Ok(())
    }

    fn geometry(&self, geometry: &Geometry, link: &str, element: &str) -> Option<UrdfGeometry> {
        match geometry {
            Geometry::Box { size } => Some(UrdfGeometry::Box { size: *size }),
            Geometry::Cylinder { radius, length } => Some(UrdfGeometry::Cylinder {
                radius: *radius,
                length: *length,
            }),
            Geometry::Sphere { radius } => Some(UrdfGeometry::Sphere { radius: *radius }),
            Geometry::Mesh { uri, scale } => Some(UrdfGeometry::Mesh {
                filename: uri.clone(),
                scale: *scale,
            }),
            other => {
                warn!(
                    link,
                    element,
                    shape = other.kind_name(),
                    "geometry has no URDF equivalent; skipped"
                );
                None
            }
        }
    }

    fn material(&mut self, link: &str, visual: &Visual) -> Option<String> {
        let material: &Material = visual.material.as_ref()?;
        match (material.diffuse, &material.script) {
            (Some(rgba), None) => {
                let name = format!("{link}_{}", visual.name);
                self.materials.push(UrdfMaterial::color(name.as_str(), rgba));
                Some(name)
            }
            (_, script) => {
                if let Some(script) = script {
                    info!(link, visual = %visual.name, script = %script.name, "material script replaced by default material");
                }
                if !self.materials.iter().any(|m| m.name == DEFAULT_MATERIAL) {
                    self.materials
                        .push(UrdfMaterial::color(DEFAULT_MATERIAL, Vector4::repeat(1.0)));
                }
                Some(DEFAULT_MATERIAL.to_string())
            }
        }
    }
}

/// `base`, or `base_1`, `base_2`, ... when a joint of that name exists.
fn unique_joint_name(robot: &UrdfRobot, base: String) -> String {
    if robot.joint(&base).is_none() {
        return base;
    }
    let name = (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| robot.joint(candidate).is_none())
        .unwrap_or_default();
    warn!(joint = %base, renamed = %name, "frame joint name already taken; renamed");
    name
}

fn urdf_joint_type(tj: &TreeJoint<'_>) -> Result<UrdfJointType> {
    match tj.joint.joint_type {
        JointType::Revolute => Ok(UrdfJointType::Revolute),
        JointType::Continuous => Ok(UrdfJointType::Continuous),
        JointType::Prismatic => Ok(UrdfJointType::Prismatic),
        JointType::Fixed => Ok(UrdfJointType::Fixed),
        other => Err(UrdfError::unsupported_joint(&tj.name, other.as_str())),
    }
}

fn round_robot(robot: &mut UrdfRobot, digits: u32) {
    let round3 = |v: &Vector3<f64>| v.map(|x| crate::types::round_to(x, digits));
    for link in &mut robot.links {
        if let Some(inertial) = &mut link.inertial {
            inertial.origin = inertial.origin.rounded(digits);
            inertial.inertia = inertial.inertia.rounded(digits);
        }
        for visual in &mut link.visuals {
            visual.origin = visual.origin.rounded(digits);
        }
        for collision in &mut link.collisions {
            collision.origin = collision.origin.rounded(digits);
        }
    }
    for joint in &mut robot.joints {
        joint.origin = joint.origin.rounded(digits);
        joint.axis = round3(&joint.axis);
    }
}
