//! URDF to SDF conversion.
//!
//! URDF poses are parent-relative; SDF poses name their frame explicitly.
//! The mapping keeps URDF's structure by pointing every pose at its
//! structural parent:
//!
//! | URDF | SDF |
//! |------|-----|
//! | `<joint><origin>` | joint pose `relative_to` the parent link |
//! | child `<link>` | identity pose `relative_to` its joint |
//! | root `<link>` | link at the model origin |
//! | link named `world` | dropped; joints from it attach to `world` |
//! | `<material>` color | visual diffuse color |

use nalgebra::Vector3;
use robot_sdf::{
    Axis, Collision, Document, Dynamics, Geometry, Inertia, Inertial, Joint, JointType, Limit,
    Link, Material, Model, Pose, Visual, WORLD_FRAME,
};
use tracing::debug;

use crate::error::{Result, UrdfError};
use crate::parser::check_duplicates;
use crate::types::{UrdfGeometry, UrdfJoint, UrdfJointType, UrdfLink, UrdfOrigin, UrdfRobot};

/// Convert a URDF robot into a document holding one model.
///
/// # Errors
///
/// See [`robot_to_model`].
pub fn urdf_to_sdf(robot: &UrdfRobot) -> Result<Document> {
    Ok(Document::default().with_model(robot_to_model(robot)?))
}

/// Convert a URDF robot into a model.
///
/// # Errors
///
/// - [`UrdfError::DuplicateLink`] or [`UrdfError::DuplicateJoint`] if a name
///   is used twice
/// - [`UrdfError::UndefinedLink`] if a joint names a missing link
/// - [`UrdfError::UnsupportedJoint`] for floating and planar joints
/// - [`UrdfError::NoRootLink`] if every link is the child of a joint
pub fn robot_to_model(robot: &UrdfRobot) -> Result<Model> {
    check_duplicates(robot)?;
    for joint in &robot.joints {
        for link in [&joint.parent, &joint.child] {
            if robot.link(link).is_none() && link != WORLD_FRAME {
                return Err(UrdfError::undefined_link(link, &joint.name));
            }
        }
        if matches!(
            joint.joint_type,
            UrdfJointType::Floating | UrdfJointType::Planar
        ) {
            return Err(UrdfError::unsupported_joint(
                &joint.name,
                joint.joint_type.as_str(),
            ));
        }
    }
    if !robot.links.is_empty() && robot.root_link().is_none() {
        return Err(UrdfError::NoRootLink(robot.name.clone()));
    }

    let mut model = Model::new(robot.name.as_str());
    for link in robot.links.iter().filter(|l| l.name != WORLD_FRAME) {
        let incoming = robot.joints.iter().find(|j| j.child == link.name);
        model.links.push(convert_link(robot, link, incoming));
    }
    for joint in &robot.joints {
        model.joints.push(convert_joint(joint));
    }
    if !robot.gazebo.is_empty() {
        debug!(robot = %robot.name, blocks = robot.gazebo.len(), "ignoring gazebo extensions");
    }
    Ok(model)
}

fn pose(origin: &UrdfOrigin) -> Pose {
    Pose::new(origin.xyz, origin.rpy)
}

fn convert_link(robot: &UrdfRobot, link: &UrdfLink, incoming: Option<&UrdfJoint>) -> Link {
    let mut out = Link::new(link.name.as_str());
    out.pose = incoming.map(|joint| Pose::default().with_relative_to(joint.name.as_str()));

    out.inertial = link.inertial.map(|inertial| {
        let i = &inertial.inertia;
        let converted = Inertial::new(
            inertial.mass,
            Inertia::new(i.ixx, i.ixy, i.ixz, i.iyy, i.iyz, i.izz),
        );
        if inertial.origin.is_identity() {
            converted
        } else {
            converted.with_pose(pose(&inertial.origin))
        }
    });

    for (i, visual) in link.visuals.iter().enumerate() {
        let name = visual.name.clone().unwrap_or_else(|| format!("visual_{i}"));
        let mut converted = Visual::new(name, convert_geometry(&visual.geometry));
        if !visual.origin.is_identity() {
            converted = converted.with_pose(pose(&visual.origin));
        }
        let color = visual
            .material
            .as_deref()
            .and_then(|m| robot.material(m))
            .and_then(|m| m.color);
        if let Some(rgba) = color {
            converted = converted.with_material(Material::diffuse(rgba));
        }
        out.visuals.push(converted);
    }

    for (i, collision) in link.collisions.iter().enumerate() {
        let name = collision
            .name
            .clone()
            .unwrap_or_else(|| format!("collision_{i}"));
        let mut converted = Collision::new(name, convert_geometry(&collision.geometry));
        if !collision.origin.is_identity() {
            converted = converted.with_pose(pose(&collision.origin));
        }
        out.collisions.push(converted);
    }
    out
}

fn convert_geometry(geometry: &UrdfGeometry) -> Geometry {
    match geometry {
        UrdfGeometry::Box { size } => Geometry::Box { size: *size },
        UrdfGeometry::Cylinder { radius, length } => Geometry::Cylinder {
            radius: *radius,
            length: *length,
        },
        UrdfGeometry::Sphere { radius } => Geometry::Sphere { radius: *radius },
        UrdfGeometry::Mesh { filename, scale } => Geometry::Mesh {
            uri: filename.clone(),
            scale: *scale,
        },
    }
}

fn convert_joint(joint: &UrdfJoint) -> Joint {
    let joint_type = match joint.joint_type {
        UrdfJointType::Revolute => JointType::Revolute,
        UrdfJointType::Continuous => JointType::Continuous,
        UrdfJointType::Prismatic => JointType::Prismatic,
        // Floating and planar are rejected before conversion.
        UrdfJointType::Fixed | UrdfJointType::Floating | UrdfJointType::Planar => JointType::Fixed,
    };
    let mut out = Joint::new(
        joint.name.as_str(),
        joint_type,
        joint.parent.as_str(),
        joint.child.as_str(),
    )
    .with_pose(pose(&joint.origin).with_relative_to(joint.parent.as_str()));

    if joint_type.is_fixed() {
        return out;
    }
    let mut axis = Axis::new(if joint.axis == Vector3::zeros() {
        Vector3::x()
    } else {
        joint.axis
    });
    if let Some(limit) = &joint.limit {
        let mut converted = Limit::default()
            .with_effort(limit.effort)
            .with_velocity(limit.velocity);
        if joint.joint_type.has_position_limits() {
            converted.lower = Some(limit.lower);
            converted.upper = Some(limit.upper);
        }
        axis = axis.with_limit(converted);
    }
    if let Some(dynamics) = &joint.dynamics {
        axis = axis.with_dynamics(Dynamics {
            damping: Some(dynamics.damping),
            friction: Some(dynamics.friction),
            ..Default::default()
        });
    }
    out.axis = Some(axis);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::exporter::{ExportOptions, export};
    use crate::parser::parse_urdf_str;
    use approx::assert_relative_eq;
    use robot_kinematics::canonicalize;

    const ARM: &str = r#"
        <robot name="arm">
          <material name="blue"><color rgba="0 0 1 1"/></material>
          <link name="base">
            <visual>
              <origin xyz="0 0 0.05"/>
              <geometry><box size="0.2 0.2 0.1"/></geometry>
              <material name="blue"/>
            </visual>
          </link>
          <link name="upper">
            <inertial>
              <origin xyz="0 0 0.25"/>
              <mass value="2"/>
              <inertia ixx="0.1" ixy="0" ixz="0" iyy="0.1" iyz="0" izz="0.01"/>
            </inertial>
          </link>
          <link name="fore"/>
          <joint name="shoulder" type="revolute">
            <origin xyz="0 0 0.1" rpy="0 0 1.5707963267948966"/>
            <parent link="base"/>
            <child link="upper"/>
            <axis xyz="0 1 0"/>
            <limit lower="-1" upper="1" effort="30" velocity="2"/>
          </joint>
          <joint name="elbow" type="continuous">
            <origin xyz="0 0 0.5"/>
            <parent link="upper"/>
            <child link="fore"/>
            <axis xyz="1 0 0"/>
            <dynamics damping="0.5" friction="0.1"/>
          </joint>
        </robot>"#;

    #[test]
    fn test_structure() {
        let doc = urdf_to_sdf(&parse_urdf_str(ARM).unwrap()).unwrap();
        let model = &doc.models[0];
        assert_eq!(model.name, "arm");
        assert!(model.link("base").unwrap().pose.is_none());
        assert_eq!(
            model.link("upper").unwrap().pose.as_ref().unwrap().reference(),
            Some("shoulder")
        );
        let shoulder = model.joint("shoulder").unwrap();
        assert_eq!(shoulder.pose.as_ref().unwrap().reference(), Some("base"));
        let limit = shoulder.axis.as_ref().unwrap().limit.unwrap();
        assert_eq!((limit.lower, limit.upper), (Some(-1.0), Some(1.0)));
        let elbow = model.joint("elbow").unwrap();
        let axis = elbow.axis.as_ref().unwrap();
        assert!(axis.limit.is_none());
        assert_eq!(axis.dynamics.unwrap().damping, Some(0.5));

        let visual = &model.link("base").unwrap().visuals[0];
        assert_eq!(visual.name, "visual_0");
        assert_eq!(
            visual.material.as_ref().unwrap().diffuse,
            Some(nalgebra::Vector4::new(0.0, 0.0, 1.0, 1.0))
        );
    }

    #[test]
    fn test_validates() {
        let doc = urdf_to_sdf(&parse_urdf_str(ARM).unwrap()).unwrap();
        let result = robot_sdf::validate(&doc);
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn test_export_reproduces_origins() {
        let robot = parse_urdf_str(ARM).unwrap();
        let doc = urdf_to_sdf(&robot).unwrap();
        let tree = canonicalize(&doc, &doc.models[0], None).unwrap();
        let back = export(&tree, &ExportOptions::default()).unwrap();

        for joint in &robot.joints {
            let exported = back.joint(&joint.name).unwrap();
            assert_eq!(exported.parent, joint.parent);
            assert_relative_eq!(exported.origin.xyz, joint.origin.xyz, epsilon = 1e-9);
            assert_relative_eq!(exported.origin.rpy, joint.origin.rpy, epsilon = 1e-9);
            assert_relative_eq!(exported.axis, joint.axis, epsilon = 1e-9);
        }
        let inertial = back.link("upper").unwrap().inertial.unwrap();
        assert_relative_eq!(inertial.origin.xyz, Vector3::new(0.0, 0.0, 0.25), epsilon = 1e-9);
        assert_relative_eq!(inertial.mass, 2.0);
    }

    #[test]
    fn test_world_link_dropped() {
        let robot = parse_urdf_str(
            r#"<robot name="r">
                 <link name="world"/>
                 <link name="base"/>
                 <joint name="anchor" type="fixed">
                   <origin xyz="0 0 1"/>
                   <parent link="world"/><child link="base"/>
                 </joint>
               </robot>"#,
        )
        .unwrap();
        let model = robot_to_model(&robot).unwrap();
        assert_eq!(model.links.len(), 1);
        assert!(model.is_fixed_base());
        assert!(model.joints[0].axis.is_none());
    }

    #[test]
    fn test_undefined_link() {
        let mut robot = parse_urdf_str(ARM).unwrap();
        robot.joints[1].child = "hand".into();
        let err = robot_to_model(&robot).unwrap_err();
        assert!(matches!(err, UrdfError::UndefinedLink { ref link_name, .. } if link_name == "hand"));
    }

    #[test]
    fn test_floating_rejected() {
        let mut robot = parse_urdf_str(ARM).unwrap();
        robot.joints[1].joint_type = UrdfJointType::Floating;
        let err = robot_to_model(&robot).unwrap_err();
        assert!(matches!(err, UrdfError::UnsupportedJoint { .. }));
    }

    #[test]
    fn test_no_root() {
        let mut robot = parse_urdf_str(ARM).unwrap();
        robot.joints.push(UrdfJoint::new("loop", UrdfJointType::Fixed, "fore", "base"));
        let err = robot_to_model(&robot).unwrap_err();
        assert!(matches!(err, UrdfError::NoRootLink(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut robot = parse_urdf_str(ARM).unwrap();
        robot.links.push(UrdfLink::new("fore"));
        let err = robot_to_model(&robot).unwrap_err();
        assert!(matches!(err, UrdfError::DuplicateLink(ref name) if name == "fore"));

        let mut robot = parse_urdf_str(ARM).unwrap();
        robot.links.push(UrdfLink::new("tool"));
        robot.joints.push(UrdfJoint::new("elbow", UrdfJointType::Fixed, "fore", "tool"));
        let err = robot_to_model(&robot).unwrap_err();
        assert!(matches!(err, UrdfError::DuplicateJoint(ref name) if name == "elbow"));
    }
}
