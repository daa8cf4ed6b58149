//! URDF XML encoding.
//!
//! Identity origins, absent inertials and absent limits are omitted, which
//! matches the parser's defaults, so parsing the output gives back the same
//! robot.

use std::path::Path;

use nalgebra::{Vector3, Vector4};

use robot_sdf::xml::{self, XmlElement};

use crate::error::Result;
use crate::types::{
    UrdfCollision, UrdfGazebo, UrdfGeometry, UrdfInertial, UrdfJoint, UrdfJointType, UrdfLink,
    UrdfMaterial, UrdfOrigin, UrdfRobot, UrdfVisual,
};

/// Indentation used for pretty output.
const INDENT: usize = 2;

/// Encode a robot as URDF XML.
///
/// # Errors
///
/// Returns an error if the XML writer fails.
pub fn write_urdf_string(robot: &UrdfRobot, pretty: bool) -> Result<String> {
    Ok(xml::write_document(&robot_element(robot), pretty, INDENT)?)
}

/// Encode a robot and write it to a file.
///
/// # Errors
///
/// Returns an error if encoding fails or the file cannot be written.
pub fn save_urdf_file(robot: &UrdfRobot, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path.as_ref(), write_urdf_string(robot, true)?)?;
    Ok(())
}

fn robot_element(robot: &UrdfRobot) -> XmlElement {
    let mut e = XmlElement::new("robot").with_attr("name", robot.name.as_str());
    for material in &robot.materials {
        e.push(material_element(material));
    }
    for link in &robot.links {
        e.push(link_element(link));
    }
    for joint in &robot.joints {
        e.push(joint_element(joint));
    }
    for gazebo in &robot.gazebo {
        e.push(gazebo_element(gazebo));
    }
    e
}

fn material_element(material: &UrdfMaterial) -> XmlElement {
    let mut e = XmlElement::new("material").with_attr("name", material.name.as_str());
    if let Some(rgba) = &material.color {
        e.push(XmlElement::new("color").with_attr("rgba", fmt_vec4(rgba)));
    }
    if let Some(texture) = &material.texture {
        e.push(XmlElement::new("texture").with_attr("filename", texture.as_str()));
    }
    e
}

fn link_element(link: &UrdfLink) -> XmlElement {
    let mut e = XmlElement::new("link").with_attr("name", link.name.as_str());
    if let Some(inertial) = &link.inertial {
        e.push(inertial_element(inertial));
    }
    for visual in &link.visuals {
        e.push(visual_element(visual));
    }
    for collision in &link.collisions {
        e.push(collision_element(collision));
    }
    e
}

fn inertial_element(inertial: &UrdfInertial) -> XmlElement {
    let i = &inertial.inertia;
    let mut e = XmlElement::new("inertial");
    push_origin(&mut e, &inertial.origin);
    e.with_child(XmlElement::new("mass").with_attr("value", fmt_f64(inertial.mass)))
        .with_child(
            XmlElement::new("inertia")
                .with_attr("ixx", fmt_f64(i.ixx))
                .with_attr("ixy", fmt_f64(i.ixy))
                .with_attr("ixz", fmt_f64(i.ixz))
                .with_attr("iyy", fmt_f64(i.iyy))
                .with_attr("iyz", fmt_f64(i.iyz))
                .with_attr("izz", fmt_f64(i.izz)),
        )
}

fn visual_element(visual: &UrdfVisual) -> XmlElement {
    let mut e = XmlElement::new("visual").with_attr_opt("name", visual.name.as_deref());
    push_origin(&mut e, &visual.origin);
    e.push(geometry_element(&visual.geometry));
    if let Some(material) = &visual.material {
        e.push(XmlElement::new("material").with_attr("name", material.as_str()));
    }
    e
}

fn collision_element(collision: &UrdfCollision) -> XmlElement {
    let mut e = XmlElement::new("collision").with_attr_opt("name", collision.name.as_deref());
    push_origin(&mut e, &collision.origin);
    e.with_child(geometry_element(&collision.geometry))
}

fn geometry_element(geometry: &UrdfGeometry) -> XmlElement {
    let shape = match geometry {
        UrdfGeometry::Box { size } => XmlElement::new("box").with_attr("size", fmt_vec3(size)),
        UrdfGeometry::Cylinder { radius, length } => XmlElement::new("cylinder")
            .with_attr("radius", fmt_f64(*radius))
            .with_attr("length", fmt_f64(*length)),
        UrdfGeometry::Sphere { radius } => {
            XmlElement::new("sphere").with_attr("radius", fmt_f64(*radius))
        }
        UrdfGeometry::Mesh { filename, scale } => XmlElement::new("mesh")
            .with_attr("filename", filename.as_str())
            .with_attr_opt("scale", scale.as_ref().map(fmt_vec3)),
    };
    XmlElement::new("geometry").with_child(shape)
}

fn joint_element(joint: &UrdfJoint) -> XmlElement {
    let mut e = XmlElement::new("joint")
        .with_attr("name", joint.name.as_str())
        .with_attr("type", joint.joint_type.as_str());
    push_origin(&mut e, &joint.origin);
    e.push(XmlElement::new("parent").with_attr("link", joint.parent.as_str()));
    e.push(XmlElement::new("child").with_attr("link", joint.child.as_str()));
    if joint.joint_type != UrdfJointType::Fixed {
        e.push(XmlElement::new("axis").with_attr("xyz", fmt_vec3(&joint.axis)));
    }
    if let Some(limit) = &joint.limit {
        let mut l = XmlElement::new("limit");
        if joint.joint_type.has_position_limits() {
            l = l
                .with_attr("lower", fmt_f64(limit.lower))
                .with_attr("upper", fmt_f64(limit.upper));
        }
        e.push(
            l.with_attr("effort", fmt_f64(limit.effort))
                .with_attr("velocity", fmt_f64(limit.velocity)),
        );
    }
    if let Some(dynamics) = &joint.dynamics {
        e.push(
            XmlElement::new("dynamics")
                .with_attr("damping", fmt_f64(dynamics.damping))
                .with_attr("friction", fmt_f64(dynamics.friction)),
        );
    }
    e
}

fn gazebo_element(gazebo: &UrdfGazebo) -> XmlElement {
    XmlElement::new("gazebo")
        .with_attr("reference", gazebo.reference.as_str())
        .with_text_child("preserveFixedJoint", gazebo.preserve_fixed_joint)
}

fn push_origin(e: &mut XmlElement, origin: &UrdfOrigin) {
    if !origin.is_identity() {
        e.push(
            XmlElement::new("origin")
                .with_attr("xyz", fmt_vec3(&origin.xyz))
                .with_attr("rpy", fmt_vec3(&origin.rpy)),
        );
    }
}

/// Shortest round-trip text for `v`, in exponent form from 1e16 up so the
/// unbounded limit defaults stay readable.
fn fmt_f64(v: f64) -> String {
    if v.is_finite() && v.abs() >= 1e16 {
        format!("{v:e}")
    } else {
        v.to_string()
    }
}

fn fmt_vec3(v: &Vector3<f64>) -> String {
    format!("{} {} {}", fmt_f64(v.x), fmt_f64(v.y), fmt_f64(v.z))
}

fn fmt_vec4(v: &Vector4<f64>) -> String {
    format!(
        "{} {} {} {}",
        fmt_f64(v.x),
        fmt_f64(v.y),
        fmt_f64(v.z),
        fmt_f64(v.w)
    )
}
