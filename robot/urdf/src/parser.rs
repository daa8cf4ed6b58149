//! URDF XML parser.
//!
//! Reads URDF XML into the types of [`crate::types`], through the same
//! element tree the SDF codec uses.

use std::collections::HashSet;
use std::path::Path;

use nalgebra::{Vector3, Vector4};
use tracing::debug;

use robot_sdf::xml::{self, XmlElement};

use crate::error::{Result, UrdfError};
use crate::types::{
    UrdfCollision, UrdfGazebo, UrdfGeometry, UrdfInertia, UrdfInertial, UrdfJoint,
    UrdfJointDynamics, UrdfJointLimit, UrdfJointType, UrdfLink, UrdfMaterial, UrdfOrigin,
    UrdfRobot, UrdfVisual,
};

/// Parse a URDF string into a robot model.
///
/// # Errors
///
/// Returns an error if the XML is malformed, missing required elements, or
/// repeats a link or joint name.
pub fn parse_urdf_str(xml: &str) -> Result<UrdfRobot> {
    let root = xml::parse_document(xml)?;
    if root.name != "robot" {
        return Err(UrdfError::missing_element("robot", "URDF document"));
    }
    let mut robot = UrdfRobot::new(get_attribute(&root, "name")?);

    for child in &root.children {
        match child.name.as_str() {
            "link" => {
                let link = parse_link(child, &mut robot.materials)?;
                robot.links.push(link);
            }
            "joint" => robot.joints.push(parse_joint(child)?),
            "material" => {
                let material = parse_material(child)?;
                if robot.material(&material.name).is_none() {
                    robot.materials.push(material);
                }
            }
            "gazebo" => {
                if let Some(gazebo) = parse_gazebo(child) {
                    robot.gazebo.push(gazebo);
                }
            }
            other => debug!(element = other, "skipping unsupported URDF element"),
        }
    }

    check_duplicates(&robot)?;
    debug!(
        robot = %robot.name,
        links = robot.links.len(),
        joints = robot.joints.len(),
        "parsed URDF"
    );
    Ok(robot)
}

/// Reject robots that reuse a link or joint name.
pub(crate) fn check_duplicates(robot: &UrdfRobot) -> Result<()> {
    let mut link_names = HashSet::new();
    for link in &robot.links {
        if !link_names.insert(link.name.as_str()) {
            return Err(UrdfError::DuplicateLink(link.name.clone()));
        }
    }

    let mut joint_names = HashSet::new();
    for joint in &robot.joints {
        if !joint_names.insert(joint.name.as_str()) {
            return Err(UrdfError::DuplicateJoint(joint.name.clone()));
        }
    }
    Ok(())
}

/// Load a URDF file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_urdf_file(path: impl AsRef<Path>) -> Result<UrdfRobot> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_urdf_str(&text)
}

/// Parse a link element. Inline visual materials are collected into
/// `materials`.
fn parse_link(e: &XmlElement, materials: &mut Vec<UrdfMaterial>) -> Result<UrdfLink> {
    let name = get_attribute(e, "name")?;
    let mut link = UrdfLink::new(name);

    for child in &e.children {
        match child.name.as_str() {
            "inertial" => link.inertial = Some(parse_inertial(child)?),
            "visual" => link.visuals.push(parse_visual(child, materials)?),
            "collision" => link.collisions.push(parse_collision(child)?),
            _ => {}
        }
    }

    Ok(link)
}

/// Parse an inertial element.
fn parse_inertial(e: &XmlElement) -> Result<UrdfInertial> {
    let mut inertial = UrdfInertial::default();
    if let Some(origin) = e.child("origin") {
        inertial.origin = parse_origin(origin)?;
    }
    if let Some(mass) = e.child("mass") {
        inertial.mass = parse_float(&get_attribute(mass, "value")?, "value", "mass")?;
    }
    if let Some(inertia) = e.child("inertia") {
        inertial.inertia = parse_inertia_element(inertia)?;
    }
    Ok(inertial)
}

/// Parse origin element attributes.
fn parse_origin(e: &XmlElement) -> Result<UrdfOrigin> {
    let xyz = e
        .attr("xyz")
        .map(|s| parse_vector3(s, "xyz", "origin"))
        .transpose()?
        .unwrap_or_else(Vector3::zeros);

    let rpy = e
        .attr("rpy")
        .map(|s| parse_vector3(s, "rpy", "origin"))
        .transpose()?
        .unwrap_or_else(Vector3::zeros);

    Ok(UrdfOrigin::new(xyz, rpy))
}

/// Parse inertia element attributes.
fn parse_inertia_element(e: &XmlElement) -> Result<UrdfInertia> {
    Ok(UrdfInertia {
        ixx: parse_float_attr(e, "ixx")?.unwrap_or(0.0),
        ixy: parse_float_attr(e, "ixy")?.unwrap_or(0.0),
        ixz: parse_float_attr(e, "ixz")?.unwrap_or(0.0),
        iyy: parse_float_attr(e, "iyy")?.unwrap_or(0.0),
        iyz: parse_float_attr(e, "iyz")?.unwrap_or(0.0),
        izz: parse_float_attr(e, "izz")?.unwrap_or(0.0),
    })
}

/// Parse a visual element.
fn parse_visual(e: &XmlElement, materials: &mut Vec<UrdfMaterial>) -> Result<UrdfVisual> {
    let origin = e.child("origin").map(parse_origin).transpose()?.unwrap_or_default();
    let geometry = e
        .child("geometry")
        .ok_or_else(|| UrdfError::missing_element("geometry", "visual"))
        .and_then(parse_geometry)?;

    let mut material = None;
    if let Some(m) = e.child("material") {
        let parsed = parse_material(m)?;
        let inline = parsed.color.is_some() || parsed.texture.is_some();
        if inline && !materials.iter().any(|known| known.name == parsed.name) {
            materials.push(parsed.clone());
        }
        material = Some(parsed.name);
    }

    Ok(UrdfVisual {
        name: e.attr("name").map(str::to_string),
        origin,
        geometry,
        material,
    })
}

/// Parse a collision element.
fn parse_collision(e: &XmlElement) -> Result<UrdfCollision> {
    let origin = e.child("origin").map(parse_origin).transpose()?.unwrap_or_default();
    let geometry = e
        .child("geometry")
        .ok_or_else(|| UrdfError::missing_element("geometry", "collision"))
        .and_then(parse_geometry)?;

    Ok(UrdfCollision {
        name: e.attr("name").map(str::to_string),
        origin,
        geometry,
    })
}

/// Parse a geometry element.
fn parse_geometry(e: &XmlElement) -> Result<UrdfGeometry> {
    for shape in &e.children {
        let geometry = match shape.name.as_str() {
            "box" => UrdfGeometry::Box {
                size: parse_vector3(&get_attribute(shape, "size")?, "size", "box")?,
            },
            "cylinder" => UrdfGeometry::Cylinder {
                radius: required_float(shape, "radius")?,
                length: required_float(shape, "length")?,
            },
            "sphere" => UrdfGeometry::Sphere {
                radius: required_float(shape, "radius")?,
            },
            "mesh" => UrdfGeometry::Mesh {
                filename: get_attribute(shape, "filename")?,
                scale: shape
                    .attr("scale")
                    .map(|s| parse_vector3(s, "scale", "mesh"))
                    .transpose()?,
            },
            _ => continue,
        };
        return Ok(geometry);
    }
    Err(UrdfError::missing_element("shape", "geometry"))
}

/// Parse a material element (robot level or inline in a visual).
fn parse_material(e: &XmlElement) -> Result<UrdfMaterial> {
    let name = get_attribute(e, "name")?;
    let color = e
        .child("color")
        .and_then(|c| c.attr("rgba"))
        .map(|s| parse_vector4(s, "rgba", &name))
        .transpose()?;
    let texture = e
        .child("texture")
        .and_then(|t| t.attr("filename"))
        .map(str::to_string);
    Ok(UrdfMaterial {
        name,
        color,
        texture,
    })
}

/// Parse a joint element.
fn parse_joint(e: &XmlElement) -> Result<UrdfJoint> {
    let name = get_attribute(e, "name")?;
    let type_str = get_attribute(e, "type")?;
    let joint_type =
        UrdfJointType::from_str(&type_str).ok_or_else(|| UrdfError::UnknownJointType(type_str))?;

    let parent = e
        .child("parent")
        .ok_or_else(|| UrdfError::missing_element("parent", format!("joint '{name}'")))
        .and_then(|p| get_attribute(p, "link"))?;
    let child = e
        .child("child")
        .ok_or_else(|| UrdfError::missing_element("child", format!("joint '{name}'")))
        .and_then(|c| get_attribute(c, "link"))?;

    let mut joint = UrdfJoint::new(name, joint_type, parent, child);
    if let Some(origin) = e.child("origin") {
        joint = joint.with_origin(parse_origin(origin)?);
    }
    if let Some(xyz) = e.child("axis").and_then(|a| a.attr("xyz")) {
        joint = joint.with_axis(parse_vector3(xyz, "xyz", "axis")?);
    }
    if let Some(limit) = e.child("limit") {
        joint = joint.with_limit(parse_joint_limit(limit)?);
    }
    if let Some(dynamics) = e.child("dynamics") {
        joint = joint.with_dynamics(parse_joint_dynamics(dynamics)?);
    }

    Ok(joint)
}

/// Parse joint limit element.
fn parse_joint_limit(e: &XmlElement) -> Result<UrdfJointLimit> {
    Ok(UrdfJointLimit {
        lower: parse_float_attr(e, "lower")?.unwrap_or(0.0),
        upper: parse_float_attr(e, "upper")?.unwrap_or(0.0),
        effort: parse_float_attr(e, "effort")?.unwrap_or(0.0),
        velocity: parse_float_attr(e, "velocity")?.unwrap_or(0.0),
    })
}

/// Parse joint dynamics element.
fn parse_joint_dynamics(e: &XmlElement) -> Result<UrdfJointDynamics> {
    Ok(UrdfJointDynamics {
        damping: parse_float_attr(e, "damping")?.unwrap_or(0.0),
        friction: parse_float_attr(e, "friction")?.unwrap_or(0.0),
    })
}

/// Parse a `<gazebo>` block; blocks without a reference are skipped.
fn parse_gazebo(e: &XmlElement) -> Option<UrdfGazebo> {
    let reference = e.attr("reference")?.to_string();
    let preserve_fixed_joint = e
        .child_text("preserveFixedJoint")
        .is_some_and(|t| t == "true" || t == "1");
    Some(UrdfGazebo {
        reference,
        preserve_fixed_joint,
    })
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get a required attribute value.
fn get_attribute(e: &XmlElement, name: &'static str) -> Result<String> {
    e.attr(name)
        .map(str::to_string)
        .ok_or_else(|| UrdfError::missing_attribute(name, e.name.as_str()))
}

fn parse_float(text: &str, name: &'static str, element: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| UrdfError::invalid_attribute(name, element, format!("invalid float: {text}")))
}

/// Parse an optional float attribute. A present but invalid value is an error.
fn parse_float_attr(e: &XmlElement, name: &'static str) -> Result<Option<f64>> {
    e.attr(name)
        .map(|s| parse_float(s, name, &e.name))
        .transpose()
}

fn required_float(e: &XmlElement, name: &'static str) -> Result<f64> {
    parse_float_attr(e, name)?.ok_or_else(|| UrdfError::missing_attribute(name, e.name.as_str()))
}

fn parse_floats(s: &str, name: &'static str, element: &str, count: usize) -> Result<Vec<f64>> {
    let parts = s
        .split_whitespace()
        .map(|p| parse_float(p, name, element))
        .collect::<Result<Vec<_>>>()?;
    if parts.len() != count {
        return Err(UrdfError::invalid_attribute(
            name,
            element,
            format!("expected {count} values, got {}", parts.len()),
        ));
    }
    Ok(parts)
}

/// Parse a space-separated vector3 string.
fn parse_vector3(s: &str, name: &'static str, element: &str) -> Result<Vector3<f64>> {
    let p = parse_floats(s, name, element, 3)?;
    Ok(Vector3::new(p[0], p[1], p[2]))
}

/// Parse a space-separated vector4 string.
fn parse_vector4(s: &str, name: &'static str, element: &str) -> Result<Vector4<f64>> {
    let p = parse_floats(s, name, element, 4)?;
    Ok(Vector4::new(p[0], p[1], p[2], p[3]))
}
