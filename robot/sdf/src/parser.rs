//! SDF XML decoding.
//!
//! The document is read into an [`XmlElement`] tree and each element is then
//! mapped onto the typed model in [`crate::types`]. Elements this crate does
//! not model (sensors, plugins, physics, ...) are skipped.

use std::path::Path;

use nalgebra::{Vector2, Vector3, Vector4};
use tracing::{debug, warn};

use crate::error::{Result, SdfError};
use crate::types::{
    Axis, Collision, Document, Dynamics, Frame, Geometry, Inertia, Inertial, Joint, JointType,
    Limit, Link, Material, MaterialScript, Model, Pose, Visual, World,
};
use crate::xml::{self, XmlElement};

/// Lowest supported minor version of the 1.x series.
const MIN_MINOR_VERSION: u32 = 7;

/// Parse an SDF document from a string.
///
/// # Errors
///
/// Returns an error if the XML is malformed, the root is not `<sdf>`, the
/// version is outside `1.7 <= v < 2.0`, or a required element is missing.
pub fn parse_sdf_str(xml: &str) -> Result<Document> {
    let root = xml::parse_document(xml)?;
    if root.name != "sdf" {
        return Err(SdfError::missing_element(
            "sdf",
            format!("document root (found <{}>)", root.name),
        ));
    }

    let version = root
        .attr("version")
        .ok_or_else(|| SdfError::missing_attribute("version", "sdf"))?;
    check_version(version)?;

    let mut doc = Document::new(version);
    for child in &root.children {
        match child.name.as_str() {
            "model" => doc.models.push(parse_model(child)?),
            "world" => doc.worlds.push(parse_world(child)?),
            other => debug!(element = other, "skipping unsupported top-level element"),
        }
    }

    debug!(
        version = %doc.version,
        models = doc.models.len(),
        worlds = doc.worlds.len(),
        "parsed SDF document"
    );
    Ok(doc)
}

/// Load an SDF document from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load_sdf_file(path: impl AsRef<Path>) -> Result<Document> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_sdf_str(&text)
}

/// Accept `1.7 <= version < 2.0`.
fn check_version(version: &str) -> Result<()> {
    let mut parts = version.trim().split('.');
    let major = parts.next().and_then(|p| p.parse::<u32>().ok());
    let minor = parts.next().and_then(|p| p.parse::<u32>().ok());
    match (major, minor, parts.next()) {
        (Some(1), Some(minor), None) if minor >= MIN_MINOR_VERSION => Ok(()),
        _ => Err(SdfError::unsupported_version(version)),
    }
}

// ============================================================================
// World & Model
// ============================================================================

fn parse_world(e: &XmlElement) -> Result<World> {
    let name = required_attr(e, "name", "world")?;
    let context = format!("world '{name}'");
    let mut world = World::new(name);

    for child in &e.children {
        match child.name.as_str() {
            "gravity" => world.gravity = Some(parse_vector3(&child.text, "gravity", &context)?),
            "frame" => world.frames.push(parse_frame(child)?),
            "model" => world.models.push(parse_model(child)?),
            _ => {}
        }
    }
    Ok(world)
}

fn parse_model(e: &XmlElement) -> Result<Model> {
    let name = required_attr(e, "name", "model")?;
    let context = format!("model '{name}'");
    let mut model = Model::new(name);
    model.canonical_link = e.attr("canonical_link").map(str::to_string);
    model.placement_frame = e.attr("placement_frame").map(str::to_string);

    for child in &e.children {
        match child.name.as_str() {
            "static" => model.is_static = Some(parse_bool(&child.text, "static", &context)?),
            "self_collide" => {
                model.self_collide = Some(parse_bool(&child.text, "self_collide", &context)?);
            }
            "pose" => model.pose = Some(parse_pose(child, &context)?),
            "link" => model.links.push(parse_link(child)?),
            "joint" => model.joints.push(parse_joint(child)?),
            "frame" => model.frames.push(parse_frame(child)?),
            "model" => model.models.push(parse_model(child)?),
            _ => {}
        }
    }
    Ok(model)
}

// ============================================================================
// Link
// ============================================================================

fn parse_link(e: &XmlElement) -> Result<Link> {
    let name = required_attr(e, "name", "link")?;
    let context = format!("link '{name}'");
    let mut link = Link::new(name);

    for child in &e.children {
        match child.name.as_str() {
            "pose" => link.pose = Some(parse_pose(child, &context)?),
            "inertial" => link.inertial = Some(parse_inertial(child, &context)?),
            "visual" => link.visuals.push(parse_visual(child, &context)?),
            "collision" => link.collisions.push(parse_collision(child, &context)?),
            "gravity" => link.gravity = Some(parse_bool(&child.text, "gravity", &context)?),
            "self_collide" => {
                link.self_collide = Some(parse_bool(&child.text, "self_collide", &context)?);
            }
            "kinematic" => link.kinematic = Some(parse_bool(&child.text, "kinematic", &context)?),
            _ => {}
        }
    }
    Ok(link)
}

fn parse_inertial(e: &XmlElement, context: &str) -> Result<Inertial> {
    let context = format!("inertial of {context}");
    let mut inertial = Inertial::default();

    if let Some(mass) = e.child_text("mass") {
        inertial.mass = parse_f64(mass, "mass", &context)?;
    }
    if let Some(pose) = e.child("pose") {
        inertial.pose = Some(parse_pose(pose, &context)?);
    }
    if let Some(inertia) = e.child("inertia") {
        inertial.inertia = parse_inertia(inertia, &context)?;
    }
    Ok(inertial)
}

fn parse_inertia(e: &XmlElement, context: &str) -> Result<Inertia> {
    let component = |name: &'static str, default: f64| -> Result<f64> {
        e.child_text(name)
            .map_or(Ok(default), |text| parse_f64(text, name, context))
    };
    Ok(Inertia::new(
        component("ixx", 1.0)?,
        component("ixy", 0.0)?,
        component("ixz", 0.0)?,
        component("iyy", 1.0)?,
        component("iyz", 0.0)?,
        component("izz", 1.0)?,
    ))
}

fn parse_visual(e: &XmlElement, link_context: &str) -> Result<Visual> {
    let name = required_attr(e, "name", "visual")?;
    let context = format!("visual '{name}' of {link_context}");
    let geometry = e
        .child("geometry")
        .ok_or_else(|| SdfError::missing_element("geometry", context.clone()))?;

    let mut visual = Visual::new(name, parse_geometry(geometry, &context)?);
    if let Some(pose) = e.child("pose") {
        visual.pose = Some(parse_pose(pose, &context)?);
    }
    if let Some(material) = e.child("material") {
        visual.material = Some(parse_material(material, &context)?);
    }
    Ok(visual)
}

fn parse_collision(e: &XmlElement, link_context: &str) -> Result<Collision> {
    let name = required_attr(e, "name", "collision")?;
    let context = format!("collision '{name}' of {link_context}");
    let geometry = e
        .child("geometry")
        .ok_or_else(|| SdfError::missing_element("geometry", context.clone()))?;

    let mut collision = Collision::new(name, parse_geometry(geometry, &context)?);
    if let Some(pose) = e.child("pose") {
        collision.pose = Some(parse_pose(pose, &context)?);
    }
    Ok(collision)
}

fn parse_geometry(e: &XmlElement, context: &str) -> Result<Geometry> {
    let shape = e
        .children
        .first()
        .ok_or_else(|| SdfError::missing_element("shape", format!("geometry of {context}")))?;

    let vec3 = |name: &'static str, default: Vector3<f64>| -> Result<Vector3<f64>> {
        shape
            .child_text(name)
            .map_or(Ok(default), |text| parse_vector3(text, name, context))
    };
    let scalar = |name: &'static str, default: f64| -> Result<f64> {
        shape
            .child_text(name)
            .map_or(Ok(default), |text| parse_f64(text, name, context))
    };
    let uri = || -> Result<String> {
        shape
            .child_text("uri")
            .map(str::to_string)
            .ok_or_else(|| SdfError::missing_element("uri", format!("{} of {context}", shape.name)))
    };

    let geometry = match shape.name.as_str() {
        "empty" => Geometry::Empty,
        "box" => Geometry::Box {
            size: vec3("size", Vector3::new(1.0, 1.0, 1.0))?,
        },
        "capsule" => Geometry::Capsule {
            radius: scalar("radius", 0.5)?,
            length: scalar("length", 1.0)?,
        },
        "cylinder" => Geometry::Cylinder {
            radius: scalar("radius", 1.0)?,
            length: scalar("length", 1.0)?,
        },
        "ellipsoid" => Geometry::Ellipsoid {
            radii: vec3("radii", Vector3::new(1.0, 1.0, 1.0))?,
        },
        "sphere" => Geometry::Sphere {
            radius: scalar("radius", 1.0)?,
        },
        "plane" => {
            let size = match shape.child_text("size") {
                Some(text) => {
                    let values = parse_float_array(text, "size", context)?;
                    if values.len() != 2 {
                        return Err(SdfError::invalid_attribute(
                            "size",
                            context,
                            format!("plane size needs 2 values, got {}", values.len()),
                        ));
                    }
                    Vector2::new(values[0], values[1])
                }
                None => Vector2::new(1.0, 1.0),
            };
            Geometry::Plane {
                normal: vec3("normal", Vector3::z())?,
                size,
            }
        }
        "mesh" => Geometry::Mesh {
            uri: uri()?,
            scale: match shape.child_text("scale") {
                Some(text) => Some(parse_vector3(text, "scale", context)?),
                None => None,
            },
        },
        "heightmap" => Geometry::Heightmap {
            uri: uri()?,
            size: vec3("size", Vector3::new(1.0, 1.0, 1.0))?,
            pos: vec3("pos", Vector3::zeros())?,
        },
        other => {
            warn!(shape = other, %context, "unsupported geometry, treating as empty");
            Geometry::Empty
        }
    };
    Ok(geometry)
}

fn parse_material(e: &XmlElement, context: &str) -> Result<Material> {
    let color = |name: &'static str| -> Result<Option<Vector4<f64>>> {
        e.child_text(name)
            .map(|text| parse_vector4(text, name, context))
            .transpose()
    };
    let script = e.child("script").map(|s| MaterialScript {
        name: s.child_text("name").unwrap_or_default().to_string(),
        uris: s
            .children_named("uri")
            .map(|u| u.text.trim().to_string())
            .collect(),
    });

    Ok(Material {
        ambient: color("ambient")?,
        diffuse: color("diffuse")?,
        specular: color("specular")?,
        emissive: color("emissive")?,
        script,
    })
}

// ============================================================================
// Joint & Frame
// ============================================================================

fn parse_joint(e: &XmlElement) -> Result<Joint> {
    let name = required_attr(e, "name", "joint")?;
    let context = format!("joint '{name}'");
    let type_name = e
        .attr("type")
        .ok_or_else(|| SdfError::missing_attribute("type", context.clone()))?;
    let joint_type = JointType::from_str(type_name)
        .ok_or_else(|| SdfError::UnknownJointType(type_name.to_string()))?;

    let parent = e
        .child_text("parent")
        .ok_or_else(|| SdfError::missing_element("parent", context.clone()))?;
    let child = e
        .child_text("child")
        .ok_or_else(|| SdfError::missing_element("child", context.clone()))?;

    let mut joint = Joint::new(name, joint_type, parent, child);
    if let Some(pose) = e.child("pose") {
        joint.pose = Some(parse_pose(pose, &context)?);
    }
    if let Some(axis) = e.child("axis") {
        joint.axis = Some(parse_axis(axis, &context)?);
    }
    Ok(joint)
}

fn parse_axis(e: &XmlElement, context: &str) -> Result<Axis> {
    let context = format!("axis of {context}");
    let mut axis = Axis::default();

    if let Some(xyz) = e.child("xyz") {
        axis.xyz = parse_vector3(&xyz.text, "xyz", &context)?;
        axis.expressed_in = xyz
            .attr("expressed_in")
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    let optional = |parent: &XmlElement, name: &'static str| -> Result<Option<f64>> {
        parent
            .child_text(name)
            .map(|text| parse_f64(text, name, &context))
            .transpose()
    };

    if let Some(limit) = e.child("limit") {
        axis.limit = Some(Limit {
            lower: optional(limit, "lower")?,
            upper: optional(limit, "upper")?,
            effort: optional(limit, "effort")?,
            velocity: optional(limit, "velocity")?,
        });
    }
    if let Some(dynamics) = e.child("dynamics") {
        axis.dynamics = Some(Dynamics {
            damping: optional(dynamics, "damping")?,
            friction: optional(dynamics, "friction")?,
            spring_reference: optional(dynamics, "spring_reference")?,
            spring_stiffness: optional(dynamics, "spring_stiffness")?,
        });
    }
    Ok(axis)
}

fn parse_frame(e: &XmlElement) -> Result<Frame> {
    let name = required_attr(e, "name", "frame")?;
    let context = format!("frame '{name}'");
    let mut frame = Frame::new(name);
    frame.attached_to = e
        .attr("attached_to")
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if let Some(pose) = e.child("pose") {
        frame.pose = Some(parse_pose(pose, &context)?);
    }
    Ok(frame)
}

// ============================================================================
// Pose
// ============================================================================

/// Parse `<pose relative_to=".." degrees=".." rotation_format="..">`.
fn parse_pose(e: &XmlElement, context: &str) -> Result<Pose> {
    let values = parse_float_array(&e.text, "pose", context)?;
    let degrees = match e.attr("degrees") {
        Some(text) => parse_bool(text, "degrees", context)?,
        None => false,
    };
    let format = e.attr("rotation_format").unwrap_or("euler_rpy");

    let pose = match (format, values.len()) {
        (_, 0) => Pose::default(),
        ("euler_rpy", 6) => {
            let rpy = Vector3::new(values[3], values[4], values[5]);
            let rpy = if degrees { rpy.map(f64::to_radians) } else { rpy };
            Pose::new(Vector3::new(values[0], values[1], values[2]), rpy)
        }
        ("quat_xyzw", 7) => Pose::from_xyz_quat(
            Vector3::new(values[0], values[1], values[2]),
            Vector4::new(values[3], values[4], values[5], values[6]),
        ),
        ("euler_rpy", n) => {
            return Err(SdfError::invalid_attribute(
                "pose",
                context,
                format!("euler_rpy pose needs 6 values, got {n}"),
            ));
        }
        ("quat_xyzw", n) => {
            return Err(SdfError::invalid_attribute(
                "pose",
                context,
                format!("quat_xyzw pose needs 7 values, got {n}"),
            ));
        }
        (other, _) => {
            return Err(SdfError::invalid_attribute(
                "rotation_format",
                context,
                format!("unknown rotation format '{other}'"),
            ));
        }
    };

    Ok(match e.attr("relative_to") {
        Some(frame) => pose.with_relative_to(frame),
        None => pose,
    })
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get a required attribute.
fn required_attr<'a>(e: &'a XmlElement, name: &'static str, element: &str) -> Result<&'a str> {
    e.attr(name)
        .ok_or_else(|| SdfError::missing_attribute(name, element))
}

/// Parse a single float.
fn parse_f64(text: &str, name: &'static str, context: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| SdfError::invalid_attribute(name, context, format!("invalid float: {text}")))
}

/// Parse a boolean (`true`/`false`/`1`/`0`).
fn parse_bool(text: &str, name: &'static str, context: &str) -> Result<bool> {
    match text.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(SdfError::invalid_attribute(
            name,
            context,
            format!("invalid boolean: {other}"),
        )),
    }
}

/// Parse a space-separated array of floats.
fn parse_float_array(text: &str, name: &'static str, context: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|p| parse_f64(p, name, context))
        .collect()
}

/// Parse a space-separated vector3 string.
fn parse_vector3(text: &str, name: &'static str, context: &str) -> Result<Vector3<f64>> {
    let parts = parse_float_array(text, name, context)?;
    if parts.len() != 3 {
        return Err(SdfError::invalid_attribute(
            name,
            context,
            format!("expected 3 values, got {}", parts.len()),
        ));
    }
    Ok(Vector3::new(parts[0], parts[1], parts[2]))
}

/// Parse a space-separated vector4 string.
fn parse_vector4(text: &str, name: &'static str, context: &str) -> Result<Vector4<f64>> {
    let parts = parse_float_array(text, name, context)?;
    if parts.len() != 4 {
        return Err(SdfError::invalid_attribute(
            name,
            context,
            format!("expected 4 values, got {}", parts.len()),
        ));
    }
    Ok(Vector4::new(parts[0], parts[1], parts[2], parts[3]))
}
