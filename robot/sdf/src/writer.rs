//! SDF XML encoding.
//!
//! Numbers are written with Rust's shortest round-trip float formatting, so
//! [`parse_sdf_str`](crate::parse_sdf_str) of the output reproduces the
//! document exactly.

use std::path::Path;

use nalgebra::{Vector3, Vector4};

use crate::error::Result;
use crate::types::{
    Axis, Collision, Document, Frame, Geometry, Inertial, Joint, Link, Material, Model, Pose,
    Visual, World,
};
use crate::xml::{self, XmlElement};

/// Indentation used for pretty output.
const INDENT: usize = 2;

/// Encode a document as SDF XML.
///
/// # Errors
///
/// Returns an error if the XML writer fails.
pub fn write_sdf_string(doc: &Document, pretty: bool) -> Result<String> {
    let root = document_element(doc);
    Ok(xml::write_document(&root, pretty, INDENT)?)
}

/// Encode a document and write it to a file.
///
/// # Errors
///
/// Returns an error if encoding fails or the file cannot be written.
pub fn save_sdf_file(doc: &Document, path: impl AsRef<Path>) -> Result<()> {
    let text = write_sdf_string(doc, true)?;
    std::fs::write(path.as_ref(), text)?;
    Ok(())
}

/// Build the element tree for a document.
#[must_use]
pub fn document_element(doc: &Document) -> XmlElement {
    let mut root = XmlElement::new("sdf").with_attr("version", doc.version.as_str());
    for world in &doc.worlds {
        root.push(world_element(world));
    }
    for model in &doc.models {
        root.push(model_element(model));
    }
    root
}

fn world_element(world: &World) -> XmlElement {
    let mut e = XmlElement::new("world").with_attr("name", world.name.as_str());
    if let Some(gravity) = &world.gravity {
        e.push(XmlElement::new("gravity").with_text(fmt_vec3(gravity)));
    }
    for frame in &world.frames {
        e.push(frame_element(frame));
    }
    for model in &world.models {
        e.push(model_element(model));
    }
    e
}

fn model_element(model: &Model) -> XmlElement {
    let mut e = XmlElement::new("model")
        .with_attr("name", model.name.as_str())
        .with_attr_opt("canonical_link", model.canonical_link.as_deref())
        .with_attr_opt("placement_frame", model.placement_frame.as_deref());

    if let Some(is_static) = model.is_static {
        e.push(XmlElement::new("static").with_text(is_static.to_string()));
    }
    if let Some(self_collide) = model.self_collide {
        e.push(XmlElement::new("self_collide").with_text(self_collide.to_string()));
    }
    if let Some(pose) = &model.pose {
        e.push(pose_element(pose));
    }
    for link in &model.links {
        e.push(link_element(link));
    }
    for joint in &model.joints {
        e.push(joint_element(joint));
    }
    for frame in &model.frames {
        e.push(frame_element(frame));
    }
    for nested in &model.models {
        e.push(model_element(nested));
    }
    e
}

fn link_element(link: &Link) -> XmlElement {
    let mut e = XmlElement::new("link").with_attr("name", link.name.as_str());
    if let Some(pose) = &link.pose {
        e.push(pose_element(pose));
    }
    if let Some(gravity) = link.gravity {
        e.push(XmlElement::new("gravity").with_text(gravity.to_string()));
    }
    if let Some(self_collide) = link.self_collide {
        e.push(XmlElement::new("self_collide").with_text(self_collide.to_string()));
    }
    if let Some(kinematic) = link.kinematic {
        e.push(XmlElement::new("kinematic").with_text(kinematic.to_string()));
    }
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

fn inertial_element(inertial: &Inertial) -> XmlElement {
    let i = &inertial.inertia;
    let mut e = XmlElement::new("inertial").with_text_child("mass", inertial.mass);
    if let Some(pose) = &inertial.pose {
        e.push(pose_element(pose));
    }
    e.with_child(
        XmlElement::new("inertia")
            .with_text_child("ixx", i.ixx)
            .with_text_child("ixy", i.ixy)
            .with_text_child("ixz", i.ixz)
            .with_text_child("iyy", i.iyy)
            .with_text_child("iyz", i.iyz)
            .with_text_child("izz", i.izz),
    )
}

fn visual_element(visual: &Visual) -> XmlElement {
    let mut e = XmlElement::new("visual").with_attr("name", visual.name.as_str());
    if let Some(pose) = &visual.pose {
        e.push(pose_element(pose));
    }
    e.push(geometry_element(&visual.geometry));
    if let Some(material) = &visual.material {
        e.push(material_element(material));
    }
    e
}

fn collision_element(collision: &Collision) -> XmlElement {
    let mut e = XmlElement::new("collision").with_attr("name", collision.name.as_str());
    if let Some(pose) = &collision.pose {
        e.push(pose_element(pose));
    }
    e.with_child(geometry_element(&collision.geometry))
}

fn geometry_element(geometry: &Geometry) -> XmlElement {
    let shape = XmlElement::new(geometry.kind_name());
    let shape = match geometry {
        Geometry::Empty => shape,
        Geometry::Box { size } => shape.with_text_child("size", fmt_vec3(size)),
        Geometry::Capsule { radius, length } | Geometry::Cylinder { radius, length } => shape
            .with_text_child("radius", radius)
            .with_text_child("length", length),
        Geometry::Ellipsoid { radii } => shape.with_text_child("radii", fmt_vec3(radii)),
        Geometry::Sphere { radius } => shape.with_text_child("radius", radius),
        Geometry::Plane { normal, size } => shape
            .with_text_child("normal", fmt_vec3(normal))
            .with_text_child("size", fmt_floats(size.iter())),
        Geometry::Mesh { uri, scale } => {
            let shape = shape.with_text_child("uri", uri);
            match scale {
                Some(scale) => shape.with_text_child("scale", fmt_vec3(scale)),
                None => shape,
            }
        }
        Geometry::Heightmap { uri, size, pos } => shape
            .with_text_child("uri", uri)
            .with_text_child("size", fmt_vec3(size))
            .with_text_child("pos", fmt_vec3(pos)),
    };
    XmlElement::new("geometry").with_child(shape)
}

fn material_element(material: &Material) -> XmlElement {
    let mut e = XmlElement::new("material");
    for (name, color) in [
        ("ambient", &material.ambient),
        ("diffuse", &material.diffuse),
        ("specular", &material.specular),
        ("emissive", &material.emissive),
    ] {
        if let Some(color) = color {
            e.push(XmlElement::new(name).with_text(fmt_vec4(color)));
        }
    }
    if let Some(script) = &material.script {
        let mut s = XmlElement::new("script");
        for uri in &script.uris {
            s.push(XmlElement::new("uri").with_text(uri.as_str()));
        }
        e.push(s.with_text_child("name", &script.name));
    }
    e
}

fn joint_element(joint: &Joint) -> XmlElement {
    let mut e = XmlElement::new("joint")
        .with_attr("name", joint.name.as_str())
        .with_attr("type", joint.joint_type.as_str())
        .with_text_child("parent", &joint.parent)
        .with_text_child("child", &joint.child);
    if let Some(pose) = &joint.pose {
        e.push(pose_element(pose));
    }
    if let Some(axis) = &joint.axis {
        e.push(axis_element(axis));
    }
    e
}

fn axis_element(axis: &Axis) -> XmlElement {
    let mut e = XmlElement::new("axis").with_child(
        XmlElement::new("xyz")
            .with_attr_opt("expressed_in", axis.expressed_in.as_deref())
            .with_text(fmt_vec3(&axis.xyz)),
    );

    if let Some(limit) = &axis.limit {
        let mut l = XmlElement::new("limit");
        for (name, value) in [
            ("lower", limit.lower),
            ("upper", limit.upper),
            ("effort", limit.effort),
            ("velocity", limit.velocity),
        ] {
            if let Some(value) = value {
                l.push(XmlElement::new(name).with_text(value.to_string()));
            }
        }
        e.push(l);
    }

    if let Some(dynamics) = &axis.dynamics {
        let mut d = XmlElement::new("dynamics");
        for (name, value) in [
            ("damping", dynamics.damping),
            ("friction", dynamics.friction),
            ("spring_reference", dynamics.spring_reference),
            ("spring_stiffness", dynamics.spring_stiffness),
        ] {
            if let Some(value) = value {
                d.push(XmlElement::new(name).with_text(value.to_string()));
            }
        }
        e.push(d);
    }
    e
}

fn frame_element(frame: &Frame) -> XmlElement {
    let mut e = XmlElement::new("frame")
        .with_attr("name", frame.name.as_str())
        .with_attr_opt("attached_to", frame.attachment());
    if let Some(pose) = &frame.pose {
        e.push(pose_element(pose));
    }
    e
}

fn pose_element(pose: &Pose) -> XmlElement {
    XmlElement::new("pose")
        .with_attr_opt("relative_to", pose.reference())
        .with_text(fmt_floats(pose.xyz.iter().chain(pose.rpy.iter())))
}

// ============================================================================
// Number formatting
// ============================================================================

fn fmt_floats<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    values
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn fmt_vec3(v: &Vector3<f64>) -> String {
    fmt_floats(v.iter())
}

fn fmt_vec4(v: &Vector4<f64>) -> String {
    fmt_floats(v.iter())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::parser::parse_sdf_str;
    use crate::types::{Dynamics, Inertia, JointType, Limit, MaterialScript};
    use nalgebra::Vector2;

    fn full_document() -> Document {
        let arm = Model::new("arm")
            .with_canonical_link("base")
            .with_pose(Pose::from_xyz(0.0, 0.0, 0.5).with_rpy(0.1, 0.2, 0.3))
            .with_link(
                Link::new("base")
                    .with_inertial(
                        Inertial::new(2.5, Inertia::new(0.1, 0.01, 0.0, 0.2, 0.0, 0.3))
                            .with_pose(Pose::from_xyz(0.0, 0.0, 0.1)),
                    )
                    .with_visual(
                        Visual::new(
                            "shell",
                            Geometry::Mesh {
                                uri: "model://arm/base.dae".into(),
                                scale: Some(Vector3::new(0.001, 0.001, 0.001)),
                            },
                        )
                        .with_material(Material {
                            diffuse: Some(Vector4::new(0.1, 0.2, 0.3, 1.0)),
                            script: Some(MaterialScript {
                                name: "Gazebo/Grey".into(),
                                uris: vec!["file://media/gazebo.material".into()],
                            }),
                            ..Default::default()
                        }),
                    )
                    .with_collision(Collision::new(
                        "floor",
                        Geometry::Plane {
                            normal: Vector3::z(),
                            size: Vector2::new(10.0, 10.0),
                        },
                    )),
            )
            .with_link(
                Link::new("link1")
                    .with_pose(Pose::from_xyz(0.0, 0.0, 1.0).with_relative_to("base"))
                    .with_collision(Collision::new(
                        "c",
                        Geometry::Capsule {
                            radius: 0.05,
                            length: 0.3,
                        },
                    )),
            )
            .with_joint(
                Joint::new("j1", JointType::Revolute, "base", "link1").with_axis(
                    Axis::new(Vector3::y())
                        .with_expressed_in("__model__")
                        .with_limit(Limit::new(-1.0, 1.0).with_effort(5.0))
                        .with_dynamics(Dynamics {
                            damping: Some(0.2),
                            ..Default::default()
                        }),
                ),
            )
            .with_frame(
                Frame::new("tool")
                    .with_attached_to("link1")
                    .with_pose(Pose::from_xyz(0.0, 0.0, 0.1)),
            )
            .with_model(Model::new("gripper").with_link(Link::new("palm")));

        let mut world = World::new("default").with_model(Model::new("ground"));
        world.gravity = Some(Vector3::new(0.0, 0.0, -9.81));

        Document::new("1.10").with_model(arm).with_world(world)
    }

    #[test]
    fn test_round_trip_is_exact() {
        let doc = full_document();
        for pretty in [false, true] {
            let text = write_sdf_string(&doc, pretty).unwrap();
            assert_eq!(parse_sdf_str(&text).unwrap(), doc);
        }
    }

    #[test]
    fn test_round_trip_awkward_floats() {
        let pose = Pose::new(
            Vector3::new(0.1 + 0.2, -0.0, 1e-300),
            Vector3::new(std::f64::consts::PI, -1.0 / 3.0, f64::MIN_POSITIVE),
        );
        let doc = Document::default()
            .with_model(Model::new("m").with_link(Link::new("a").with_pose(pose)));
        let text = write_sdf_string(&doc, false).unwrap();
        assert_eq!(parse_sdf_str(&text).unwrap(), doc);
    }

    #[test]
    fn test_written_text_shape() {
        let text = write_sdf_string(&full_document(), true).unwrap();
        assert!(text.contains(r#"<sdf version="1.10">"#));
        assert!(text.contains(r#"<pose relative_to="base">0 0 1 0 0 0</pose>"#));
        assert!(text.contains(r#"<xyz expressed_in="__model__">0 1 0</xyz>"#));
        assert!(text.contains("<mass>2.5</mass>"));
    }
}
