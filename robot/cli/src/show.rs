//! Text rendering of a document's resolved frames.

use std::fmt::Write;

use anyhow::Result;
use nalgebra::Isometry3;
use robot_kinematics::{FrameGraph, PoseResolver, canonicalize};
use robot_sdf::{Document, Model, scoped_name};

/// Render every model with poses relative to world.
pub fn render(doc: &Document) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "sdf {}", doc.version)?;
    for model in doc.all_models() {
        render_model(&mut out, doc, model)?;
    }
    Ok(out)
}

fn render_model(out: &mut String, doc: &Document, model: &Model) -> Result<()> {
    let graph = FrameGraph::build(doc, model)?;
    let resolver = PoseResolver::new(&graph);
    let scope = if graph.scope_root() == graph.world() {
        model.name.clone()
    } else {
        String::new()
    };

    let root = match canonicalize(doc, model, None) {
        Ok(tree) => format!("root {}", tree.root().name),
        Err(err) => format!("no tree: {err}"),
    };
    writeln!(out, "model {} ({root})", model.name)?;
    render_scope(out, &graph, &resolver, model, &scope)
}

fn render_scope(
    out: &mut String,
    graph: &FrameGraph,
    resolver: &PoseResolver<'_>,
    model: &Model,
    scope: &str,
) -> Result<()> {
    let world = graph.world();
    let pose = |name: &str| -> Result<String> {
        let id = graph.require(&scoped_name(scope, name))?;
        Ok(fmt_pose(&resolver.resolve(id, world)?))
    };

    for link in &model.links {
        let mass = link
            .inertial
            .as_ref()
            .map(|i| format!(" mass {}", i.mass))
            .unwrap_or_default();
        writeln!(
            out,
            "  link {}{mass} {}",
            scoped_name(scope, &link.name),
            pose(&link.name)?
        )?;
    }
    for joint in &model.joints {
        writeln!(
            out,
            "  joint {} {} {} -> {} {}",
            scoped_name(scope, &joint.name),
            joint.joint_type.as_str(),
            joint.parent,
            joint.child,
            pose(&joint.name)?
        )?;
    }
    for frame in &model.frames {
        writeln!(
            out,
            "  frame {} on {} {}",
            scoped_name(scope, &frame.name),
            frame.attachment().unwrap_or("__model__"),
            pose(&frame.name)?
        )?;
    }
    for nested in &model.models {
        render_scope(out, graph, resolver, nested, &scoped_name(scope, &nested.name))?;
    }
    Ok(())
}

fn fmt_pose(iso: &Isometry3<f64>) -> String {
    let t = iso.translation.vector;
    let (roll, pitch, yaw) = iso.rotation.euler_angles();
    format!(
        "xyz [{:.6} {:.6} {:.6}] rpy [{:.6} {:.6} {:.6}]",
        t.x, t.y, t.z, roll, pitch, yaw
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use robot_sdf::{Frame, Joint, JointType, Link, Pose, World};

    fn arm() -> Model {
        Model::new("arm")
            .with_link(Link::new("base"))
            .with_link(Link::new("tip").with_pose(Pose::from_xyz(0.0, 0.0, 1.0)))
            .with_joint(Joint::new("weld", JointType::Fixed, "base", "tip"))
            .with_frame(Frame::new("tcp").with_attached_to("tip").with_pose(Pose::from_xyz(0.1, 0.0, 0.0)))
    }

    #[test]
    fn test_render_model() {
        let doc = Document::default().with_model(arm());
        let text = render(&doc).unwrap();
        assert!(text.contains("model arm (root base)"));
        assert!(text.contains("link tip xyz [0.000000 0.000000 1.000000]"));
        assert!(text.contains("joint weld fixed base -> tip"));
        assert!(text.contains("frame tcp on tip xyz [0.100000 0.000000 1.000000]"));
    }

    #[test]
    fn test_render_world_model() {
        let doc = Document::default().with_world(
            World::new("w").with_model(arm().with_pose(Pose::from_xyz(2.0, 0.0, 0.0))),
        );
        let text = render(&doc).unwrap();
        assert!(text.contains("link arm::tip xyz [2.000000 0.000000 1.000000]"));
    }

    #[test]
    fn test_render_reports_tree_errors() {
        let doc = Document::default().with_model(arm().with_link(Link::new("stray")));
        let text = render(&doc).unwrap();
        assert!(text.contains("no tree: ambiguous root"));
    }
}
