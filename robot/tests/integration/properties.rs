//! Property tests: resolver identity and composition, mass conservation.

use nalgebra::{Isometry3, Point3, Vector3};
use proptest::prelude::*;
use robot_conformance_tests::serial_chain;
use robot_kinematics::{FrameGraph, PoseResolver, canonicalize_model};
use robot_sdf::{Frame, Link, Model, Pose};
use robot_urdf::{ExportOptions, export};

const TOLERANCE: f64 = 1e-9;

fn pose_strategy() -> impl Strategy<Value = Pose> {
    (
        prop::array::uniform3(-5.0..5.0f64),
        prop::array::uniform3(-3.0..3.0f64),
    )
        .prop_map(|(t, r)| Pose::new(Vector3::from(t), Vector3::from(r)))
}

/// Frames `f0 .. fn`, each posed relative to the link or an earlier frame.
fn frame_model() -> impl Strategy<Value = Model> {
    (
        pose_strategy(),
        prop::collection::vec((pose_strategy(), any::<prop::sample::Index>()), 1..8),
    )
        .prop_map(|(link_pose, frames)| {
            let mut model = Model::new("m").with_link(Link::new("base").with_pose(link_pose));
            for (i, (pose, parent)) in frames.into_iter().enumerate() {
                let reference = match parent.index(i + 1) {
                    0 => "base".to_string(),
                    k => format!("f{}", k - 1),
                };
                model = model.with_frame(
                    Frame::new(format!("f{i}"))
                        .with_attached_to("base")
                        .with_pose(pose.with_relative_to(reference)),
                );
            }
            model
        })
}

fn assert_near(a: &Isometry3<f64>, b: &Isometry3<f64>) -> Result<(), TestCaseError> {
    let dt = (a.translation.vector - b.translation.vector).norm();
    let dr = a.rotation.angle_to(&b.rotation);
    prop_assert!(dt < TOLERANCE, "translation differs by {dt}");
    prop_assert!(dr < TOLERANCE, "rotation differs by {dr}");
    Ok(())
}

proptest! {
    #[test]
    fn resolve_to_self_is_identity(model in frame_model()) {
        let graph = FrameGraph::from_model(&model).expect("graph");
        let resolver = PoseResolver::new(&graph);
        for (id, _) in graph.nodes() {
            assert_near(&resolver.resolve(id, id).expect("resolves"), &Isometry3::identity())?;
        }
    }

    #[test]
    fn resolution_composes(model in frame_model(), picks in prop::array::uniform3(any::<prop::sample::Index>())) {
        let graph = FrameGraph::from_model(&model).expect("graph");
        let resolver = PoseResolver::new(&graph);
        let ids: Vec<_> = graph.nodes().map(|(id, _)| id).collect();
        let [a, b, c] = picks.map(|p| ids[p.index(ids.len())]);

        let direct = resolver.resolve(a, c).expect("a->c");
        let via = resolver.resolve(b, c).expect("b->c") * resolver.resolve(a, b).expect("a->b");
        assert_near(&direct, &via)?;
    }

    #[test]
    fn lumping_conserves_mass(
        masses in prop::collection::vec(prop_oneof![Just(0.0), 0.01..10.0f64], 2..7),
        offsets in prop::collection::vec(prop::array::uniform3(-2.0..2.0f64), 7),
        fixed in prop::collection::vec(any::<bool>(), 6),
    ) {
        let offsets: Vec<Vector3<f64>> = offsets.into_iter().map(Vector3::from).collect();
        let model = serial_chain(&masses, &offsets, &fixed);
        let tree = canonicalize_model(&model, None).expect("tree");
        let total: f64 = masses.iter().sum();

        let lumped = export(&tree, &ExportOptions::default()).expect("lumped");
        let kept = export(&tree, &ExportOptions::default().with_preserve_fixed_joints(true)).expect("kept");
        prop_assert!((lumped.total_mass() - total).abs() < TOLERANCE);
        prop_assert!((kept.total_mass() - total).abs() < TOLERANCE);
        prop_assert_eq!(kept.links.len(), masses.len());
        let lumped_joints = fixed.iter().take(masses.len() - 1).filter(|f| **f).count();
        prop_assert_eq!(lumped.links.len(), masses.len() - lumped_joints);
    }

    #[test]
    fn lumping_everything_keeps_center_of_mass(
        masses in prop::collection::vec(0.01..10.0f64, 2..6),
        offsets in prop::collection::vec(prop::array::uniform3(-2.0..2.0f64), 6),
    ) {
        // The root sits at the model origin, so its frame is the model frame.
        let mut offsets: Vec<Vector3<f64>> = offsets.into_iter().map(Vector3::from).collect();
        offsets[0] = Vector3::zeros();
        let fixed = vec![true; masses.len()];
        let model = serial_chain(&masses, &offsets, &fixed);
        let tree = canonicalize_model(&model, None).expect("tree");
        let robot = export(&tree, &ExportOptions::default()).expect("export");

        prop_assert_eq!(robot.links.len(), 1);
        let inertial = robot.links[0].inertial.expect("inertial");
        let total: f64 = masses.iter().sum();
        let expected = masses
            .iter()
            .zip(&offsets)
            .fold(Point3::origin(), |acc, (m, p)| acc + p * (*m / total));
        prop_assert!((inertial.origin.xyz - expected.coords).norm() < 1e-9);
    }
}
