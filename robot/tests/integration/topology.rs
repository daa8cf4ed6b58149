//! Root selection and tree topology tests.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use robot_kinematics::{CanonicalizationError, GraphDefect, GraphError, canonicalize};
use robot_sdf::{Document, load_sdf_validated, parse_sdf_str};
use robot_urdf::{ExportOptions, UrdfError, export_model};

fn model_sdf(body: &str) -> String {
    format!(r#"<sdf version="1.10"><model name="m">{body}</model></sdf>"#)
}

fn load(body: &str) -> Document {
    load_sdf_validated(&model_sdf(body)).expect("valid document")
}

/// Test: two unjointed links are both reported as root candidates.
#[test]
fn test_ambiguous_root_names_both() {
    let doc = load(r#"<link name="left"/><link name="right"/>"#);
    let err = canonicalize(&doc, &doc.models[0], None).expect_err("ambiguous");
    match err {
        CanonicalizationError::AmbiguousRoot { model, candidates } => {
            assert_eq!(model, "m");
            assert_eq!(candidates, ["left", "right"]);
        }
        other => panic!("expected AmbiguousRoot, got {other}"),
    }
}

/// Test: a root hint or `canonical_link` picks the root.
#[test]
fn test_canonical_link_selects_root() {
    let doc = load(
        r#"<link name="a"/><link name="b"><pose>0 0 1 0 0 0</pose></link>
           <joint name="j" type="revolute"><parent>a</parent><child>b</child>
             <axis><xyz>1 0 0</xyz></axis></joint>"#,
    );
    let tree = canonicalize(&doc, &doc.models[0], Some("b")).expect("hinted root");
    assert_eq!(tree.root().name, "b");
    assert!(tree.joints()[0].reversed);

    let mut doc = doc;
    doc.models[0].canonical_link = Some("b".into());
    let tree = canonicalize(&doc, &doc.models[0], None).expect("canonical root");
    assert_eq!(tree.root().name, "b");
    let a = &tree.links()[tree.link_index("a").expect("a")];
    // `a` is expressed in the joint frame, which sits on `b`.
    assert_relative_eq!(a.root_pose.translation.vector, Vector3::zeros(), epsilon = 1e-12);
    let link_a = tree
        .resolver()
        .resolve(a.frame, tree.root().frame)
        .expect("resolves");
    assert_relative_eq!(link_a.translation.vector, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
}

/// Test: two joints between the same pair of links form a closed chain.
#[test]
fn test_closed_chain_rejected() {
    let doc = load(
        r#"<link name="a"/><link name="b"/>
           <joint name="j1" type="revolute"><parent>a</parent><child>b</child>
             <axis><xyz>1 0 0</xyz></axis></joint>
           <joint name="j2" type="revolute"><parent>a</parent><child>b</child>
             <axis><xyz>0 1 0</xyz></axis></joint>"#,
    );
    let err = canonicalize(&doc, &doc.models[0], None).expect_err("closed chain");
    match &err {
        CanonicalizationError::UnsupportedTopology { elements, .. } => {
            assert!(elements.iter().any(|e| e == "j1"));
            assert!(elements.iter().any(|e| e == "j2"));
        }
        other => panic!("expected UnsupportedTopology, got {other}"),
    }

    let export = export_model(&doc, &doc.models[0], &ExportOptions::default());
    assert!(matches!(export, Err(UrdfError::Kinematics(_))));
}

/// Test: a four-bar linkage is a closed chain too.
#[test]
fn test_four_bar_rejected() {
    let mut body = String::new();
    for link in ["ground", "crank", "coupler", "rocker"] {
        body.push_str(&format!(r#"<link name="{link}"/>"#));
    }
    for (name, parent, child) in [
        ("j1", "ground", "crank"),
        ("j2", "crank", "coupler"),
        ("j3", "coupler", "rocker"),
        ("j4", "ground", "rocker"),
    ] {
        body.push_str(&format!(
            r#"<joint name="{name}" type="revolute"><parent>{parent}</parent><child>{child}</child><axis><xyz>0 0 1</xyz></axis></joint>"#
        ));
    }
    let doc = load(&body);
    let err = canonicalize(&doc, &doc.models[0], None).expect_err("closed chain");
    assert!(err.to_string().contains("closed kinematic chain"));
}

/// Test: a relative_to cycle is caught by the frame graph builder.
#[test]
fn test_pose_cycle_is_graph_error() {
    let sdf = model_sdf(
        r#"<link name="a"><pose relative_to="f">0 0 0 0 0 0</pose></link>
           <frame name="f" attached_to="a"><pose relative_to="g">0 0 0 0 0 0</pose></frame>
           <frame name="g" attached_to="a"><pose relative_to="a">0 0 0 0 0 0</pose></frame>"#,
    );
    let doc = parse_sdf_str(&sdf).expect("decodes");
    let err = canonicalize(&doc, &doc.models[0], None).expect_err("cycle");
    match err {
        CanonicalizationError::Graph(GraphError::Invalid { defects, .. }) => {
            assert!(defects.iter().any(|d| matches!(d, GraphDefect::Cycle { .. })));
        }
        other => panic!("expected a graph cycle, got {other}"),
    }
}

/// Test: an unknown preserved joint fails the export.
#[test]
fn test_unknown_preserved_joint() {
    let doc = load(r#"<link name="solo"/>"#);
    let options = ExportOptions::default().with_preserved_joint("missing");
    let err = export_model(&doc, &doc.models[0], &options).expect_err("unknown joint");
    assert!(matches!(err, UrdfError::UnknownJoint { .. }));
}

/// Test: joint types URDF cannot express fail the whole export.
#[test]
fn test_ball_joint_unsupported() {
    let doc = load(
        r#"<link name="a"/><link name="b"/>
           <joint name="socket" type="ball"><parent>a</parent><child>b</child></joint>"#,
    );
    let err = export_model(&doc, &doc.models[0], &ExportOptions::default()).expect_err("ball");
    assert!(err.to_string().contains("socket"));
}
