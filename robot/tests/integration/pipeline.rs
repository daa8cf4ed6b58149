//! SDF → URDF pipeline tests.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use robot_conformance_tests::{CHAIN_SDF, chain_with_fixed_tip};
use robot_kinematics::{FrameGraph, PoseResolver, canonicalize};
use robot_sdf::{SdfError, load_sdf_validated, parse_sdf_str, validate};
use robot_urdf::{
    ExportOptions, UrdfJointType, export_document, export_model, parse_urdf_str, sdf_to_urdf,
    sdf_to_urdf_robot, write_urdf_string,
};

/// Test: the three-link chain keeps its parent-relative origins.
#[test]
fn test_three_link_chain_origins() {
    let options = ExportOptions::default().with_preserve_fixed_joints(true);
    let robot = sdf_to_urdf_robot(CHAIN_SDF, None, &options).expect("should export");

    assert_eq!(robot.name, "chain");
    assert_eq!(robot.links.len(), 3);
    assert_eq!(robot.joints.len(), 2);

    for (name, parent, child) in [("joint1", "base", "link1"), ("joint2", "link1", "link2")] {
        let joint = robot.joint(name).expect("joint exists");
        assert_eq!(joint.parent, parent);
        assert_eq!(joint.child, child);
        assert_eq!(joint.joint_type, UrdfJointType::Revolute);
        assert_eq!(joint.origin.xyz, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(joint.origin.rpy, Vector3::zeros());
    }
}

/// Test: a welded tip is lumped into its parent.
#[test]
fn test_fixed_tip_lumped() {
    let sdf = chain_with_fixed_tip();
    let robot = sdf_to_urdf_robot(&sdf, None, &ExportOptions::default()).expect("should export");

    assert!(robot.link("link3").is_none());
    assert!(robot.joint("tip_weld").is_none());
    assert_eq!(robot.links.len(), 3);

    let inertial = robot
        .link("link2")
        .and_then(|l| l.inertial)
        .expect("link2 keeps an inertial");
    assert_relative_eq!(inertial.mass, 3.0);
    // (2 * 0 + 1 * 0.5) / 3
    assert_relative_eq!(
        inertial.origin.xyz,
        Vector3::new(0.0, 0.0, 0.5 / 3.0),
        epsilon = 1e-12
    );
    assert_relative_eq!(inertial.inertia.izz, 0.11, epsilon = 1e-12);
    // 0.1 + 2 (1/6)^2 + 0.01 + 1 (1/3)^2
    let expected = 0.1 + 2.0 / 36.0 + 0.01 + 1.0 / 9.0;
    assert_relative_eq!(inertial.inertia.ixx, expected, epsilon = 1e-12);
    assert_relative_eq!(robot.total_mass(), 3.0);
}

/// Test: the same tip is kept and tagged when preserved.
#[test]
fn test_fixed_tip_preserved() {
    let sdf = chain_with_fixed_tip();
    let options = ExportOptions::default().with_preserved_joint("tip_weld");
    let robot = sdf_to_urdf_robot(&sdf, None, &options).expect("should export");

    let weld = robot.joint("tip_weld").expect("weld kept");
    assert_eq!(weld.joint_type, UrdfJointType::Fixed);
    assert_eq!(weld.origin.xyz, Vector3::new(0.0, 0.0, 0.5));
    assert_eq!(robot.gazebo.len(), 1);
    assert_eq!(robot.gazebo[0].reference, "tip_weld");

    let text = write_urdf_string(&robot, true).expect("should write");
    assert!(text.contains("<preserveFixedJoint>true</preserveFixedJoint>"));
    assert_eq!(parse_urdf_str(&text).expect("should reparse"), robot);
}

/// Test: a nested model is flattened under scoped names.
#[test]
fn test_nested_model_export() {
    let sdf = r#"
        <sdf version="1.9">
          <model name="robot">
            <link name="arm"/>
            <model name="gripper">
              <pose>0 0 0.8 0 0 0</pose>
              <link name="palm"/>
              <link name="finger">
                <pose relative_to="palm">0.05 0 0.1 0 0 0</pose>
              </link>
              <joint name="slide" type="prismatic">
                <parent>palm</parent>
                <child>finger</child>
                <axis><xyz>1 0 0</xyz><limit><lower>0</lower><upper>0.04</upper></limit></axis>
              </joint>
            </model>
            <joint name="wrist" type="revolute">
              <parent>arm</parent>
              <child>gripper::palm</child>
              <axis><xyz>0 0 1</xyz></axis>
            </joint>
          </model>
        </sdf>"#;
    let robot = sdf_to_urdf_robot(sdf, None, &ExportOptions::default()).expect("should export");

    let wrist = robot.joint("wrist").expect("wrist");
    assert_eq!(wrist.child, "gripper::palm");
    assert_relative_eq!(wrist.origin.xyz, Vector3::new(0.0, 0.0, 0.8), epsilon = 1e-12);

    let slide = robot.joint("gripper::slide").expect("nested joint");
    assert_eq!(slide.parent, "gripper::palm");
    assert_relative_eq!(slide.origin.xyz, Vector3::new(0.05, 0.0, 0.1), epsilon = 1e-12);
    let limit = slide.limit.expect("limit");
    assert_eq!((limit.lower, limit.upper), (0.0, 0.04));
    // Revolute joint without a limit gets the unbounded defaults.
    assert_eq!(
        wrist.limit.expect("limit").upper,
        robot_urdf::DEFAULT_POSITION_LIMIT
    );
}

/// Test: models inside a world can be posed relative to world frames.
#[test]
fn test_world_models() {
    let sdf = r#"
        <sdf version="1.10">
          <world name="lab">
            <frame name="table">
              <pose>1 0 0.7 0 0 0</pose>
            </frame>
            <model name="bin">
              <pose relative_to="table">0 0 0.1 0 0 0</pose>
              <link name="body"/>
            </model>
            <model name="arm">
              <link name="base"/>
              <link name="tool"><pose>0 0 0.4 0 0 0</pose></link>
              <joint name="mount" type="fixed">
                <parent>world</parent>
                <child>base</child>
              </joint>
              <joint name="wrist" type="continuous">
                <parent>base</parent>
                <child>tool</child>
                <axis><xyz>0 0 1</xyz></axis>
              </joint>
            </model>
          </world>
        </sdf>"#;
    let doc = load_sdf_validated(sdf).expect("valid");

    let bin = doc.model("bin").expect("bin");
    let graph = FrameGraph::build(&doc, bin).expect("graph");
    let resolver = PoseResolver::new(&graph);
    let body = resolver
        .resolve_names("bin::body", "world")
        .expect("resolves");
    assert_relative_eq!(body.translation.vector, Vector3::new(1.0, 0.0, 0.8), epsilon = 1e-12);
    assert!(graph.frame("table").is_some());

    let robots = export_document(&doc, &ExportOptions::default()).expect("exports");
    assert_eq!(robots.len(), 2);
    let arm = &robots[1];
    assert_eq!(arm.root_link().expect("root").name, "world");
    assert!(arm.joint("mount").is_some());
    let wrist = arm.joint("wrist").expect("wrist");
    assert_eq!(wrist.joint_type, UrdfJointType::Continuous);
    assert_relative_eq!(wrist.origin.xyz, Vector3::new(0.0, 0.0, 0.4), epsilon = 1e-12);
}

/// Test: the same document exports differently with different options.
#[test]
fn test_repeated_export_with_options() {
    let doc = parse_sdf_str(&chain_with_fixed_tip()).expect("parses");
    let before = doc.clone();
    let model = &doc.models[0];

    let lumped = export_model(&doc, model, &ExportOptions::default()).expect("lumped");
    let kept = export_model(
        &doc,
        model,
        &ExportOptions::default().with_preserve_fixed_joints(true),
    )
    .expect("kept");

    assert_eq!(lumped.links.len(), 3);
    assert_eq!(kept.links.len(), 4);
    assert_relative_eq!(lumped.total_mass(), kept.total_mass());
    assert_eq!(doc, before);
}

/// Test: validation reports every defect with its element path.
#[test]
fn test_validation_collects_everything() {
    let sdf = r#"
        <sdf version="1.10">
          <model name="bad">
            <link name="a">
              <pose relative_to="nowhere">0 0 0 0 0 0</pose>
              <inertial><mass>-1</mass></inertial>
            </link>
            <link name="a"/>
            <joint name="j" type="revolute">
              <parent>a</parent>
              <child>ghost</child>
            </joint>
          </model>
        </sdf>"#;
    let doc = parse_sdf_str(sdf).expect("decodes");
    let report = validate(&doc);
    assert!(!report.is_valid());
    assert!(report.error_count() >= 4, "{:?}", report.errors());

    let err = load_sdf_validated(sdf).expect_err("invalid");
    assert!(matches!(err, SdfError::Schema(_)));
    let message = sdf_to_urdf(sdf, None, &ExportOptions::default())
        .expect_err("invalid")
        .to_string();
    assert!(message.contains("bad"));
}

/// Test: unsupported format versions are rejected on decode.
#[test]
fn test_version_rejected() {
    let err = parse_sdf_str(r#"<sdf version="1.4"><model name="m"><link name="l"/></model></sdf>"#)
        .expect_err("old version");
    assert!(matches!(err, SdfError::UnsupportedVersion { .. }));
}

/// Test: canonicalization errors surface through the exporter unchanged.
#[test]
fn test_canonicalization_errors_propagate() {
    let sdf = CHAIN_SDF.replace("<link name=\"base\"/>", "<link name=\"base\"/><link name=\"spare\"/>");
    let doc = load_sdf_validated(&sdf).expect("valid");
    assert!(canonicalize(&doc, &doc.models[0], None).is_err());
    let err = sdf_to_urdf(&sdf, None, &ExportOptions::default()).expect_err("ambiguous");
    let message = err.to_string();
    assert!(message.contains("base"));
    assert!(message.contains("spare"));

    let rooted = ExportOptions::default().with_root_hint("base");
    let err = sdf_to_urdf(&sdf, None, &rooted).expect_err("spare is disconnected");
    assert!(err.to_string().contains("spare"));
}

/// Test: a frame whose synthesized joint name is already taken gets a fresh
/// one, and the output reparses.
#[test]
fn test_frame_joint_name_clash() {
    let sdf = r#"
        <sdf version="1.10">
          <model name="rig">
            <link name="base"/>
            <link name="cam_body"><pose>0 0 0.2 0 0 0</pose></link>
            <joint name="base_to_cam" type="revolute">
              <parent>base</parent>
              <child>cam_body</child>
              <axis><xyz>0 0 1</xyz></axis>
            </joint>
            <frame name="cam" attached_to="base">
              <pose>0.1 0 0 0 0 0</pose>
            </frame>
          </model>
        </sdf>"#;
    assert!(validate(&parse_sdf_str(sdf).expect("decodes")).is_valid());

    let robot = sdf_to_urdf_robot(sdf, None, &ExportOptions::default()).expect("exports");
    let mut names: Vec<&str> = robot.joint_names().collect();
    names.sort_unstable();
    assert_eq!(names, ["base_to_cam", "base_to_cam_1"]);
    assert_eq!(robot.joint("base_to_cam").expect("joint").child, "cam_body");
    let frame_joint = robot.joint("base_to_cam_1").expect("frame joint");
    assert_eq!(frame_joint.child, "cam");
    assert_relative_eq!(frame_joint.origin.xyz, Vector3::new(0.1, 0.0, 0.0), epsilon = 1e-12);

    let text = write_urdf_string(&robot, true).expect("writes");
    assert_eq!(parse_urdf_str(&text).expect("reparses"), robot);
}
