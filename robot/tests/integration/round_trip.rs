//! Encode/decode and export/import round trips.

use approx::assert_relative_eq;
use robot_conformance_tests::{CHAIN_SDF, chain_with_fixed_tip};
use robot_kinematics::canonicalize;
use robot_sdf::{Document, load_sdf_file, parse_sdf_str, save_sdf_file, write_sdf_string};
use robot_urdf::{
    ExportOptions, UrdfRobot, export_model, load_urdf_file, parse_urdf_str, save_urdf_file,
    urdf_to_sdf, write_urdf_string,
};

/// A model that uses frames, rotations and non-parent `relative_to` poses.
const TWISTED: &str = r#"<?xml version="1.0"?>
<sdf version="1.10">
  <model name="twisted">
    <link name="base">
      <visual name="plate">
        <pose>0 0 0.01 0 0 0</pose>
        <geometry><box><size>0.3 0.3 0.02</size></box></geometry>
        <material><diffuse>0.2 0.2 0.2 1</diffuse></material>
      </visual>
    </link>
    <frame name="shoulder_mount" attached_to="base">
      <pose>0.1 0 0.2 0 0.3 0.5</pose>
    </frame>
    <link name="upper">
      <pose relative_to="shoulder_mount">0 0 0.3 0.1 0 0</pose>
      <inertial>
        <pose>0 0 0.15 0 0 0</pose>
        <mass>1.5</mass>
        <inertia>
          <ixx>0.02</ixx><ixy>0</ixy><ixz>0</ixz>
          <iyy>0.02</iyy><iyz>0</iyz><izz>0.005</izz>
        </inertia>
      </inertial>
      <collision name="shell">
        <pose>0 0 0.15 0 0 0</pose>
        <geometry><cylinder><radius>0.04</radius><length>0.3</length></cylinder></geometry>
      </collision>
    </link>
    <link name="fore">
      <pose relative_to="upper">0.02 0 0.3 0 -0.4 0</pose>
    </link>
    <joint name="shoulder" type="revolute">
      <pose relative_to="shoulder_mount">0 0 0 0 0 0</pose>
      <parent>base</parent>
      <child>upper</child>
      <axis>
        <xyz expressed_in="shoulder_mount">0 1 0</xyz>
        <limit><lower>-2</lower><upper>2</upper><effort>40</effort><velocity>3</velocity></limit>
        <dynamics><damping>0.3</damping><friction>0.05</friction></dynamics>
      </axis>
    </joint>
    <joint name="elbow" type="revolute">
      <parent>upper</parent>
      <child>fore</child>
      <axis><xyz>0 1 0</xyz><limit><lower>0</lower><upper>2.5</upper></limit></axis>
    </joint>
  </model>
</sdf>
"#;

fn sources() -> Vec<String> {
    vec![CHAIN_SDF.to_string(), chain_with_fixed_tip(), TWISTED.to_string()]
}

/// Test: SDF decode(encode(doc)) == doc, pretty and compact.
#[test]
fn test_sdf_codec_round_trip() {
    for source in sources() {
        let doc = parse_sdf_str(&source).expect("parses");
        for pretty in [true, false] {
            let text = write_sdf_string(&doc, pretty).expect("writes");
            assert_eq!(parse_sdf_str(&text).expect("reparses"), doc);
        }
    }
}

/// Test: SDF files round trip through disk.
#[test]
fn test_sdf_file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("twisted.sdf");
    let doc = parse_sdf_str(TWISTED).expect("parses");
    save_sdf_file(&doc, &path).expect("saves");
    assert_eq!(load_sdf_file(&path).expect("loads"), doc);
}

fn export_first(doc: &Document, options: &ExportOptions) -> UrdfRobot {
    export_model(doc, &doc.models[0], options).expect("exports")
}

fn assert_equivalent(a: &UrdfRobot, b: &UrdfRobot) {
    let names = |r: &UrdfRobot| {
        let mut links: Vec<String> = r.link_names().map(String::from).collect();
        let mut joints: Vec<String> = r.joint_names().map(String::from).collect();
        links.sort();
        joints.sort();
        (links, joints)
    };
    assert_eq!(names(a), names(b));

    for joint in &a.joints {
        let other = b.joint(&joint.name).expect("same joints");
        assert_eq!(joint.parent, other.parent);
        assert_eq!(joint.child, other.child);
        assert_eq!(joint.joint_type, other.joint_type);
        let (x, y) = (joint.origin.to_isometry(), other.origin.to_isometry());
        assert_relative_eq!(x.translation.vector, y.translation.vector, epsilon = 1e-9);
        assert!(x.rotation.angle_to(&y.rotation) < 1e-9);
        assert_relative_eq!(joint.axis, other.axis, epsilon = 1e-9);
        assert_eq!(joint.limit, other.limit);
    }
    for link in &a.links {
        let other = b.link(&link.name).expect("same links");
        assert_relative_eq!(link.mass(), other.mass(), epsilon = 1e-12);
        assert_eq!(link.visuals.len(), other.visuals.len());
        assert_eq!(link.collisions.len(), other.collisions.len());
    }
}

/// Test: export → URDF text → import → canonicalize → export is stable.
#[test]
fn test_export_import_export() {
    for source in sources() {
        let doc = parse_sdf_str(&source).expect("parses");
        // Frame links come back as real links behind fixed joints, so they
        // only survive a second export when fixed joints are kept.
        for options in [
            ExportOptions::default().with_frames_as_links(false),
            ExportOptions::default().with_preserve_fixed_joints(true),
        ] {
            let first = export_first(&doc, &options);
            let text = write_urdf_string(&first, true).expect("writes URDF");
            let reparsed = parse_urdf_str(&text).expect("parses URDF");
            assert_eq!(reparsed, first);

            let imported = urdf_to_sdf(&reparsed).expect("imports");
            let sdf_text = write_sdf_string(&imported, true).expect("writes SDF");
            let imported = parse_sdf_str(&sdf_text).expect("parses SDF");
            let tree = canonicalize(&imported, &imported.models[0], None).expect("canonical");
            assert_eq!(tree.root().name, first.root_link().expect("root").name);

            let second = export_first(&imported, &options);
            assert_equivalent(&first, &second);
        }
    }
}

/// Test: the twisted model keeps its world-space geometry through export.
#[test]
fn test_twisted_export_matches_world_poses() {
    let doc = parse_sdf_str(TWISTED).expect("parses");
    let model = &doc.models[0];
    let tree = canonicalize(&doc, model, None).expect("canonical");
    let resolver = tree.resolver();
    let robot = export_first(&doc, &ExportOptions::default());

    // Chain the exported origins and compare with the resolved joint frame.
    let shoulder = robot.joint("shoulder").expect("shoulder").origin.to_isometry();
    let elbow = robot.joint("elbow").expect("elbow").origin.to_isometry();
    let resolved = resolver.resolve_names("elbow", "base").expect("resolves");
    let chained = shoulder * elbow;
    assert_relative_eq!(
        chained.translation.vector,
        resolved.translation.vector,
        epsilon = 1e-9
    );
    assert!(chained.rotation.angle_to(&resolved.rotation) < 1e-9);

    // The axis was given in the mount frame, which coincides with the joint.
    let axis = robot.joint("shoulder").expect("shoulder").axis;
    assert_relative_eq!(axis, nalgebra::Vector3::y(), epsilon = 1e-9);

    let upper = robot.link("upper").expect("upper");
    let inertial = upper.inertial.expect("inertial");
    let upper_in_joint = resolver.resolve_names("upper", "shoulder").expect("resolves");
    let expected = upper_in_joint * nalgebra::Point3::new(0.0, 0.0, 0.15);
    assert_relative_eq!(inertial.origin.xyz, expected.coords, epsilon = 1e-9);
    assert_eq!(robot.material("base_plate").and_then(|m| m.color).map(|c| c.x), Some(0.2));
}

/// Test: URDF files round trip through disk.
#[test]
fn test_urdf_file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("twisted.urdf");
    let doc = parse_sdf_str(TWISTED).expect("parses");
    let robot = export_first(&doc, &ExportOptions::default().with_pose_precision(9));
    save_urdf_file(&robot, &path).expect("saves");
    assert_eq!(load_urdf_file(&path).expect("loads"), robot);
}
