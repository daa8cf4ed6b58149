//! End-to-end tests of the `robot-desc` binary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::{Command, Output};

const ARM: &str = r#"<?xml version="1.0"?>
<sdf version="1.10">
  <model name="arm">
    <link name="base"/>
    <link name="upper">
      <pose>0 0 0.5 0 0 0</pose>
      <inertial><mass>2</mass></inertial>
    </link>
    <link name="flange">
      <pose relative_to="upper">0 0 0.4 0 0 0</pose>
    </link>
    <joint name="shoulder" type="revolute">
      <parent>base</parent>
      <child>upper</child>
      <axis><xyz>0 1 0</xyz><limit><lower>-1</lower><upper>1</upper></limit></axis>
    </joint>
    <joint name="bolt" type="fixed">
      <parent>upper</parent>
      <child>flange</child>
    </joint>
    <frame name="tcp" attached_to="flange">
      <pose>0 0 0.1 0 0 0</pose>
    </frame>
  </model>
</sdf>
"#;

fn robot_desc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_robot-desc"))
        .args(args)
        .env_remove("ROBOT_DESC_LOG")
        .output()
        .expect("binary should run")
}

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn show_is_default() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "arm.sdf", ARM);
    let out = robot_desc(&["-f", &input]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("model arm (root base)"));
    assert!(stdout.contains("link flange xyz [0.000000 0.000000 0.900000]"));
    assert!(stdout.contains("frame tcp on flange"));
}

#[test]
fn converts_to_urdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "arm.sdf", ARM);
    let output = dir.path().join("arm.urdf");
    let out = robot_desc(&["-f", &input, "-o", output.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    // No --show: nothing on stdout.
    assert!(out.stdout.is_empty());

    let robot = robot_urdf::load_urdf_file(&output).unwrap();
    assert!(robot.joint("bolt").is_none());
    assert!(robot.link("flange").is_none());
    let tcp = robot.joint("upper_to_tcp").unwrap();
    assert!((tcp.origin.xyz.z - 0.5).abs() < 1e-12);
}

#[test]
fn keeps_fixed_joints_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "arm.sdf", ARM);
    let output = dir.path().join("arm.urdf");
    let out = robot_desc(&[
        "-f",
        &input,
        "-o",
        output.to_str().unwrap(),
        "--keep-fixed",
        "bolt",
        "--no-frames",
    ]);
    assert!(out.status.success());
    let robot = robot_urdf::load_urdf_file(&output).unwrap();
    assert!(robot.joint("bolt").is_some());
    assert!(robot.link("tcp").is_none());
    assert_eq!(robot.gazebo.len(), 1);
}

#[test]
fn unknown_kept_joint_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "arm.sdf", ARM);
    let output = dir.path().join("arm.urdf");
    let out = robot_desc(&["-f", &input, "-o", output.to_str().unwrap(), "--keep-fixed", "nope"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope"));
    assert!(!output.exists());
}

#[test]
fn validation_errors_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let broken = ARM.replace(r#"relative_to="upper""#, r#"relative_to="elbow""#);
    let input = write(dir.path(), "broken.sdf", &broken);
    let out = robot_desc(&["-f", &input]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("elbow"));
    assert!(stderr.contains("failed validation"));
    assert!(out.stdout.is_empty());
}

#[test]
fn urdf_input_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "arm.sdf", ARM);
    let urdf = dir.path().join("arm.urdf");
    let sdf = dir.path().join("back.sdf");
    assert!(robot_desc(&["-f", &input, "-o", urdf.to_str().unwrap()]).status.success());
    let out = robot_desc(&["-f", urdf.to_str().unwrap(), "-o", sdf.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let doc = robot_sdf::load_sdf_file(&sdf).unwrap();
    let model = doc.model("arm").unwrap();
    assert!(model.link("upper").is_some());
    assert!(model.joint("shoulder").is_some());
}

#[test]
fn unknown_output_extension() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "arm.sdf", ARM);
    let out = robot_desc(&["-f", &input, "-o", "arm.xml"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains(".urdf or .sdf"));
}
