//! Shared fixtures for the conformance tests.

#![allow(clippy::missing_panics_doc)]

use nalgebra::Vector3;
use robot_sdf::{Axis, Inertia, Inertial, Joint, JointType, Limit, Link, Model, Pose};

/// Three links stacked one meter apart, each posed relative to the previous
/// one and connected by revolute joints.
pub const CHAIN_SDF: &str = r#"<?xml version="1.0"?>
<sdf version="1.10">
  <model name="chain">
    <link name="base"/>
    <link name="link1">
      <pose relative_to="base">0 0 1 0 0 0</pose>
    </link>
    <link name="link2">
      <pose relative_to="link1">0 0 1 0 0 0</pose>
      <inertial>
        <mass>2</mass>
        <inertia>
          <ixx>0.1</ixx><ixy>0</ixy><ixz>0</ixz>
          <iyy>0.1</iyy><iyz>0</iyz><izz>0.1</izz>
        </inertia>
      </inertial>
    </link>
    <joint name="joint1" type="revolute">
      <parent>base</parent>
      <child>link1</child>
      <axis><xyz>0 0 1</xyz><limit><lower>-1.57</lower><upper>1.57</upper></limit></axis>
    </joint>
    <joint name="joint2" type="revolute">
      <parent>link1</parent>
      <child>link2</child>
      <axis><xyz>0 1 0</xyz><limit><lower>-1</lower><upper>1</upper></limit></axis>
    </joint>
  </model>
</sdf>
"#;

/// [`CHAIN_SDF`] with `link3` (mass 1, 0.5 above `link2`) welded to `link2`.
#[must_use]
pub fn chain_with_fixed_tip() -> String {
    CHAIN_SDF.replace(
        "  </model>",
        r#"    <link name="link3">
      <pose relative_to="link2">0 0 0.5 0 0 0</pose>
      <inertial>
        <mass>1</mass>
        <inertia>
          <ixx>0.01</ixx><ixy>0</ixy><ixz>0</ixz>
          <iyy>0.01</iyy><iyz>0</iyz><izz>0.01</izz>
        </inertia>
      </inertial>
    </link>
    <joint name="tip_weld" type="fixed">
      <parent>link2</parent>
      <child>link3</child>
    </joint>
  </model>"#,
    )
}

/// A link with a point-like inertial of `mass` at its origin.
#[must_use]
pub fn massive_link(name: &str, mass: f64, pose: Pose) -> Link {
    let inertia = if mass > 0.0 {
        Inertia::diagonal(0.01 * mass, 0.01 * mass, 0.01 * mass)
    } else {
        Inertia::zero()
    };
    Link::new(name)
        .with_pose(pose)
        .with_inertial(Inertial::new(mass, inertia))
}

/// A revolute joint about `axis` with symmetric limits.
#[must_use]
pub fn hinge(name: &str, parent: &str, child: &str, axis: Vector3<f64>) -> Joint {
    Joint::new(name, JointType::Revolute, parent, child)
        .with_axis(Axis::new(axis).with_limit(Limit::new(-1.0, 1.0)))
}

/// A serial chain `l0 .. l{n}` whose links carry `masses` and sit at
/// `offsets` from the model origin. Joint `k` connects `l{k}` to `l{k+1}`
/// and is fixed when `fixed[k]` is set.
#[must_use]
pub fn serial_chain(masses: &[f64], offsets: &[Vector3<f64>], fixed: &[bool]) -> Model {
    let mut model = Model::new("serial");
    for (i, (mass, offset)) in masses.iter().zip(offsets).enumerate() {
        model = model.with_link(massive_link(
            &format!("l{i}"),
            *mass,
            Pose::new(*offset, Vector3::zeros()),
        ));
    }
    for (k, is_fixed) in fixed.iter().enumerate().take(masses.len().saturating_sub(1)) {
        let parent = format!("l{k}");
        let child = format!("l{}", k + 1);
        let joint = if *is_fixed {
            Joint::new(format!("j{k}"), JointType::Fixed, parent, child)
        } else {
            hinge(&format!("j{k}"), &parent, &child, Vector3::z())
        };
        model = model.with_joint(joint);
    }
    model
}
