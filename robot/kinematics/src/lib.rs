//! Frame graphs, pose resolution and kinematic canonicalization for SDF
//! models.
//!
//! # Pipeline
//!
//! ```text
//! Document ─▶ FrameGraph ─▶ PoseResolver ─▶ KinematicTree
//!             (relative_to    (any frame      (single root,
//!              edges)          to any frame)   directed joints)
//! ```
//!
//! - [`FrameGraph`] turns every pose-owning element into a node with an edge
//!   to the frame its pose is expressed in, collecting every duplicate,
//!   unresolved reference, non-finite pose and cycle.
//! - [`PoseResolver`] computes transforms between any two frames and caches
//!   each frame's transform into `world`.
//! - [`canonicalize`] picks a root, directs every joint away from it and
//!   rejects closed chains.
//! - [`MassProperties`] combines rigid bodies for fixed-joint lumping.
//!
//! # Example
//!
//! ```
//! use robot_kinematics::canonicalize_model;
//! use robot_sdf::{Axis, Joint, JointType, Link, Model, Pose};
//!
//! let model = Model::new("pendulum")
//!     .with_link(Link::new("base"))
//!     .with_link(Link::new("bob").with_pose(Pose::from_xyz(0.0, 0.0, -1.0)))
//!     .with_joint(
//!         Joint::new("hinge", JointType::Revolute, "base", "bob").with_axis(Axis::default()),
//!     );
//!
//! let tree = canonicalize_model(&model, None).expect("tree");
//! assert_eq!(tree.root().name, "base");
//!
//! let resolver = tree.resolver();
//! let t = resolver.resolve_names("bob", "base").expect("resolves");
//! assert!((t.translation.vector.z + 1.0).abs() < 1e-12);
//! ```

#![doc(html_root_url = "https://docs.rs/robot-kinematics/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    clippy::too_many_lines,
    clippy::many_single_char_names
)]

mod canonical;
mod error;
mod graph;
mod mass;
mod resolver;

pub use canonical::{
    KinematicTree, TreeFrame, TreeJoint, TreeLink, canonicalize, canonicalize_model,
};
pub use error::{
    CanonicalizationError, GraphDefect, GraphError, KinematicsError, NumericError, Result,
};
pub use graph::{FrameGraph, FrameId, FrameNode};
pub use mass::{MassProperties, check_inertial, check_pose, parallel_axis};
pub use resolver::PoseResolver;
