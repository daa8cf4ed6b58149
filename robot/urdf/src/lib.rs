//! URDF robot description model and SDF-to-URDF export.
//!
//! This crate holds a typed [URDF](http://wiki.ros.org/urdf) model with an
//! XML codec, and converts SDF models into it. Conversion goes through
//! `robot-kinematics`: the model's frame graph is resolved, the links are
//! arranged into a single-root tree, and the tree is written out with
//! parent-relative joint origins.
//!
//! # Features
//!
//! - Parse and write URDF XML, exact round trip
//! - Export any SDF model, with optional fixed-joint lumping
//! - Explicit frames exported as massless links
//! - Import URDF back into an SDF [`Document`]
//!
//! # Example
//!
//! ```
//! use robot_urdf::{ExportOptions, sdf_to_urdf_robot};
//!
//! let sdf = r#"
//!     <sdf version="1.10">
//!         <model name="arm">
//!             <link name="base"/>
//!             <link name="tool">
//!                 <pose>0 0 0.5 0 0 0</pose>
//!             </link>
//!             <joint name="mount" type="fixed">
//!                 <parent>base</parent>
//!                 <child>tool</child>
//!             </joint>
//!         </model>
//!     </sdf>
//! "#;
//!
//! let kept = ExportOptions::default().with_preserve_fixed_joints(true);
//! let robot = sdf_to_urdf_robot(sdf, None, &kept).expect("should export");
//! assert_eq!(robot.joint("mount").expect("kept").origin.xyz.z, 0.5);
//!
//! // With lumping, the tool is merged into the base.
//! let robot = sdf_to_urdf_robot(sdf, None, &ExportOptions::default()).expect("should export");
//! assert_eq!(robot.links.len(), 1);
//! ```
//!
//! # Limitations
//!
//! - Ball, screw, universal, revolute2 and gearbox joints are rejected
//! - Capsule, ellipsoid, plane and heightmap geometry is skipped with a warning
//! - Closed kinematic chains cannot be exported
//! - `<mimic>` and `<transmission>` are not supported

#![doc(html_root_url = "https://docs.rs/robot-urdf/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::should_implement_trait,
    clippy::doc_markdown,
    clippy::too_many_lines,
    clippy::cast_precision_loss
)]

mod error;
mod exporter;
mod importer;
mod parser;
mod types;
mod writer;

pub use error::{Result, UrdfError};
pub use exporter::{
    DEFAULT_EFFORT_VELOCITY, DEFAULT_MATERIAL, DEFAULT_POSITION_LIMIT, ExportOptions, export,
    export_model,
};
pub use importer::{robot_to_model, urdf_to_sdf};
pub use parser::{load_urdf_file, parse_urdf_str};
pub use types::{
    UrdfCollision, UrdfGazebo, UrdfGeometry, UrdfInertia, UrdfInertial, UrdfJoint,
    UrdfJointDynamics, UrdfJointLimit, UrdfJointType, UrdfLink, UrdfMaterial, UrdfOrigin,
    UrdfRobot, UrdfVisual, round_to,
};
pub use writer::{save_urdf_file, write_urdf_string};

use robot_sdf::{Document, Model, load_sdf_validated};
use tracing::warn;

/// Export every model of a document, top-level models first.
///
/// With the `parallel` feature, models are exported on the rayon pool.
/// Results are in document order either way.
///
/// # Errors
///
/// Returns the first error in document order.
pub fn export_document(doc: &Document, options: &ExportOptions) -> Result<Vec<UrdfRobot>> {
    let models: Vec<&Model> = doc.all_models().collect();

    #[cfg(feature = "parallel")]
    {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
        models
            .par_iter()
            .map(|model| export_model(doc, model, options))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        models
            .iter()
            .map(|model| export_model(doc, model, options))
            .collect()
    }
}

/// Pick a model by name, or the first model when `name` is `None`.
///
/// # Errors
///
/// Returns [`UrdfError::UnknownModel`] or [`UrdfError::NoModel`].
pub fn select_model<'d>(doc: &'d Document, name: Option<&str>) -> Result<&'d Model> {
    match name {
        Some(name) => doc
            .model(name)
            .ok_or_else(|| UrdfError::UnknownModel(name.to_string())),
        None => {
            let mut models = doc.all_models();
            let first = models.next().ok_or(UrdfError::NoModel)?;
            let rest = models.count();
            if rest > 0 {
                warn!(model = %first.name, skipped = rest, "document has several models; using the first");
            }
            Ok(first)
        }
    }
}

/// Parse and validate SDF text, then export one model.
///
/// # Errors
///
/// Returns [`UrdfError::Sdf`] if the text does not decode or validate, or
/// any export error.
pub fn sdf_to_urdf_robot(
    sdf_xml: &str,
    model: Option<&str>,
    options: &ExportOptions,
) -> Result<UrdfRobot> {
    let doc = load_sdf_validated(sdf_xml)?;
    export_model(&doc, select_model(&doc, model)?, options)
}

/// Convert SDF text to URDF text.
///
/// # Errors
///
/// See [`sdf_to_urdf_robot`].
pub fn sdf_to_urdf(sdf_xml: &str, model: Option<&str>, options: &ExportOptions) -> Result<String> {
    write_urdf_string(&sdf_to_urdf_robot(sdf_xml, model, options)?, true)
}
