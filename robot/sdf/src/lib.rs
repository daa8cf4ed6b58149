//! SDFormat robot description model.
//!
//! This crate holds the in-memory object model for SDF documents
//! ([SDFormat](http://sdformat.org/spec)), reads and writes it as XML, and
//! validates it.
//!
//! # Features
//!
//! - Typed model: [`Document`], [`World`], [`Model`], [`Link`], [`Joint`],
//!   [`Frame`] and [`Pose`] with explicit `relative_to` frames
//! - Version-aware decoding (`1.7 <= version < 2.0`) with degree and
//!   quaternion pose handling
//! - Exact round-trip encoding
//! - Single-pass validation that reports every violation by element path
//! - Scoped name resolution for nested models (`gripper::palm`)
//! - Primitive builders with analytic inertia
//!
//! # Example
//!
//! ```
//! use robot_sdf::{parse_sdf_str, validate, write_sdf_string};
//!
//! let sdf = r#"
//!     <sdf version="1.10">
//!         <model name="pendulum">
//!             <link name="base"/>
//!             <link name="bob">
//!                 <pose relative_to="base">0 0 -1 0 0 0</pose>
//!             </link>
//!             <joint name="hinge" type="revolute">
//!                 <parent>base</parent>
//!                 <child>bob</child>
//!                 <axis><xyz>0 1 0</xyz></axis>
//!             </joint>
//!         </model>
//!     </sdf>
//! "#;
//!
//! let doc = parse_sdf_str(sdf).expect("should parse");
//! assert!(validate(&doc).is_valid());
//!
//! let text = write_sdf_string(&doc, true).expect("should write");
//! assert_eq!(parse_sdf_str(&text).expect("should reparse"), doc);
//! ```
//!
//! # Frame semantics
//!
//! Every pose names the frame it is expressed in. An empty `relative_to`
//! means the element's default frame:
//!
//! | Element | Default frame |
//! |---------|---------------|
//! | top-level model | `world` |
//! | link, nested model | enclosing model (`__model__`) |
//! | joint | child link |
//! | frame | `attached_to` entity |
//! | inertial, visual, collision | owning link |
//!
//! Resolving these into transforms is the job of `robot-kinematics`.

#![doc(html_root_url = "https://docs.rs/robot-sdf/0.3.0")]
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
    clippy::struct_field_names
)]

mod builder;
mod error;
mod parser;
pub mod scope;
mod types;
mod validation;
mod writer;
pub mod xml;

pub use builder::{BoxBuilder, CylinderBuilder, Primitive, SphereBuilder};
pub use error::{Result, SchemaError, SdfError};
pub use parser::{load_sdf_file, parse_sdf_str};
pub use scope::{EntityKind, NameIndex};
pub use types::{
    Axis, Collision, DEFAULT_VERSION, Document, Dynamics, Frame, Geometry, Inertia, Inertial,
    Joint, JointType, Limit, Link, MODEL_FRAME, Material, MaterialScript, Model, Pose,
    SCOPE_DELIMITER, Visual, WORLD_FRAME, World, scoped_name,
};
pub use validation::{
    InertiaNoisePolicy, ValidationOptions, ValidationResult, Violation, ViolationKind, validate,
    validate_with,
};
pub use writer::{save_sdf_file, write_sdf_string};

/// Parse and validate in one step.
///
/// # Errors
///
/// Returns a decoding error, or [`SdfError::Schema`] carrying every
/// violation if the document is invalid.
pub fn load_sdf_validated(xml: &str) -> Result<Document> {
    let doc = parse_sdf_str(xml)?;
    validate(&doc).into_result()?;
    Ok(doc)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_validated_reports_schema_errors() {
        let sdf = r#"<sdf version="1.9">
            <model name="m">
                <link name="a"/>
                <joint name="j" type="revolute"><parent>a</parent><child>b</child></joint>
            </model>
        </sdf>"#;
        let err = load_sdf_validated(sdf).unwrap_err();
        let SdfError::Schema(schema) = &err else {
            panic!("expected schema error, got {err}");
        };
        // Unresolved child and missing axis, both on the joint.
        assert_eq!(schema.result.error_count(), 2);
        assert!(err.to_string().contains("sdf/model[m]/joint[j]"));
    }

    #[test]
    fn test_load_validated_accepts_valid_document() {
        let sdf = r#"<sdf version="1.7"><model name="m"><link name="a"/></model></sdf>"#;
        assert_eq!(load_sdf_validated(sdf).unwrap().models[0].links.len(), 1);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.sdf");

        let doc = Document::default().with_model(BoxBuilder::new("box", 1.0, 1.0, 1.0, 1.0).model(None));
        save_sdf_file(&doc, &path).unwrap();
        assert_eq!(load_sdf_file(&path).unwrap(), doc);
    }
}
