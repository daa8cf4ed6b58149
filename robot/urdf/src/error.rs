//! Error types for URDF decoding, encoding and export.

use robot_kinematics::{CanonicalizationError, GraphError, KinematicsError, NumericError};
use robot_sdf::SdfError;
use robot_sdf::xml::XmlError;
use thiserror::Error;

/// Errors that can occur while reading, writing or exporting URDF.
#[derive(Debug, Error)]
pub enum UrdfError {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// XML writing error.
    #[error("XML write error: {0}")]
    XmlWrite(String),

    /// Missing required element.
    #[error("missing required element: {element} in {context}")]
    MissingElement {
        /// The missing element name.
        element: &'static str,
        /// Where the element was expected.
        context: String,
    },

    /// Missing required attribute.
    #[error("missing required attribute: {attribute} on {element}")]
    MissingAttribute {
        /// The missing attribute name.
        attribute: &'static str,
        /// The element that should have the attribute.
        element: String,
    },

    /// Invalid attribute value.
    #[error("invalid value for {attribute} on {element}: {message}")]
    InvalidAttribute {
        /// The attribute with the invalid value.
        attribute: &'static str,
        /// The element containing the attribute.
        element: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// Unknown joint type.
    #[error("unknown joint type: {0}")]
    UnknownJointType(String),

    /// Reference to undefined link.
    #[error("reference to undefined link: {link_name} in joint {joint_name}")]
    UndefinedLink {
        /// The link name that was referenced.
        link_name: String,
        /// The joint that referenced it.
        joint_name: String,
    },

    /// A source joint type URDF cannot express.
    #[error("joint {joint_name} of type {joint_type} cannot be expressed in URDF")]
    UnsupportedJoint {
        /// The joint.
        joint_name: String,
        /// Its source type.
        joint_type: String,
    },

    /// A joint named in the export options does not exist.
    #[error("unknown joint {joint_name} in model {model}")]
    UnknownJoint {
        /// The requested joint.
        joint_name: String,
        /// The exported model.
        model: String,
    },

    /// Duplicate link name.
    #[error("duplicate link name: {0}")]
    DuplicateLink(String),

    /// Duplicate joint name.
    #[error("duplicate joint name: {0}")]
    DuplicateJoint(String),

    /// No root link found.
    #[error("no root link found in robot {0} (every link is a joint child)")]
    NoRootLink(String),

    /// The requested model is not in the document.
    #[error("no model named {0} in document")]
    UnknownModel(String),

    /// The document has no model to export.
    #[error("document contains no model")]
    NoModel,

    /// The source document could not be decoded or failed validation.
    #[error(transparent)]
    Sdf(#[from] SdfError),

    /// Frame-graph or canonicalization failure.
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UrdfError {
    /// Create a missing element error.
    pub fn missing_element(element: &'static str, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            context: context.into(),
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(attribute: &'static str, element: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute,
            element: element.into(),
        }
    }

    /// Create an invalid attribute error.
    pub fn invalid_attribute(
        attribute: &'static str,
        element: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            attribute,
            element: element.into(),
            message: message.into(),
        }
    }

    /// Create an undefined link error.
    pub fn undefined_link(link_name: impl Into<String>, joint_name: impl Into<String>) -> Self {
        Self::UndefinedLink {
            link_name: link_name.into(),
            joint_name: joint_name.into(),
        }
    }

    /// Create an unsupported joint error.
    pub fn unsupported_joint(joint_name: impl Into<String>, joint_type: impl Into<String>) -> Self {
        Self::UnsupportedJoint {
            joint_name: joint_name.into(),
            joint_type: joint_type.into(),
        }
    }

    /// Create an unknown joint error.
    pub fn unknown_joint(joint_name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::UnknownJoint {
            joint_name: joint_name.into(),
            model: model.into(),
        }
    }
}

impl From<XmlError> for UrdfError {
    fn from(err: XmlError) -> Self {
        match err {
            XmlError::Parse(msg) => Self::XmlParse(msg),
            XmlError::Write(msg) => Self::XmlWrite(msg),
        }
    }
}

impl From<GraphError> for UrdfError {
    fn from(err: GraphError) -> Self {
        Self::Kinematics(err.into())
    }
}

impl From<NumericError> for UrdfError {
    fn from(err: NumericError) -> Self {
        Self::Kinematics(err.into())
    }
}

impl From<CanonicalizationError> for UrdfError {
    fn from(err: CanonicalizationError) -> Self {
        Self::Kinematics(err.into())
    }
}

/// Result type for URDF operations.
pub type Result<T> = std::result::Result<T, UrdfError>;
