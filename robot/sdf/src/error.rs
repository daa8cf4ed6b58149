//! Error types for SDF decoding, encoding and validation.

use std::fmt;

use thiserror::Error;

use crate::validation::ValidationResult;
use crate::xml::XmlError;

/// Errors that can occur while reading, writing or validating SDF documents.
#[derive(Debug, Error)]
pub enum SdfError {
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

    /// Invalid attribute or element value.
    #[error("invalid value for {attribute} on {element}: {message}")]
    InvalidAttribute {
        /// The attribute (or text element) with the invalid value.
        attribute: &'static str,
        /// The element containing the value.
        element: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// Unknown joint type.
    #[error("unknown joint type: {0}")]
    UnknownJointType(String),

    /// The document declares a format version this crate cannot read.
    #[error("unsupported SDF version {found} (supported: 1.7 <= version < 2.0)")]
    UnsupportedVersion {
        /// The version string found on the `<sdf>` element.
        found: String,
    },

    /// The document failed validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdfError {
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

    /// Create an unsupported version error.
    pub fn unsupported_version(found: impl Into<String>) -> Self {
        Self::UnsupportedVersion {
            found: found.into(),
        }
    }
}

impl From<XmlError> for SdfError {
    fn from(err: XmlError) -> Self {
        match err {
            XmlError::Parse(message) => Self::XmlParse(message),
            XmlError::Write(message) => Self::XmlWrite(message),
        }
    }
}

/// A document that failed validation, with every violation that was found.
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// The complete validation outcome.
    pub result: ValidationResult,
}

impl SchemaError {
    /// Wrap a failed validation result.
    #[must_use]
    pub fn new(result: ValidationResult) -> Self {
        Self { result }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "document failed validation with {} error(s)",
            self.result.error_count()
        )?;
        for (path, violations) in self.result.errors() {
            for violation in violations {
                write!(f, "\n  {path}: {violation}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Result type for SDF operations.
pub type Result<T> = std::result::Result<T, SdfError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validation::{Violation, ViolationKind};

    #[test]
    fn test_error_display() {
        let err = SdfError::missing_element("parent", "joint 'elbow'");
        assert!(err.to_string().contains("parent"));
        assert!(err.to_string().contains("elbow"));
    }

    #[test]
    fn test_missing_attribute() {
        let err = SdfError::missing_attribute("name", "link");
        assert!(err.to_string().contains("name"));
        assert!(err.to_string().contains("link"));
    }

    #[test]
    fn test_unsupported_version() {
        let err = SdfError::unsupported_version("1.4");
        assert!(err.to_string().contains("1.4"));
    }

    #[test]
    fn test_xml_error_conversion() {
        let err: SdfError = XmlError::Parse("bad tag".into()).into();
        assert!(matches!(err, SdfError::XmlParse(_)));
        let err: SdfError = XmlError::Write("closed".into()).into();
        assert!(matches!(err, SdfError::XmlWrite(_)));
    }

    #[test]
    fn test_schema_error_lists_paths() {
        let mut result = ValidationResult::default();
        result.push_error(
            "sdf/model[arm]/joint[j1]",
            Violation::new(ViolationKind::Reference, "parent 'ghost' does not resolve"),
        );
        let err = SdfError::from(SchemaError::new(result));
        let text = err.to_string();
        assert!(text.contains("1 error"));
        assert!(text.contains("sdf/model[arm]/joint[j1]"));
        assert!(text.contains("ghost"));
    }
}
