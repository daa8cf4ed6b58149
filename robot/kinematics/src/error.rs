//! Error types for frame-graph construction, pose resolution and
//! canonicalization.

use std::fmt;

use thiserror::Error;

/// A NaN, infinite or out-of-range value where a usable number is required.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid numeric value in {element}: {message}")]
pub struct NumericError {
    /// Scoped name of the offending element.
    pub element: String,
    /// What was not finite.
    pub message: String,
}

impl NumericError {
    /// Create a numeric error.
    pub fn new(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            message: message.into(),
        }
    }
}

/// One problem found while building a frame graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphDefect {
    /// Two pose-owning elements share a scoped name.
    DuplicateName {
        /// The repeated name.
        name: String,
    },
    /// A `relative_to`, `attached_to` or joint child reference does not resolve.
    UnresolvedReference {
        /// Element making the reference.
        element: String,
        /// The name that did not resolve.
        reference: String,
    },
    /// The `relative_to` chain never reaches the root frame.
    Cycle {
        /// Frames on the cycle, in chain order.
        frames: Vec<String>,
    },
    /// A pose with NaN or infinite components.
    NonFinite(NumericError),
}

impl fmt::Display for GraphDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(f, "duplicate frame name '{name}'"),
            Self::UnresolvedReference { element, reference } => {
                write!(f, "{element}: reference '{reference}' does not resolve")
            }
            Self::Cycle { frames } => write!(f, "pose cycle through {}", frames.join(" -> ")),
            Self::NonFinite(err) => err.fmt(f),
        }
    }
}

/// Frame-graph failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The graph could not be built; every defect found is listed.
    #[error("invalid frame graph for '{scope}': {}", join_defects(.defects))]
    Invalid {
        /// Model or world the graph was built for.
        scope: String,
        /// Every defect found.
        defects: Vec<GraphDefect>,
    },

    /// A frame name or id that is not part of the graph.
    #[error("unknown frame '{0}'")]
    UnknownFrame(String),
}

fn join_defects(defects: &[GraphDefect]) -> String {
    defects
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl GraphError {
    /// Create an unknown frame error.
    pub fn unknown_frame(name: impl Into<String>) -> Self {
        Self::UnknownFrame(name.into())
    }
}

/// Failures turning a model into a single-root tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizationError {
    /// Zero or several links qualify as root.
    #[error("ambiguous root in model '{model}': candidates [{}]", .candidates.join(", "))]
    AmbiguousRoot {
        /// Model name.
        model: String,
        /// Links with no incoming joint.
        candidates: Vec<String>,
    },

    /// The joint structure is not a tree (closed chain, disconnected links).
    #[error("unsupported topology in model '{model}': {reason} [{}]", .elements.join(", "))]
    UnsupportedTopology {
        /// Model name.
        model: String,
        /// What is wrong.
        reason: String,
        /// The conflicting links and joints.
        elements: Vec<String>,
    },

    /// The requested root cannot be used.
    #[error("invalid root '{name}' for model '{model}': {reason}")]
    InvalidRoot {
        /// Model name.
        model: String,
        /// Requested root.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The frame graph of the model is invalid.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl CanonicalizationError {
    /// Create an ambiguous root error.
    pub fn ambiguous_root(model: impl Into<String>, candidates: Vec<String>) -> Self {
        Self::AmbiguousRoot {
            model: model.into(),
            candidates,
        }
    }

    /// Create an unsupported topology error.
    pub fn unsupported_topology(
        model: impl Into<String>,
        reason: impl Into<String>,
        elements: Vec<String>,
    ) -> Self {
        Self::UnsupportedTopology {
            model: model.into(),
            reason: reason.into(),
            elements,
        }
    }

    /// Create an invalid root error.
    pub fn invalid_root(
        model: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRoot {
            model: model.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Any kinematics failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KinematicsError {
    /// Frame-graph failure.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Canonicalization failure.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
    /// Numeric failure.
    #[error(transparent)]
    Numeric(#[from] NumericError),
}

/// Result type for kinematics operations.
pub type Result<T> = std::result::Result<T, KinematicsError>;
