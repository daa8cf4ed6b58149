//! Structural and numeric validation of SDF documents.
//!
//! Validation is a single pass over the document that records every
//! violation instead of stopping at the first one. Violations are keyed by
//! element path, e.g. `sdf/model[arm]/link[base]/inertial`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::error::SchemaError;
use crate::scope::{EntityKind, NameIndex, is_reserved_name};
use crate::types::{
    Axis, Document, Frame, Geometry, Inertial, Joint, Link, Model, Pose, WORLD_FRAME, World,
    scoped_name,
};

// ============================================================================
// Options
// ============================================================================

/// How to treat small but non-zero off-diagonal inertia entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InertiaNoisePolicy {
    /// Accept silently.
    #[default]
    Allow,
    /// Record a warning.
    Warn,
    /// Record an error.
    Reject,
}

/// Opt-in checks on top of the structural rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOptions {
    /// Warn about links with non-zero mass and an all-zero inertia tensor.
    pub warn_zero_inertia: bool,
    /// Policy for off-diagonal entries with `0 < |v| <= noise_tolerance`.
    pub inertia_noise: InertiaNoisePolicy,
    /// Magnitude below which an off-diagonal entry counts as noise.
    pub noise_tolerance: f64,
    /// Warn when principal moments violate the triangle inequality.
    pub check_triangle_inequality: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            warn_zero_inertia: false,
            inertia_noise: InertiaNoisePolicy::Allow,
            noise_tolerance: 1e-9,
            check_triangle_inequality: false,
        }
    }
}

impl ValidationOptions {
    /// Enable every soft check, reporting noise as warnings.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            warn_zero_inertia: true,
            inertia_noise: InertiaNoisePolicy::Warn,
            check_triangle_inequality: true,
            ..Default::default()
        }
    }

    /// Toggle the zero-inertia warning.
    #[must_use]
    pub fn with_zero_inertia_warning(mut self, enabled: bool) -> Self {
        self.warn_zero_inertia = enabled;
        self
    }

    /// Set the off-diagonal noise policy and tolerance.
    #[must_use]
    pub fn with_inertia_noise(mut self, policy: InertiaNoisePolicy, tolerance: f64) -> Self {
        self.inertia_noise = policy;
        self.noise_tolerance = tolerance;
        self
    }

    /// Toggle the triangle-inequality check.
    #[must_use]
    pub fn with_triangle_inequality(mut self, enabled: bool) -> Self {
        self.check_triangle_inequality = enabled;
        self
    }
}

// ============================================================================
// Result
// ============================================================================

/// Category of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Empty, reserved or duplicate name.
    Name,
    /// A reference that does not resolve, or resolves to the wrong kind.
    Reference,
    /// A required element is absent.
    MissingElement,
    /// A value outside its allowed range.
    Range,
    /// A NaN or infinite value.
    NonFinite,
    /// Soft inertia diagnostics.
    Inertia,
}

impl ViolationKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Reference => "reference",
            Self::MissingElement => "missing element",
            Self::Range => "range",
            Self::NonFinite => "non-finite",
            Self::Inertia => "inertia",
        }
    }
}

/// One violation at an element path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Category.
    pub kind: ViolationKind,
    /// Human-readable reason.
    pub message: String,
}

impl Violation {
    /// Create a violation.
    #[must_use]
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

/// Every error and warning found in a document, keyed by element path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: BTreeMap<String, Vec<Violation>>,
    warnings: BTreeMap<String, Vec<Violation>>,
}

impl ValidationResult {
    /// True if no errors were recorded. Warnings do not count.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Total number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    /// Errors by element path.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, Vec<Violation>> {
        &self.errors
    }

    /// Warnings by element path.
    #[must_use]
    pub fn warnings(&self) -> &BTreeMap<String, Vec<Violation>> {
        &self.warnings
    }

    /// Errors recorded at one path.
    #[must_use]
    pub fn errors_at(&self, path: &str) -> &[Violation] {
        self.errors.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    /// Record an error.
    pub fn push_error(&mut self, path: impl Into<String>, violation: Violation) {
        self.errors.entry(path.into()).or_default().push(violation);
    }

    /// Record a warning.
    pub fn push_warning(&mut self, path: impl Into<String>, violation: Violation) {
        self.warnings.entry(path.into()).or_default().push(violation);
    }

    /// `Ok(self)` when valid, otherwise a [`SchemaError`] carrying every error.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if any error was recorded.
    pub fn into_result(self) -> Result<Self, SchemaError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(SchemaError::new(self))
        }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Validate a document with the default options.
#[must_use]
pub fn validate(doc: &Document) -> ValidationResult {
    validate_with(doc, &ValidationOptions::default())
}

/// Validate a document.
#[must_use]
pub fn validate_with(doc: &Document, options: &ValidationOptions) -> ValidationResult {
    let mut validator = Validator {
        options,
        result: ValidationResult::default(),
    };

    if doc.models.is_empty() && doc.worlds.is_empty() {
        validator.error(
            "sdf",
            ViolationKind::MissingElement,
            "document contains no model or world",
        );
    }
    for world in &doc.worlds {
        validator.check_world(world);
    }
    for model in &doc.models {
        let index = NameIndex::for_model(model);
        let path = format!("sdf/model[{}]", model.name);
        validator.check_model(model, &path, &index, "", None);
    }

    debug!(
        errors = validator.result.error_count(),
        warnings = validator.result.warning_count(),
        "validated SDF document"
    );
    validator.result
}

// ============================================================================
// Validator
// ============================================================================

struct Validator<'a> {
    options: &'a ValidationOptions,
    result: ValidationResult,
}

impl Validator<'_> {
    fn error(&mut self, path: &str, kind: ViolationKind, message: impl Into<String>) {
        self.result.push_error(path, Violation::new(kind, message));
    }

    fn warning(&mut self, path: &str, kind: ViolationKind, message: impl Into<String>) {
        self.result.push_warning(path, Violation::new(kind, message));
    }

    fn check_name(&mut self, path: &str, element: &str, name: &str) {
        if name.is_empty() {
            self.error(path, ViolationKind::Name, format!("{element} has an empty name"));
        } else if is_reserved_name(name) {
            self.error(
                path,
                ViolationKind::Name,
                format!("{element} name '{name}' is reserved"),
            );
        }
    }

    fn check_world(&mut self, world: &World) {
        let path = format!("sdf/world[{}]", world.name);
        if world.name.is_empty() {
            self.error(&path, ViolationKind::Name, "world has an empty name");
        }
        if let Some(gravity) = &world.gravity {
            if !gravity.iter().all(|v| v.is_finite()) {
                self.error(&path, ViolationKind::NonFinite, "gravity is not finite");
            }
        }

        let mut seen: HashMap<&str, &str> = HashMap::new();
        let declared = world
            .frames
            .iter()
            .map(|f| (f.name.as_str(), "frame"))
            .chain(world.models.iter().map(|m| (m.name.as_str(), "model")));
        for (name, kind) in declared {
            if let Some(previous) = seen.insert(name, kind) {
                self.error(
                    &path,
                    ViolationKind::Name,
                    format!("duplicate name '{name}' ({previous} and {kind})"),
                );
            }
        }

        let index = NameIndex::for_world(world);
        for frame in &world.frames {
            let frame_path = format!("{path}/frame[{}]", frame.name);
            self.check_frame(frame, &frame_path, &index, "");
        }
        for model in &world.models {
            let model_path = format!("{path}/model[{}]", model.name);
            self.check_model(model, &model_path, &index, &model.name, Some(""));
        }
    }

    /// `scope` is the model's own naming scope inside `index`; `pose_scope`
    /// is the scope its pose resolves in, `None` for a document-level model.
    fn check_model(
        &mut self,
        model: &Model,
        path: &str,
        index: &NameIndex,
        scope: &str,
        pose_scope: Option<&str>,
    ) {
        self.check_name(path, "model", &model.name);
        self.check_unique_names(model, path);

        if model.links.is_empty() && model.models.is_empty() && model.is_static != Some(true) {
            self.warning(path, ViolationKind::MissingElement, "model has no links");
        }

        if let Some(canonical) = &model.canonical_link {
            if index
                .resolve_kind(scope, canonical, &[EntityKind::Link])
                .is_none()
            {
                self.error(
                    path,
                    ViolationKind::Reference,
                    format!("canonical_link '{canonical}' is not a link of this model"),
                );
            }
        }
        if let Some(placement) = &model.placement_frame {
            if index.resolve(scope, placement).is_none() {
                self.error(
                    path,
                    ViolationKind::Reference,
                    format!("placement_frame '{placement}' does not resolve"),
                );
            }
        }

        if let Some(pose) = &model.pose {
            let pose_path = format!("{path}/pose");
            match pose_scope {
                Some(parent_scope) => self.check_pose(pose, &pose_path, index, parent_scope),
                None => {
                    self.check_pose_numbers(pose, &pose_path);
                    if let Some(reference) = pose.reference() {
                        if reference != WORLD_FRAME {
                            self.error(
                                &pose_path,
                                ViolationKind::Reference,
                                format!(
                                    "top-level model pose must be relative to world, not '{reference}'"
                                ),
                            );
                        }
                    }
                }
            }
        }

        for link in &model.links {
            self.check_link(link, &format!("{path}/link[{}]", link.name), index, scope);
        }
        for joint in &model.joints {
            self.check_joint(joint, &format!("{path}/joint[{}]", joint.name), index, scope);
        }
        for frame in &model.frames {
            self.check_frame(frame, &format!("{path}/frame[{}]", frame.name), index, scope);
        }
        for nested in &model.models {
            let nested_path = format!("{path}/model[{}]", nested.name);
            let nested_scope = scoped_name(scope, &nested.name);
            self.check_model(nested, &nested_path, index, &nested_scope, Some(scope));
        }
    }

    fn check_unique_names(&mut self, model: &Model, path: &str) {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let declared = model
            .links
            .iter()
            .map(|l| (l.name.as_str(), "link"))
            .chain(model.joints.iter().map(|j| (j.name.as_str(), "joint")))
            .chain(model.frames.iter().map(|f| (f.name.as_str(), "frame")))
            .chain(model.models.iter().map(|m| (m.name.as_str(), "model")));
        for (name, kind) in declared {
            if let Some(previous) = seen.insert(name, kind) {
                self.error(
                    path,
                    ViolationKind::Name,
                    format!("duplicate name '{name}' ({previous} and {kind})"),
                );
            }
        }
    }

    fn check_pose_numbers(&mut self, pose: &Pose, path: &str) {
        if !pose.is_finite() {
            self.error(path, ViolationKind::NonFinite, "pose has non-finite values");
        }
    }

    fn check_pose(&mut self, pose: &Pose, path: &str, index: &NameIndex, scope: &str) {
        self.check_pose_numbers(pose, path);
        if let Some(reference) = pose.reference() {
            if index.resolve(scope, reference).is_none() {
                self.error(
                    path,
                    ViolationKind::Reference,
                    format!("relative_to '{reference}' does not resolve"),
                );
            }
        }
    }

    fn check_link(&mut self, link: &Link, path: &str, index: &NameIndex, scope: &str) {
        self.check_name(path, "link", &link.name);
        if let Some(pose) = &link.pose {
            self.check_pose(pose, &format!("{path}/pose"), index, scope);
        }
        if let Some(inertial) = &link.inertial {
            self.check_inertial(inertial, &format!("{path}/inertial"), index, scope);
        }

        let mut visual_names: HashSet<&str> = HashSet::new();
        for visual in &link.visuals {
            let visual_path = format!("{path}/visual[{}]", visual.name);
            if visual.name.is_empty() {
                self.error(&visual_path, ViolationKind::Name, "visual has an empty name");
            } else if !visual_names.insert(visual.name.as_str()) {
                self.error(
                    &visual_path,
                    ViolationKind::Name,
                    format!("duplicate visual name '{}'", visual.name),
                );
            }
            if let Some(pose) = &visual.pose {
                self.check_pose(pose, &format!("{visual_path}/pose"), index, scope);
            }
            self.check_geometry(&visual.geometry, &format!("{visual_path}/geometry"));
        }

        let mut collision_names: HashSet<&str> = HashSet::new();
        for collision in &link.collisions {
            let collision_path = format!("{path}/collision[{}]", collision.name);
            if collision.name.is_empty() {
                self.error(
                    &collision_path,
                    ViolationKind::Name,
                    "collision has an empty name",
                );
            } else if !collision_names.insert(collision.name.as_str()) {
                self.error(
                    &collision_path,
                    ViolationKind::Name,
                    format!("duplicate collision name '{}'", collision.name),
                );
            }
            if let Some(pose) = &collision.pose {
                self.check_pose(pose, &format!("{collision_path}/pose"), index, scope);
            }
            self.check_geometry(&collision.geometry, &format!("{collision_path}/geometry"));
        }
    }

    fn check_inertial(&mut self, inertial: &Inertial, path: &str, index: &NameIndex, scope: &str) {
        if !inertial.mass.is_finite() {
            self.error(path, ViolationKind::NonFinite, "mass is not finite");
        } else if inertial.mass < 0.0 {
            self.error(
                path,
                ViolationKind::Range,
                format!("mass must be non-negative, got {}", inertial.mass),
            );
        }
        if let Some(pose) = &inertial.pose {
            self.check_pose(pose, &format!("{path}/pose"), index, scope);
        }

        let inertia = &inertial.inertia;
        if !inertia.is_finite() {
            self.error(path, ViolationKind::NonFinite, "inertia has non-finite components");
            return;
        }
        for (name, value) in [("ixx", inertia.ixx), ("iyy", inertia.iyy), ("izz", inertia.izz)] {
            if value < 0.0 {
                self.error(
                    path,
                    ViolationKind::Range,
                    format!("{name} must be non-negative, got {value}"),
                );
            }
        }

        if self.options.warn_zero_inertia && inertial.mass > 0.0 && inertia.is_zero() {
            self.warning(
                path,
                ViolationKind::Inertia,
                format!("mass {} with an all-zero inertia tensor", inertial.mass),
            );
        }

        if self.options.inertia_noise != InertiaNoisePolicy::Allow {
            let tolerance = self.options.noise_tolerance;
            let noisy: Vec<&str> = [("ixy", inertia.ixy), ("ixz", inertia.ixz), ("iyz", inertia.iyz)]
                .into_iter()
                .filter(|(_, v)| *v != 0.0 && v.abs() <= tolerance)
                .map(|(name, _)| name)
                .collect();
            if !noisy.is_empty() {
                let message = format!(
                    "off-diagonal entries {} are non-zero but below {tolerance}",
                    noisy.join(", ")
                );
                match self.options.inertia_noise {
                    InertiaNoisePolicy::Warn => self.warning(path, ViolationKind::Inertia, message),
                    InertiaNoisePolicy::Reject => self.error(path, ViolationKind::Inertia, message),
                    InertiaNoisePolicy::Allow => {}
                }
            }
        }

        if self.options.check_triangle_inequality {
            let (a, b, c) = (inertia.ixx, inertia.iyy, inertia.izz);
            let slack = 1e-12 * (a + b + c).abs().max(1.0);
            if a + b < c - slack || b + c < a - slack || a + c < b - slack {
                self.warning(
                    path,
                    ViolationKind::Inertia,
                    format!("principal moments ({a}, {b}, {c}) violate the triangle inequality"),
                );
            }
        }
    }

    fn check_geometry(&mut self, geometry: &Geometry, path: &str) {
        let dimensions = geometry.dimensions();
        if dimensions.iter().any(|v| !v.is_finite()) {
            self.error(
                path,
                ViolationKind::NonFinite,
                format!("{} has non-finite dimensions", geometry.kind_name()),
            );
        } else if dimensions.iter().any(|v| *v < 0.0) {
            self.error(
                path,
                ViolationKind::Range,
                format!("{} has negative dimensions", geometry.kind_name()),
            );
        }
        if let Geometry::Mesh { uri, .. } | Geometry::Heightmap { uri, .. } = geometry {
            if uri.trim().is_empty() {
                self.error(path, ViolationKind::MissingElement, "uri is empty");
            }
        }
    }

    fn check_joint(&mut self, joint: &Joint, path: &str, index: &NameIndex, scope: &str) {
        self.check_name(path, "joint", &joint.name);

        let parent = if joint.parent.is_empty() {
            self.error(path, ViolationKind::MissingElement, "joint has no parent");
            None
        } else {
            let resolved =
                index.resolve_kind(scope, &joint.parent, &[EntityKind::Link, EntityKind::World]);
            if resolved.is_none() {
                self.error(
                    path,
                    ViolationKind::Reference,
                    format!("parent '{}' is not a link or world", joint.parent),
                );
            }
            resolved
        };

        let child = if joint.child.is_empty() {
            self.error(path, ViolationKind::MissingElement, "joint has no child");
            None
        } else if joint.child == WORLD_FRAME {
            self.error(path, ViolationKind::Reference, "child cannot be world");
            None
        } else {
            let resolved = index.resolve_kind(scope, &joint.child, &[EntityKind::Link]);
            if resolved.is_none() {
                self.error(
                    path,
                    ViolationKind::Reference,
                    format!("child '{}' is not a link", joint.child),
                );
            }
            resolved
        };

        if let (Some(parent), Some(child)) = (&parent, &child) {
            if parent.name == child.name {
                self.error(
                    path,
                    ViolationKind::Reference,
                    format!("parent and child are the same link '{}'", child.name),
                );
            }
        }

        if let Some(pose) = &joint.pose {
            self.check_pose(pose, &format!("{path}/pose"), index, scope);
        }

        match &joint.axis {
            Some(axis) => self.check_axis(axis, &format!("{path}/axis"), index, scope),
            None if joint.joint_type.requires_axis() => self.error(
                path,
                ViolationKind::MissingElement,
                format!("{} joint requires an axis", joint.joint_type.as_str()),
            ),
            None => {}
        }
    }

    fn check_axis(&mut self, axis: &Axis, path: &str, index: &NameIndex, scope: &str) {
        if !axis.xyz.iter().all(|v| v.is_finite()) {
            self.error(path, ViolationKind::NonFinite, "axis direction is not finite");
        } else if axis.xyz.norm() < 1e-12 {
            self.error(path, ViolationKind::Range, "axis direction is zero");
        }
        if let Some(frame) = axis.expressed_in.as_deref().filter(|s| !s.is_empty()) {
            if index.resolve(scope, frame).is_none() {
                self.error(
                    path,
                    ViolationKind::Reference,
                    format!("expressed_in '{frame}' does not resolve"),
                );
            }
        }

        let Some(limit) = &axis.limit else {
            return;
        };
        let limit_path = format!("{path}/limit");
        for (name, value) in [
            ("lower", limit.lower),
            ("upper", limit.upper),
            ("effort", limit.effort),
            ("velocity", limit.velocity),
        ] {
            if value.is_some_and(f64::is_nan) {
                self.error(&limit_path, ViolationKind::NonFinite, format!("{name} is NaN"));
            }
        }
        if let (Some(lower), Some(upper)) = (limit.lower, limit.upper) {
            if lower > upper {
                self.error(
                    &limit_path,
                    ViolationKind::Range,
                    format!("lower {lower} exceeds upper {upper}"),
                );
            }
        }
        if let Some(effort) = limit.effort.filter(|e| *e < 0.0) {
            self.error(
                &limit_path,
                ViolationKind::Range,
                format!("effort must be non-negative, got {effort}"),
            );
        }
        if let Some(velocity) = limit.velocity.filter(|v| *v < 0.0) {
            self.error(
                &limit_path,
                ViolationKind::Range,
                format!("velocity must be non-negative, got {velocity}"),
            );
        }
    }

    fn check_frame(&mut self, frame: &Frame, path: &str, index: &NameIndex, scope: &str) {
        self.check_name(path, "frame", &frame.name);
        if let Some(target) = frame.attachment() {
            match index.resolve(scope, target) {
                None => self.error(
                    path,
                    ViolationKind::Reference,
                    format!("attached_to '{target}' does not resolve"),
                ),
                Some(resolved) if resolved.name == scoped_name(scope, &frame.name) => self.error(
                    path,
                    ViolationKind::Reference,
                    "frame is attached to itself",
                ),
                Some(_) => {}
            }
        }
        if let Some(pose) = &frame.pose {
            self.check_pose(pose, &format!("{path}/pose"), index, scope);
        }
    }
}
