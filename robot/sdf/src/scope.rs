//! Name scopes and reference resolution.
//!
//! Every model opens a naming scope. Entities of a nested model are addressed
//! from the outside as `nested::entity`. A reference made inside a scope is
//! looked up in that scope first and then in each enclosing scope, so
//! `relative_to="base"` inside `arm::hand` tries `arm::hand::base`,
//! `arm::base` and finally `base`.

use std::collections::HashMap;

use crate::types::{MODEL_FRAME, Model, SCOPE_DELIMITER, WORLD_FRAME, World, scoped_name};

/// The kind of entity a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// The world frame.
    World,
    /// A model frame.
    Model,
    /// A link.
    Link,
    /// A joint.
    Joint,
    /// An explicit frame.
    Frame,
}

impl EntityKind {
    /// Lowercase element name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Model => "model",
            Self::Link => "link",
            Self::Joint => "joint",
            Self::Frame => "frame",
        }
    }
}

/// A successfully resolved reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Fully scoped name of the target.
    pub name: String,
    /// What the target is.
    pub kind: EntityKind,
}

/// Index of every scoped name declared in a model or world.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: HashMap<String, EntityKind>,
    aliases: HashMap<String, String>,
    duplicates: Vec<String>,
    root: String,
}

impl NameIndex {
    /// Index a model. The model's own frame is `__model__`; the model name is
    /// accepted as an alias for it.
    #[must_use]
    pub fn for_model(model: &Model) -> Self {
        let mut index = Self {
            root: MODEL_FRAME.to_string(),
            ..Default::default()
        };
        index.entries.insert(MODEL_FRAME.to_string(), EntityKind::Model);
        index.collect(model, "");
        if !model.name.is_empty() && !index.entries.contains_key(&model.name) {
            index
                .aliases
                .insert(model.name.clone(), MODEL_FRAME.to_string());
        }
        index
    }

    /// Index a world: its frames, and each model (with its contents) under
    /// the model's name.
    #[must_use]
    pub fn for_world(world: &World) -> Self {
        let mut index = Self {
            root: WORLD_FRAME.to_string(),
            ..Default::default()
        };
        for frame in &world.frames {
            index.insert(frame.name.clone(), EntityKind::Frame);
        }
        for model in &world.models {
            index.insert_model(model, "");
        }
        index
    }

    fn insert(&mut self, name: String, kind: EntityKind) {
        if self.entries.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.entries.insert(name, kind);
        }
    }

    fn insert_model(&mut self, model: &Model, prefix: &str) {
        let name = scoped_name(prefix, &model.name);
        self.insert(name.clone(), EntityKind::Model);
        self.aliases
            .insert(scoped_name(&name, MODEL_FRAME), name.clone());
        self.collect(model, &name);
    }

    fn collect(&mut self, model: &Model, prefix: &str) {
        for link in &model.links {
            self.insert(scoped_name(prefix, &link.name), EntityKind::Link);
        }
        for joint in &model.joints {
            self.insert(scoped_name(prefix, &joint.name), EntityKind::Joint);
        }
        for frame in &model.frames {
            self.insert(scoped_name(prefix, &frame.name), EntityKind::Frame);
        }
        for nested in &model.models {
            self.insert_model(nested, prefix);
        }
    }

    /// Name of the frame the index is rooted at (`__model__` or `world`).
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Scoped names declared more than once, in declaration order.
    #[must_use]
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Kind of a fully scoped name.
    #[must_use]
    pub fn kind_of(&self, scoped: &str) -> Option<EntityKind> {
        if scoped == WORLD_FRAME {
            return Some(EntityKind::World);
        }
        self.entries.get(scoped).copied()
    }

    /// Frame name of the model that owns `scope`.
    #[must_use]
    pub fn scope_frame(&self, scope: &str) -> String {
        if scope.is_empty() {
            self.root.clone()
        } else {
            scope.to_string()
        }
    }

    /// Resolve a reference made inside `scope`, innermost scope first.
    #[must_use]
    pub fn resolve(&self, scope: &str, reference: &str) -> Option<Resolved> {
        if reference == WORLD_FRAME {
            return Some(Resolved {
                name: WORLD_FRAME.to_string(),
                kind: EntityKind::World,
            });
        }
        for prefix in ancestor_scopes(scope) {
            let candidate = if reference == MODEL_FRAME {
                self.scope_frame(prefix)
            } else {
                scoped_name(prefix, reference)
            };
            if let Some(kind) = self.entries.get(&candidate) {
                return Some(Resolved {
                    name: candidate,
                    kind: *kind,
                });
            }
            if let Some(target) = self.aliases.get(&candidate) {
                if let Some(kind) = self.entries.get(target) {
                    return Some(Resolved {
                        name: target.clone(),
                        kind: *kind,
                    });
                }
            }
        }
        None
    }

    /// Resolve a reference and require it to be one of `kinds`.
    #[must_use]
    pub fn resolve_kind(&self, scope: &str, reference: &str, kinds: &[EntityKind]) -> Option<Resolved> {
        self.resolve(scope, reference)
            .filter(|resolved| kinds.contains(&resolved.kind))
    }
}

/// `scope` followed by each enclosing scope, ending with the root scope `""`.
#[must_use]
pub fn ancestor_scopes(scope: &str) -> Vec<&str> {
    let mut scopes = vec![scope];
    let mut current = scope;
    while !current.is_empty() {
        current = match current.rfind(SCOPE_DELIMITER) {
            Some(idx) => &current[..idx],
            None => "",
        };
        scopes.push(current);
    }
    scopes
}

/// Is `name` usable as an element name?
///
/// Names must be non-empty, must not use the scope delimiter and must not
/// shadow the reserved `world` and `__model__` frames.
#[must_use]
pub fn is_reserved_name(name: &str) -> bool {
    name == WORLD_FRAME || name == MODEL_FRAME || name.contains(SCOPE_DELIMITER)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{Frame, Joint, JointType, Link};

    fn nested_model() -> Model {
        Model::new("robot")
            .with_link(Link::new("base"))
            .with_link(Link::new("arm"))
            .with_joint(Joint::new("shoulder", JointType::Revolute, "base", "arm"))
            .with_model(
                Model::new("gripper")
                    .with_link(Link::new("palm"))
                    .with_frame(Frame::new("tcp").with_attached_to("palm")),
            )
    }

    #[test]
    fn test_ancestor_scopes() {
        assert_eq!(ancestor_scopes(""), vec![""]);
        assert_eq!(ancestor_scopes("a::b"), vec!["a::b", "a", ""]);
    }

    #[test]
    fn test_resolve_in_own_scope() {
        let index = NameIndex::for_model(&nested_model());
        let r = index.resolve("", "base").unwrap();
        assert_eq!(r.name, "base");
        assert_eq!(r.kind, EntityKind::Link);
        assert_eq!(index.resolve("", "shoulder").unwrap().kind, EntityKind::Joint);
    }

    #[test]
    fn test_resolve_nested_and_ancestor() {
        let index = NameIndex::for_model(&nested_model());
        assert_eq!(index.resolve("", "gripper::palm").unwrap().name, "gripper::palm");
        assert_eq!(index.resolve("gripper", "palm").unwrap().name, "gripper::palm");
        // Falls back to the enclosing scope.
        assert_eq!(index.resolve("gripper", "base").unwrap().name, "base");
    }

    #[test]
    fn test_model_frame_aliases() {
        let index = NameIndex::for_model(&nested_model());
        assert_eq!(index.resolve("", "__model__").unwrap().name, "__model__");
        assert_eq!(index.resolve("", "robot").unwrap().name, "__model__");
        assert_eq!(index.resolve("gripper", "__model__").unwrap().name, "gripper");
        assert_eq!(
            index.resolve("", "gripper::__model__").unwrap().kind,
            EntityKind::Model
        );
        assert_eq!(index.resolve("", "world").unwrap().kind, EntityKind::World);
    }

    #[test]
    fn test_unresolved_reference() {
        let index = NameIndex::for_model(&nested_model());
        assert!(index.resolve("", "palm").is_none());
        assert!(index.resolve("", "ghost").is_none());
        assert!(
            index
                .resolve_kind("", "shoulder", &[EntityKind::Link])
                .is_none()
        );
    }

    #[test]
    fn test_duplicates_are_recorded() {
        let model = Model::new("m")
            .with_link(Link::new("a"))
            .with_frame(Frame::new("a"));
        let index = NameIndex::for_model(&model);
        assert_eq!(index.duplicates(), ["a".to_string()]);
    }

    #[test]
    fn test_world_index() {
        let world = World::new("w")
            .with_frame(Frame::new("table"))
            .with_model(nested_model());
        let index = NameIndex::for_world(&world);
        assert_eq!(index.root(), "world");
        assert_eq!(index.resolve("", "robot::base").unwrap().kind, EntityKind::Link);
        assert_eq!(index.resolve("", "table").unwrap().kind, EntityKind::Frame);
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("world"));
        assert!(is_reserved_name("__model__"));
        assert!(is_reserved_name("a::b"));
        assert!(!is_reserved_name("base"));
    }
}
