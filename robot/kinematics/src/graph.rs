//! Frame graph construction.
//!
//! Every pose-owning element of a model (the model frame itself, links,
//! joints, explicit frames and nested models) becomes a node in an arena.
//! Each node points at the frame its pose is expressed in, which is either
//! the explicit `relative_to` target or the element's default frame. The
//! graph is rooted at `world`.
//!
//! Nodes also record what they are attached to (frames to their
//! `attached_to` entity, joints to their child link, models to their
//! canonical link) so that any frame can be traced to the rigid body that
//! carries it.

use std::collections::HashMap;

use nalgebra::Isometry3;
use robot_sdf::{
    Document, EntityKind, MODEL_FRAME, Model, NameIndex, Pose, WORLD_FRAME, World, scoped_name,
};
use tracing::debug;

use crate::error::{GraphDefect, GraphError, NumericError};

/// Index of a node in a [`FrameGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One named frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameNode {
    /// Fully scoped name (`world`, `__model__`, `base`, `gripper::palm`).
    pub name: String,
    /// What declared the frame.
    pub kind: EntityKind,
    /// Frame this node's pose is expressed in. `None` only for `world`.
    pub parent: Option<FrameId>,
    /// Transform from this frame into the parent frame.
    pub local: Isometry3<f64>,
    /// Entity the frame is rigidly attached to. Links and `world` point at
    /// themselves.
    pub attached: Option<FrameId>,
    /// Naming scope the element was declared in.
    pub scope: String,
}

/// Directed graph of named frames and their `relative_to` edges.
#[derive(Debug, Clone)]
pub struct FrameGraph {
    label: String,
    nodes: Vec<FrameNode>,
    by_name: HashMap<String, FrameId>,
    children: Vec<Vec<FrameId>>,
    names: NameIndex,
    scope_root: FrameId,
}

const WORLD_ID: FrameId = FrameId(0);

impl FrameGraph {
    /// Build the graph for `model`, which must belong to `doc`.
    ///
    /// A model that sits inside a `<world>` is built together with the
    /// world's frames and sibling models, so poses may refer to them.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Invalid`] listing every duplicate name,
    /// unresolved reference, non-finite pose and cycle.
    pub fn build(doc: &Document, model: &Model) -> Result<Self, GraphError> {
        let world = doc
            .worlds
            .iter()
            .find(|w| w.models.iter().any(|m| std::ptr::eq(m, model)));
        match world {
            Some(world) => Self::from_world(world),
            None => Self::from_model(model),
        }
    }

    /// Build the graph of a standalone model placed in `world`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Invalid`] listing every defect.
    pub fn from_model(model: &Model) -> Result<Self, GraphError> {
        let mut builder = GraphBuilder::new(NameIndex::for_model(model));
        builder.decls.push(Decl {
            name: MODEL_FRAME.to_string(),
            kind: EntityKind::Model,
            pose: model.pose.as_ref(),
            scope: None,
            default: Ref::World,
            attach: canonical_ref(model, ""),
        });
        builder.collect_model(model, "");
        builder.finish(&model.name, MODEL_FRAME)
    }

    /// Build the graph of a world: its frames and every model in it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Invalid`] listing every defect.
    pub fn from_world(world: &World) -> Result<Self, GraphError> {
        let mut builder = GraphBuilder::new(NameIndex::for_world(world));
        for frame in &world.frames {
            let target = frame
                .attachment()
                .map_or(Ref::World, |name| Ref::Named(name.to_string()));
            builder.decls.push(Decl {
                name: frame.name.clone(),
                kind: EntityKind::Frame,
                pose: frame.pose.as_ref(),
                scope: Some(String::new()),
                default: target.clone(),
                attach: target,
            });
        }
        for model in &world.models {
            builder.push_model(model, "");
        }
        builder.finish(&world.name, WORLD_FRAME)
    }

    /// Graph label (model or world name), used in error messages.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The `world` node.
    #[must_use]
    pub fn world(&self) -> FrameId {
        WORLD_ID
    }

    /// The frame that top-level names are scoped under: `__model__` for a
    /// standalone model, `world` for a world graph.
    #[must_use]
    pub fn scope_root(&self) -> FrameId {
        self.scope_root
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph holds only `world`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// All nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (FrameId, &FrameNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (FrameId(i), n))
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: FrameId) -> Option<&FrameNode> {
        self.nodes.get(id.0)
    }

    /// Look up a node by fully scoped name.
    #[must_use]
    pub fn frame(&self, scoped: &str) -> Option<FrameId> {
        self.by_name.get(scoped).copied()
    }

    /// Look up a node by fully scoped name, failing with
    /// [`GraphError::UnknownFrame`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownFrame`] if no node has that name.
    pub fn require(&self, scoped: &str) -> Result<FrameId, GraphError> {
        self.frame(scoped)
            .ok_or_else(|| GraphError::unknown_frame(scoped))
    }

    /// Resolve a reference made inside `scope` to a node.
    #[must_use]
    pub fn lookup(&self, scope: &str, reference: &str) -> Option<FrameId> {
        self.names
            .resolve(scope, reference)
            .and_then(|r| self.frame(&r.name))
    }

    /// Nodes whose pose is expressed in `id`.
    #[must_use]
    pub fn children(&self, id: FrameId) -> &[FrameId] {
        self.children.get(id.0).map_or(&[], Vec::as_slice)
    }

    /// The name index the graph was built from.
    #[must_use]
    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    /// The link (or `world`) that rigidly carries frame `id`.
    ///
    /// Follows attachment edges: a frame to its `attached_to` entity, a joint
    /// to its child link, a model to its canonical link.
    #[must_use]
    pub fn body_of(&self, id: FrameId) -> Option<FrameId> {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            let node = self.node(current)?;
            if matches!(node.kind, EntityKind::Link | EntityKind::World) {
                return Some(current);
            }
            current = node.attached?;
        }
        None
    }
}

// ============================================================================
// Builder
// ============================================================================

/// A reference to be resolved after every node has an id.
#[derive(Debug, Clone, PartialEq)]
enum Ref {
    /// The `world` frame.
    World,
    /// A fully scoped name.
    Scoped(String),
    /// A name to resolve in the declaring scope.
    Named(String),
    /// The node itself.
    Itself,
}

struct Decl<'a> {
    name: String,
    kind: EntityKind,
    pose: Option<&'a Pose>,
    /// Scope for resolving `relative_to`; `None` accepts only `world`.
    scope: Option<String>,
    default: Ref,
    attach: Ref,
}

struct GraphBuilder<'a> {
    names: NameIndex,
    decls: Vec<Decl<'a>>,
    defects: Vec<GraphDefect>,
}

/// Canonical link of a model: the declared one, else the first link, else
/// the canonical link of the first nested model.
fn canonical_ref(model: &Model, prefix: &str) -> Ref {
    if let Some(canonical) = model.canonical_link.as_deref().filter(|c| !c.is_empty()) {
        return Ref::Scoped(scoped_name(prefix, canonical));
    }
    if let Some(first) = model.links.first() {
        return Ref::Scoped(scoped_name(prefix, &first.name));
    }
    model.models.first().map_or(Ref::World, |nested| {
        Ref::Scoped(scoped_name(prefix, &nested.name))
    })
}

impl<'a> GraphBuilder<'a> {
    fn new(names: NameIndex) -> Self {
        Self {
            names,
            decls: Vec::new(),
            defects: Vec::new(),
        }
    }

    fn defect(&mut self, defect: GraphDefect) {
        if !self.defects.contains(&defect) {
            self.defects.push(defect);
        }
    }

    /// Declare a model nested in `prefix` and everything inside it.
    fn push_model(&mut self, model: &'a Model, prefix: &str) {
        let name = scoped_name(prefix, &model.name);
        let default = if prefix.is_empty() && self.names.root() == WORLD_FRAME {
            Ref::World
        } else {
            Ref::Scoped(self.names.scope_frame(prefix))
        };
        self.decls.push(Decl {
            name: name.clone(),
            kind: EntityKind::Model,
            pose: model.pose.as_ref(),
            scope: Some(prefix.to_string()),
            default,
            attach: canonical_ref(model, &name),
        });
        self.collect_model(model, &name);
    }

    fn collect_model(&mut self, model: &'a Model, prefix: &str) {
        let model_frame = Ref::Scoped(self.names.scope_frame(prefix));
        for link in &model.links {
            self.decls.push(Decl {
                name: scoped_name(prefix, &link.name),
                kind: EntityKind::Link,
                pose: link.pose.as_ref(),
                scope: Some(prefix.to_string()),
                default: model_frame.clone(),
                attach: Ref::Itself,
            });
        }
        for joint in &model.joints {
            let child = Ref::Named(joint.child.clone());
            self.decls.push(Decl {
                name: scoped_name(prefix, &joint.name),
                kind: EntityKind::Joint,
                pose: joint.pose.as_ref(),
                scope: Some(prefix.to_string()),
                default: child.clone(),
                attach: child,
            });
        }
        for frame in &model.frames {
            let target = frame
                .attachment()
                .map_or_else(|| model_frame.clone(), |name| Ref::Named(name.to_string()));
            self.decls.push(Decl {
                name: scoped_name(prefix, &frame.name),
                kind: EntityKind::Frame,
                pose: frame.pose.as_ref(),
                scope: Some(prefix.to_string()),
                default: target.clone(),
                attach: target,
            });
        }
        for nested in &model.models {
            self.push_model(nested, prefix);
        }
    }

    fn resolve_ref(
        &mut self,
        reference: &Ref,
        element: &str,
        scope: &str,
        id: FrameId,
        by_name: &HashMap<String, FrameId>,
    ) -> Option<FrameId> {
        let found = match reference {
            Ref::World => Some(WORLD_ID),
            Ref::Itself => Some(id),
            Ref::Scoped(name) => by_name.get(name).copied(),
            Ref::Named(name) => self
                .names
                .resolve(scope, name)
                .and_then(|r| by_name.get(&r.name).copied()),
        };
        if found.is_none() {
            let reference = match reference {
                Ref::Scoped(name) | Ref::Named(name) => name.clone(),
                Ref::World => WORLD_FRAME.to_string(),
                Ref::Itself => element.to_string(),
            };
            self.defect(GraphDefect::UnresolvedReference {
                element: element.to_string(),
                reference,
            });
        }
        found
    }

    fn finish(mut self, label: &str, scope_root: &str) -> Result<FrameGraph, GraphError> {
        let mut nodes = vec![FrameNode {
            name: WORLD_FRAME.to_string(),
            kind: EntityKind::World,
            parent: None,
            local: Isometry3::identity(),
            attached: Some(WORLD_ID),
            scope: String::new(),
        }];
        let mut by_name: HashMap<String, FrameId> = HashMap::new();
        by_name.insert(WORLD_FRAME.to_string(), WORLD_ID);

        for (i, decl) in self.decls.iter().enumerate() {
            let id = FrameId(i + 1);
            if by_name.contains_key(&decl.name) {
                self.defects.push(GraphDefect::DuplicateName {
                    name: decl.name.clone(),
                });
            } else {
                by_name.insert(decl.name.clone(), id);
            }
        }

        let decls = std::mem::take(&mut self.decls);
        for (i, decl) in decls.iter().enumerate() {
            let id = FrameId(i + 1);
            let scope = decl.scope.clone().unwrap_or_default();

            let local = match decl.pose {
                Some(pose) if !pose.is_finite() => {
                    self.defect(GraphDefect::NonFinite(NumericError::new(
                        decl.name.clone(),
                        "pose has non-finite components",
                    )));
                    Isometry3::identity()
                }
                Some(pose) => pose.transform(),
                None => Isometry3::identity(),
            };

            let explicit = decl.pose.and_then(Pose::reference);
            let parent = match (explicit, &decl.scope) {
                (Some(reference), None) if reference != WORLD_FRAME => {
                    self.defect(GraphDefect::UnresolvedReference {
                        element: decl.name.clone(),
                        reference: reference.to_string(),
                    });
                    None
                }
                (Some(reference), _) => self.resolve_ref(
                    &Ref::Named(reference.to_string()),
                    &decl.name,
                    &scope,
                    id,
                    &by_name,
                ),
                (None, _) => self.resolve_ref(&decl.default, &decl.name, &scope, id, &by_name),
            };
            let attached = self.resolve_ref(&decl.attach, &decl.name, &scope, id, &by_name);

            if parent == Some(id) {
                self.defect(GraphDefect::Cycle {
                    frames: vec![decl.name.clone(), decl.name.clone()],
                });
            }

            nodes.push(FrameNode {
                name: decl.name.clone(),
                kind: decl.kind,
                parent: parent.filter(|p| *p != id),
                local,
                attached,
                scope,
            });
        }

        for frames in find_cycles(&nodes, |n| n.parent) {
            self.defect(GraphDefect::Cycle { frames });
        }
        for frames in find_cycles(&nodes, |n| n.attached.filter(|a| *a != WORLD_ID)) {
            self.defect(GraphDefect::Cycle { frames });
        }

        if !self.defects.is_empty() {
            return Err(GraphError::Invalid {
                scope: label.to_string(),
                defects: self.defects,
            });
        }

        let mut children = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                children[parent.0].push(FrameId(i));
            }
        }

        let scope_root = by_name.get(scope_root).copied().unwrap_or(WORLD_ID);
        debug!(graph = label, nodes = nodes.len(), "built frame graph");
        Ok(FrameGraph {
            label: label.to_string(),
            nodes,
            by_name,
            children,
            names: self.names,
            scope_root,
        })
    }
}

/// Find every cycle along `next` edges, each listed once in chain order with
/// the first frame repeated at the end.
///
/// Each walk is bounded by the node count, so a corrupt edge set cannot make
/// it loop forever.
fn find_cycles(
    nodes: &[FrameNode],
    next: impl Fn(&FrameNode) -> Option<FrameId>,
) -> Vec<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut cycles = Vec::new();

    for start in 0..nodes.len() {
        let mut path: Vec<usize> = Vec::new();
        let mut current = Some(start);
        let mut hops = 0;
        while let Some(i) = current {
            if marks[i] != Mark::Unvisited || hops > nodes.len() {
                break;
            }
            marks[i] = Mark::OnPath;
            path.push(i);
            hops += 1;
            current = next(&nodes[i])
                .map(FrameId::index)
                .filter(|j| *j < nodes.len() && *j != i);
        }
        if let Some(i) = current {
            if marks[i] == Mark::OnPath {
                if let Some(pos) = path.iter().position(|p| *p == i) {
                    let mut frames: Vec<String> =
                        path[pos..].iter().map(|p| nodes[*p].name.clone()).collect();
                    frames.push(nodes[i].name.clone());
                    cycles.push(frames);
                }
            }
        }
        for p in path {
            marks[p] = Mark::Done;
        }
    }
    cycles
}
