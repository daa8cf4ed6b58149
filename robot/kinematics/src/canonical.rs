//! Canonicalization of a model into a single-root kinematic tree.
//!
//! Links (flattened across nested models) are connected by joints into an
//! undirected graph. A root is chosen, a breadth-first traversal gives every
//! joint a parent-to-child direction, and every link gets its pose relative
//! to the root. Closed chains and disconnected links are rejected.
//!
//! Each tree link has a *target frame*: the frame its contents are expressed
//! in once exported. The root uses its own link frame, any other link uses the
//! frame of its incoming joint, which keeps the joint axis through the link
//! origin.

use std::collections::{HashMap, VecDeque};

use nalgebra::{Isometry3, Vector3};
use robot_sdf::{Document, EntityKind, Frame, Joint, Link, Model, WORLD_FRAME, scoped_name};
use tracing::debug;

use crate::error::{CanonicalizationError, GraphError};
use crate::graph::{FrameGraph, FrameId};
use crate::resolver::PoseResolver;

/// A link of the canonical tree.
#[derive(Debug, Clone)]
pub struct TreeLink<'a> {
    /// Name relative to the model (`gripper::palm` for nested links).
    pub name: String,
    /// Source link. `None` for the `world` root of a fixed-base model.
    pub link: Option<&'a Link>,
    /// Frame-graph node of the link.
    pub frame: FrameId,
    /// Scope for resolving references made inside the link.
    pub scope: String,
    /// Incoming joint, `None` for the root.
    pub parent_joint: Option<usize>,
    /// Outgoing joints in traversal order.
    pub children: Vec<usize>,
    /// Pose of the link's target frame in the root's target frame.
    pub root_pose: Isometry3<f64>,
}

impl TreeLink<'_> {
    /// True for the `world` pseudo-link.
    #[must_use]
    pub fn is_world(&self) -> bool {
        self.link.is_none()
    }
}

/// A joint of the canonical tree, directed from parent to child.
#[derive(Debug, Clone)]
pub struct TreeJoint<'a> {
    /// Name relative to the model.
    pub name: String,
    /// Source joint.
    pub joint: &'a Joint,
    /// Frame-graph node of the joint.
    pub frame: FrameId,
    /// Scope the joint was declared in.
    pub scope: String,
    /// Tree parent link index.
    pub parent: usize,
    /// Tree child link index.
    pub child: usize,
    /// True when the tree direction is opposite to the declared one.
    pub reversed: bool,
}

/// An explicit frame of the model and the tree link that carries it.
#[derive(Debug, Clone)]
pub struct TreeFrame<'a> {
    /// Name relative to the model.
    pub name: String,
    /// Source frame.
    pub frame: &'a Frame,
    /// Frame-graph node.
    pub id: FrameId,
    /// Carrying tree link, `None` if the frame is attached to `world` in a
    /// floating model.
    pub body: Option<usize>,
}

/// A model rearranged into a single-root tree.
///
/// Owns the frame graph it was derived from and borrows the source model,
/// which is never modified.
#[derive(Debug)]
pub struct KinematicTree<'a> {
    model: &'a Model,
    graph: FrameGraph,
    links: Vec<TreeLink<'a>>,
    joints: Vec<TreeJoint<'a>>,
    frames: Vec<TreeFrame<'a>>,
    order: Vec<usize>,
    root: usize,
    fixed_base: bool,
}

impl<'a> KinematicTree<'a> {
    /// The source model.
    #[must_use]
    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// The frame graph of the model.
    #[must_use]
    pub fn graph(&self) -> &FrameGraph {
        &self.graph
    }

    /// A fresh resolver over the model's frame graph.
    #[must_use]
    pub fn resolver(&self) -> PoseResolver<'_> {
        PoseResolver::new(&self.graph)
    }

    /// All links, in declaration order (the `world` pseudo-link first).
    #[must_use]
    pub fn links(&self) -> &[TreeLink<'a>] {
        &self.links
    }

    /// All joints, in declaration order.
    #[must_use]
    pub fn joints(&self) -> &[TreeJoint<'a>] {
        &self.joints
    }

    /// All explicit frames.
    #[must_use]
    pub fn frames(&self) -> &[TreeFrame<'a>] {
        &self.frames
    }

    /// Link indices in breadth-first order from the root.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Index of the root link.
    #[must_use]
    pub fn root_index(&self) -> usize {
        self.root
    }

    /// The root link.
    #[must_use]
    pub fn root(&self) -> &TreeLink<'a> {
        &self.links[self.root]
    }

    /// True if the model is attached to `world` by a joint.
    #[must_use]
    pub fn is_fixed_base(&self) -> bool {
        self.fixed_base
    }

    /// Index of a link by model-relative name.
    #[must_use]
    pub fn link_index(&self, name: &str) -> Option<usize> {
        self.links.iter().position(|l| l.name == name)
    }

    /// Index of a joint by model-relative name.
    #[must_use]
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Frame the contents of link `index` are expressed in after export.
    #[must_use]
    pub fn target_frame(&self, index: usize) -> FrameId {
        let link = &self.links[index];
        match link.parent_joint {
            Some(joint) => self.joints[joint].frame,
            None => link.frame,
        }
    }

    /// Unit axis of joint `index` in its joint frame, pointing along the tree
    /// direction. `None` when the joint has no axis.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownFrame`] if `expressed_in` does not
    /// resolve.
    pub fn joint_axis(
        &self,
        index: usize,
        resolver: &PoseResolver<'_>,
    ) -> Result<Option<Vector3<f64>>, GraphError> {
        let tree_joint = &self.joints[index];
        let Some(axis) = &tree_joint.joint.axis else {
            return Ok(None);
        };
        let mut xyz = axis.xyz;
        if let Some(frame) = axis.expressed_in.as_deref().filter(|f| !f.is_empty()) {
            let id = self
                .graph
                .lookup(&tree_joint.scope, frame)
                .ok_or_else(|| GraphError::unknown_frame(frame))?;
            xyz = resolver.resolve(id, tree_joint.frame)?.rotation * xyz;
        }
        let norm = xyz.norm();
        if norm > 0.0 {
            xyz /= norm;
        }
        if tree_joint.reversed {
            xyz = -xyz;
        }
        Ok(Some(xyz))
    }
}

/// Canonicalize `model`, a top-level or world model of `doc`.
///
/// # Errors
///
/// Returns [`CanonicalizationError`] if the frame graph is invalid, the root
/// is ambiguous or invalid, or the joints do not form a tree.
pub fn canonicalize<'a>(
    doc: &Document,
    model: &'a Model,
    root_hint: Option<&str>,
) -> Result<KinematicTree<'a>, CanonicalizationError> {
    let graph = FrameGraph::build(doc, model)?;
    build_tree(model, graph, root_hint)
}

/// Canonicalize a standalone model placed directly in `world`.
///
/// # Errors
///
/// See [`canonicalize`].
pub fn canonicalize_model<'a>(
    model: &'a Model,
    root_hint: Option<&str>,
) -> Result<KinematicTree<'a>, CanonicalizationError> {
    let graph = FrameGraph::from_model(model)?;
    build_tree(model, graph, root_hint)
}

// ============================================================================
// Construction
// ============================================================================

struct Collected<'a> {
    links: Vec<TreeLink<'a>>,
    joints: Vec<(&'a Joint, String, String)>,
    frames: Vec<(&'a Frame, String, String)>,
}

/// Flatten `model` and its nested models. `graph_scope` is the scope in the
/// frame graph, `local` the model-relative prefix.
fn collect<'a>(
    model: &'a Model,
    graph: &FrameGraph,
    graph_scope: &str,
    local: &str,
    out: &mut Collected<'a>,
) -> Result<(), GraphError> {
    for link in &model.links {
        out.links.push(TreeLink {
            name: scoped_name(local, &link.name),
            link: Some(link),
            frame: graph.require(&scoped_name(graph_scope, &link.name))?,
            scope: graph_scope.to_string(),
            parent_joint: None,
            children: Vec::new(),
            root_pose: Isometry3::identity(),
        });
    }
    for joint in &model.joints {
        out.joints
            .push((joint, scoped_name(local, &joint.name), graph_scope.to_string()));
    }
    for frame in &model.frames {
        out.frames
            .push((frame, scoped_name(local, &frame.name), graph_scope.to_string()));
    }
    for nested in &model.models {
        collect(
            nested,
            graph,
            &scoped_name(graph_scope, &nested.name),
            &scoped_name(local, &nested.name),
            out,
        )?;
    }
    Ok(())
}

fn build_tree<'a>(
    model: &'a Model,
    graph: FrameGraph,
    root_hint: Option<&str>,
) -> Result<KinematicTree<'a>, CanonicalizationError> {
    let graph_scope = if graph.scope_root() == graph.world() {
        model.name.clone()
    } else {
        String::new()
    };

    let mut collected = Collected {
        links: Vec::new(),
        joints: Vec::new(),
        frames: Vec::new(),
    };
    collect(model, &graph, &graph_scope, "", &mut collected)?;

    let fixed_base = collected
        .joints
        .iter()
        .any(|(joint, _, _)| joint.parent == WORLD_FRAME);
    let mut links = Vec::with_capacity(collected.links.len() + 1);
    if fixed_base {
        links.push(TreeLink {
            name: WORLD_FRAME.to_string(),
            link: None,
            frame: graph.world(),
            scope: String::new(),
            parent_joint: None,
            children: Vec::new(),
            root_pose: Isometry3::identity(),
        });
    }
    links.extend(collected.links);

    let by_frame: HashMap<FrameId, usize> =
        links.iter().enumerate().map(|(i, l)| (l.frame, i)).collect();
    let link_of = |scope: &str, reference: &str| -> Option<usize> {
        let id = graph.lookup(scope, reference)?;
        let kind = graph.node(id)?.kind;
        matches!(kind, EntityKind::Link | EntityKind::World)
            .then(|| by_frame.get(&id).copied())
            .flatten()
    };

    // Declared endpoints of every joint.
    let mut joints = Vec::with_capacity(collected.joints.len());
    let mut endpoints = Vec::with_capacity(collected.joints.len());
    for (joint, name, scope) in collected.joints {
        let parent = link_of(&scope, &joint.parent)
            .ok_or_else(|| GraphError::unknown_frame(scoped_name(&scope, &joint.parent)))?;
        let child = link_of(&scope, &joint.child)
            .ok_or_else(|| GraphError::unknown_frame(scoped_name(&scope, &joint.child)))?;
        if parent == child {
            return Err(CanonicalizationError::unsupported_topology(
                &model.name,
                "joint connects a link to itself",
                vec![name, links[parent].name.clone()],
            ));
        }
        let frame = graph.require(&scoped_name(&scope, &joint.name))?;
        endpoints.push((parent, child));
        joints.push(TreeJoint {
            name,
            joint,
            frame,
            scope,
            parent,
            child,
            reversed: false,
        });
    }

    let root = select_root(model, &graph, &graph_scope, &links, &endpoints, fixed_base, root_hint, &link_of)?;

    // Breadth-first traversal over the undirected link graph.
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); links.len()];
    for (j, &(parent, child)) in endpoints.iter().enumerate() {
        adjacency[parent].push((j, child));
        adjacency[child].push((j, parent));
    }
    let mut visited = vec![false; links.len()];
    let mut used = vec![false; joints.len()];
    let mut order = Vec::with_capacity(links.len());
    let mut queue = VecDeque::from([root]);
    visited[root] = true;
    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &(j, next) in &adjacency[current] {
            if used[j] {
                continue;
            }
            used[j] = true;
            if visited[next] {
                let mut elements = vec![links[next].name.clone()];
                if let Some(existing) = links[next].parent_joint {
                    elements.push(joints[existing].name.clone());
                }
                elements.push(joints[j].name.clone());
                return Err(CanonicalizationError::unsupported_topology(
                    &model.name,
                    "closed kinematic chain",
                    elements,
                ));
            }
            visited[next] = true;
            let joint = &mut joints[j];
            joint.reversed = joint.parent != current;
            joint.parent = current;
            joint.child = next;
            links[next].parent_joint = Some(j);
            links[current].children.push(j);
            queue.push_back(next);
        }
    }

    let unreached: Vec<String> = links
        .iter()
        .zip(&visited)
        .filter(|(_, seen)| !**seen)
        .map(|(l, _)| l.name.clone())
        .collect();
    if !unreached.is_empty() {
        return Err(CanonicalizationError::unsupported_topology(
            &model.name,
            format!("links not connected to root '{}'", links[root].name),
            unreached,
        ));
    }

    let frames = collected
        .frames
        .into_iter()
        .map(|(frame, name, scope)| {
            let id = graph.require(&scoped_name(&scope, &frame.name))?;
            let body = graph.body_of(id).and_then(|b| by_frame.get(&b).copied());
            Ok(TreeFrame {
                name,
                frame,
                id,
                body,
            })
        })
        .collect::<Result<Vec<_>, GraphError>>()?;

    let mut tree = KinematicTree {
        model,
        graph,
        links,
        joints,
        frames,
        order,
        root,
        fixed_base,
    };

    let root_frame = tree.target_frame(root);
    let poses = {
        let resolver = tree.resolver();
        (0..tree.links.len())
            .map(|i| resolver.resolve(tree.target_frame(i), root_frame))
            .collect::<Result<Vec<_>, GraphError>>()?
    };
    for (link, pose) in tree.links.iter_mut().zip(poses) {
        link.root_pose = pose;
    }

    debug!(
        model = %model.name,
        root = %tree.links[root].name,
        links = tree.links.len(),
        joints = tree.joints.len(),
        reversed = tree.joints.iter().filter(|j| j.reversed).count(),
        "canonicalized model"
    );
    Ok(tree)
}

#[allow(clippy::too_many_arguments)]
fn select_root(
    model: &Model,
    graph: &FrameGraph,
    graph_scope: &str,
    links: &[TreeLink<'_>],
    endpoints: &[(usize, usize)],
    fixed_base: bool,
    root_hint: Option<&str>,
    link_of: &dyn Fn(&str, &str) -> Option<usize>,
) -> Result<usize, CanonicalizationError> {
    if fixed_base {
        return match root_hint {
            None | Some(WORLD_FRAME) => Ok(0),
            Some(hint) => Err(CanonicalizationError::invalid_root(
                &model.name,
                hint,
                "model is attached to world, which must be the root",
            )),
        };
    }

    if let Some(hint) = root_hint {
        return link_of(graph_scope, hint).ok_or_else(|| {
            CanonicalizationError::invalid_root(&model.name, hint, "not a link of the model")
        });
    }

    if let Some(canonical) = model.canonical_link.as_deref().filter(|c| !c.is_empty()) {
        return link_of(graph_scope, canonical).ok_or_else(|| {
            CanonicalizationError::invalid_root(
                &model.name,
                canonical,
                "canonical link does not name a link",
            )
        });
    }

    let mut is_child = vec![false; links.len()];
    for &(_, child) in endpoints {
        is_child[child] = true;
    }
    let candidates: Vec<usize> = (0..links.len()).filter(|i| !is_child[*i]).collect();
    match candidates.as_slice() {
        [single] => Ok(*single),
        _ => {
            debug!(graph = graph.label(), count = candidates.len(), "no unique root link");
            Err(CanonicalizationError::ambiguous_root(
                &model.name,
                candidates.iter().map(|i| links[*i].name.clone()).collect(),
            ))
        }
    }
}
