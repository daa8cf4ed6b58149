//! Transforms between arbitrary frames of a [`FrameGraph`].
//!
//! The transform of every frame into `world` is computed once, lazily, by
//! composing local transforms down the `relative_to` chain. Any other pair
//! is answered from those two root transforms.

use std::sync::OnceLock;

use nalgebra::Isometry3;
use robot_sdf::Pose;

use crate::error::{GraphDefect, GraphError};
use crate::graph::{FrameGraph, FrameId};

/// Resolves transforms over an immutable [`FrameGraph`].
///
/// Root transforms are memoized per frame. The cache uses [`OnceLock`], so a
/// resolver can be shared between threads.
#[derive(Debug)]
pub struct PoseResolver<'g> {
    graph: &'g FrameGraph,
    cache: Vec<OnceLock<Isometry3<f64>>>,
}

impl<'g> PoseResolver<'g> {
    /// Create a resolver with an empty cache.
    #[must_use]
    pub fn new(graph: &'g FrameGraph) -> Self {
        Self {
            graph,
            cache: (0..graph.len()).map(|_| OnceLock::new()).collect(),
        }
    }

    /// The graph being resolved.
    #[must_use]
    pub fn graph(&self) -> &'g FrameGraph {
        self.graph
    }

    /// Transform carrying coordinates in frame `id` into `world`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownFrame`] for an id outside the graph.
    pub fn root_transform(&self, id: FrameId) -> Result<Isometry3<f64>, GraphError> {
        let slot = self
            .cache
            .get(id.index())
            .ok_or_else(|| GraphError::unknown_frame(format!("#{}", id.index())))?;
        if let Some(cached) = slot.get() {
            return Ok(*cached);
        }

        // Walk up to the first frame with a known root transform.
        let mut chain = Vec::new();
        let mut current = Some(id);
        let mut base = Isometry3::identity();
        while let Some(frame) = current {
            if let Some(cached) = self.cache[frame.index()].get() {
                base = *cached;
                break;
            }
            if chain.len() > self.graph.len() {
                return Err(self.cycle_error(&chain));
            }
            chain.push(frame);
            current = self.graph.node(frame).and_then(|n| n.parent);
        }

        for frame in chain.into_iter().rev() {
            let local = self
                .graph
                .node(frame)
                .map_or_else(Isometry3::identity, |n| n.local);
            base *= local;
            let _ = self.cache[frame.index()].set(base);
        }
        Ok(base)
    }

    fn cycle_error(&self, chain: &[FrameId]) -> GraphError {
        let frames = chain
            .iter()
            .filter_map(|id| self.graph.node(*id))
            .map(|n| n.name.clone())
            .collect();
        GraphError::Invalid {
            scope: self.graph.label().to_string(),
            defects: vec![GraphDefect::Cycle { frames }],
        }
    }

    /// Transform carrying coordinates expressed in `from` into coordinates
    /// expressed in `to`. Equivalently, the pose of `from` in `to`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownFrame`] for an id outside the graph.
    pub fn resolve(&self, from: FrameId, to: FrameId) -> Result<Isometry3<f64>, GraphError> {
        if from == to {
            return Ok(Isometry3::identity());
        }
        let world_from = self.root_transform(from)?;
        let world_to = self.root_transform(to)?;
        Ok(world_to.inverse() * world_from)
    }

    /// [`resolve`](Self::resolve) by fully scoped frame name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownFrame`] if either name is not a frame.
    pub fn resolve_names(&self, from: &str, to: &str) -> Result<Isometry3<f64>, GraphError> {
        self.resolve(self.graph.require(from)?, self.graph.require(to)?)
    }

    /// Pose of an attached element (inertial, visual, collision) in `target`.
    ///
    /// `pose` is interpreted in its own `relative_to` frame, looked up from
    /// `scope`, or in `default` when it names none. A missing pose is the
    /// identity in `default`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownFrame`] if the pose names a frame that
    /// does not resolve.
    pub fn pose_in(
        &self,
        pose: Option<&Pose>,
        default: FrameId,
        scope: &str,
        target: FrameId,
    ) -> Result<Isometry3<f64>, GraphError> {
        let Some(pose) = pose else {
            return self.resolve(default, target);
        };
        let frame = match pose.reference() {
            Some(reference) => self
                .graph
                .lookup(scope, reference)
                .ok_or_else(|| GraphError::unknown_frame(reference))?,
            None => default,
        };
        Ok(self.resolve(frame, target)? * pose.transform())
    }
}
