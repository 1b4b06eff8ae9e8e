//! Migration edges and path discovery between model versions.
//!
//! Migration functions are supplied by the owning application at startup and
//! held only in memory; each directed edge `(from, to)` per model carries one
//! function. When no direct edge covers a request, a breadth-first search
//! finds the shortest chain of registered edges and applies it step by step.
//!
//! Among equal-length paths the one whose edges were registered first wins.
//! That tie-break is a deliberate determinism guarantee tied to registration
//! order, not a quality ranking of paths.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use tracing::debug;

use crate::model::ModelDescriptor;

/// Options forwarded verbatim to every migration function along a path.
pub type MigrationOptions = BTreeMap<String, Value>;

/// A caller-supplied transformation from one version's descriptor to the
/// next.
pub type MigrationFn<D> =
    Box<dyn Fn(D, &MigrationOptions) -> Result<D, MigrationError> + Send + Sync>;

/// Errors from migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path found for model '{model_id}' from {from} to {to}")]
    NoPath {
        model_id: String,
        from: String,
        to: String,
    },

    #[error("migration step failed: {0}")]
    Step(String),
}

impl MigrationError {
    /// Convenience constructor for migration functions reporting failure.
    pub fn step(message: impl Into<String>) -> Self {
        Self::Step(message.into())
    }
}

struct MigrationEdge<D> {
    from: String,
    to: String,
    func: MigrationFn<D>,
}

/// In-memory registry of migration functions, keyed by model.
pub struct MigrationTool<D> {
    // Vec preserves registration order, which drives BFS exploration order.
    edges: BTreeMap<String, Vec<MigrationEdge<D>>>,
}

impl<D> Default for MigrationTool<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for MigrationTool<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (model_id, edges) in &self.edges {
            let pairs: Vec<String> = edges
                .iter()
                .map(|e| format!("{} -> {}", e.from, e.to))
                .collect();
            map.entry(model_id, &pairs);
        }
        map.finish()
    }
}

impl<D> MigrationTool<D> {
    pub fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }

    /// Register a migration function for the directed edge `from -> to`.
    ///
    /// Re-registering an existing edge replaces its function while keeping
    /// the edge's position in registration order.
    pub fn register_migration(
        &mut self,
        model_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        func: MigrationFn<D>,
    ) {
        let model_id = model_id.into();
        let from = from.into();
        let to = to.into();

        let edges = self.edges.entry(model_id).or_default();
        if let Some(existing) = edges.iter_mut().find(|e| e.from == from && e.to == to) {
            existing.func = func;
        } else {
            edges.push(MigrationEdge { from, to, func });
        }
    }

    /// Whether any chain of registered edges connects `from` to `to`.
    pub fn can_migrate(&self, model_id: &str, from: &str, to: &str) -> bool {
        self.find_path(model_id, from, to).is_some()
    }

    /// Shortest edge chain from `from` to `to`, breadth-first.
    ///
    /// Edges are explored in registration order, so the first shortest path
    /// found is stable for a given registration sequence. `from == to`
    /// resolves to the empty chain.
    fn find_path(&self, model_id: &str, from: &str, to: &str) -> Option<Vec<&MigrationEdge<D>>> {
        let edges = self.edges.get(model_id)?;

        if from == to {
            return Some(Vec::new());
        }

        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut arrived_via: HashMap<&str, usize> = HashMap::new();

        queue.push_back(from);

        while let Some(node) = queue.pop_front() {
            for (index, edge) in edges.iter().enumerate() {
                if edge.from != node {
                    continue;
                }
                if edge.to == from || arrived_via.contains_key(edge.to.as_str()) {
                    continue;
                }

                arrived_via.insert(&edge.to, index);
                if edge.to == to {
                    return Some(Self::reconstruct(edges, &arrived_via, from, to));
                }
                queue.push_back(&edge.to);
            }
        }

        None
    }

    fn reconstruct<'a>(
        edges: &'a [MigrationEdge<D>],
        arrived_via: &HashMap<&str, usize>,
        from: &str,
        to: &str,
    ) -> Vec<&'a MigrationEdge<D>> {
        let mut path = Vec::new();
        let mut node = to;

        while node != from {
            let edge = &edges[arrived_via[node]];
            path.push(edge);
            node = &edge.from;
        }

        path.reverse();
        path
    }
}

impl<D: ModelDescriptor> MigrationTool<D> {
    /// Migrate `info` from `from` to `to`.
    ///
    /// A direct edge is applied once; otherwise the shortest registered chain
    /// is applied in sequence, threading the descriptor through every step
    /// and forwarding the same options to each function. A step error
    /// propagates unmodified; nothing is retried or rolled back.
    pub fn migrate(
        &self,
        info: D,
        from: &str,
        to: &str,
        options: &MigrationOptions,
    ) -> Result<D, MigrationError> {
        let model_id = info.model_id().to_string();

        let direct = self
            .edges
            .get(&model_id)
            .and_then(|edges| edges.iter().find(|e| e.from == from && e.to == to));
        if let Some(edge) = direct {
            debug!(model_id = %model_id, from, to, "applying direct migration");
            return (edge.func)(info, options);
        }

        let path = self
            .find_path(&model_id, from, to)
            .ok_or_else(|| MigrationError::NoPath {
                model_id: model_id.clone(),
                from: from.to_string(),
                to: to.to_string(),
            })?;

        debug!(model_id = %model_id, from, to, hops = path.len(), "applying migration path");

        let mut current = info;
        for edge in path {
            current = (edge.func)(current, options)?;
        }
        Ok(current)
    }
}
