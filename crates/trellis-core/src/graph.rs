//! In-memory JSON graph cache

use crate::envelope::JsonGraphEnvelope;
use crate::extract::{self, MAX_REF_HOPS, Walk};
use crate::model::{Node, Resolution};
use crate::path::{Key, Path};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// A graph shared between a facade and the readers of its snapshot.
///
/// Mutations hold the write lock for their whole duration, so a reader never
/// observes a partially applied change.
pub type SharedGraph = Arc<RwLock<Graph>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("reference cycle: gave up after {hops} hops resolving `{path}`")]
    ReferenceCycle { path: Path, hops: usize },
    #[error("cannot write to the graph root")]
    EmptyPath,
}

/// The local cache: a tree of [`Node`]s whose references may form cycles.
#[derive(Clone, PartialEq)]
pub struct Graph {
    root: Node,
    version: u64,
    /// Canonical paths the data source answered without resolving them.
    settled: HashSet<Path>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let top_level = match &self.root {
            Node::Branch(children) => children.len(),
            _ => 0,
        };
        f.debug_struct("Graph")
            .field("top_level_keys", &top_level)
            .field("version", &self.version)
            .field("settled", &self.settled.len())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            root: Node::branch(),
            version: 0,
            settled: HashSet::new(),
        }
    }

    /// Build a graph from a JSON graph seed. The seed is copied.
    pub fn from_json(seed: &Value) -> Self {
        match Node::from_json(seed) {
            root @ Node::Branch(_) => Graph {
                root,
                ..Graph::new()
            },
            other => {
                tracing::warn!("Ignoring non-object cache seed: {:?}", other);
                Graph::new()
            }
        }
    }

    pub fn shared(self) -> SharedGraph {
        Arc::new(RwLock::new(self))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Bumped by every mutation that changed the graph.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The whole cache in JSON graph notation.
    pub fn to_json(&self) -> Value {
        self.root.to_json()
    }

    pub fn extract(&self, path: &[Key]) -> Resolution {
        extract::extract(&self.root, path)
    }

    /// Follow references through the intermediate segments of `path`.
    ///
    /// The final key is never dereferenced, so writes replace a reference
    /// rather than its target.
    pub fn optimize(&self, path: &[Key]) -> Result<Vec<Key>, GraphError> {
        let mut keys = path.to_vec();
        let mut hops = 0;
        loop {
            let next = {
                let mut node = &self.root;
                let mut next = None;
                for (index, key) in keys.iter().enumerate().take(keys.len().saturating_sub(1)) {
                    match node.child(key) {
                        Some(Node::Ref(target)) => {
                            next = Some(extract::redirect(target, &keys, index));
                            break;
                        }
                        Some(child @ Node::Branch(_)) => node = child,
                        _ => break,
                    }
                }
                next
            };
            let Some(next) = next else {
                return Ok(keys);
            };
            hops += 1;
            if hops > MAX_REF_HOPS {
                return Err(GraphError::ReferenceCycle {
                    path: Path::new(path.to_vec()),
                    hops,
                });
            }
            keys = next;
        }
    }

    /// Write `node` at `path`, creating branches and replacing leaves on the
    /// way. Returns the reference-free location that was written.
    pub fn set(&mut self, path: &[Key], node: Node) -> Result<Path, GraphError> {
        let keys = self.optimize(path)?;
        if keys.is_empty() {
            return Err(GraphError::EmptyPath);
        }
        self.insert_raw(&keys, node);
        self.touch();
        Ok(Path::new(keys))
    }

    /// Drop the node at `path`. Returns whether anything was removed.
    ///
    /// A settled miss at `path` is forgotten either way.
    pub fn invalidate(&mut self, path: &[Key]) -> bool {
        self.settled.remove(&Path::canonical(path));
        let Ok(keys) = self.optimize(path) else {
            return false;
        };
        let Some((last, parents)) = keys.split_last() else {
            return false;
        };
        let mut current = &mut self.root;
        for key in parents {
            let Node::Branch(children) = current else {
                return false;
            };
            match children.get_mut(key.as_map_key().as_ref()) {
                Some(child) => current = child,
                None => return false,
            }
        }
        let Node::Branch(children) = current else {
            return false;
        };
        let removed = children.remove(last.as_map_key().as_ref()).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Deep-merge a JSON graph fragment. Branches merge; everything else
    /// replaces what was there. A fragment that changes nothing leaves the
    /// version alone.
    pub fn merge(&mut self, json_graph: &Value) {
        match Node::from_json(json_graph) {
            incoming @ Node::Branch(_) => {
                if merge_node(&mut self.root, incoming) {
                    self.touch();
                }
            }
            Node::Value(Value::Null) => {}
            other => tracing::warn!("Ignoring non-object jsonGraph payload: {:?}", other),
        }
    }

    /// Merge a data source response and apply its invalidations.
    pub fn merge_envelope(&mut self, envelope: &JsonGraphEnvelope) {
        self.merge(&envelope.json_graph);
        for path in &envelope.invalidated {
            self.invalidate(path);
        }
    }

    /// Record that the data source has nothing at `path` by storing a boxed
    /// `undefined` there, so later reads resolve locally. A reference in the
    /// final position is followed and its missing target is boxed instead.
    ///
    /// Existing nodes are never overwritten.
    pub fn materialize(&mut self, path: &[Key]) -> bool {
        if self.extract(path).is_available() {
            return false;
        }
        let mut keys = path.to_vec();
        for _ in 0..=MAX_REF_HOPS {
            let Ok(optimized) = self.optimize(&keys) else {
                return false;
            };
            keys = optimized;
            match self.vacancy(&keys) {
                Vacancy::Open => {
                    self.insert_raw(&keys, Node::Atom(None));
                    self.touch();
                    return true;
                }
                Vacancy::Ref(target) => keys = target.to_vec(),
                Vacancy::Occupied => return false,
            }
        }
        false
    }

    /// Remember that `path` was fetched and still does not resolve, so it is
    /// not requested again until the graph changes.
    pub fn settle(&mut self, path: &[Key]) {
        self.settled.insert(Path::canonical(path));
    }

    pub fn is_settled(&self, path: &[Key]) -> bool {
        !self.settled.is_empty() && self.settled.contains(&Path::canonical(path))
    }

    fn vacancy(&self, keys: &[Key]) -> Vacancy {
        let Some((last, parents)) = keys.split_last() else {
            return Vacancy::Occupied;
        };
        let mut node = &self.root;
        for key in parents {
            match node.child(key) {
                Some(child @ Node::Branch(_)) => node = child,
                Some(_) => return Vacancy::Occupied,
                None => return Vacancy::Open,
            }
        }
        match node.child(last) {
            None => Vacancy::Open,
            Some(Node::Ref(target)) => Vacancy::Ref(target.clone()),
            Some(_) => Vacancy::Occupied,
        }
    }

    /// The smallest fragment of this graph that resolves `paths` the same
    /// way, references included.
    pub fn slice(&self, paths: &[Path]) -> Graph {
        let mut out = Graph::new();
        for path in paths {
            self.slice_path(path, &mut out);
        }
        out
    }

    fn slice_path(&self, path: &[Key], out: &mut Graph) {
        let mut keys = path.to_vec();
        let mut hops = 0;
        loop {
            match extract::walk(&self.root, &keys) {
                Walk::Terminal(node) => {
                    if keys.is_empty() {
                        out.root = node.clone();
                    } else {
                        out.insert_raw(&keys, node.clone());
                    }
                    return;
                }
                Walk::Missing => return,
                Walk::Redirect { target, index } => {
                    out.insert_raw(&keys[..=index], Node::Ref(Path::new(target.to_vec())));
                    hops += 1;
                    if hops > MAX_REF_HOPS {
                        return;
                    }
                    keys = extract::redirect(target, &keys, index);
                }
            }
        }
    }

    /// Resolved values for `paths` as plain JSON shaped by the requested
    /// paths: `{"json": {...}}`.
    pub fn select(&self, paths: &[Path]) -> Value {
        let mut json = Map::new();
        for path in paths {
            if let Resolution::Present(value) = self.extract(path) {
                insert_json(&mut json, path, value);
            }
        }
        serde_json::json!({ "json": Value::Object(json) })
    }

    /// A change that may resolve earlier misses.
    fn touch(&mut self) {
        self.version += 1;
        self.settled.clear();
    }

    /// Write without following references, replacing leaves on the way.
    fn insert_raw(&mut self, keys: &[Key], node: Node) {
        let Some((last, parents)) = keys.split_last() else {
            self.root = node;
            return;
        };
        let mut current = &mut self.root;
        for key in parents {
            if !current.is_branch() {
                *current = Node::branch();
            }
            let Node::Branch(children) = current else {
                return;
            };
            current = children
                .entry(key.as_map_key().into_owned())
                .or_insert_with(Node::branch);
        }
        if !current.is_branch() {
            *current = Node::branch();
        }
        if let Node::Branch(children) = current {
            children.insert(last.as_map_key().into_owned(), node);
        }
    }
}

enum Vacancy {
    Open,
    Ref(Path),
    Occupied,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns whether `target` changed.
fn merge_node(target: &mut Node, incoming: Node) -> bool {
    match (target, incoming) {
        (Node::Branch(existing), Node::Branch(incoming)) => {
            let mut changed = false;
            for (key, child) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => changed |= merge_node(slot, child),
                    None => {
                        existing.insert(key, child);
                        changed = true;
                    }
                }
            }
            changed
        }
        (slot, incoming) if *slot == incoming => false,
        (slot, incoming) => {
            *slot = incoming;
            true
        }
    }
}

fn insert_json(root: &mut Map<String, Value>, keys: &[Key], value: Value) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };
    let mut current = root;
    for key in parents {
        let slot = current
            .entry(key.as_map_key().into_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(map) = slot else {
            return;
        };
        current = map;
    }
    current.insert(last.as_map_key().into_owned(), value);
}
