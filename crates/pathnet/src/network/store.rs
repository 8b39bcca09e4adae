use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use super::arena::Arena;
use super::{NetworkError, NodeId, PathId};
use crate::geom::Vec2;
use crate::time::TimeState;

#[derive(Debug, Clone)]
pub(super) struct PathNode {
    pub(super) position: Vec2,
    pub(super) past_neighbours: Vec<NodeId>,
    pub(super) future_neighbours: Vec<NodeId>,
}

impl PathNode {
    fn new(position: Vec2) -> Self {
        Self {
            position,
            past_neighbours: Vec::new(),
            future_neighbours: Vec::new(),
        }
    }

    pub(super) fn neighbours(&self, time: TimeState) -> &[NodeId] {
        match time {
            TimeState::Past => &self.past_neighbours,
            TimeState::Future => &self.future_neighbours,
        }
    }

    fn neighbours_mut(&mut self, time: TimeState) -> &mut Vec<NodeId> {
        match time {
            TimeState::Past => &mut self.past_neighbours,
            TimeState::Future => &mut self.future_neighbours,
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct Path {
    pub(super) node_a: NodeId,
    pub(super) node_b: NodeId,
    pub(super) name: Option<String>,
    pub(super) past_traversable: bool,
    pub(super) future_traversable: bool,
}

impl Path {
    fn new(node_a: NodeId, node_b: NodeId) -> Self {
        Self {
            node_a,
            node_b,
            name: None,
            past_traversable: true,
            future_traversable: true,
        }
    }

    pub(super) fn traversable(&self, time: TimeState) -> bool {
        match time {
            TimeState::Past => self.past_traversable,
            TimeState::Future => self.future_traversable,
        }
    }

    fn set_traversable(&mut self, time: TimeState, traversable: bool) {
        match time {
            TimeState::Past => self.past_traversable = traversable,
            TimeState::Future => self.future_traversable = traversable,
        }
    }

    pub(super) fn touches(&self, node: NodeId) -> bool {
        self.node_a == node || self.node_b == node
    }

    pub(super) fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.node_a == node {
            Some(self.node_b)
        } else if self.node_b == node {
            Some(self.node_a)
        } else {
            None
        }
    }

    pub(super) fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.node_a == a && self.node_b == b) || (self.node_a == b && self.node_b == a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathNetwork {
    pub(super) nodes: Arena<NodeId, PathNode>,
    pub(super) paths: Arena<PathId, Path>,
    pub(super) revision: u64,
}

impl PathNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, position: Vec2) -> NodeId {
        let node = self.nodes.insert(PathNode::new(position));
        self.bump_revision();
        debug!(node = %node, x = position.x, y = position.y, "node_created");
        node
    }

    pub fn fork_node(&mut self, node: NodeId, position: Vec2) -> Result<NodeId, NetworkError> {
        self.require_node(node)?;
        let forked = self.nodes.insert(PathNode::new(position));
        let path = self.paths.insert(Path::new(node, forked));
        self.link_path(path);
        self.bump_revision();
        debug!(from = %node, node = %forked, path = %path, "node_forked");
        Ok(forked)
    }

    pub fn fork_nearest_node(&mut self, position: Vec2) -> Result<NodeId, NetworkError> {
        let (_, nearest) = self
            .nearest_node(position)
            .ok_or(NetworkError::EmptyNetwork)?;
        self.fork_node(nearest, position)
    }

    pub fn connect_nodes(&mut self, a: NodeId, b: NodeId) -> Result<PathId, NetworkError> {
        self.require_node(a)?;
        self.require_node(b)?;
        if a == b {
            return Err(NetworkError::SelfLoop(a));
        }
        if let Some(existing) = self.path_between(a, b) {
            return Err(NetworkError::AlreadyConnected { a, b, existing });
        }

        let path = self.paths.insert(Path::new(a, b));
        self.link_path(path);
        self.bump_revision();
        debug!(a = %a, b = %b, path = %path, "nodes_connected");
        Ok(path)
    }

    /// Returns the survivor, the node in the lower slot. Duplicate paths to a shared
    /// neighbour collapse into the first one, which takes the union of their traversability.
    pub fn merge_node(&mut self, node_a: NodeId, node_b: NodeId) -> Result<NodeId, NetworkError> {
        self.require_node(node_a)?;
        self.require_node(node_b)?;
        if node_a == node_b {
            return Err(NetworkError::MergeSameNode(node_a));
        }

        let (survivor, discarded) = if node_a.raw().slot() < node_b.raw().slot() {
            (node_a, node_b)
        } else {
            (node_b, node_a)
        };

        let mut affected: BTreeSet<NodeId> = BTreeSet::new();
        for node in [survivor, discarded] {
            if let Some(entry) = self.nodes.get(node) {
                affected.extend(entry.past_neighbours.iter().copied());
                affected.extend(entry.future_neighbours.iter().copied());
            }
        }
        self.nodes.remove(discarded);
        affected.remove(&discarded);
        affected.insert(survivor);

        for (_, path) in self.paths.iter_mut() {
            if path.node_a == discarded {
                path.node_a = survivor;
            }
            if path.node_b == discarded {
                path.node_b = survivor;
            }
        }

        let mut kept_by_neighbour: HashMap<NodeId, PathId> = HashMap::new();
        let mut doomed: Vec<PathId> = Vec::new();
        let mut inherited: Vec<(PathId, Path)> = Vec::new();
        for (path_id, path) in self.paths.iter() {
            let Some(other) = path.other_end(survivor) else {
                continue;
            };
            if other == survivor {
                doomed.push(path_id);
            } else if let Some(kept) = kept_by_neighbour.get(&other) {
                doomed.push(path_id);
                inherited.push((*kept, path.clone()));
            } else {
                kept_by_neighbour.insert(other, path_id);
            }
        }

        for (kept, duplicate) in inherited {
            if let Some(path) = self.paths.get_mut(kept) {
                path.past_traversable |= duplicate.past_traversable;
                path.future_traversable |= duplicate.future_traversable;
                if path.name.is_none() {
                    path.name = duplicate.name;
                }
            }
        }
        let removed_paths = doomed.len();
        for path in doomed {
            self.paths.remove(path);
        }

        for node in affected {
            self.rebuild_neighbours(node);
        }
        self.bump_revision();
        debug!(
            survivor = %survivor,
            discarded = %discarded,
            removed_paths,
            "nodes_merged"
        );
        Ok(survivor)
    }

    pub fn erase_node(&mut self, node: NodeId) -> Result<(), NetworkError> {
        self.require_node(node)?;
        let touching: Vec<PathId> = self
            .paths
            .iter()
            .filter(|(_, path)| path.touches(node))
            .map(|(path_id, _)| path_id)
            .collect();
        let removed_paths = touching.len();
        for path in touching {
            self.remove_path_entry(path);
        }
        self.nodes.remove(node);
        self.bump_revision();
        debug!(node = %node, removed_paths, "node_erased");
        Ok(())
    }

    pub fn erase_orphan_nodes(&mut self) -> usize {
        let connected: HashSet<NodeId> = self
            .paths
            .iter()
            .flat_map(|(_, path)| [path.node_a, path.node_b])
            .collect();
        let orphans: Vec<NodeId> = self
            .nodes
            .keys()
            .into_iter()
            .filter(|node| !connected.contains(node))
            .collect();

        for node in &orphans {
            self.nodes.remove(*node);
        }
        if !orphans.is_empty() {
            self.bump_revision();
            debug!(removed = orphans.len(), "orphan_nodes_erased");
        }
        orphans.len()
    }

    /// The split path keeps its A end; a new path runs from the new node to the old B end.
    pub fn break_path(
        &mut self,
        path: PathId,
        midpoint: Option<Vec2>,
    ) -> Result<NodeId, NetworkError> {
        let existing = self.require_path(path)?.clone();
        let midpoint = match midpoint {
            Some(position) => position,
            None => {
                let a = self.require_node(existing.node_a)?.position;
                let b = self.require_node(existing.node_b)?.position;
                (a + b) / 2.0
            }
        };

        self.unlink_path(path);
        let middle = self.nodes.insert(PathNode::new(midpoint));
        if let Some(entry) = self.paths.get_mut(path) {
            entry.node_b = middle;
        }
        let second_half = self.paths.insert(Path {
            node_a: middle,
            node_b: existing.node_b,
            name: None,
            past_traversable: existing.past_traversable,
            future_traversable: existing.future_traversable,
        });
        self.link_path(path);
        self.link_path(second_half);
        self.bump_revision();
        debug!(path = %path, node = %middle, new_path = %second_half, "path_broken");
        Ok(middle)
    }

    pub fn erase_path(&mut self, path: PathId) -> Result<(), NetworkError> {
        self.require_path(path)?;
        self.remove_path_entry(path);
        self.bump_revision();
        debug!(path = %path, "path_erased");
        Ok(())
    }

    pub fn move_node(&mut self, node: NodeId, position: Vec2) -> Result<(), NetworkError> {
        let entry = self
            .nodes
            .get_mut(node)
            .ok_or(NetworkError::StaleNode(node))?;
        entry.position = position;
        Ok(())
    }

    pub fn set_path_traversable(
        &mut self,
        path: PathId,
        time: TimeState,
        traversable: bool,
    ) -> Result<(), NetworkError> {
        let entry = self
            .paths
            .get_mut(path)
            .ok_or(NetworkError::StalePath(path))?;
        if entry.traversable(time) == traversable {
            return Ok(());
        }
        entry.set_traversable(time, traversable);
        let (a, b) = (entry.node_a, entry.node_b);
        if traversable {
            self.link(a, b, time);
        } else {
            self.unlink(a, b, time);
        }
        self.bump_revision();
        debug!(path = %path, time = time.name(), traversable, "path_traversability_changed");
        Ok(())
    }

    pub fn set_path_name(&mut self, path: PathId, name: Option<String>) -> Result<(), NetworkError> {
        let entry = self
            .paths
            .get_mut(path)
            .ok_or(NetworkError::StalePath(path))?;
        entry.name = name;
        Ok(())
    }

    pub fn named_path(&self, name: &str) -> Result<PathId, NetworkError> {
        let matches: Vec<PathId> = self
            .paths
            .iter()
            .filter(|(_, path)| path.name.as_deref() == Some(name))
            .map(|(path_id, _)| path_id)
            .collect();

        match matches.as_slice() {
            [single] => Ok(*single),
            [] => {
                warn!(path_name = name, "named_path_not_found");
                Err(NetworkError::NamedPathNotFound(name.to_string()))
            }
            _ => {
                warn!(path_name = name, count = matches.len(), "named_path_ambiguous");
                Err(NetworkError::AmbiguousPathName {
                    name: name.to_string(),
                    count: matches.len(),
                })
            }
        }
    }

    pub(super) fn require_node(&self, node: NodeId) -> Result<&PathNode, NetworkError> {
        self.nodes.get(node).ok_or(NetworkError::StaleNode(node))
    }

    pub(super) fn require_path(&self, path: PathId) -> Result<&Path, NetworkError> {
        self.paths.get(path).ok_or(NetworkError::StalePath(path))
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn remove_path_entry(&mut self, path: PathId) {
        self.unlink_path(path);
        self.paths.remove(path);
    }

    fn link_path(&mut self, path: PathId) {
        let Some(entry) = self.paths.get(path) else {
            return;
        };
        let (a, b) = (entry.node_a, entry.node_b);
        let times: Vec<TimeState> = TimeState::ALL
            .into_iter()
            .filter(|time| entry.traversable(*time))
            .collect();
        for time in times {
            self.link(a, b, time);
        }
    }

    fn unlink_path(&mut self, path: PathId) {
        let Some(entry) = self.paths.get(path) else {
            return;
        };
        let (a, b) = (entry.node_a, entry.node_b);
        for time in TimeState::ALL {
            self.unlink(a, b, time);
        }
    }

    fn link(&mut self, a: NodeId, b: NodeId, time: TimeState) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(node) = self.nodes.get_mut(from) {
                let neighbours = node.neighbours_mut(time);
                if !neighbours.contains(&to) {
                    neighbours.push(to);
                }
            }
        }
    }

    fn unlink(&mut self, a: NodeId, b: NodeId, time: TimeState) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(node) = self.nodes.get_mut(from) {
                node.neighbours_mut(time).retain(|neighbour| *neighbour != to);
            }
        }
    }

    fn rebuild_neighbours(&mut self, node: NodeId) {
        let mut past = Vec::new();
        let mut future = Vec::new();
        for (_, path) in self.paths.iter() {
            let Some(other) = path.other_end(node) else {
                continue;
            };
            if other == node {
                continue;
            }
            if path.past_traversable && !past.contains(&other) {
                past.push(other);
            }
            if path.future_traversable && !future.contains(&other) {
                future.push(other);
            }
        }
        if let Some(entry) = self.nodes.get_mut(node) {
            entry.past_neighbours = past;
            entry.future_neighbours = future;
        }
    }

    #[cfg(test)]
    pub(crate) fn validate(&self) -> Result<(), String> {
        let mut pairs: HashSet<(NodeId, NodeId)> = HashSet::new();
        for (path_id, path) in self.paths.iter() {
            if !self.nodes.contains(path.node_a) || !self.nodes.contains(path.node_b) {
                return Err(format!("{path_id} references a removed node"));
            }
            if path.node_a == path.node_b {
                return Err(format!("{path_id} is a self-loop"));
            }
            let key = (path.node_a.min(path.node_b), path.node_a.max(path.node_b));
            if !pairs.insert(key) {
                return Err(format!("{path_id} duplicates another path"));
            }
        }

        for (node_id, node) in self.nodes.iter() {
            for time in TimeState::ALL {
                let mut expected: Vec<NodeId> = self
                    .paths
                    .iter()
                    .filter(|(_, path)| path.traversable(time))
                    .filter_map(|(_, path)| path.other_end(node_id))
                    .collect();
                let mut actual = node.neighbours(time).to_vec();
                expected.sort();
                actual.sort();
                if expected != actual {
                    return Err(format!(
                        "{node_id} {} neighbours {actual:?} != expected {expected:?}",
                        time.name()
                    ));
                }
            }
        }
        Ok(())
    }
}
