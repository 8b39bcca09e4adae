use super::store::PathNetwork;
use super::{NetworkError, NodeId, PathId};
use crate::geom::Vec2;
use crate::time::TimeState;

impl PathNetwork {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Increases on every structural edit or traversability change. Moving a
    /// node does not count.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(node)
    }

    pub fn contains_path(&self, path: PathId) -> bool {
        self.paths.contains(path)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys()
    }

    pub fn path_ids(&self) -> Vec<PathId> {
        self.paths.keys()
    }

    pub fn node_position(&self, node: NodeId) -> Result<Vec2, NetworkError> {
        Ok(self.require_node(node)?.position)
    }

    pub fn path_nodes(&self, path: PathId) -> Result<(NodeId, NodeId), NetworkError> {
        let entry = self.require_path(path)?;
        Ok((entry.node_a, entry.node_b))
    }

    pub fn path_node_a(&self, path: PathId) -> Result<NodeId, NetworkError> {
        Ok(self.require_path(path)?.node_a)
    }

    pub fn path_node_b(&self, path: PathId) -> Result<NodeId, NetworkError> {
        Ok(self.require_path(path)?.node_b)
    }

    pub fn path_position_a(&self, path: PathId) -> Result<Vec2, NetworkError> {
        self.node_position(self.path_node_a(path)?)
    }

    pub fn path_position_b(&self, path: PathId) -> Result<Vec2, NetworkError> {
        self.node_position(self.path_node_b(path)?)
    }

    pub fn path_name(&self, path: PathId) -> Result<Option<&str>, NetworkError> {
        Ok(self.require_path(path)?.name.as_deref())
    }

    pub fn is_path_traversable_at(&self, path: PathId, time: TimeState) -> Result<bool, NetworkError> {
        Ok(self.require_path(path)?.traversable(time))
    }

    pub fn path_between(&self, a: NodeId, b: NodeId) -> Option<PathId> {
        self.paths
            .iter()
            .find(|(_, path)| path.joins(a, b))
            .map(|(path_id, _)| path_id)
    }

    pub fn are_nodes_connected(&self, a: NodeId, b: NodeId, time: TimeState) -> bool {
        self.nodes
            .get(a)
            .is_some_and(|node| node.neighbours(time).contains(&b))
    }

    pub fn node_neighbours(&self, node: NodeId, time: TimeState) -> Result<&[NodeId], NetworkError> {
        Ok(self.require_node(node)?.neighbours(time))
    }

    pub fn path_connections_a(
        &self,
        path: PathId,
        time: TimeState,
    ) -> Result<Vec<PathId>, NetworkError> {
        let node = self.path_node_a(path)?;
        Ok(self.path_connections(path, node, time))
    }

    pub fn path_connections_b(
        &self,
        path: PathId,
        time: TimeState,
    ) -> Result<Vec<PathId>, NetworkError> {
        let node = self.path_node_b(path)?;
        Ok(self.path_connections(path, node, time))
    }

    fn path_connections(&self, source: PathId, node: NodeId, time: TimeState) -> Vec<PathId> {
        self.paths
            .iter()
            .filter(|(path_id, path)| {
                *path_id != source && path.traversable(time) && path.touches(node)
            })
            .map(|(path_id, _)| path_id)
            .collect()
    }

    pub fn path_points_going_direction(
        &self,
        path: PathId,
        direction: Vec2,
    ) -> Result<(Vec2, Vec2), NetworkError> {
        let a = self.path_position_a(path)?;
        let b = self.path_position_b(path)?;
        if (b - a).dot(direction) > 0.0 {
            Ok((a, b))
        } else {
            Ok((b, a))
        }
    }

    pub fn path_points_coming_from(
        &self,
        path: PathId,
        position: Vec2,
    ) -> Result<(Vec2, Vec2), NetworkError> {
        let a = self.path_position_a(path)?;
        let b = self.path_position_b(path)?;
        if a.distance(position) < b.distance(position) {
            Ok((a, b))
        } else {
            Ok((b, a))
        }
    }

    pub fn nearest_node(&self, position: Vec2) -> Option<(f32, NodeId)> {
        let mut nearest: Option<(f32, NodeId)> = None;
        for (node_id, node) in self.nodes.iter() {
            let distance = position.distance(node.position);
            if nearest.map_or(true, |(best, _)| distance < best) {
                nearest = Some((distance, node_id));
            }
        }
        nearest
    }

    /// Ties go to the lowest slot.
    pub fn nearest_point_on_paths(&self, position: Vec2, time: TimeState) -> Option<(Vec2, PathId)> {
        let mut nearest: Option<(f32, Vec2, PathId)> = None;
        for (path_id, path) in self.paths.iter() {
            if !path.traversable(time) {
                continue;
            }
            let (Some(a), Some(b)) = (self.nodes.get(path.node_a), self.nodes.get(path.node_b))
            else {
                continue;
            };
            let point = project_onto_segment(a.position, b.position, position, true);
            let distance = position.distance(point);
            if nearest.map_or(true, |(best, _, _)| distance < best) {
                nearest = Some((distance, point, path_id));
            }
        }
        nearest.map(|(_, point, path_id)| (point, path_id))
    }

    pub fn nearest_point_on_path(
        &self,
        path: PathId,
        point: Vec2,
        clamp: bool,
    ) -> Result<Vec2, NetworkError> {
        let a = self.path_position_a(path)?;
        let b = self.path_position_b(path)?;
        Ok(project_onto_segment(a, b, point, clamp))
    }
}

fn project_onto_segment(a: Vec2, b: Vec2, point: Vec2, clamp: bool) -> Vec2 {
    let offset = b - a;
    let length_squared = offset.length_squared();
    if length_squared == 0.0 {
        return a;
    }
    let t = (point - a).dot(offset) / length_squared;
    if clamp {
        if t <= 0.0 {
            return a;
        }
        if t >= 1.0 {
            return b;
        }
    }
    a + offset * t
}
