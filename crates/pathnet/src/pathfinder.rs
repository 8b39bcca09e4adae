use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::geom::Vec2;
use crate::heap::Heap;
use crate::network::{NetworkError, NodeId, PathId, PathNetwork};
use crate::time::TimeState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("no route from {start} to {goal}")]
    NotFound { start: NodeId, goal: NodeId },
    #[error(transparent)]
    Network(#[from] NetworkError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub nodes: Option<Vec<NodeId>>,
    pub nearest_start: Vec2,
    pub nearest_goal: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct SearchRecord {
    node: NodeId,
    parent: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    node: NodeId,
    record: usize,
    g_score: f32,
    h_score: f32,
}

impl OpenEntry {
    fn f_score(&self) -> f32 {
        self.g_score + self.h_score
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score()
            .total_cmp(&other.f_score())
            .then_with(|| self.h_score.total_cmp(&other.h_score))
            .then_with(|| self.node.cmp(&other.node))
    }
}

pub struct Pathfinder<'a> {
    network: &'a PathNetwork,
}

impl<'a> Pathfinder<'a> {
    pub fn new(network: &'a PathNetwork) -> Self {
        Self { network }
    }

    pub fn find_path(
        &self,
        start: NodeId,
        goal: NodeId,
        time: TimeState,
    ) -> Result<Vec<NodeId>, SearchError> {
        let goal_position = self.network.node_position(goal)?;
        let start_position = self.network.node_position(start)?;

        let mut open: Heap<OpenEntry> = Heap::min();
        let mut closed: HashSet<NodeId> = HashSet::new();
        let mut g_scores: HashMap<NodeId, f32> = HashMap::new();
        let mut records: Vec<SearchRecord> = vec![SearchRecord {
            node: start,
            parent: None,
        }];

        open.push(OpenEntry {
            node: start,
            record: 0,
            g_score: 0.0,
            h_score: start_position.distance(goal_position),
        });
        g_scores.insert(start, 0.0);

        let mut expanded = 0usize;
        while let Some(current) = open.pop() {
            if current.node == goal {
                let path = reconstruct_path(&records, current.record);
                debug!(
                    start = %start,
                    goal = %goal,
                    time = time.name(),
                    expanded,
                    nodes = path.len(),
                    cost = current.g_score,
                    "astar_found"
                );
                return Ok(path);
            }
            if !closed.insert(current.node) {
                continue;
            }
            expanded += 1;

            let current_position = self.network.node_position(current.node)?;
            for &neighbour in self.network.node_neighbours(current.node, time)? {
                if closed.contains(&neighbour) {
                    continue;
                }

                let neighbour_position = self.network.node_position(neighbour)?;
                let g_score = current.g_score + current_position.distance(neighbour_position);
                let known = g_scores.get(&neighbour).copied();
                if known.is_some_and(|known| g_score >= known) {
                    continue;
                }

                records.push(SearchRecord {
                    node: neighbour,
                    parent: Some(current.record),
                });
                let entry = OpenEntry {
                    node: neighbour,
                    record: records.len() - 1,
                    g_score,
                    h_score: neighbour_position.distance(goal_position),
                };
                if known.is_some() {
                    // Matched by node, not by score: the queued entry carries
                    // the old parent and cost.
                    open.replace_by(|queued| queued.node == neighbour, entry);
                } else {
                    open.push(entry);
                }
                g_scores.insert(neighbour, g_score);
            }
        }

        debug!(
            start = %start,
            goal = %goal,
            time = time.name(),
            expanded,
            "astar_exhausted"
        );
        Err(SearchError::NotFound { start, goal })
    }

    pub fn check_path_still_valid(&self, path: &[NodeId], time: TimeState) -> bool {
        path.windows(2)
            .all(|pair| self.network.are_nodes_connected(pair[0], pair[1], time))
    }

    /// Snaps both positions onto the nearest walkable path. The node sequence starts
    /// and ends at the far ends of those paths so the first and last legs pass through
    /// the snapped points.
    pub fn plan_between_positions(
        &self,
        start_position: Vec2,
        goal_position: Vec2,
        time: TimeState,
    ) -> Option<RoutePlan> {
        let (nearest_start, start_path) = self.network.nearest_point_on_paths(start_position, time)?;
        let (nearest_goal, goal_path) = self.network.nearest_point_on_paths(goal_position, time)?;
        let (start, alternate_start) = self.nearer_end(start_path, nearest_start).ok()?;
        let (goal, alternate_goal) = self.nearer_end(goal_path, nearest_goal).ok()?;

        let nodes = match self.find_path(start, goal, time) {
            Ok(mut nodes) => {
                if !nodes.contains(&alternate_start) {
                    nodes.insert(0, alternate_start);
                }
                if !nodes.contains(&alternate_goal) {
                    nodes.push(alternate_goal);
                }
                Some(nodes)
            }
            Err(error) => {
                debug!(error = %error, "route_not_found");
                None
            }
        };

        Some(RoutePlan {
            nodes,
            nearest_start,
            nearest_goal,
        })
    }

    fn nearer_end(&self, path: PathId, point: Vec2) -> Result<(NodeId, NodeId), NetworkError> {
        let (a, b) = self.network.path_nodes(path)?;
        let a_distance = self.network.node_position(a)?.distance(point);
        let b_distance = self.network.node_position(b)?.distance(point);
        if a_distance < b_distance {
            Ok((a, b))
        } else {
            Ok((b, a))
        }
    }
}

fn reconstruct_path(records: &[SearchRecord], last: usize) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut cursor = Some(last);
    while let Some(index) = cursor {
        let record = records[index];
        path.push(record.node);
        cursor = record.parent;
    }
    path.reverse();
    path
}
