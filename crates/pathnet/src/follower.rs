use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geom::Vec2;
use crate::network::{NetworkError, NodeId, PathId, PathNetwork};
use crate::pathfinder::Pathfinder;
use crate::time::{TimeState, TimeTransition};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerConfig {
    pub speed: f32,
    pub intersection_size: f32,
    pub max_path_error_degrees: f32,
    pub path_lerp_rate: f32,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            speed: 40.0,
            intersection_size: 12.0,
            max_path_error_degrees: 60.0,
            path_lerp_rate: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerEvent {
    Replanned,
    Abandoned,
    Arrived,
}

#[derive(Debug, Clone)]
struct Plan {
    nodes: Vec<NodeId>,
    end_position: Vec2,
}

#[derive(Debug, Clone)]
pub struct PathFollower {
    config: FollowerConfig,
    position: Vec2,
    plan: Option<Plan>,
    // None forces the next fixed update to revalidate.
    validated: Option<(u64, TimeState)>,
}

impl PathFollower {
    pub fn new(config: FollowerConfig, position: Vec2) -> Self {
        Self {
            config,
            position,
            plan: None,
            validated: None,
        }
    }

    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn is_pathfinding(&self) -> bool {
        self.plan.is_some()
    }

    pub fn planned_nodes(&self) -> Option<&[NodeId]> {
        self.plan.as_ref().map(|plan| plan.nodes.as_slice())
    }

    pub fn planned_end(&self) -> Option<Vec2> {
        self.plan.as_ref().map(|plan| plan.end_position)
    }

    pub fn pathfind_to(&mut self, network: &PathNetwork, time: TimeState, target: Vec2) -> bool {
        let route = Pathfinder::new(network)
            .plan_between_positions(self.position, target, time)
            .and_then(|plan| plan.nodes.map(|nodes| (nodes, plan.nearest_goal)));

        match route {
            Some((nodes, end_position)) => {
                debug!(
                    nodes = nodes.len(),
                    end_x = end_position.x,
                    end_y = end_position.y,
                    "route_planned"
                );
                self.plan = Some(Plan {
                    nodes,
                    end_position,
                });
                self.validated = Some((network.revision(), time));
                true
            }
            None => {
                debug!(target_x = target.x, target_y = target.y, "pathfind_failed");
                self.stop_pathfinding();
                false
            }
        }
    }

    pub fn stop_pathfinding(&mut self) {
        self.plan = None;
        self.validated = None;
    }

    pub fn mark_stale(&mut self) {
        self.validated = None;
    }

    pub fn on_time_changed(&mut self, transition: TimeTransition) {
        if self.plan.is_some() {
            debug!(
                from = transition.from.name(),
                to = transition.to.name(),
                "plan_marked_stale"
            );
        }
        self.mark_stale();
    }

    pub fn fixed_update(&mut self, network: &PathNetwork, time: TimeState) -> Option<FollowerEvent> {
        let plan = self.plan.as_ref()?;
        let stamp = (network.revision(), time);
        if self.validated == Some(stamp) {
            return None;
        }

        let final_edge_intact = match plan.nodes.as_slice() {
            [.., before_last, last] => network.are_nodes_connected(*before_last, *last, time),
            _ => false,
        };
        let reason = if !final_edge_intact {
            "final_edge_broken"
        } else if !Pathfinder::new(network).check_path_still_valid(&plan.nodes, time) {
            "path_broken"
        } else {
            self.validated = Some(stamp);
            return None;
        };

        let end_position = plan.end_position;
        debug!(reason, "plan_invalidated");
        if self.pathfind_to(network, time, end_position) {
            Some(FollowerEvent::Replanned)
        } else {
            warn!(
                reason,
                end_x = end_position.x,
                end_y = end_position.y,
                "replan_failed"
            );
            Some(FollowerEvent::Abandoned)
        }
    }

    pub fn frame_update(&mut self, network: &PathNetwork, delta_seconds: f32) -> Option<FollowerEvent> {
        let target = self.pathfinding_target(network)?;
        self.position = self
            .position
            .move_towards(target, self.config.speed * delta_seconds);
        if self.position != target {
            return None;
        }

        let plan = self.plan.as_mut()?;
        plan.nodes.remove(0);
        if plan.nodes.len() <= 1 {
            self.stop_pathfinding();
            return Some(FollowerEvent::Arrived);
        }
        None
    }

    pub fn pathfinding_target(&self, network: &PathNetwork) -> Option<Vec2> {
        let plan = self.plan.as_ref()?;
        if plan.nodes.len() > 2 {
            network.node_position(plan.nodes[1]).ok()
        } else {
            Some(plan.end_position)
        }
    }

    pub fn pathfinding_direction(&self, network: &PathNetwork) -> Option<Vec2> {
        self.pathfinding_target(network)
            .map(|target| (target - self.position).normalized())
    }

    pub fn walk_towards(
        &mut self,
        network: &PathNetwork,
        time: TimeState,
        input_direction: Vec2,
        delta_seconds: f32,
    ) -> Vec2 {
        self.stop_pathfinding();

        let mut movement = Vec2::ZERO;
        let nearest_point = if input_direction.is_zero() {
            match network.nearest_point_on_paths(self.position, time) {
                Some((point, _)) => point,
                None => return Vec2::ZERO,
            }
        } else {
            let chosen = match self.choose_path_to_walk_on(network, time, input_direction) {
                Ok(Some(chosen)) => chosen,
                Ok(None) => return Vec2::ZERO,
                Err(error) => {
                    warn!(error = %error, "walk_path_lookup_failed");
                    return Vec2::ZERO;
                }
            };
            let (path, path_end) = chosen;
            self.position = self
                .position
                .move_towards(path_end, self.config.speed * delta_seconds);
            movement = (path_end - self.position).normalized();

            match network.nearest_point_on_path(path, self.position, false) {
                Ok(point) => point,
                Err(_) => return movement,
            }
        };

        let lerp_amount = 1.0 - (1.0 - self.config.path_lerp_rate).powf(delta_seconds);
        self.position = self.position.lerp(nearest_point, lerp_amount);
        movement
    }

    fn choose_path_to_walk_on(
        &self,
        network: &PathNetwork,
        time: TimeState,
        direction: Vec2,
    ) -> Result<Option<(PathId, Vec2)>, NetworkError> {
        let candidates = self.walkable_paths(network, time)?;
        let Some(&first) = candidates.first() else {
            return Ok(None);
        };

        let mut best = (first, f32::INFINITY, self.position);
        if candidates.len() == 1 {
            // Alone on a path: either way along it is fine.
            let (start, end) = network.path_points_going_direction(first, direction)?;
            best = (first, (end - start).angle_degrees(direction), end);
        } else {
            for &path in &candidates {
                let (start, end) = network.path_points_coming_from(path, self.position)?;
                let error = (end - start).angle_degrees(direction);
                if error < best.1 {
                    best = (path, error, end);
                }
            }
        }

        let (path, error, end) = best;
        if error < self.config.max_path_error_degrees {
            Ok(Some((path, end)))
        } else {
            Ok(Some((path, self.position)))
        }
    }

    fn walkable_paths(&self, network: &PathNetwork, time: TimeState) -> Result<Vec<PathId>, NetworkError> {
        let Some((_, nearest)) = network.nearest_point_on_paths(self.position, time) else {
            return Ok(Vec::new());
        };

        let mut paths = vec![nearest];
        if network.path_position_a(nearest)?.distance(self.position) < self.config.intersection_size {
            paths.extend(network.path_connections_a(nearest, time)?);
        }
        if network.path_position_b(nearest)?.distance(self.position) < self.config.intersection_size {
            paths.extend(network.path_connections_b(nearest, time)?);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn line_network() -> (PathNetwork, [NodeId; 4]) {
        let mut network = PathNetwork::new();
        let n0 = network.create_node(v(0.0, 0.0));
        let n1 = network.fork_node(n0, v(10.0, 0.0)).expect("n1");
        let n2 = network.fork_node(n1, v(20.0, 0.0)).expect("n2");
        let n3 = network.fork_node(n2, v(30.0, 0.0)).expect("n3");
        (network, [n0, n1, n2, n3])
    }

    fn run_until_arrived(follower: &mut PathFollower, network: &PathNetwork) -> usize {
        for frame in 1..=200 {
            if follower.frame_update(network, 0.1) == Some(FollowerEvent::Arrived) {
                return frame;
            }
        }
        panic!("follower never arrived");
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: FollowerConfig = serde_json::from_str(r#"{ "speed": 10.0 }"#).expect("parse");
        assert_eq!(config.speed, 10.0);
        assert_eq!(config.intersection_size, 12.0);
        assert_eq!(config.max_path_error_degrees, 60.0);
        assert_eq!(config.path_lerp_rate, 0.9);
    }

    #[test]
    fn follows_plan_to_snapped_goal() {
        let (network, [n0, n1, n2, n3]) = line_network();
        let mut follower = PathFollower::new(FollowerConfig::default(), v(0.0, 0.0));

        assert!(follower.pathfind_to(&network, TimeState::Past, v(30.0, 2.0)));
        assert_eq!(follower.planned_nodes(), Some(&[n0, n1, n2, n3][..]));
        assert_eq!(follower.planned_end(), Some(v(30.0, 0.0)));
        assert_eq!(follower.pathfinding_target(&network), Some(v(10.0, 0.0)));
        assert_eq!(follower.pathfinding_direction(&network), Some(v(1.0, 0.0)));

        run_until_arrived(&mut follower, &network);
        assert!(!follower.is_pathfinding());
        assert_eq!(follower.position(), v(30.0, 0.0));
        assert_eq!(follower.pathfinding_target(&network), None);
    }

    #[test]
    fn pops_waypoints_on_exact_arrival() {
        let (network, [_, n1, n2, n3]) = line_network();
        let mut follower = PathFollower::new(FollowerConfig::default(), v(0.0, 0.0));
        assert!(follower.pathfind_to(&network, TimeState::Past, v(30.0, 0.0)));

        // 40 units/s for 0.25 s lands exactly on n1.
        assert_eq!(follower.frame_update(&network, 0.25), None);
        assert_eq!(follower.position(), v(10.0, 0.0));
        assert_eq!(follower.planned_nodes(), Some(&[n1, n2, n3][..]));
    }

    #[test]
    fn unreachable_target_leaves_follower_idle() {
        let (mut network, [_, n1, n2, _]) = line_network();
        let middle = network.path_between(n1, n2).expect("middle");
        network
            .set_path_traversable(middle, TimeState::Future, false)
            .expect("gate");

        let mut follower = PathFollower::new(FollowerConfig::default(), v(0.0, 0.0));
        assert!(follower.pathfind_to(&network, TimeState::Past, v(30.0, 0.0)));
        assert!(!follower.pathfind_to(&network, TimeState::Future, v(30.0, 0.0)));
        assert!(!follower.is_pathfinding());
        assert_eq!(follower.frame_update(&network, 0.1), None);
        assert_eq!(follower.position(), v(0.0, 0.0));
    }

    #[test]
    fn erased_leg_triggers_replan_through_detour() {
        let (mut network, [n0, n1, n2, n3]) = line_network();
        let detour = network.fork_node(n1, v(15.0, 5.0)).expect("detour");
        network.connect_nodes(detour, n2).expect("rejoin");

        let mut follower = PathFollower::new(FollowerConfig::default(), v(0.0, 0.0));
        assert!(follower.pathfind_to(&network, TimeState::Past, v(30.0, 0.0)));
        assert_eq!(follower.planned_nodes(), Some(&[n0, n1, n2, n3][..]));
        assert_eq!(follower.fixed_update(&network, TimeState::Past), None);

        let middle = network.path_between(n1, n2).expect("middle");
        network.erase_path(middle).expect("erase");

        assert_eq!(
            follower.fixed_update(&network, TimeState::Past),
            Some(FollowerEvent::Replanned)
        );
        assert_eq!(follower.planned_nodes(), Some(&[n0, n1, detour, n2, n3][..]));

        run_until_arrived(&mut follower, &network);
        assert_eq!(follower.position(), v(30.0, 0.0));
    }

    #[test]
    fn broken_final_edge_without_alternative_abandons() {
        let (mut network, [_, _, n2, n3]) = line_network();
        let mut follower = PathFollower::new(FollowerConfig::default(), v(0.0, 0.0));
        assert!(follower.pathfind_to(&network, TimeState::Past, v(30.0, 0.0)));

        let last = network.path_between(n2, n3).expect("last");
        network.erase_path(last).expect("erase");

        // The goal now snaps onto the n1-n2 leg, which is still reachable.
        assert_eq!(
            follower.fixed_update(&network, TimeState::Past),
            Some(FollowerEvent::Replanned)
        );
        assert_eq!(follower.planned_end(), Some(v(20.0, 0.0)));

        let mut isolated = PathNetwork::new();
        let a = isolated.create_node(v(0.0, 0.0));
        let b = isolated.fork_node(a, v(10.0, 0.0)).expect("b");
        let c = isolated.create_node(v(50.0, 0.0));
        let d = isolated.fork_node(c, v(60.0, 0.0)).expect("d");
        let far = isolated.path_between(c, d).expect("far");
        let mut follower = PathFollower::new(FollowerConfig::default(), v(0.0, 0.0));
        assert!(!follower.pathfind_to(&isolated, TimeState::Past, v(60.0, 0.0)));

        let near = isolated.path_between(a, b).expect("near");
        isolated.connect_nodes(b, c).expect("bridge");
        assert!(follower.pathfind_to(&isolated, TimeState::Past, v(60.0, 0.0)));
        isolated
            .set_path_traversable(far, TimeState::Past, false)
            .expect("gate far");
        isolated
            .set_path_traversable(near, TimeState::Past, false)
            .expect("gate near");
        let bridge = isolated.path_between(b, c).expect("bridge");
        isolated.erase_path(bridge).expect("erase bridge");

        assert_eq!(
            follower.fixed_update(&isolated, TimeState::Past),
            Some(FollowerEvent::Abandoned)
        );
        assert!(!follower.is_pathfinding());
    }

    #[test]
    fn time_change_revalidates_against_new_state() {
        let (mut network, [_, n1, n2, _]) = line_network();
        let middle = network.path_between(n1, n2).expect("middle");
        network
            .set_path_traversable(middle, TimeState::Future, false)
            .expect("gate");

        let mut follower = PathFollower::new(FollowerConfig::default(), v(0.0, 0.0));
        assert!(follower.pathfind_to(&network, TimeState::Past, v(30.0, 0.0)));
        assert_eq!(follower.fixed_update(&network, TimeState::Past), None);

        follower.on_time_changed(TimeTransition {
            from: TimeState::Past,
            to: TimeState::Future,
        });
        assert_eq!(
            follower.fixed_update(&network, TimeState::Future),
            Some(FollowerEvent::Abandoned)
        );
        assert!(!follower.is_pathfinding());
    }

    #[test]
    fn stop_pathfinding_clears_plan() {
        let (network, _) = line_network();
        let mut follower = PathFollower::new(FollowerConfig::default(), v(0.0, 0.0));
        assert!(follower.pathfind_to(&network, TimeState::Past, v(25.0, 0.0)));
        follower.stop_pathfinding();
        assert!(!follower.is_pathfinding());
        assert_eq!(follower.planned_nodes(), None);
        assert_eq!(follower.fixed_update(&network, TimeState::Past), None);
    }

    #[test]
    fn walking_along_line_drifts_onto_path() {
        let (network, _) = line_network();
        let mut follower = PathFollower::new(FollowerConfig::default(), v(2.0, 0.5));
        assert!(follower.pathfind_to(&network, TimeState::Past, v(30.0, 0.0)));

        let movement = follower.walk_towards(&network, TimeState::Past, v(1.0, 0.0), 0.1);

        assert!(!follower.is_pathfinding());
        assert!(movement.x > 0.99);
        let position = follower.position();
        assert!(position.x > 5.9 && position.x < 6.1, "x = {}", position.x);
        assert!(position.y > 0.0 && position.y < 0.25, "y = {}", position.y);
    }

    #[test]
    fn walking_across_paths_stays_put() {
        let (network, _) = line_network();
        let mut follower = PathFollower::new(FollowerConfig::default(), v(5.0, 0.0));

        let movement = follower.walk_towards(&network, TimeState::Past, v(0.0, 1.0), 0.1);

        assert_eq!(movement, Vec2::ZERO);
        assert_eq!(follower.position(), v(5.0, 0.0));
    }

    #[test]
    fn lone_path_can_be_walked_either_way() {
        let mut network = PathNetwork::new();
        let a = network.create_node(v(0.0, 0.0));
        network.fork_node(a, v(100.0, 0.0)).expect("b");
        let mut follower = PathFollower::new(FollowerConfig::default(), v(50.0, 0.0));

        let movement = follower.walk_towards(&network, TimeState::Past, v(-1.0, 0.2), 0.5);

        assert!(approx(movement.x, -1.0) && approx(movement.y, 0.0));
        assert!(approx(follower.position().x, 30.0));
        assert!(approx(follower.position().y, 0.0));
    }

    #[test]
    fn zero_input_pulls_toward_nearest_path() {
        let (network, _) = line_network();
        let mut follower = PathFollower::new(FollowerConfig::default(), v(5.0, 3.0));

        let movement = follower.walk_towards(&network, TimeState::Past, Vec2::ZERO, 1.0);

        assert_eq!(movement, Vec2::ZERO);
        assert!(approx(follower.position().x, 5.0));
        assert!(approx(follower.position().y, 0.3));
    }

    #[test]
    fn walking_on_empty_network_does_nothing() {
        let network = PathNetwork::new();
        let mut follower = PathFollower::new(FollowerConfig::default(), v(1.0, 1.0));
        assert_eq!(
            follower.walk_towards(&network, TimeState::Past, v(1.0, 0.0), 0.1),
            Vec2::ZERO
        );
        assert_eq!(follower.position(), v(1.0, 1.0));
    }
}
