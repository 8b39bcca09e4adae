use pathnet::{
    AgentId, NetworkError, NodeId, PathId, PathNetwork, Simulation, TimeState, Timeline, Vec2,
};
use tracing::info;

use super::config::DemoConfig;

pub(crate) const HOME: Vec2 = Vec2 { x: 0.0, y: 0.0 };
pub(crate) const MARKET: Vec2 = Vec2 { x: 120.0, y: 0.0 };
pub(crate) const TOWER: Vec2 = Vec2 { x: 240.0, y: 0.0 };
pub(crate) const GROVE: Vec2 = Vec2 { x: 60.0, y: 90.0 };
pub(crate) const RIDGE: Vec2 = Vec2 { x: 180.0, y: 90.0 };

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptAction {
    PathfindTo { agent: AgentId, target: Vec2 },
    Walk {
        agent: AgentId,
        direction: Vec2,
        frames: u32,
    },
    ToggleTime,
    ErasePath { name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScriptedEvent {
    pub(crate) frame: u32,
    pub(crate) action: ScriptAction,
}

pub(crate) struct Scenario {
    pub(crate) simulation: Simulation,
    pub(crate) courier: AgentId,
    pub(crate) wanderer: AgentId,
    pub(crate) script: Vec<ScriptedEvent>,
}

pub(crate) fn build_scenario(config: &DemoConfig) -> Result<Scenario, String> {
    let network = build_demo_network().map_err(|error| format!("build demo network: {error}"))?;
    let mut simulation = Simulation::new(
        config.loop_config.clone(),
        network,
        Timeline::new(TimeState::Past),
    );

    let courier = simulation.spawn_agent(config.follower, HOME);
    let wanderer = simulation.spawn_agent(config.follower, GROVE);
    let script = vec![
        ScriptedEvent {
            frame: 0,
            action: ScriptAction::PathfindTo {
                agent: courier,
                target: TOWER,
            },
        },
        ScriptedEvent {
            frame: 0,
            action: ScriptAction::Walk {
                agent: wanderer,
                direction: Vec2::new(1.0, 0.0),
                frames: 50,
            },
        },
        ScriptedEvent {
            frame: 40,
            action: ScriptAction::ToggleTime,
        },
        ScriptedEvent {
            frame: 80,
            action: ScriptAction::PathfindTo {
                agent: wanderer,
                target: HOME,
            },
        },
        ScriptedEvent {
            frame: 100,
            action: ScriptAction::ErasePath { name: "ferry" },
        },
    ];

    info!(
        nodes = simulation.network().node_count(),
        paths = simulation.network().path_count(),
        events = script.len(),
        "scenario_built"
    );

    Ok(Scenario {
        simulation,
        courier,
        wanderer,
        script,
    })
}

//            grove ------ ridge_node
//           /     ridge      / \
//   grove_path          ferry   ridge_descent
//         /              /        \
//     home ---- market ------------ tower
//        lane        old_bridge
pub(crate) fn build_demo_network() -> Result<PathNetwork, NetworkError> {
    let mut network = PathNetwork::new();
    let home = network.create_node(HOME);
    let market = network.create_node(MARKET);
    let tower = network.create_node(TOWER);
    let grove = network.create_node(GROVE);
    let ridge = network.create_node(RIDGE);

    named_connection(&mut network, home, market, "lane")?;
    let old_bridge = named_connection(&mut network, market, tower, "old_bridge")?;
    network.set_path_traversable(old_bridge, TimeState::Future, false)?;
    named_connection(&mut network, home, grove, "grove_path")?;
    named_connection(&mut network, grove, ridge, "ridge")?;
    named_connection(&mut network, ridge, tower, "ridge_descent")?;
    let ferry = named_connection(&mut network, market, ridge, "ferry")?;
    network.set_path_traversable(ferry, TimeState::Past, false)?;

    Ok(network)
}

fn named_connection(
    network: &mut PathNetwork,
    a: NodeId,
    b: NodeId,
    name: &str,
) -> Result<PathId, NetworkError> {
    let path = network.connect_nodes(a, b)?;
    network.set_path_name(path, Some(name.to_string()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use pathnet::Pathfinder;

    use super::*;

    #[test]
    fn demo_network_has_named_paths_per_era() {
        let network = build_demo_network().expect("network");
        assert_eq!(network.node_count(), 5);
        assert_eq!(network.path_count(), 6);

        let old_bridge = network.named_path("old_bridge").expect("old_bridge");
        let ferry = network.named_path("ferry").expect("ferry");
        assert_eq!(network.is_path_traversable_at(old_bridge, TimeState::Past), Ok(true));
        assert_eq!(network.is_path_traversable_at(old_bridge, TimeState::Future), Ok(false));
        assert_eq!(network.is_path_traversable_at(ferry, TimeState::Past), Ok(false));
        assert_eq!(network.is_path_traversable_at(ferry, TimeState::Future), Ok(true));
    }

    #[test]
    fn tower_route_depends_on_era() {
        let network = build_demo_network().expect("network");
        let pathfinder = Pathfinder::new(&network);

        let past = pathfinder
            .plan_between_positions(HOME, TOWER, TimeState::Past)
            .and_then(|plan| plan.nodes)
            .expect("past route");
        let future = pathfinder
            .plan_between_positions(MARKET, TOWER, TimeState::Future)
            .and_then(|plan| plan.nodes)
            .expect("future route");

        let positions = |nodes: &[NodeId]| -> Vec<Vec2> {
            nodes
                .iter()
                .map(|node| network.node_position(*node).expect("position"))
                .collect()
        };
        assert_eq!(positions(past.as_slice()), vec![HOME, MARKET, TOWER]);
        assert_eq!(positions(future.as_slice()), vec![HOME, MARKET, RIDGE, TOWER]);
    }
}
