use std::process::ExitCode;
use std::time::Duration;

use pathnet::{AgentId, Simulation, Vec2};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;
use super::scenario::{Scenario, ScriptAction};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) frames: u32,
    pub(crate) ticks: u64,
    pub(crate) replans: u32,
    pub(crate) abandoned: u32,
    pub(crate) arrivals: u32,
    pub(crate) dropped_backlog: Duration,
}

struct Walker {
    agent: AgentId,
    direction: Vec2,
    frames_left: u32,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut scenario,
    } = app;
    let frame_dt = Duration::from_millis(config.frame_ms);

    match run_script(&mut scenario, config.frames, frame_dt) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                ticks = summary.ticks,
                replans = summary.replans,
                abandoned = summary.abandoned,
                arrivals = summary.arrivals,
                dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
                simulated_ms = scenario.simulation.elapsed().as_millis() as u64,
                "run_finished"
            );
            log_agent_states(&scenario);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}

pub(crate) fn run_script(
    scenario: &mut Scenario,
    frames: u32,
    frame_dt: Duration,
) -> Result<RunSummary, String> {
    let frame_dt_seconds = frame_dt.as_secs_f32();
    let mut walkers: Vec<Walker> = Vec::new();
    let mut summary = RunSummary::default();

    for frame in 0..frames {
        for event in scenario.script.iter().filter(|event| event.frame == frame) {
            info!(frame, action = ?event.action, "script_event");
            apply_action(&mut scenario.simulation, &event.action, &mut walkers)?;
        }

        for walker in &mut walkers {
            scenario
                .simulation
                .walk_towards(walker.agent, walker.direction, frame_dt_seconds)
                .map_err(|error| format!("walk frame {frame}: {error}"))?;
            walker.frames_left = walker.frames_left.saturating_sub(1);
        }
        walkers.retain(|walker| walker.frames_left > 0);

        let report = scenario.simulation.advance_frame(frame_dt);
        summary.frames += 1;
        summary.ticks += u64::from(report.ticks_run);
        summary.replans += report.replans;
        summary.abandoned += report.abandoned;
        summary.arrivals += report.arrivals;
        summary.dropped_backlog = summary.dropped_backlog.saturating_add(report.dropped_backlog);
    }

    Ok(summary)
}

fn apply_action(
    simulation: &mut Simulation,
    action: &ScriptAction,
    walkers: &mut Vec<Walker>,
) -> Result<(), String> {
    match action {
        ScriptAction::PathfindTo { agent, target } => {
            walkers.retain(|walker| walker.agent != *agent);
            let found = simulation
                .pathfind_to(*agent, *target)
                .map_err(|error| format!("pathfind: {error}"))?;
            if !found {
                warn!(agent = agent.0, "scripted_target_unreachable");
            }
        }
        ScriptAction::Walk {
            agent,
            direction,
            frames,
        } => {
            if simulation.agent(*agent).is_none() {
                return Err(format!("walk: {agent} does not exist"));
            }
            walkers.retain(|walker| walker.agent != *agent);
            walkers.push(Walker {
                agent: *agent,
                direction: *direction,
                frames_left: *frames,
            });
        }
        ScriptAction::ToggleTime => {
            simulation.toggle_time();
        }
        ScriptAction::ErasePath { name } => {
            let path = simulation
                .network()
                .named_path(name)
                .map_err(|error| format!("erase path '{name}': {error}"))?;
            simulation
                .network_mut()
                .erase_path(path)
                .map_err(|error| format!("erase path '{name}': {error}"))?;
            info!(path_name = *name, path = %path, "path_erased");
        }
    }
    Ok(())
}

fn log_agent_states(scenario: &Scenario) {
    let simulation = &scenario.simulation;
    for index in 0..simulation.agent_count() {
        let id = AgentId(index as u32);
        let Some(agent) = simulation.agent(id) else {
            continue;
        };
        let role = agent_role(scenario, id);
        let position = agent.position();
        info!(
            agent = id.0,
            role,
            x = position.x,
            y = position.y,
            pathfinding = agent.is_pathfinding(),
            "agent_final_state"
        );
    }
}

fn agent_role(scenario: &Scenario, id: AgentId) -> &'static str {
    if id == scenario.courier {
        "courier"
    } else if id == scenario.wanderer {
        "wanderer"
    } else {
        "extra"
    }
}
