use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::follower::{FollowerConfig, FollowerEvent, PathFollower};
use crate::geom::Vec2;
use crate::network::PathNetwork;
use crate::time::{TimeState, TimeTransition, Timeline};

mod metrics;

pub use metrics::LoopMetricsSnapshot;

use metrics::MetricsAccumulator;

const DEFAULT_MAX_FRAME_DELTA: Duration = Duration::from_millis(250);
const DEFAULT_METRICS_LOG_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub target_tps: u32,
    #[serde(rename = "max_frame_delta_ms", with = "duration_ms")]
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    #[serde(rename = "metrics_log_interval_ms", with = "duration_ms")]
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
            max_ticks_per_frame: 5,
            metrics_log_interval: DEFAULT_METRICS_LOG_INTERVAL,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("{0} does not exist")]
    UnknownAgent(AgentId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub ticks_run: u32,
    pub dropped_backlog: Duration,
    pub replans: u32,
    pub abandoned: u32,
    pub arrivals: u32,
    pub metrics: Option<LoopMetricsSnapshot>,
}

pub struct Simulation {
    config: LoopConfig,
    fixed_dt: Duration,
    max_frame_delta: Duration,
    network: PathNetwork,
    timeline: Timeline,
    agents: Vec<PathFollower>,
    accumulator: Duration,
    elapsed: Duration,
    metrics: MetricsAccumulator,
}

impl Simulation {
    pub fn new(config: LoopConfig, network: PathNetwork, timeline: Timeline) -> Self {
        let target_tps = config.target_tps.max(1);
        let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
        let max_frame_delta =
            normalize_non_zero_duration(config.max_frame_delta, DEFAULT_MAX_FRAME_DELTA);
        let metrics_log_interval =
            normalize_non_zero_duration(config.metrics_log_interval, DEFAULT_METRICS_LOG_INTERVAL);

        info!(
            target_tps,
            max_frame_delta_ms = max_frame_delta.as_millis() as u64,
            max_ticks_per_frame = config.max_ticks_per_frame,
            nodes = network.node_count(),
            paths = network.path_count(),
            time = timeline.current().name(),
            "simulation_started"
        );

        Self {
            config,
            fixed_dt,
            max_frame_delta,
            network,
            timeline,
            agents: Vec::new(),
            accumulator: Duration::ZERO,
            elapsed: Duration::ZERO,
            metrics: MetricsAccumulator::new(metrics_log_interval),
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn network(&self) -> &PathNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut PathNetwork {
        &mut self.network
    }

    pub fn time(&self) -> TimeState {
        self.timeline.current()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn set_time(&mut self, state: TimeState) -> Option<TimeTransition> {
        let transition = self.timeline.set(state)?;
        self.broadcast_transition(transition);
        Some(transition)
    }

    pub fn toggle_time(&mut self) -> TimeTransition {
        let transition = self.timeline.toggle();
        self.broadcast_transition(transition);
        transition
    }

    fn broadcast_transition(&mut self, transition: TimeTransition) {
        for agent in &mut self.agents {
            agent.on_time_changed(transition);
        }
    }

    pub fn spawn_agent(&mut self, config: FollowerConfig, position: Vec2) -> AgentId {
        let id = AgentId(self.agents.len() as u32);
        self.agents.push(PathFollower::new(config, position));
        info!(
            agent = id.0,
            x = position.x,
            y = position.y,
            speed = config.speed,
            "agent_spawned"
        );
        id
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, id: AgentId) -> Option<&PathFollower> {
        self.agents.get(id.0 as usize)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut PathFollower> {
        self.agents.get_mut(id.0 as usize)
    }

    pub fn pathfind_to(&mut self, id: AgentId, target: Vec2) -> Result<bool, SimError> {
        let time = self.timeline.current();
        let agent = self
            .agents
            .get_mut(id.0 as usize)
            .ok_or(SimError::UnknownAgent(id))?;

        let found = agent.pathfind_to(&self.network, time, target);
        if found {
            info!(
                agent = id.0,
                nodes = agent.planned_nodes().map_or(0, <[_]>::len),
                target_x = target.x,
                target_y = target.y,
                "pathfind_started"
            );
        } else {
            info!(
                agent = id.0,
                target_x = target.x,
                target_y = target.y,
                time = time.name(),
                "pathfind_unreachable"
            );
        }
        Ok(found)
    }

    pub fn walk_towards(
        &mut self,
        id: AgentId,
        direction: Vec2,
        delta_seconds: f32,
    ) -> Result<Vec2, SimError> {
        let time = self.timeline.current();
        let agent = self
            .agents
            .get_mut(id.0 as usize)
            .ok_or(SimError::UnknownAgent(id))?;
        Ok(agent.walk_towards(&self.network, time, direction, delta_seconds))
    }

    pub fn stop_pathfinding(&mut self, id: AgentId) -> Result<(), SimError> {
        let agent = self
            .agents
            .get_mut(id.0 as usize)
            .ok_or(SimError::UnknownAgent(id))?;
        agent.stop_pathfinding();
        Ok(())
    }

    pub fn advance_frame(&mut self, frame_dt: Duration) -> FrameReport {
        let clamped_frame_dt = clamp_frame_delta(frame_dt, self.max_frame_delta);
        self.accumulator = self.accumulator.saturating_add(clamped_frame_dt);

        let max_ticks_per_frame = self.config.max_ticks_per_frame;
        let step_plan = plan_sim_steps(self.accumulator, self.fixed_dt, max_ticks_per_frame);
        let mut report = FrameReport {
            ticks_run: step_plan.ticks_to_run,
            dropped_backlog: step_plan.dropped_backlog,
            ..FrameReport::default()
        };

        let time = self.timeline.current();
        for _ in 0..step_plan.ticks_to_run {
            for (index, agent) in self.agents.iter_mut().enumerate() {
                match agent.fixed_update(&self.network, time) {
                    Some(FollowerEvent::Replanned) => {
                        report.replans += 1;
                        self.metrics.record_replan();
                        info!(agent = index, "agent_replanned");
                    }
                    Some(FollowerEvent::Abandoned) => {
                        report.abandoned += 1;
                        self.metrics.record_abandoned();
                        warn!(agent = index, time = time.name(), "agent_route_lost");
                    }
                    Some(FollowerEvent::Arrived) | None => {}
                }
            }
            self.metrics.record_tick();
        }
        self.accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        let frame_dt_seconds = clamped_frame_dt.as_secs_f32();
        for (index, agent) in self.agents.iter_mut().enumerate() {
            if agent.frame_update(&self.network, frame_dt_seconds) == Some(FollowerEvent::Arrived) {
                report.arrivals += 1;
                self.metrics.record_arrival();
                let position = agent.position();
                info!(agent = index, x = position.x, y = position.y, "agent_arrived");
            }
        }

        self.elapsed = self.elapsed.saturating_add(clamped_frame_dt);
        self.metrics.record_frame(clamped_frame_dt);
        if let Some(snapshot) = self.metrics.maybe_snapshot(self.elapsed) {
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                replans = snapshot.replans,
                abandoned = snapshot.abandoned,
                arrivals = snapshot.arrivals,
                agents = self.agents.len(),
                time = time.name(),
                "loop_metrics"
            );
            report.metrics = Some(snapshot);
        }

        report
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
