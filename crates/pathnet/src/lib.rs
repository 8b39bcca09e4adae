pub mod follower;
pub mod geom;
pub mod heap;
pub mod network;
pub mod pathfinder;
pub mod sim;
pub mod time;

pub use follower::{FollowerConfig, FollowerEvent, PathFollower};
pub use geom::Vec2;
pub use heap::{Heap, HeapOrder};
pub use network::{NetworkError, NodeId, PathId, PathNetwork, RawHandle};
pub use pathfinder::{Pathfinder, RoutePlan, SearchError};
pub use sim::{AgentId, FrameReport, LoopConfig, LoopMetricsSnapshot, SimError, Simulation};
pub use time::{TimeState, TimeTransition, Timeline};
