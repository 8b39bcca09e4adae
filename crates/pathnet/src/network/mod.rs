use std::fmt;

use thiserror::Error;

mod arena;
mod queries;
mod store;

pub use arena::RawHandle;
pub use store::PathNetwork;

use arena::ArenaKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(RawHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(RawHandle);

impl NodeId {
    pub fn raw(self) -> RawHandle {
        self.0
    }
}

impl PathId {
    pub fn raw(self) -> RawHandle {
        self.0
    }
}

impl ArenaKey for NodeId {
    fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    fn raw(self) -> RawHandle {
        self.0
    }
}

impl ArenaKey for PathId {
    fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    fn raw(self) -> RawHandle {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("{0} does not exist or has been removed")]
    StaleNode(NodeId),
    #[error("{0} does not exist or has been removed")]
    StalePath(PathId),
    #[error("cannot merge {0} with itself")]
    MergeSameNode(NodeId),
    #[error("cannot connect {0} to itself")]
    SelfLoop(NodeId),
    #[error("{a} and {b} are already connected by {existing}")]
    AlreadyConnected {
        a: NodeId,
        b: NodeId,
        existing: PathId,
    },
    #[error("no path is named '{0}'")]
    NamedPathNotFound(String),
    #[error("{count} paths share the name '{name}'")]
    AmbiguousPathName { name: String, count: usize },
    #[error("the network has no nodes")]
    EmptyNetwork,
}
