//! Error types.
//!
//! Node-level problems (wrong packet type, unusable value) are not errors in
//! this sense: components report them as error packets on their error ports.
//! The types here cover what has to reach the caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::node::{Endpoint, NodeId};
use crate::packet::Packet;

/// Errors raised by the network while enqueueing or delivering messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("message queue full (capacity {capacity}), message for {target} rejected")]
    QueueFull { target: Endpoint, capacity: usize },

    #[error("no node {0} in network")]
    UnknownNode(NodeId),

    #[error("node {} has no input port {}", .0.node, .0.port.0)]
    UnknownInput(Endpoint),

    #[error("node {} has no output port {}", .0.node, .0.port.0)]
    UnknownOutput(Endpoint),
}

/// Errors found while validating or instantiating a static graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("graph has no nodes")]
    Empty,

    #[error("too many nodes: {0}")]
    TooManyNodes(usize),

    #[error("graph has no inport")]
    NoInport,

    #[error("{role} refers to {endpoint}, which does not exist")]
    InvalidEndpoint {
        role: &'static str,
        endpoint: Endpoint,
    },

    #[error("connection {from} -> {to} joins incompatible ports")]
    PortMismatch { from: Endpoint, to: Endpoint },

    #[error("output {0} is connected more than once")]
    FanOut(Endpoint),

    #[error("graph declares {0} completion outports, expected exactly one")]
    Completion(usize),

    #[error("graph declares {0} failure outports, expected at most one")]
    Failure(usize),

    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),

    #[error("completion outport {completion} is unreachable from inport {inport}")]
    Unreachable {
        inport: Endpoint,
        completion: Endpoint,
    },

    #[error("initial packets: {0}")]
    Network(#[from] NetworkError),
}

/// Errors returned by [`Bridge::run`](crate::bridge::Bridge::run).
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("block of {requested} samples exceeds capacity of {capacity}")]
    BlockTooLarge { requested: usize, capacity: usize },

    #[error("no completion after {ticks} ticks ({pending} messages still pending)")]
    TickBudgetExhausted { ticks: usize, pending: usize },

    #[error("network went idle after {ticks} ticks without completing")]
    Stalled { ticks: usize },

    #[error("node failure reported on {origin}: {packet:?}")]
    NodeFailure { origin: Endpoint, packet: Packet },

    #[error("completion outport emitted {0:?}, expected an audio buffer")]
    UnexpectedPacket(Packet),

    #[error("unknown parameter index {0}")]
    UnknownParameter(usize),

    #[error("buffer arena exhausted")]
    ArenaExhausted,

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the host adapter.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("no plugin at index {0}")]
    UnknownPlugin(usize),

    #[error("plugin '{plugin}' has no port {port}")]
    UnknownPort { plugin: &'static str, port: usize },

    #[error("sample rate must be non-zero")]
    InvalidSampleRate,

    #[error("graph has no parameter named '{0}'")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
