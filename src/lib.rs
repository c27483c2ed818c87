//! Blockflow - audio plugin core driving a message-passing network per block
//!
//! Design principles:
//! - The host calls `run` once per block; the call returns only when the
//!   network has emitted the processed block on its completion port
//! - Nodes exchange typed packets through one bounded FIFO, one message per tick
//! - Audio is lent to the network, never copied or owned by it; a buffer
//!   reference is dead once the call that lent it returns
//! - No locks and no allocation on the audio thread
//! - Liveness is bounded: a run that cannot complete fails instead of spinning

pub mod bridge;
pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod host;
pub mod network;
pub mod node;
pub mod nodes;
pub mod packet;
pub mod queue;
pub mod transport;

pub use bridge::{Bridge, RunReport};
pub use config::{AmplifierConfig, BridgeConfig, Limit, OversizePolicy, PluginConfig};
pub use controller::{Controller, Correlation, Settlement};
pub use error::{BridgeError, ConfigError, GraphError, HostError, NetworkError};
pub use graph::GraphDefinition;
pub use host::{PluginDescriptor, PluginInstance, PluginLibrary};
pub use network::{Emission, Network};
pub use node::{Component, Endpoint, NodeId, PortId, ProcessContext};
pub use packet::{BufferRef, BufferType, ErrorCode, Message, Packet};
pub use transport::{MonitorTransport, NullTransport, Transport};
