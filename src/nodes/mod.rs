//! Built-in components.
//!
//! Components are organized into two categories:
//!
//! ## Effects ([`effect`])
//!
//! Transform audio buffers:
//! - [`Amplitude`] - Scale a buffer in place by a gain set through its `amplitude` port
//!
//! ## Flow ([`flow`])
//!
//! Move packets around without looking at them:
//! - [`Forward`] - Re-emit every packet unchanged
//!
//! Nodes are addressed by [`NodeId`](crate::node::NodeId) and ports by
//! [`PortId`](crate::node::PortId); each component publishes its port numbers
//! as constants (see [`amplitude_ports`]).

pub mod effect;
pub mod flow;

pub use effect::{amplitude_ports, Amplitude, DEFAULT_GAIN, DEFAULT_MAX_SAMPLES};
pub use flow::Forward;
