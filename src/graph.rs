//! Static graph definition - nodes, connections, initial packets and outports

use std::path::Path;

use hashbrown::HashSet;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AmplifierConfig, Limit};
use crate::error::{ConfigError, GraphError};
use crate::network::Network;
use crate::node::{find_port, Component, Endpoint, NodeId, PortDescriptor, PortDirection};
use crate::nodes::{amplitude_ports, Amplitude, Forward, DEFAULT_GAIN, DEFAULT_MAX_SAMPLES};
use crate::packet::Packet;

/// One node of a static graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    Amplitude {
        #[serde(default = "default_gain")]
        default_gain: f32,
        #[serde(default = "default_max_samples")]
        max_samples: Limit,
    },
    Forward,
}

fn default_gain() -> f32 {
    DEFAULT_GAIN
}

fn default_max_samples() -> Limit {
    Limit::AtMost(DEFAULT_MAX_SAMPLES)
}

impl NodeSpec {
    /// An amplitude node with default gain and bound
    pub fn amplitude() -> Self {
        NodeSpec::Amplitude {
            default_gain: DEFAULT_GAIN,
            max_samples: default_max_samples(),
        }
    }

    pub fn instantiate(&self) -> Box<dyn Component> {
        match *self {
            NodeSpec::Amplitude {
                default_gain,
                max_samples,
            } => Box::new(Amplitude::new(default_gain).with_max_samples(max_samples.as_option())),
            NodeSpec::Forward => Box::new(Forward),
        }
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        match self {
            NodeSpec::Amplitude { .. } => Amplitude::default().ports(),
            NodeSpec::Forward => Forward.ports(),
        }
    }
}

/// An output-to-input connection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: Endpoint,
    pub to: Endpoint,
}

/// Scalar value of an initial packet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialValue {
    Bool(bool),
    Integer(i32),
    Float(f32),
}

impl From<InitialValue> for Packet {
    fn from(value: InitialValue) -> Self {
        match value {
            InitialValue::Bool(v) => Packet::Bool(v),
            InitialValue::Integer(v) => Packet::Integer(v),
            InitialValue::Float(v) => Packet::Float(v),
        }
    }
}

/// A packet enqueued once, when the network is built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialPacket {
    pub target: Endpoint,
    pub value: InitialValue,
}

/// What the bridge does with an exported output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutportRole {
    /// Its first emission completes the run
    Completion,
    /// Its first emission fails the run
    Failure,
    /// Recorded, nothing more
    Observe,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outport {
    pub endpoint: Endpoint,
    pub role: OutportRole,
}

/// A named host control feeding an input port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub target: Endpoint,
}

/// Static description of a network and how the bridge talks to it.
///
/// Node ids are positions in `nodes`. A definition is validated before any
/// network is built from it, so a built network never routes to a port
/// that does not exist.
///
/// ```toml
/// inport = { node = 0, port = 0 }
///
/// [[nodes]]
/// kind = "forward"
///
/// [[nodes]]
/// kind = "amplitude"
/// default_gain = 0.5
///
/// [[connections]]
/// from = { node = 0, port = 0 }
/// to = { node = 1, port = 0 }
///
/// [[outports]]
/// endpoint = { node = 1, port = 0 }
/// role = "completion"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inport: Option<Endpoint>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub initial: Vec<InitialPacket>,
    #[serde(default)]
    pub outports: Vec<Outport>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl GraphDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single-node amplifier graph the plugin ships with.
    ///
    /// Audio enters on the amplitude node's `in`; `out` completes the run,
    /// `error` fails it and `amplitudechanged` is observed. The host control
    /// is the `amplitude` parameter.
    pub fn amplifier(config: &AmplifierConfig) -> Self {
        let mut graph = Self::new();
        let amp = graph.add_node(NodeSpec::Amplitude {
            default_gain: config.default_gain,
            max_samples: config.max_samples,
        });
        let at = |port| Endpoint { node: amp, port };

        graph
            .set_inport(at(amplitude_ports::IN))
            .outport(at(amplitude_ports::OUT), OutportRole::Completion)
            .outport(at(amplitude_ports::ERROR), OutportRole::Failure)
            .outport(at(amplitude_ports::AMPLITUDE_CHANGED), OutportRole::Observe)
            .parameter("amplitude", at(amplitude_ports::AMPLITUDE));
        graph
    }

    pub fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.nodes.len() as u16);
        self.nodes.push(spec);
        id
    }

    pub fn connect(&mut self, from: Endpoint, to: Endpoint) -> &mut Self {
        self.connections.push(Connection { from, to });
        self
    }

    pub fn initial(&mut self, target: Endpoint, value: InitialValue) -> &mut Self {
        self.initial.push(InitialPacket { target, value });
        self
    }

    pub fn set_inport(&mut self, inport: Endpoint) -> &mut Self {
        self.inport = Some(inport);
        self
    }

    pub fn outport(&mut self, endpoint: Endpoint, role: OutportRole) -> &mut Self {
        self.outports.push(Outport { endpoint, role });
        self
    }

    pub fn parameter(&mut self, name: impl Into<String>, target: Endpoint) -> &mut Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            target,
        });
        self
    }

    /// Load a definition from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse a definition from a TOML string. Does not validate it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn role(&self, role: OutportRole) -> impl Iterator<Item = Endpoint> + '_ {
        self.outports
            .iter()
            .filter(move |o| o.role == role)
            .map(|o| o.endpoint)
    }

    /// The completion endpoint, if exactly one is declared
    pub fn completion(&self) -> Option<Endpoint> {
        let mut completions = self.role(OutportRole::Completion);
        match (completions.next(), completions.next()) {
            (Some(endpoint), None) => Some(endpoint),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<Endpoint> {
        self.role(OutportRole::Failure).next()
    }

    /// Every exported output, whatever its role
    pub fn exports(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.outports.iter().map(|o| o.endpoint)
    }

    fn port(&self, endpoint: Endpoint, direction: PortDirection) -> Option<&'static PortDescriptor> {
        let spec = self.nodes.get(endpoint.node.index())?;
        find_port(spec.ports(), endpoint.port, direction)
    }

    fn require(
        &self,
        role: &'static str,
        endpoint: Endpoint,
        direction: PortDirection,
    ) -> Result<&'static PortDescriptor, GraphError> {
        self.port(endpoint, direction)
            .ok_or(GraphError::InvalidEndpoint { role, endpoint })
    }

    /// Check the definition for everything a network cannot recover from at run time.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }
        if self.nodes.len() > u16::MAX as usize {
            return Err(GraphError::TooManyNodes(self.nodes.len()));
        }

        let mut fed = HashSet::with_capacity(self.connections.len());
        for c in &self.connections {
            let from = self.require("connection source", c.from, PortDirection::Output)?;
            let to = self.require("connection target", c.to, PortDirection::Input)?;
            if !from.kind.feeds(to.kind) {
                return Err(GraphError::PortMismatch {
                    from: c.from,
                    to: c.to,
                });
            }
            if !fed.insert(c.from) {
                return Err(GraphError::FanOut(c.from));
            }
        }

        for p in &self.initial {
            self.require("initial packet", p.target, PortDirection::Input)?;
        }

        let inport = self.inport.ok_or(GraphError::NoInport)?;
        self.require("inport", inport, PortDirection::Input)?;

        for o in &self.outports {
            self.require("outport", o.endpoint, PortDirection::Output)?;
        }

        let completions = self.role(OutportRole::Completion).count();
        if completions != 1 {
            return Err(GraphError::Completion(completions));
        }
        let failures = self.role(OutportRole::Failure).count();
        if failures > 1 {
            return Err(GraphError::Failure(failures));
        }

        let mut names = HashSet::with_capacity(self.parameters.len());
        for p in &self.parameters {
            self.require("parameter", p.target, PortDirection::Input)?;
            if !names.insert(p.name.as_str()) {
                return Err(GraphError::DuplicateParameter(p.name.clone()));
            }
        }

        let completion = self.completion().ok_or(GraphError::Completion(completions))?;
        if !self.reaches(inport.node, completion.node) {
            return Err(GraphError::Unreachable { inport, completion });
        }

        Ok(())
    }

    /// Node-level reachability. Any input of a node is assumed to reach any
    /// of its outputs.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut g = DiGraph::<(), ()>::with_capacity(self.nodes.len(), self.connections.len());
        for _ in &self.nodes {
            g.add_node(());
        }
        for c in &self.connections {
            g.add_edge(
                NodeIndex::new(c.from.node.index()),
                NodeIndex::new(c.to.node.index()),
                (),
            );
        }
        has_path_connecting(
            &g,
            NodeIndex::new(from.index()),
            NodeIndex::new(to.index()),
            None,
        )
    }

    /// Validate, then build a network and enqueue the initial packets.
    pub fn build(&self, queue_capacity: usize) -> Result<Network, GraphError> {
        self.validate()?;

        let mut network = Network::new(queue_capacity);
        for spec in &self.nodes {
            network.add_node(spec.instantiate());
        }
        for c in &self.connections {
            network.connect(c.from, c.to)?;
        }
        for p in &self.initial {
            network.send_message_to(p.target, p.value.into())?;
        }

        debug!(
            nodes = self.nodes.len(),
            connections = self.connections.len(),
            initial = self.initial.len(),
            "network built"
        );
        Ok(network)
    }
}
