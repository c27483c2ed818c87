//! Static plugin metadata

use crate::node::PortDirection;

/// Whether a host port carries a block of samples or a single value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PortClass {
    Audio,
    Control,
}

/// Suggested range for a control port.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RangeHint {
    pub lower: f32,
    pub upper: f32,
    pub default: Option<f32>,
}

impl RangeHint {
    pub const fn bounded(lower: f32, upper: f32) -> Self {
        Self {
            lower,
            upper,
            default: None,
        }
    }

    pub const fn with_default(mut self, default: f32) -> Self {
        self.default = Some(default);
        self
    }

    #[inline]
    pub fn constrain(&self, value: f32) -> f32 {
        value.max(self.lower).min(self.upper)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PortInfo {
    pub name: &'static str,
    pub direction: PortDirection,
    pub class: PortClass,
    pub hint: Option<RangeHint>,
}

impl PortInfo {
    pub const fn audio(name: &'static str, direction: PortDirection) -> Self {
        Self {
            name,
            direction,
            class: PortClass::Audio,
            hint: None,
        }
    }

    pub const fn control(name: &'static str, hint: RangeHint) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            class: PortClass::Control,
            hint: Some(hint),
        }
    }
}

/// What a host needs to know about a plugin before instantiating it.
#[derive(Debug)]
pub struct PluginDescriptor {
    pub unique_id: u32,
    pub label: &'static str,
    pub name: &'static str,
    pub maker: &'static str,
    pub copyright: &'static str,
    /// `run` never blocks or allocates
    pub hard_rt_capable: bool,
    pub ports: &'static [PortInfo],
}

impl PluginDescriptor {
    #[inline]
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn port(&self, index: usize) -> Option<&PortInfo> {
        self.ports.get(index)
    }

    /// Index of the port called `name`
    pub fn port_index(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name == name)
    }
}
