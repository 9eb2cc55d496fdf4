//! Virtual interface identity, roles and binding references.

use std::fmt;

/// Identifier of a virtual interface, stable for the interface's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VifId(pub u32);

impl fmt::Display for VifId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vif-{}", self.0)
    }
}

/// Identifier of a binding, the physical radio context one or more
/// interfaces share. Doubles as the slot index in the firmware command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding-{}", self.0)
    }
}

/// Binding reference carried by each interface: the slot id plus the
/// firmware color of the underlying context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingRef {
    pub id: BindingId,
    pub color: u32,
}

impl BindingRef {
    pub const fn new(id: u32, color: u32) -> Self {
        BindingRef {
            id: BindingId(id),
            color,
        }
    }
}

/// Operational role of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VifRole {
    /// Client association to an access point.
    Station,
    /// Access point or IBSS, beaconing on behalf of other stations.
    Ap,
    /// Passive capture. A monitor interface must be the only active one.
    Monitor,
}

/// Latency sensitivity of an interface, tiered by role. Each tier maps to
/// its own guaranteed minimum share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LowLatency {
    #[default]
    Off,
    Generic,
    P2pClient,
    P2pGo,
}

impl LowLatency {
    pub fn is_set(&self) -> bool {
        !matches!(self, LowLatency::Off)
    }
}

/// Roster entry for one operationally active interface. The committed quota
/// of an interface is state of the allocator, not of the roster.
#[derive(Debug, Clone, Copy)]
pub struct Vif {
    pub id: VifId,
    pub binding: BindingRef,
    pub role: VifRole,
    pub low_latency: LowLatency,
}

impl Vif {
    pub fn new(id: u32, binding: BindingRef, role: VifRole) -> Self {
        Vif {
            id: VifId(id),
            binding,
            role,
            low_latency: LowLatency::Off,
        }
    }

    pub fn with_low_latency(mut self, low_latency: LowLatency) -> Self {
        self.low_latency = low_latency;
        self
    }
}
