//! Dynamic airtime-share allocation for virtual interfaces that share
//! physical radio contexts.
//!
//! Several logical interfaces (station, AP/IBSS, monitor) can be active on
//! the same radio at once, each bound to a physical context ("binding").
//! Once per measurement period the allocator decides what fraction of the
//! shared airtime each interface may use next: interfaces that saturated
//! their slice grow by reclaiming slack the idle ones left behind,
//! latency-sensitive interfaces are guaranteed role-specific minimum
//! shares, and the result is encoded as a fixed-point firmware command
//! whose fractions always sum to the exact hardware total.
//!
//! The crate is deliberately split along its data flow: telemetry and the
//! interface roster come in as plain values, [`quota::QuotaManager`] is
//! pure bounded arithmetic over them, and [`maintenance`] supplies the
//! periodic task plus the channel plumbing around it.

/// Allocator tunables.
pub mod config;

/// Periodic recomputation task and the driver-facing boundary traits.
pub mod maintenance;

/// Quota projection, normalization and firmware command encoding.
pub mod quota;

/// Per-period airtime usage telemetry.
pub mod telemetry;

/// Virtual interface identity, roles and binding references.
pub mod vif;

pub use config::{ConfigError, QuotaConfig};
pub use maintenance::{spawn_quota_maintenance, QuotaSources, QuotaSupervisor};
pub use quota::{QuotaCommand, QuotaDecision, QuotaError, QuotaErrorKind, QuotaManager};
pub use telemetry::UsageSnapshot;
pub use vif::{BindingId, BindingRef, LowLatency, Vif, VifId, VifRole};
