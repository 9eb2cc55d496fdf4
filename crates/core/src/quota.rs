//! Dynamic airtime-share allocation across active interfaces.
//!
//! Every measurement period the [`QuotaManager`] turns the active-interface
//! roster and that period's usage telemetry into a firmware quota command
//! whose per-binding fractions sum to exactly [`constants::MAX_QUOTA`].
//! Interfaces that ran hot grow at the expense of slack left idle by the
//! others, latency-sensitive interfaces are held above role-specific
//! floors, and commands are only republished when shares moved enough to
//! matter.

pub mod constants;
mod encoder;
mod projector;

pub use encoder::{QuotaCommand, QuotaSlot, INVALID_ID_AND_COLOR};

use std::collections::HashMap;

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::config::QuotaConfig;
use crate::telemetry::UsageSnapshot;
use crate::vif::{Vif, VifId, VifRole};
use constants::{MAX_ACTIVE_VIFS, REBALANCE_ITERATION_LIMIT};

/// Outcome of one per-period recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Shares moved enough to be worth pushing to the firmware.
    Publish(QuotaCommand),
    /// Nothing moved beyond the significance threshold; the command already
    /// in effect stays valid.
    NoChange,
}

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("no active interface is eligible for quota")]
    EmptyActiveSet,
    #[error("minimum quota {min_percent}% cannot be honored for {active} interfaces")]
    FloorInfeasible { min_percent: u32, active: usize },
    #[error("monitor interface {0} is active alongside other interfaces")]
    MonitorNotExclusive(VifId),
    #[error("{0} active interfaces exceed the supported maximum of {MAX_ACTIVE_VIFS}")]
    TooManyInterfaces(usize),
    #[error("no interface maps to a valid binding slot")]
    NoSchedulableBinding,
    #[error("minimum-floor rebalancing did not converge within {REBALANCE_ITERATION_LIMIT} passes")]
    RebalanceDiverged,
    #[error("encoded quota total {total} exceeds the firmware maximum {max}")]
    FractionOverflow { total: u32, max: u32 },
}

/// Coarse classification of a failed recomputation, deciding how the caller
/// reacts. Either way the previous command stays in effect and committed
/// per-interface quotas are untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaErrorKind {
    /// The period's inputs were unusable.
    Validation,
    /// An internal invariant broke mid-computation.
    InvariantViolation,
}

impl QuotaError {
    pub fn kind(&self) -> QuotaErrorKind {
        match self {
            QuotaError::EmptyActiveSet
            | QuotaError::FloorInfeasible { .. }
            | QuotaError::MonitorNotExclusive(_)
            | QuotaError::TooManyInterfaces(_)
            | QuotaError::NoSchedulableBinding => QuotaErrorKind::Validation,
            QuotaError::RebalanceDiverged | QuotaError::FractionOverflow { .. } => {
                QuotaErrorKind::InvariantViolation
            }
        }
    }
}

/// Per-period working entry for one active interface.
pub(crate) struct Allocation {
    pub(crate) vif: Vif,
    pub(crate) prior_pct: u32,
    pub(crate) quota_pct: u32,
    pub(crate) low_latency: bool,
    /// Hard per-interface floor: the absolute minimum, or the role floor
    /// for a latency-sensitive interface.
    pub(crate) floor_pct: u32,
}

type ActiveSet = ArrayVec<Allocation, MAX_ACTIVE_VIFS>;

/// Per-period driver of the quota algorithm. Owns the committed quota of
/// every active interface; callers serialize invocations (the supervisor
/// holds one lock around each whole recomputation).
pub struct QuotaManager {
    config: QuotaConfig,
    committed: HashMap<VifId, u32>,
}

impl QuotaManager {
    pub fn new(config: QuotaConfig) -> Self {
        QuotaManager {
            config,
            committed: HashMap::new(),
        }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Share committed for `vif` by the last significant period, zero for
    /// an unknown interface.
    pub fn committed_percent(&self, vif: VifId) -> u32 {
        self.committed.get(&vif).copied().unwrap_or(0)
    }

    /// Forget an interface that went inactive, so a later reappearance
    /// bootstraps from scratch instead of resuming a stale share.
    pub fn retire(&mut self, vif: VifId) {
        if self.committed.remove(&vif).is_some() {
            tracing::debug!(%vif, "retired interface quota");
        }
    }

    /// Recompute the airtime shares for one measurement period.
    ///
    /// `disabled` names an interface mid-teardown to leave out of this
    /// period. With `force` the command is published and committed even
    /// when no share moved significantly.
    pub fn recompute(
        &mut self,
        roster: &[Vif],
        snapshot: &UsageSnapshot,
        disabled: Option<VifId>,
        force: bool,
    ) -> Result<QuotaDecision, QuotaError> {
        let mut active = self.build_active_set(roster, disabled)?;
        let active_count = active.len() as u32;

        // Slack freed up this period: for every interface, the part of its
        // committed share it did not use.
        let mut usages: ArrayVec<u32, MAX_ACTIVE_VIFS> = ArrayVec::new();
        let mut unused_pct = 0u32;
        for allocation in &active {
            let usage = if allocation.prior_pct == 0 {
                0
            } else {
                snapshot.usage_percent(allocation.vif.id, allocation.prior_pct)
            };
            if allocation.prior_pct > 0 {
                unused_pct += allocation.prior_pct * (100 - usage) / 100;
            }
            usages.push(usage);
        }

        let mut lowlat_count = 0usize;
        for (allocation, usage) in active.iter_mut().zip(&usages) {
            allocation.quota_pct = projector::project(
                &self.config,
                *usage,
                allocation.prior_pct,
                unused_pct,
                active_count,
            );
            if allocation.low_latency {
                lowlat_count += 1;
                if allocation.quota_pct < allocation.floor_pct {
                    allocation.quota_pct = allocation.floor_pct;
                }
            }
        }

        self.normalize(&mut active, lowlat_count)?;

        let significant = active.iter().any(|allocation| {
            allocation.quota_pct.abs_diff(allocation.prior_pct)
                > self.config.significant_change_percent
        });
        if !significant && !force {
            tracing::debug!("airtime shares settled, keeping the previous command");
            return Ok(QuotaDecision::NoChange);
        }

        let command = encoder::encode(&active)?;

        // Commit the whole allocation at once so stored state always
        // matches the command being published. Interfaces that left the
        // roster drop out here.
        self.committed = active
            .iter()
            .map(|allocation| (allocation.vif.id, allocation.quota_pct))
            .collect();

        for allocation in &active {
            tracing::debug!(
                vif = %allocation.vif.id,
                binding = %allocation.vif.binding.id,
                quota = allocation.quota_pct,
                "airtime share"
            );
        }

        Ok(QuotaDecision::Publish(command))
    }

    fn build_active_set(
        &self,
        roster: &[Vif],
        disabled: Option<VifId>,
    ) -> Result<ActiveSet, QuotaError> {
        let mut active = ActiveSet::new();
        for vif in roster {
            if Some(vif.id) == disabled {
                continue;
            }
            let allocation = Allocation {
                vif: *vif,
                prior_pct: self.committed_percent(vif.id),
                quota_pct: 0,
                low_latency: vif.low_latency.is_set(),
                floor_pct: self
                    .config
                    .min_percent
                    .max(self.config.low_latency_floor(vif.low_latency)),
            };
            if active.try_push(allocation).is_err() {
                return Err(QuotaError::TooManyInterfaces(roster.len()));
            }
        }

        if active.is_empty() {
            return Err(QuotaError::EmptyActiveSet);
        }
        if let Some(monitor) = active
            .iter()
            .find(|allocation| allocation.vif.role == VifRole::Monitor)
        {
            // A monitor interface owns the radio outright or not at all.
            if active.len() > 1 {
                return Err(QuotaError::MonitorNotExclusive(monitor.vif.id));
            }
        }
        if self.config.min_percent * active.len() as u32 > 100 {
            return Err(QuotaError::FloorInfeasible {
                min_percent: self.config.min_percent,
                active: active.len(),
            });
        }
        Ok(active)
    }

    /// Bring the proposed shares to a sum of exactly 100 while honoring the
    /// absolute minimum per interface.
    fn normalize(&self, active: &mut ActiveSet, lowlat_count: usize) -> Result<(), QuotaError> {
        let mut total: u32 = active.iter().map(|allocation| allocation.quota_pct).sum();

        if total > 100 {
            for allocation in active.iter_mut() {
                allocation.quota_pct = allocation.quota_pct * 100 / total;
            }
            total = active.iter().map(|allocation| allocation.quota_pct).sum();
        }

        // Hand out the remaining points one at a time; latency-sensitive
        // interfaces take them all when any are present.
        while total < 100 {
            for allocation in active.iter_mut() {
                if total == 100 {
                    break;
                }
                if lowlat_count > 0 && !allocation.low_latency {
                    continue;
                }
                allocation.quota_pct += 1;
                total += 1;
            }
        }

        // Scaling may have pushed interfaces under their hard floor; raise
        // them back and strip the excess from those with room to give. An
        // infeasible floor set makes no pass progress and trips the bound.
        for allocation in active.iter_mut() {
            if allocation.quota_pct < allocation.floor_pct {
                total += allocation.floor_pct - allocation.quota_pct;
                allocation.quota_pct = allocation.floor_pct;
            }
        }
        let mut passes = 0usize;
        while total > 100 {
            passes += 1;
            if passes > REBALANCE_ITERATION_LIMIT {
                tracing::error!(total, "floor rebalancing is stuck");
                return Err(QuotaError::RebalanceDiverged);
            }
            for allocation in active.iter_mut() {
                if total == 100 {
                    break;
                }
                if allocation.quota_pct > allocation.floor_pct {
                    allocation.quota_pct -= 1;
                    total -= 1;
                }
            }
        }

        Ok(())
    }
}
