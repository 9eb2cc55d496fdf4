//! Periodic recomputation task wiring the allocator to its collaborators.
//!
//! The allocator itself is pure arithmetic over values passed in; this
//! module owns the lock that serializes recomputations, the timer that
//! paces them, and the channel that carries published commands to the
//! firmware layer.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::quota::{QuotaCommand, QuotaDecision, QuotaErrorKind, QuotaManager};
use crate::telemetry::UsageSnapshot;
use crate::vif::{Vif, VifId};

/// Boundary to the surrounding driver: the roster of operationally active
/// interfaces and the airtime accumulated since the previous snapshot.
pub trait QuotaSources: Send + 'static {
    fn active_vifs(&mut self) -> Vec<Vif>;

    fn usage_snapshot(&mut self) -> UsageSnapshot;

    /// Interface currently mid-teardown, to leave out of this period.
    fn disabled_vif(&mut self) -> Option<VifId> {
        None
    }
}

/// Owns the allocator behind the single lock that serializes
/// recomputations and republishes commands over the firmware channel.
///
/// A failed or insignificant period publishes nothing; whatever command the
/// firmware holds stays in effect, which is exactly the fallback the error
/// taxonomy asks for.
pub struct QuotaSupervisor {
    manager: RwLock<QuotaManager>,
    last_published: RwLock<Option<QuotaCommand>>,
    command_tx: mpsc::Sender<QuotaCommand>,
}

impl QuotaSupervisor {
    pub fn new(manager: QuotaManager, command_tx: mpsc::Sender<QuotaCommand>) -> Arc<Self> {
        Arc::new(QuotaSupervisor {
            manager: RwLock::new(manager),
            last_published: RwLock::new(None),
            command_tx,
        })
    }

    /// Most recently published command, if any period published one.
    pub fn last_published(&self) -> Option<QuotaCommand> {
        self.last_published.read().clone()
    }

    /// Forward an interface teardown to the allocator state.
    pub fn retire(&self, vif: VifId) {
        self.manager.write().retire(vif);
    }

    /// Run one recomputation and push the command out if shares moved.
    pub async fn tick<S: QuotaSources>(&self, sources: &mut S, force: bool) -> anyhow::Result<()> {
        let roster = sources.active_vifs();
        let snapshot = sources.usage_snapshot();
        let disabled = sources.disabled_vif();

        let decision = self
            .manager
            .write()
            .recompute(&roster, &snapshot, disabled, force);

        match decision {
            Ok(QuotaDecision::Publish(command)) => {
                tracing::info!(total = command.total_quota(), "publishing quota command");
                if self.command_tx.send(command.clone()).await.is_err() {
                    anyhow::bail!("firmware command channel closed");
                }
                *self.last_published.write() = Some(command);
            }
            Ok(QuotaDecision::NoChange) => {
                tracing::trace!("airtime shares unchanged");
            }
            Err(error) => match error.kind() {
                QuotaErrorKind::Validation => {
                    tracing::debug!(%error, "skipping quota update this period");
                }
                QuotaErrorKind::InvariantViolation => {
                    tracing::error!(%error, "quota recomputation failed, previous command stays in effect");
                }
            },
        }
        Ok(())
    }

    async fn quota_maintenance<S: QuotaSources>(
        self: Arc<Self>,
        mut sources: S,
    ) -> anyhow::Result<()> {
        tracing::debug!("initializing quota maintenance task");
        let period = self.manager.read().config().recompute_period;
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick(&mut sources, false).await?;
        }
    }
}

/// Spawn the periodic recomputation loop. The task runs until the firmware
/// command channel closes.
pub fn spawn_quota_maintenance<S: QuotaSources>(
    supervisor: Arc<QuotaSupervisor>,
    sources: S,
) -> tokio::task::JoinHandle<anyhow::Result<()>> {
    let span = tracing::info_span!("quota_maintenance");
    tokio::spawn(supervisor.quota_maintenance(sources).instrument(span))
}
