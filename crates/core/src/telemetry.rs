//! Per-period airtime usage telemetry.

use std::collections::HashMap;
use std::time::Duration;

use crate::vif::VifId;

/// Airtime observed for each interface during one closed measurement
/// period. `elapsed` is the length of that period; per-interface airtime is
/// expressed in the same units.
#[derive(Debug, Clone, Default)]
pub struct UsageSnapshot {
    elapsed: Duration,
    airtime: HashMap<VifId, Duration>,
}

impl UsageSnapshot {
    pub fn new(elapsed: Duration) -> Self {
        UsageSnapshot {
            elapsed,
            airtime: HashMap::new(),
        }
    }

    /// Record airtime consumed by `vif`. Repeated calls accumulate, so a
    /// caller draining several hardware counters can report them one by one.
    pub fn record(&mut self, vif: VifId, airtime: Duration) {
        *self.airtime.entry(vif).or_default() += airtime;
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn airtime(&self, vif: VifId) -> Duration {
        self.airtime.get(&vif).copied().unwrap_or_default()
    }

    /// Airtime consumed by `vif` as a percentage of the slice it was
    /// granted (`granted_pct` of the whole period). Capped at 100 to absorb
    /// the measurement noise that comes with channel-context sharing. A
    /// zero-length period or a zero grant reads as zero usage.
    pub fn usage_percent(&self, vif: VifId, granted_pct: u32) -> u32 {
        let slice_us = self.elapsed.as_micros() * u128::from(granted_pct) / 100;
        if slice_us == 0 {
            return 0;
        }
        let used_us = self.airtime(vif).as_micros();
        (used_us * 100 / slice_us).min(100) as u32
    }
}
