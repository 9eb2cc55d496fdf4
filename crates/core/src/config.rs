//! Allocator tunables.
//!
//! Every knob of the closed-loop algorithm lives here as a named constant
//! backing a [`QuotaConfig`] field, so deployments can override individual
//! values from their configuration file without touching the algorithm.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vif::LowLatency;

/// Bootstrap share handed to a brand-new interface.
pub const DEFAULT_START_PERCENT: u32 = 20;
/// Usage above this watermark marks an interface as starved for airtime.
pub const DEFAULT_HIGH_WATERMARK_PERCENT: u32 = 90;
/// Usage below this watermark marks an interface as leaving its slice idle.
pub const DEFAULT_LOW_WATERMARK_PERCENT: u32 = 10;
/// Extra share granted on top of reclaimed slack when an interface grows.
pub const DEFAULT_GROW_STEP_PERCENT: u32 = 5;
/// Baseline share taken away from an idle interface each period.
pub const DEFAULT_SHRINK_STEP_PERCENT: u32 = 3;
/// Hard floor below which no active interface may fall.
pub const DEFAULT_MIN_PERCENT: u32 = 5;
/// Smallest per-interface movement that justifies republishing a command.
pub const DEFAULT_SIGNIFICANT_CHANGE_PERCENT: u32 = 5;
/// Guaranteed share for a generic latency-sensitive interface.
pub const DEFAULT_LOW_LATENCY_FLOOR_PERCENT: u32 = 25;
/// Guaranteed share for a latency-sensitive P2P client.
pub const DEFAULT_P2P_CLIENT_FLOOR_PERCENT: u32 = 35;
/// Guaranteed share for a latency-sensitive P2P GO or AP, which carries
/// traffic for its clients as well as its own.
pub const DEFAULT_P2P_GO_FLOOR_PERCENT: u32 = 45;
/// How often the supervisor recomputes shares.
pub const DEFAULT_RECOMPUTE_PERIOD: Duration = Duration::from_secs(5);

/// Tunables of the airtime-share algorithm. Values are percentages of the
/// shared airtime unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub start_percent: u32,
    pub high_watermark_percent: u32,
    pub low_watermark_percent: u32,
    pub grow_step_percent: u32,
    pub shrink_step_percent: u32,
    pub min_percent: u32,
    pub significant_change_percent: u32,
    pub low_latency_floor_percent: u32,
    pub p2p_client_floor_percent: u32,
    pub p2p_go_floor_percent: u32,
    pub recompute_period: Duration,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        QuotaConfig {
            start_percent: DEFAULT_START_PERCENT,
            high_watermark_percent: DEFAULT_HIGH_WATERMARK_PERCENT,
            low_watermark_percent: DEFAULT_LOW_WATERMARK_PERCENT,
            grow_step_percent: DEFAULT_GROW_STEP_PERCENT,
            shrink_step_percent: DEFAULT_SHRINK_STEP_PERCENT,
            min_percent: DEFAULT_MIN_PERCENT,
            significant_change_percent: DEFAULT_SIGNIFICANT_CHANGE_PERCENT,
            low_latency_floor_percent: DEFAULT_LOW_LATENCY_FLOOR_PERCENT,
            p2p_client_floor_percent: DEFAULT_P2P_CLIENT_FLOOR_PERCENT,
            p2p_go_floor_percent: DEFAULT_P2P_GO_FLOOR_PERCENT,
            recompute_period: DEFAULT_RECOMPUTE_PERIOD,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("low watermark {low}% must sit below the high watermark {high}%")]
    WatermarkOrder { low: u32, high: u32 },
    #[error("{name} is {value}% but must be between 1 and 100")]
    PercentOutOfRange { name: &'static str, value: u32 },
    #[error("minimum quota {min}% must not exceed the bootstrap share {start}%")]
    MinAboveStart { min: u32, start: u32 },
    #[error("recompute period must be non-zero")]
    ZeroPeriod,
}

impl QuotaConfig {
    /// Reject tunable combinations the algorithm cannot operate under.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let percents = [
            ("start_percent", self.start_percent),
            ("high_watermark_percent", self.high_watermark_percent),
            ("low_watermark_percent", self.low_watermark_percent),
            ("min_percent", self.min_percent),
            ("low_latency_floor_percent", self.low_latency_floor_percent),
            ("p2p_client_floor_percent", self.p2p_client_floor_percent),
            ("p2p_go_floor_percent", self.p2p_go_floor_percent),
        ];
        for (name, value) in percents {
            if value == 0 || value > 100 {
                return Err(ConfigError::PercentOutOfRange { name, value });
            }
        }
        if self.low_watermark_percent >= self.high_watermark_percent {
            return Err(ConfigError::WatermarkOrder {
                low: self.low_watermark_percent,
                high: self.high_watermark_percent,
            });
        }
        if self.min_percent > self.start_percent {
            return Err(ConfigError::MinAboveStart {
                min: self.min_percent,
                start: self.start_percent,
            });
        }
        if self.recompute_period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }

    /// Role-specific guaranteed share, zero when the interface is not
    /// latency sensitive.
    pub fn low_latency_floor(&self, class: LowLatency) -> u32 {
        match class {
            LowLatency::Off => 0,
            LowLatency::Generic => self.low_latency_floor_percent,
            LowLatency::P2pClient => self.p2p_client_floor_percent,
            LowLatency::P2pGo => self.p2p_go_floor_percent,
        }
    }
}
