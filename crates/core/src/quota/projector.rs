//! Per-interface quota projection.

use crate::config::QuotaConfig;

/// Propose the next quota percentage for a single interface from this
/// period's usage, before normalization against the shared 100%.
///
/// Four regimes, evaluated in order: bootstrap for a brand-new interface,
/// growth when the interface ran hot, hold while it sits between the
/// watermarks, and decay when it left most of its slice idle.
pub(super) fn project(
    config: &QuotaConfig,
    usage_pct: u32,
    prior_pct: u32,
    unused_pct: u32,
    active_count: u32,
) -> u32 {
    debug_assert!(active_count > 0, "projection over an empty active set");
    debug_assert!(usage_pct <= 100, "usage must be pre-capped by the caller");

    if prior_pct == 0 {
        return config.start_percent;
    }

    if usage_pct > config.high_watermark_percent {
        return if unused_pct > 0 {
            prior_pct + unused_pct / active_count + config.grow_step_percent
        } else {
            // Every interface is saturated; nothing to reclaim, so fall
            // back to an equal split.
            100 / active_count
        };
    }

    if usage_pct > config.low_watermark_percent {
        return prior_pct;
    }

    let decay = (config.shrink_step_percent + unused_pct / active_count)
        .min(config.low_watermark_percent - usage_pct);
    prior_pct.saturating_sub(decay).max(config.min_percent)
}
