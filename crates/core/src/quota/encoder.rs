//! Firmware quota command encoding.
//!
//! Interface percentages are aggregated per binding and converted to the
//! firmware's fixed-point unit. Integer conversion loses up to one unit per
//! interface; the shortfall is redistributed so the encoded total always
//! lands on [`MAX_QUOTA`] exactly.

use bytes::{BufMut, BytesMut};

use super::constants::{MAX_BINDINGS, MAX_QUOTA};
use super::{Allocation, QuotaError};
use crate::vif::BindingRef;

/// Composite id-and-color marking an unused command slot.
pub const INVALID_ID_AND_COLOR: u32 = u32::MAX;

const COLOR_SHIFT: u32 = 8;

pub(crate) fn id_and_color(binding: &BindingRef) -> u32 {
    binding.id.0 | binding.color << COLOR_SHIFT
}

/// One per-binding entry of the firmware quota command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSlot {
    pub id_and_color: u32,
    /// Share of [`MAX_QUOTA`] granted to this binding.
    pub quota: u32,
    /// Airtime cap for one scheduling visit; zero leaves it uncapped.
    pub max_duration: u32,
}

impl QuotaSlot {
    const UNUSED: Self = QuotaSlot {
        id_and_color: INVALID_ID_AND_COLOR,
        quota: 0,
        max_duration: 0,
    };

    pub fn is_used(&self) -> bool {
        self.id_and_color != INVALID_ID_AND_COLOR
    }
}

/// Complete quota command, one slot per possible binding, sent verbatim as
/// the firmware payload. On the success path the slot quotas sum to exactly
/// [`MAX_QUOTA`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaCommand {
    pub slots: [QuotaSlot; MAX_BINDINGS],
}

impl QuotaCommand {
    pub fn total_quota(&self) -> u32 {
        self.slots.iter().map(|slot| slot.quota).sum()
    }

    /// Little-endian wire payload: three `u32` fields per slot.
    pub fn payload(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(MAX_BINDINGS * 12);
        for slot in &self.slots {
            buf.put_u32_le(slot.id_and_color);
            buf.put_u32_le(slot.quota);
            buf.put_u32_le(slot.max_duration);
        }
        buf
    }
}

pub(super) fn encode(allocations: &[Allocation]) -> Result<QuotaCommand, QuotaError> {
    let mut slots = [QuotaSlot::UNUSED; MAX_BINDINGS];

    for allocation in allocations {
        let index = allocation.vif.binding.id.0 as usize;
        let Some(slot) = slots.get_mut(index) else {
            tracing::warn!(
                vif = %allocation.vif.id,
                binding = %allocation.vif.binding.id,
                "binding outside the firmware slot range, interface left unscheduled"
            );
            continue;
        };
        if !slot.is_used() {
            slot.id_and_color = id_and_color(&allocation.vif.binding);
        }
        slot.quota += allocation.quota_pct * MAX_QUOTA / 100;
    }

    let total: u32 = slots.iter().map(|slot| slot.quota).sum();
    if total > MAX_QUOTA {
        // The percentage sum was normalized to 100 before conversion, so
        // overshooting the fixed-point total means the allocation step is
        // broken, not the inputs.
        tracing::error!(total, max = MAX_QUOTA, "encoded quota exceeds the firmware total");
        return Err(QuotaError::FractionOverflow {
            total,
            max: MAX_QUOTA,
        });
    }
    if total == 0 {
        return Err(QuotaError::NoSchedulableBinding);
    }

    // Hand the conversion remainder back one unit at a time across the
    // populated slots until the total is exact.
    let mut shortfall = MAX_QUOTA - total;
    while shortfall > 0 {
        for slot in slots.iter_mut().filter(|slot| slot.quota > 0) {
            if shortfall == 0 {
                break;
            }
            slot.quota += 1;
            shortfall -= 1;
        }
    }

    Ok(QuotaCommand { slots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vif::{Vif, VifRole};

    fn allocation(vif_id: u32, binding: BindingRef, quota_pct: u32) -> Allocation {
        Allocation {
            vif: Vif::new(vif_id, binding, VifRole::Station),
            prior_pct: 0,
            quota_pct,
            low_latency: false,
            floor_pct: 0,
        }
    }

    #[test]
    fn encoded_total_is_exact() {
        let command = encode(&[
            allocation(1, BindingRef::new(0, 0), 33),
            allocation(2, BindingRef::new(1, 0), 33),
            allocation(3, BindingRef::new(2, 0), 34),
        ])
        .unwrap();

        assert_eq!(command.total_quota(), MAX_QUOTA);
    }

    #[test]
    fn shared_binding_aggregates_into_one_slot() {
        let binding = BindingRef::new(1, 7);
        let command = encode(&[
            allocation(1, binding, 34),
            allocation(2, binding, 33),
            allocation(3, binding, 33),
        ])
        .unwrap();

        let used: Vec<_> = command.slots.iter().filter(|slot| slot.is_used()).collect();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].id_and_color, 1 | 7 << 8);
        assert_eq!(used[0].quota, MAX_QUOTA);
        assert_eq!(command.slots[0], QuotaSlot::UNUSED);
    }

    #[test]
    fn out_of_range_binding_skips_only_that_interface() {
        let command = encode(&[
            allocation(1, BindingRef::new(0, 0), 50),
            allocation(2, BindingRef::new(MAX_BINDINGS as u32, 0), 50),
        ])
        .unwrap();

        // The surviving binding absorbs the whole budget.
        assert_eq!(command.slots[0].quota, MAX_QUOTA);
        assert_eq!(command.total_quota(), MAX_QUOTA);
    }

    #[test]
    fn all_bindings_out_of_range_is_an_error() {
        let result = encode(&[allocation(1, BindingRef::new(9, 0), 100)]);
        assert!(matches!(result, Err(QuotaError::NoSchedulableBinding)));
    }

    #[test]
    fn percentage_overshoot_is_an_invariant_violation() {
        let result = encode(&[
            allocation(1, BindingRef::new(0, 0), 100),
            allocation(2, BindingRef::new(1, 0), 100),
        ]);
        assert!(matches!(
            result,
            Err(QuotaError::FractionOverflow { total: 256, .. })
        ));
    }

    #[test]
    fn payload_layout_is_little_endian_triples() {
        let command = encode(&[allocation(1, BindingRef::new(2, 1), 100)]).unwrap();
        let payload = command.payload();

        assert_eq!(payload.len(), MAX_BINDINGS * 12);
        // Slot 0 and 1 are unused sentinels.
        assert_eq!(&payload[0..4], &u32::MAX.to_le_bytes());
        assert_eq!(&payload[4..8], &0u32.to_le_bytes());
        // Slot 2 carries the full quota for binding 2, color 1.
        let base = 2 * 12;
        assert_eq!(&payload[base..base + 4], &(2u32 | 1 << 8).to_le_bytes());
        assert_eq!(&payload[base + 4..base + 8], &MAX_QUOTA.to_le_bytes());
        assert_eq!(&payload[base + 8..base + 12], &0u32.to_le_bytes());
    }
}
