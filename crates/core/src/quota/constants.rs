/// Fixed-point total understood by the firmware; the fractions of every
/// published command sum to exactly this value.
pub const MAX_QUOTA: u32 = 128;

/// Number of binding slots in a firmware quota command. Binding ids at or
/// above this bound cannot be scheduled.
pub const MAX_BINDINGS: usize = 4;

/// Upper bound on simultaneously active interfaces in one recomputation.
pub const MAX_ACTIVE_VIFS: usize = 8;

/// Safety bound for the minimum-floor rebalancing loop. A feasible floor
/// configuration converges in far fewer passes; exhausting the bound means
/// the floor/count validation and the loop disagree.
pub(crate) const REBALANCE_ITERATION_LIMIT: usize = 100;
