//! Payment status transitions.
//!
//! Status ids live in the `payment_statuses` table; admins can add rows, so
//! statuses are not a closed enum. The three seeded ids below are the ones the
//! service itself depends on.

/// Default status for a new payment.
pub const PENDING: i64 = 1;
pub const PAID: i64 = 2;
pub const CANCELLED: i64 = 3;

/// A named rewrite applied when a caller asks for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub name: &'static str,
    pub requested: i64,
    pub effective: i64,
}

/// Requested → effective status rewrites consulted on every update.
///
/// A payment that has been touched cannot go back to pending: asking for
/// Pending cancels it instead.
pub const TRANSITION_RULES: &[TransitionRule] = &[TransitionRule {
    name: "pending_cancels",
    requested: PENDING,
    effective: CANCELLED,
}];

/// Outcome of resolving a requested status against the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub requested: i64,
    pub effective: i64,
    pub rule: Option<&'static str>,
}

/// Resolve the status that will actually be stored for `requested`.
///
/// Does not check that `requested` is a known status; callers validate that
/// against storage first.
pub fn resolve(requested: i64) -> Transition {
    match TRANSITION_RULES.iter().find(|r| r.requested == requested) {
        Some(rule) => Transition {
            requested,
            effective: rule.effective,
            rule: Some(rule.name),
        },
        None => Transition {
            requested,
            effective: requested,
            rule: None,
        },
    }
}
